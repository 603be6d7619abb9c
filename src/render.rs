//! HTML views.
//!
//! Uses [maud](https://maud.lambda.xyz/) for compile-time HTML templating,
//! so every interpolated record field is escaped.
//!
//! ## Pages
//!
//! - **Public page** (`/`): every record, oldest first, with its evidence
//! - **Admin page** (`/admin`): publish form when logged in, otherwise a
//!   warning and the login form
//! - **Error page**: persistence failures, shown with the underlying message
//!
//! Evidence is dispatched on its stored [`MediaKind`]: images become `<img>`,
//! videos become `<video>`, and anything else is skipped.

use crate::imaging::rust_backend::supported_input_extensions;
use crate::media::encode_path;
use crate::record::{Evidence, MediaKind, Record, VIDEO_EXTENSIONS};
use crate::session::{Session, View};
use crate::workflow::PublishForm;
use maud::{DOCTYPE, Markup, PreEscaped, html};

const CSS: &str = include_str!("../static/style.css");

/// URL prefix the upload root is served under.
pub const UPLOADS_URL: &str = "/uploads";

/// One-shot message shown above a page's content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flash {
    Notice(String),
    Warning(String),
    Error(String),
}

impl Flash {
    fn class(&self) -> &'static str {
        match self {
            Flash::Notice(_) => "flash notice",
            Flash::Warning(_) => "flash warning",
            Flash::Error(_) => "flash error",
        }
    }

    fn message(&self) -> &str {
        match self {
            Flash::Notice(m) | Flash::Warning(m) | Flash::Error(m) => m,
        }
    }
}

fn render_flash(flash: Option<&Flash>) -> Markup {
    html! {
        @if let Some(flash) = flash {
            p class=(flash.class()) role="status" { (flash.message()) }
        }
    }
}

// ============================================================================
// Layout
// ============================================================================

fn base_document(title: &str, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="pt-BR" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
                style { (PreEscaped(CSS)) }
            }
            body {
                (content)
            }
        }
    }
}

fn site_header(nav: Markup) -> Markup {
    html! {
        header.site-header {
            a.brand href="/" { "Portfólio de Evidências" }
            nav.site-nav {
                (nav)
            }
        }
    }
}

/// Renders the navigation menu: one entry per view, plus logout when the
/// session is authenticated.
pub fn render_nav(session: &Session, current: View) -> Markup {
    html! {
        ul {
            @for view in [View::Public, View::Admin] {
                li class=[(view == current).then_some("current")] {
                    a href=(view.path()) { (view.label()) }
                }
            }
            @if session.logged_in {
                li {
                    form method="post" action="/logout" {
                        button type="submit" { "Sair" }
                    }
                }
            }
        }
    }
}

fn page(title: &str, session: &Session, current: View, body: Markup) -> Markup {
    base_document(
        title,
        html! {
            (site_header(render_nav(session, current)))
            main {
                (body)
            }
        },
    )
}

// ============================================================================
// Public view
// ============================================================================

/// Public URL of a stored evidence file. The upload root is flat, so only
/// the final path component matters.
pub fn media_url(path: &str) -> String {
    let name = path.rsplit('/').next().unwrap_or(path);
    format!("{UPLOADS_URL}/{}", encode_path(name))
}

fn render_evidence(evidence: &Evidence) -> Markup {
    let src = media_url(&evidence.path);
    html! {
        @match evidence.kind {
            MediaKind::Image => {
                img src=(src) alt="Evidência" loading="lazy";
            }
            MediaKind::Video => {
                video src=(src) controls preload="metadata" {}
            }
            MediaKind::Other => {}
        }
    }
}

fn render_record(record: &Record) -> Markup {
    html! {
        article.record id={ "registro-" (record.id) } {
            h2 { (record.premissa) }
            dl {
                @for (label, value) in record.labeled_fields() {
                    dt { (label) }
                    dd { (value) }
                }
            }
            @if !record.evidencias.is_empty() {
                div.evidence {
                    @for evidence in &record.evidencias {
                        (render_evidence(evidence))
                    }
                }
            }
        }
    }
}

/// All records, in the order given.
pub fn render_public(records: &[Record]) -> Markup {
    html! {
        @if records.is_empty() {
            p.empty { "Nenhum registro publicado ainda." }
        }
        @for record in records {
            (render_record(record))
        }
    }
}

pub fn public_page(records: &[Record], session: &Session, flash: Option<&Flash>) -> Markup {
    page(
        View::Public.label(),
        session,
        View::Public,
        html! {
            h1 { (View::Public.label()) }
            (render_flash(flash))
            (render_public(records))
        },
    )
}

// ============================================================================
// Admin view
// ============================================================================

pub fn render_login(error: Option<&str>) -> Markup {
    html! {
        h2 { "Login" }
        @if let Some(error) = error {
            p.flash.error role="alert" { (error) }
        }
        form.stacked method="post" action="/login" {
            label for="username" { "Usuário" }
            input type="text" id="username" name="username" autocomplete="username" required;
            label for="password" { "Senha" }
            input type="password" id="password" name="password" autocomplete="current-password" required;
            button type="submit" { "Entrar" }
        }
    }
}

/// File types offered by the evidence picker, as an HTML `accept` list.
fn accepted_extensions() -> String {
    supported_input_extensions()
        .iter()
        .chain(VIDEO_EXTENSIONS)
        .map(|ext| format!(".{ext}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Publish form, pre-filled with `form` (empty on first visit, the rejected
/// submission after a validation error).
pub fn render_admin(form: &PublishForm, flash: Option<&Flash>) -> Markup {
    let text_fields = [
        ("premissa", "Premissa", &form.premissa),
        ("competencia", "Competência", &form.competencia),
        ("macro_indicador", "Macro Indicador", &form.macro_indicador),
        ("micro_indicador", "Micro Indicador", &form.micro_indicador),
    ];
    let area_fields = [
        ("acao", "Ação", &form.acao),
        ("descricao", "Descrição", &form.descricao),
    ];

    html! {
        h2 { "Publicar evidência" }
        (render_flash(flash))
        form.stacked method="post" action="/publish" enctype="multipart/form-data" {
            @for (name, label, value) in text_fields {
                label for=(name) { (label) }
                input type="text" id=(name) name=(name) value=(value) required;
            }
            @for (name, label, value) in area_fields {
                label for=(name) { (label) }
                textarea id=(name) name=(name) required { (value) }
            }
            label for="evidencias" { "Evidências (imagens ou vídeos)" }
            input type="file" id="evidencias" name="evidencias" multiple
                accept=(accepted_extensions());
            button type="submit" { "Publicar" }
        }
    }
}

pub fn admin_page(session: &Session, form: &PublishForm, flash: Option<&Flash>) -> Markup {
    page(
        View::Admin.label(),
        session,
        View::Admin,
        html! {
            h1 { (View::Admin.label()) }
            (render_admin(form, flash))
        },
    )
}

/// Admin page for an anonymous session.
pub fn login_page(session: &Session, error: Option<&str>) -> Markup {
    page(
        View::Admin.label(),
        session,
        View::Admin,
        html! {
            h1 { (View::Admin.label()) }
            p.flash.warning { "Você precisa estar logado para acessar esta página." }
            (render_login(error))
        },
    )
}

pub fn error_page(session: &Session, message: &str) -> Markup {
    page(
        "Erro",
        session,
        session.page,
        html! {
            h1 { "Não foi possível concluir a operação" }
            p.flash.error { (message) }
            p { a href=(session.page.path()) { "Voltar" } }
        },
    )
}

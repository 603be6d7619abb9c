//! HTTP server setup and routing.
//!
//! | Route | Handler |
//! |---|---|
//! | `GET /` | public page |
//! | `GET /admin` | publish form, or warning + login form |
//! | `POST /login` | form login, 303 to `/admin` or 401 with the login form |
//! | `POST /logout` | ends the session, 303 to `/` |
//! | `POST /publish` | multipart publish, 303 to `/` |
//! | `GET /uploads/*` | stored evidence files |
//!
//! Each browser is tied to its [`Session`] through the `folio_session`
//! cookie. Handlers receive the session as a [`ClientSession`] extractor and
//! write it back to the [`SessionStore`] when they change it.
//!
//! SQLite and image work run on the blocking pool.

use crate::config::{AppConfig, ConfigError, Credentials};
use crate::db::{DbError, open_db};
use crate::export::DocumentExporter;
use crate::imaging::RustBackend;
use crate::media::{MediaError, MediaStore};
use crate::render::{self, Flash, UPLOADS_URL};
use crate::session::{AuthGate, AuthResult, Session, SessionId, SessionStore, View};
use crate::store::{RecordStore, SqliteRecordStore};
use crate::workflow::{PublishError, PublishForm, Publisher, Upload};
use axum::extract::{DefaultBodyLimit, FromRequestParts, Multipart, Query, State};
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router, async_trait};
use serde::Deserialize;
use std::convert::Infallible;
use std::fs;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

pub const SESSION_COOKIE: &str = "folio_session";

const LOGIN_FAILED: &str = "Usuário ou senha incorretos.";
const PUBLISHED: &str = "Registro publicado com sucesso!";
const EXPORT_FAILED: &str = "Registro publicado, mas a exportação em markdown falhou.";

#[derive(Error, Debug)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid bind address {0:?}")]
    Bind(String),
}

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Mutex<SqliteRecordStore>>,
    pub media: Arc<MediaStore<RustBackend>>,
    pub exporter: Arc<DocumentExporter>,
    pub auth: Arc<AuthGate>,
    pub sessions: Arc<SessionStore>,
    /// Request body limit for `/publish`, in bytes.
    pub body_limit: usize,
}

impl AppState {
    pub fn new(
        store: SqliteRecordStore,
        media: MediaStore<RustBackend>,
        exporter: DocumentExporter,
        auth: AuthGate,
        body_limit: usize,
    ) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            media: Arc::new(media),
            exporter: Arc::new(exporter),
            auth: Arc::new(auth),
            sessions: Arc::new(SessionStore::new()),
            body_limit,
        }
    }

    /// Wire up every component from configuration: create the upload and
    /// export roots, open (and migrate) the database, check credentials.
    pub fn open(config: &AppConfig, credentials: Credentials) -> Result<Self, StartupError> {
        let auth = AuthGate::new(credentials)?;

        fs::create_dir_all(&config.paths.uploads)?;
        fs::create_dir_all(&config.paths.posts)?;
        if let Some(parent) = config.paths.database.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let conn = open_db(&config.paths.database)?;

        Ok(Self::new(
            SqliteRecordStore::new(conn),
            MediaStore::new(
                &config.paths.uploads,
                config.media.bound(),
                config.media.quality(),
                RustBackend::new(),
            ),
            DocumentExporter::new(&config.paths.posts, config.export.naming),
            auth,
            config.server.body_limit_bytes(),
        ))
    }
}

fn lock_store(store: &Mutex<SqliteRecordStore>) -> MutexGuard<'_, SqliteRecordStore> {
    store.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    let uploads = ServeDir::new(state.media.root());
    let body_limit = state.body_limit;

    Router::new()
        .route("/", get(public_view))
        .route("/admin", get(admin_view))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/publish", post(publish))
        .nest_service(UPLOADS_URL, uploads)
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Bind `config.server.bind` and serve until Ctrl-C.
pub async fn serve(config: &AppConfig, state: AppState) -> Result<(), StartupError> {
    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .map_err(|_| StartupError::Bind(config.server.bind.clone()))?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "could not install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

// =============================================================================
// Session cookie
// =============================================================================

/// The requesting client's session, created on first contact.
#[derive(Debug, Clone, Copy)]
pub struct ClientSession {
    pub id: SessionId,
    pub session: Session,
}

#[async_trait]
impl FromRequestParts<AppState> for ClientSession {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let (id, session) = state
            .sessions
            .get_or_create(session_id_from_headers(&parts.headers));
        Ok(Self { id, session })
    }
}

/// Extract the session id from the `Cookie` header(s), if present and valid.
pub fn session_id_from_headers(headers: &HeaderMap) -> Option<SessionId> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| value.parse().ok())
}

fn session_cookie(id: SessionId) -> String {
    format!("{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Lax")
}

fn expired_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

fn respond(id: SessionId, status: StatusCode, body: impl IntoResponse) -> Response {
    (status, [(header::SET_COOKIE, session_cookie(id))], body).into_response()
}

fn redirect(id: SessionId, to: &str) -> Response {
    ([(header::SET_COOKIE, session_cookie(id))], Redirect::to(to)).into_response()
}

// =============================================================================
// Handlers
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct PublicQuery {
    pub published: Option<i64>,
    #[serde(default)]
    pub export_failed: bool,
}

impl PublicQuery {
    fn flash(&self) -> Option<Flash> {
        match (self.published, self.export_failed) {
            (Some(_), true) => Some(Flash::Warning(EXPORT_FAILED.to_string())),
            (Some(_), false) => Some(Flash::Notice(PUBLISHED.to_string())),
            (None, _) => None,
        }
    }
}

async fn public_view(
    State(state): State<AppState>,
    ClientSession { id, mut session }: ClientSession,
    Query(query): Query<PublicQuery>,
) -> Response {
    session.page = View::Public;
    state.sessions.update(id, session);

    let store = Arc::clone(&state.store);
    let listed = tokio::task::spawn_blocking(move || lock_store(&store).list_all()).await;

    match listed {
        Ok(Ok(records)) => respond(
            id,
            StatusCode::OK,
            render::public_page(&records, &session, query.flash().as_ref()),
        ),
        Ok(Err(err)) => {
            error!(error = %err, "listing records failed");
            respond(
                id,
                StatusCode::INTERNAL_SERVER_ERROR,
                render::error_page(&session, &err.to_string()),
            )
        }
        Err(err) => {
            error!(error = %err, "listing task failed");
            respond(
                id,
                StatusCode::INTERNAL_SERVER_ERROR,
                render::error_page(&session, &err.to_string()),
            )
        }
    }
}

async fn admin_view(
    State(state): State<AppState>,
    ClientSession { id, mut session }: ClientSession,
) -> Response {
    session.page = View::Admin;
    state.sessions.update(id, session);

    let page = if session.logged_in {
        render::admin_page(&session, &PublishForm::default(), None)
    } else {
        render::login_page(&session, None)
    };
    respond(id, StatusCode::OK, page)
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

async fn login(
    State(state): State<AppState>,
    ClientSession { id, mut session }: ClientSession,
    Form(form): Form<LoginForm>,
) -> Response {
    match state.auth.login(&mut session, &form.username, &form.password) {
        AuthResult::Authenticated => {
            state.sessions.update(id, session);
            redirect(id, View::Admin.path())
        }
        AuthResult::Rejected => respond(
            id,
            StatusCode::UNAUTHORIZED,
            render::login_page(&session, Some(LOGIN_FAILED)),
        ),
    }
}

async fn logout(
    State(state): State<AppState>,
    ClientSession { id, mut session }: ClientSession,
) -> Response {
    state.auth.logout(&mut session);
    state.sessions.end(id);
    (
        [(header::SET_COOKIE, expired_cookie())],
        Redirect::to(View::Public.path()),
    )
        .into_response()
}

async fn publish(
    State(state): State<AppState>,
    ClientSession { id, mut session }: ClientSession,
    multipart: Multipart,
) -> Response {
    if !session.logged_in {
        return respond(
            id,
            StatusCode::UNAUTHORIZED,
            render::login_page(&session, None),
        );
    }

    let mut form = match read_publish_form(multipart).await {
        Ok(form) => form,
        Err(err) => {
            warn!(error = %err, "unreadable publish request");
            return (err.status(), err.body_text()).into_response();
        }
    };

    // Text fields are kept to refill the form if the publish is rejected.
    let uploads = std::mem::take(&mut form.uploads);
    let retained = form.clone();
    form.uploads = uploads;

    let task_state = state.clone();
    let result = tokio::task::spawn_blocking(move || {
        let mut store = lock_store(&task_state.store);
        Publisher::new(&mut *store, &*task_state.media, &*task_state.exporter)
            .publish(&session, form)
    })
    .await;

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(err) => {
            error!(error = %err, "publish task failed");
            return respond(
                id,
                StatusCode::INTERNAL_SERVER_ERROR,
                render::error_page(&session, &err.to_string()),
            );
        }
    };

    match outcome {
        Ok(outcome) => {
            session.page = outcome.next;
            state.sessions.update(id, session);
            let mut target = format!("{}?published={}", outcome.next.path(), outcome.record_id);
            if outcome.export.is_err() {
                target.push_str("&export_failed=true");
            }
            redirect(id, &target)
        }
        Err(err) => {
            let status = publish_error_status(&err);
            if status.is_server_error() {
                error!(error = %err, "publish failed");
            } else {
                warn!(error = %err, "publish rejected");
            }
            let body = match err {
                PublishError::Unauthenticated => render::login_page(&session, None),
                err if status.is_client_error() => render::admin_page(
                    &session,
                    &retained,
                    Some(&Flash::Error(err.to_string())),
                ),
                err => render::error_page(&session, &err.to_string()),
            };
            respond(id, status, body)
        }
    }
}

/// HTTP status for a failed publish.
pub fn publish_error_status(err: &PublishError) -> StatusCode {
    match err {
        PublishError::Unauthenticated => StatusCode::UNAUTHORIZED,
        PublishError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
        PublishError::Media { source, .. } => match source {
            MediaError::Imaging(_) | MediaError::InvalidName(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            MediaError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        },
        PublishError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn read_publish_form(
    mut multipart: Multipart,
) -> Result<PublishForm, axum::extract::multipart::MultipartError> {
    let mut form = PublishForm::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "evidencias" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                form.uploads.push(Upload::new(file_name, bytes.to_vec()));
            }
            "premissa" => form.premissa = field.text().await?,
            "competencia" => form.competencia = field.text().await?,
            "macro_indicador" => form.macro_indicador = field.text().await?,
            "micro_indicador" => form.micro_indicador = field.text().await?,
            "acao" => form.acao = field.text().await?,
            "descricao" => form.descricao = field.text().await?,
            other => warn!(field = other, "ignoring unknown form field"),
        }
    }

    Ok(form)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn cookie_parsing_finds_session() {
        let id = SessionId::generate();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("theme=dark; {SESSION_COOKIE}={id}; other=1")).unwrap(),
        );
        assert_eq!(session_id_from_headers(&headers), Some(id));
    }

    #[test]
    fn cookie_parsing_ignores_garbage() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("folio_session=not-a-uuid"),
        );
        assert_eq!(session_id_from_headers(&headers), None);
        assert_eq!(session_id_from_headers(&HeaderMap::new()), None);
    }

    #[test]
    fn session_cookie_is_http_only() {
        let cookie = session_cookie(SessionId::generate());
        assert!(cookie.starts_with("folio_session="));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Path=/"));
    }

    #[test]
    fn public_query_flash() {
        let ok = PublicQuery {
            published: Some(3),
            export_failed: false,
        };
        assert!(matches!(ok.flash(), Some(Flash::Notice(_))));

        let partial = PublicQuery {
            published: Some(3),
            export_failed: true,
        };
        assert!(matches!(partial.flash(), Some(Flash::Warning(_))));

        assert_eq!(PublicQuery::default().flash(), None);
    }

    #[test]
    fn error_status_mapping() {
        use crate::imaging::BackendError;
        use crate::record::RecordError;
        use crate::store::StoreError;

        assert_eq!(
            publish_error_status(&PublishError::Unauthenticated),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            publish_error_status(&PublishError::Invalid(RecordError::MissingField("acao"))),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            publish_error_status(&PublishError::Media {
                file_name: "x.png".into(),
                source: MediaError::Imaging(BackendError::Unsupported("bad".into())),
            }),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            publish_error_status(&PublishError::Media {
                file_name: "x.png".into(),
                source: MediaError::Io(std::io::Error::other("disk full")),
            }),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            publish_error_status(&PublishError::Store(StoreError::InvalidData("x".into()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}

//! Markdown export of published records.
//!
//! Every published record is mirrored to a human-readable markdown file in
//! the export directory. The file is derived data: nothing in the
//! application reads it back, and it is rewritten in full on every export.
//!
//! ## Document template
//!
//! ```text
//! # {premissa}
//!
//! **Competência:** {competencia}
//!
//! **Macro Indicador:** {macro_indicador}
//!
//! **Micro Indicador:** {micro_indicador}
//!
//! **Ação:** {acao}
//!
//! **Descrição:** {descricao}
//!
//! ![Evidência](../uploads/photo.jpg)
//! ```
//!
//! One embed line per evidence file, in submission order. Paths are made
//! relative to the export directory so the links resolve when the folder
//! is browsed directly, and percent-encoded so any file name survives as a
//! link destination.
//!
//! ## File naming
//!
//! [`ExportNaming::Identity`] (default) names files `{id}-{slug}.md`, which
//! can never collide. [`ExportNaming::Title`] reproduces the older
//! `{slug}.md` scheme, where two records with the same premise share a file
//! and the later export replaces the earlier one.

use crate::media::{decode_path, encode_path};
use crate::record::Record;
use pulldown_cmark::{Event, Parser, Tag};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// How export file names are derived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportNaming {
    /// `{id}-{slug}.md`, unique per record.
    #[default]
    Identity,
    /// `{slug}.md`, shared by records with the same premise.
    Title,
}

/// Writes one markdown document per record.
#[derive(Debug, Clone)]
pub struct DocumentExporter {
    root: PathBuf,
    naming: ExportNaming,
}

impl DocumentExporter {
    pub fn new(root: impl Into<PathBuf>, naming: ExportNaming) -> Self {
        Self {
            root: root.into(),
            naming,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path the document for `record` is written to.
    pub fn path_for(&self, record: &Record) -> PathBuf {
        let slug = slugify(&record.premissa);
        let file_name = match self.naming {
            ExportNaming::Identity => format!("{}-{}.md", record.id, slug),
            ExportNaming::Title => format!("{slug}.md"),
        };
        self.root.join(file_name)
    }

    /// Write (or overwrite) the document for `record`.
    pub fn export(&self, record: &Record) -> Result<PathBuf, ExportError> {
        fs::create_dir_all(&self.root)?;
        let path = self.path_for(record);
        fs::write(&path, render_document(record))?;
        tracing::info!(record_id = %record.id, path = %path.display(), "document exported");
        Ok(path)
    }
}

/// File-system safe form of a premise: spaces and path separators become
/// underscores.
pub fn slugify(title: &str) -> String {
    let slug: String = title
        .trim()
        .chars()
        .map(|c| match c {
            ' ' | '/' | '\\' => '_',
            c => c,
        })
        .collect();
    if slug.is_empty() || slug.chars().all(|c| c == '.') {
        "untitled".to_string()
    } else {
        slug
    }
}

/// Render the markdown document for a record.
pub fn render_document(record: &Record) -> String {
    let mut doc = String::new();
    let _ = writeln!(doc, "# {}\n", record.premissa);
    for (label, value) in record.labeled_fields() {
        let _ = writeln!(doc, "**{label}:** {value}\n");
    }
    for evidence in &record.evidencias {
        let _ = writeln!(doc, "![Evidência](../{})", encode_path(&evidence.path));
    }
    doc
}

/// Image destinations embedded in a markdown document, in order.
///
/// Inverse of the embed lines written by [`render_document`]: the `../`
/// prefix is removed and the path decoded.
pub fn embedded_media(markdown: &str) -> Vec<String> {
    Parser::new(markdown)
        .filter_map(|event| match event {
            Event::Start(Tag::Image { dest_url, .. }) => {
                let dest = dest_url.strip_prefix("../").unwrap_or(&*dest_url);
                Some(decode_path(dest))
            }
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::tests::sample_record;
    use crate::record::{Evidence, MediaKind, RecordId};
    use tempfile::TempDir;

    fn record_with_evidence(id: i64, paths: &[&str]) -> Record {
        let mut draft = sample_record();
        draft.evidencias = paths
            .iter()
            .map(|p| Evidence::new(*p, MediaKind::from_file_name(p)))
            .collect();
        draft.with_id(RecordId(id))
    }

    #[test]
    fn slugify_replaces_spaces_and_separators() {
        assert_eq!(slugify("Trabalho em equipe"), "Trabalho_em_equipe");
        assert_eq!(slugify("a/b\\c"), "a_b_c");
        assert_eq!(slugify("  "), "untitled");
        assert_eq!(slugify(".."), "untitled");
    }

    #[test]
    fn identity_naming_includes_id() {
        let exporter = DocumentExporter::new("posts", ExportNaming::Identity);
        let record = record_with_evidence(12, &[]);
        assert_eq!(
            exporter.path_for(&record),
            Path::new("posts").join("12-Trabalho_em_equipe.md")
        );
    }

    #[test]
    fn title_naming_uses_slug_only() {
        let exporter = DocumentExporter::new("posts", ExportNaming::Title);
        let record = record_with_evidence(12, &[]);
        assert_eq!(
            exporter.path_for(&record),
            Path::new("posts").join("Trabalho_em_equipe.md")
        );
    }

    #[test]
    fn document_has_heading_and_labeled_fields() {
        let doc = render_document(&record_with_evidence(1, &[]));
        assert!(doc.starts_with("# Trabalho em equipe\n\n"));
        assert!(doc.contains("**Competência:** Colaboração\n"));
        assert!(doc.contains("**Macro Indicador:** Comunicação\n"));
        assert!(doc.contains("**Micro Indicador:** Escuta ativa\n"));
        assert!(doc.contains("**Ação:** Conduziu a retrospectiva da sprint\n"));
        assert!(doc.contains("**Descrição:** Facilitou a discussão"));
        assert!(!doc.contains("!["));
    }

    #[test]
    fn export_then_reread_keeps_embed_order() {
        let tmp = TempDir::new().unwrap();
        let exporter = DocumentExporter::new(tmp.path().join("posts"), ExportNaming::Identity);
        let paths = ["uploads/3.png", "uploads/1.mp4", "uploads/foto, final.jpg"];
        let record = record_with_evidence(5, &paths);

        let written = exporter.export(&record).unwrap();
        let content = fs::read_to_string(written).unwrap();

        assert_eq!(embedded_media(&content), paths);
        assert_eq!(content.matches("![Evidência]").count(), 3);
    }

    #[test]
    fn reserved_characters_survive_reread() {
        let paths = [
            "uploads/foto#1.jpg",
            "uploads/a>b.png",
            "uploads/100% certo.png",
            "uploads/x (1) <2>.mp4",
        ];
        let doc = render_document(&record_with_evidence(3, &paths));

        assert!(doc.contains("![Evidência](../uploads/foto%231.jpg)\n"));
        assert!(doc.contains("![Evidência](../uploads/a%3Eb.png)\n"));
        assert_eq!(embedded_media(&doc), paths);
    }

    #[test]
    fn same_title_overwrites_in_title_mode() {
        let tmp = TempDir::new().unwrap();
        let exporter = DocumentExporter::new(tmp.path(), ExportNaming::Title);
        let first = record_with_evidence(1, &["uploads/first.png"]);
        let mut second = record_with_evidence(2, &["uploads/second.png"]);
        second.acao = "Segunda ação".to_string();

        let p1 = exporter.export(&first).unwrap();
        let p2 = exporter.export(&second).unwrap();
        assert_eq!(p1, p2);

        let content = fs::read_to_string(p2).unwrap();
        assert_eq!(content, render_document(&second));
        assert!(!content.contains("first.png"));
    }

    #[test]
    fn same_title_kept_apart_in_identity_mode() {
        let tmp = TempDir::new().unwrap();
        let exporter = DocumentExporter::new(tmp.path(), ExportNaming::Identity);

        let p1 = exporter.export(&record_with_evidence(1, &[])).unwrap();
        let p2 = exporter.export(&record_with_evidence(2, &[])).unwrap();
        assert_ne!(p1, p2);
        assert!(p1.exists() && p2.exists());
    }

    #[test]
    fn export_naming_parses_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            naming: ExportNaming,
        }
        let w: Wrapper = toml::from_str(r#"naming = "title""#).unwrap();
        assert_eq!(w.naming, ExportNaming::Title);
    }
}

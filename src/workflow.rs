//! The publish pipeline: validate, store media, insert, export.
//!
//! ```text
//! PublishForm ──validate──▶ MediaStore (one call per upload, in order)
//!                               │
//!                               ▼
//!                         RecordStore::insert ──▶ DocumentExporter::export
//! ```
//!
//! Any failure up to and including the insert aborts the publish. Media
//! already written by then stays on disk; no compensation is attempted.
//! The export runs after the record is committed and its failure is only
//! reported: the record is the source of truth and the markdown file can be
//! regenerated.

use crate::export::DocumentExporter;
use crate::imaging::ImageBackend;
use crate::media::{MediaError, MediaStore};
use crate::record::{Evidence, LegacyPost, MediaKind, NewRecord, RecordError, RecordId};
use crate::session::{Session, View};
use crate::store::{RecordStore, StoreError};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("login required")]
    Unauthenticated,
    #[error("invalid submission: {0}")]
    Invalid(#[from] RecordError),
    #[error("could not store `{file_name}`: {source}")]
    Media {
        file_name: String,
        #[source]
        source: MediaError,
    },
    #[error("could not save record: {0}")]
    Store(#[from] StoreError),
}

/// One uploaded file as received from the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// Browsers submit an empty, nameless part when no file was chosen.
    fn is_blank(&self) -> bool {
        self.file_name.trim().is_empty() && self.bytes.is_empty()
    }
}

/// The publish form as submitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishForm {
    pub premissa: String,
    pub competencia: String,
    pub macro_indicador: String,
    pub micro_indicador: String,
    pub acao: String,
    pub descricao: String,
    pub uploads: Vec<Upload>,
}

impl PublishForm {
    /// The submitted text fields as a record draft, without evidence.
    pub fn draft(&self) -> NewRecord {
        NewRecord {
            premissa: self.premissa.clone(),
            competencia: self.competencia.clone(),
            macro_indicador: self.macro_indicador.clone(),
            micro_indicador: self.micro_indicador.clone(),
            acao: self.acao.clone(),
            descricao: self.descricao.clone(),
            evidencias: Vec::new(),
        }
    }
}

#[derive(Debug)]
pub struct PublishOutcome {
    pub record_id: RecordId,
    /// Where the markdown copy was written, or why it was not.
    pub export: Result<PathBuf, String>,
    /// Where the client goes next.
    pub next: View,
}

/// Runs one publish against borrowed collaborators.
pub struct Publisher<'a, S: RecordStore, B: ImageBackend> {
    store: &'a mut S,
    media: &'a MediaStore<B>,
    exporter: &'a DocumentExporter,
}

impl<'a, S: RecordStore, B: ImageBackend> Publisher<'a, S, B> {
    pub fn new(
        store: &'a mut S,
        media: &'a MediaStore<B>,
        exporter: &'a DocumentExporter,
    ) -> Self {
        Self {
            store,
            media,
            exporter,
        }
    }

    pub fn publish(
        &mut self,
        session: &Session,
        form: PublishForm,
    ) -> Result<PublishOutcome, PublishError> {
        if !session.logged_in {
            return Err(PublishError::Unauthenticated);
        }

        let mut draft = form.draft();
        draft.validate()?;

        for upload in form.uploads.into_iter().filter(|u| !u.is_blank()) {
            let kind = MediaKind::from_file_name(&upload.file_name);
            let stored = self
                .media
                .store(upload.bytes, &upload.file_name, kind)
                .map_err(|source| PublishError::Media {
                    file_name: upload.file_name.clone(),
                    source,
                })?;
            draft.evidencias.push(Evidence::new(stored.path, stored.kind));
        }

        let record_id = self.store.insert(&draft)?;
        let record = draft.with_id(record_id);

        let export = self.exporter.export(&record).map_err(|err| {
            tracing::error!(record_id = %record_id, error = %err, "export failed");
            err.to_string()
        });

        tracing::info!(
            record_id = %record_id,
            evidence_count = record.evidencias.len(),
            "record published"
        );

        Ok(PublishOutcome {
            record_id,
            export,
            next: View::Public,
        })
    }
}

/// Result of importing legacy posts.
#[derive(Debug, Default)]
pub struct ImportSummary {
    pub imported: Vec<RecordId>,
    /// 1-based position of each rejected post, with the reason.
    pub skipped: Vec<(usize, RecordError)>,
    pub export_failures: usize,
}

/// Migrate legacy posts into the store and export each one.
///
/// Posts that fail validation after migration are skipped. A store failure
/// stops the import; posts inserted before it stay.
pub fn import_legacy<S: RecordStore>(
    store: &mut S,
    exporter: &DocumentExporter,
    posts: Vec<LegacyPost>,
) -> Result<ImportSummary, StoreError> {
    let mut summary = ImportSummary::default();

    for (index, post) in posts.into_iter().enumerate() {
        let draft = NewRecord::from(post);
        if let Err(err) = draft.validate() {
            tracing::warn!(post = index + 1, error = %err, "legacy post skipped");
            summary.skipped.push((index + 1, err));
            continue;
        }

        let record_id = store.insert(&draft)?;
        if let Err(err) = exporter.export(&draft.with_id(record_id)) {
            tracing::error!(record_id = %record_id, error = %err, "export failed");
            summary.export_failures += 1;
        }
        summary.imported.push(record_id);
    }

    tracing::info!(
        imported = summary.imported.len(),
        skipped = summary.skipped.len(),
        "legacy import finished"
    );
    Ok(summary)
}

//! Evaluation records and their evidence.
//!
//! A [`Record`] is one published competency evaluation: a premise, the
//! competency and indicators it addresses, the action taken, a free-text
//! description, and an ordered list of [`Evidence`] files.
//!
//! ## Versions
//!
//! The first iteration of the tool stored generic blog posts
//! (`title`, `content`, one optional media file). Those documents are
//! modelled as [`LegacyPost`] and converted with `NewRecord::from`, so old
//! exports can be imported into the current schema instead of living in a
//! parallel, incompatible one.
//!
//! ## Media kind
//!
//! Each evidence carries a [`MediaKind`] decided once, at upload time.
//! Renderers dispatch on the stored tag, not on the path suffix.

use crate::imaging::rust_backend::supported_input_extensions;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Store-assigned record identity. Increases with insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordId(pub i64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Schema versions of the persisted record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordVersion {
    /// Generic post: title, content, single optional media path.
    V1Post,
    /// Structured evaluation with multiple evidence files.
    V2Evaluation,
}

impl RecordVersion {
    pub const CURRENT: RecordVersion = RecordVersion::V2Evaluation;

    pub fn number(self) -> u32 {
        match self {
            RecordVersion::V1Post => 1,
            RecordVersion::V2Evaluation => 2,
        }
    }
}

impl fmt::Display for RecordVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.number())
    }
}

/// Extensions stored as video evidence.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4"];

/// How an evidence file is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    /// Anything else. Stored, but never rendered.
    Other,
}

impl MediaKind {
    /// Classify a file name by its extension (case-insensitive).
    ///
    /// Extensions the image backend handles → image; [`VIDEO_EXTENSIONS`]
    /// → video; everything else → other.
    pub fn from_file_name(name: &str) -> Self {
        let ext = name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        if supported_input_extensions().contains(&ext.as_str()) {
            Self::Image
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Self::Video
        } else {
            Self::Other
        }
    }

    /// Stable name used in the database.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Other => "other",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "image" => Some(Self::Image),
            "video" => Some(Self::Video),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

/// One evidence file attached to a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    /// Path relative to the working directory, e.g. `uploads/photo.jpg`.
    pub path: String,
    pub kind: MediaKind,
}

impl Evidence {
    pub fn new(path: impl Into<String>, kind: MediaKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RecordError {
    #[error("required field `{0}` is empty")]
    MissingField(&'static str),
}

/// A record as submitted, before the store assigns an identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRecord {
    pub premissa: String,
    pub competencia: String,
    pub macro_indicador: String,
    pub micro_indicador: String,
    pub acao: String,
    pub descricao: String,
    #[serde(default)]
    pub evidencias: Vec<Evidence>,
}

impl NewRecord {
    /// Required text fields paired with their names, in form order.
    pub fn required_fields(&self) -> [(&'static str, &str); 6] {
        [
            ("premissa", &self.premissa),
            ("competencia", &self.competencia),
            ("macro_indicador", &self.macro_indicador),
            ("micro_indicador", &self.micro_indicador),
            ("acao", &self.acao),
            ("descricao", &self.descricao),
        ]
    }

    /// Reject records with any whitespace-only required field.
    pub fn validate(&self) -> Result<(), RecordError> {
        for (name, value) in self.required_fields() {
            if value.trim().is_empty() {
                return Err(RecordError::MissingField(name));
            }
        }
        Ok(())
    }

    /// Attach the identity the store assigned.
    pub fn with_id(self, id: RecordId) -> Record {
        Record {
            id,
            premissa: self.premissa,
            competencia: self.competencia,
            macro_indicador: self.macro_indicador,
            micro_indicador: self.micro_indicador,
            acao: self.acao,
            descricao: self.descricao,
            evidencias: self.evidencias,
        }
    }
}

/// A persisted evaluation record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub premissa: String,
    pub competencia: String,
    pub macro_indicador: String,
    pub micro_indicador: String,
    pub acao: String,
    pub descricao: String,
    pub evidencias: Vec<Evidence>,
}

impl Record {
    /// Labeled structured fields, in display order. The premise is the
    /// heading and is not included.
    pub fn labeled_fields(&self) -> [(&'static str, &str); 5] {
        [
            ("Competência", &self.competencia),
            ("Macro Indicador", &self.macro_indicador),
            ("Micro Indicador", &self.micro_indicador),
            ("Ação", &self.acao),
            ("Descrição", &self.descricao),
        ]
    }
}

/// A post document from the first iteration of the tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyPost {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub file_path: Option<String>,
    /// Path of the markdown export written for the post. Derived data.
    #[serde(default)]
    pub post_file: Option<String>,
}

/// Placeholder for structured fields a legacy post never had.
pub const LEGACY_PLACEHOLDER: &str = "-";

impl From<LegacyPost> for NewRecord {
    fn from(post: LegacyPost) -> Self {
        let evidencias = post
            .file_path
            .filter(|p| !p.trim().is_empty())
            .map(|p| {
                let kind = MediaKind::from_file_name(&p);
                vec![Evidence::new(p, kind)]
            })
            .unwrap_or_default();

        NewRecord {
            premissa: post.title,
            competencia: LEGACY_PLACEHOLDER.to_string(),
            macro_indicador: LEGACY_PLACEHOLDER.to_string(),
            micro_indicador: LEGACY_PLACEHOLDER.to_string(),
            acao: post.content.clone(),
            descricao: post.content,
            evidencias,
        }
    }
}

#[derive(Error, Debug)]
#[error("legacy post #{index}: {source}")]
pub struct LegacyParseError {
    /// 1-based position of the offending document.
    pub index: usize,
    #[source]
    pub source: serde_json::Error,
}

/// Parse exported legacy post documents.
///
/// Accepts either a JSON array of documents or one document per line (the
/// shape document-database exports usually take). Unknown keys such as
/// `_id` are ignored.
pub fn parse_legacy_posts(input: &str) -> Result<Vec<LegacyPost>, LegacyParseError> {
    let trimmed = input.trim_start();
    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed)
            .map_err(|source| LegacyParseError { index: 1, source });
    }
    trimmed
        .lines()
        .filter(|line| !line.trim().is_empty())
        .enumerate()
        .map(|(i, line)| {
            serde_json::from_str(line).map_err(|source| LegacyParseError {
                index: i + 1,
                source,
            })
        })
        .collect()
}

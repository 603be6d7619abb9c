//! Consistency check between the record store and the filesystem.
//!
//! The store is the source of truth. Three kinds of drift are reported:
//!
//! - **Missing media**: an evidence file referenced by a record is not in
//!   the upload root.
//! - **Orphan files**: a file in the upload root no record references
//!   (left behind by an aborted publish, or a replaced upload).
//! - **Export issues**: a record's markdown document is missing, or its
//!   embedded media no longer match the record's evidence.
//!
//! With title-based export naming several records share one document; only
//! the newest of them is expected to match it.

use crate::export::{DocumentExporter, embedded_media};
use crate::record::{Record, RecordId};
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum CheckError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Directory walk error: {0}")]
    WalkDir(#[from] walkdir::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingMedia {
    pub record_id: RecordId,
    pub path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportProblem {
    Missing,
    EvidenceMismatch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportIssue {
    pub record_id: RecordId,
    pub path: PathBuf,
    pub problem: ExportProblem,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckReport {
    pub records: usize,
    pub missing_media: Vec<MissingMedia>,
    /// Paths relative to the upload root, sorted.
    pub orphan_files: Vec<PathBuf>,
    pub export_issues: Vec<ExportIssue>,
}

impl CheckReport {
    pub fn problem_count(&self) -> usize {
        self.missing_media.len() + self.orphan_files.len() + self.export_issues.len()
    }

    pub fn is_clean(&self) -> bool {
        self.problem_count() == 0
    }
}

/// Final path component of a stored evidence path.
fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

pub fn check(
    records: &[Record],
    upload_root: &Path,
    exporter: &DocumentExporter,
) -> Result<CheckReport, CheckError> {
    let mut report = CheckReport {
        records: records.len(),
        ..CheckReport::default()
    };

    let mut referenced = BTreeSet::new();
    for record in records {
        for evidence in &record.evidencias {
            let name = file_name(&evidence.path);
            referenced.insert(PathBuf::from(name));
            if !upload_root.join(name).is_file() {
                report.missing_media.push(MissingMedia {
                    record_id: record.id,
                    path: evidence.path.clone(),
                });
            }
        }
    }

    if upload_root.is_dir() {
        for entry in WalkDir::new(upload_root).min_depth(1).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(upload_root)
                .unwrap_or(entry.path())
                .to_path_buf();
            if !referenced.contains(&relative) {
                report.orphan_files.push(relative);
            }
        }
    }

    // Newest record wins each export path.
    let mut owner: HashMap<PathBuf, RecordId> = HashMap::new();
    for record in records {
        owner.insert(exporter.path_for(record), record.id);
    }

    for record in records {
        let path = exporter.path_for(record);
        if owner.get(&path) != Some(&record.id) {
            continue;
        }
        if !path.is_file() {
            report.export_issues.push(ExportIssue {
                record_id: record.id,
                path,
                problem: ExportProblem::Missing,
            });
            continue;
        }
        let content = fs::read_to_string(&path)?;
        let expected: Vec<&str> = record.evidencias.iter().map(|e| e.path.as_str()).collect();
        if embedded_media(&content) != expected {
            report.export_issues.push(ExportIssue {
                record_id: record.id,
                path,
                problem: ExportProblem::EvidenceMismatch,
            });
        }
    }

    tracing::debug!(
        records = report.records,
        problems = report.problem_count(),
        "consistency check finished"
    );
    Ok(report)
}

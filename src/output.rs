//! CLI output formatting.
//!
//! # Entity Display Contract
//!
//! Every record is shown the same way across commands:
//!
//! 1. **Header line**: zero-padded identity + premise (+ evidence count)
//! 2. **Context lines**: indented labeled fields and evidence, one per line
//!
//! # Output Format
//!
//! ## List
//!
//! ```text
//! 001 Trabalho em equipe (2 evidence)
//!     Competência: Colaboração
//!     Macro Indicador: Comunicação
//!     Micro Indicador: Escuta ativa
//!     Ação: Conduziu a retrospectiva da sprint
//!     Descrição: Facilitou a discussão e registrou os acordos.
//!     image: uploads/quadro.jpg
//!     video: uploads/retro.mp4
//!
//! 1 record
//! ```
//!
//! ## Check
//!
//! ```text
//! Missing media
//!     003 uploads/gone.jpg
//! Orphan files
//!     old.png
//! Exports
//!     002 posts/2-Autonomia.md: missing
//!
//! Checked 3 records: 3 problems
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::check::{CheckReport, ExportProblem};
use crate::record::{Record, RecordId, RecordVersion};
use crate::workflow::ImportSummary;

/// Longest field value shown before truncation.
const MAX_FIELD_CHARS: usize = 60;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a record identity as 3-digit zero-padded.
fn format_id(id: RecordId) -> String {
    format!("{:0>3}", id.0)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

/// Truncate text to `max` characters, appending `...` if truncated.
/// Newlines are flattened so every value stays on its line.
fn truncate_field(text: &str, max: usize) -> String {
    let flat: String = text
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();
    if flat.chars().count() <= max {
        flat
    } else {
        let cut: String = flat.chars().take(max).collect();
        format!("{cut}...")
    }
}

/// ```text
/// 001 Trabalho em equipe (2 evidence)
/// ```
fn record_header(record: &Record) -> String {
    match record.evidencias.len() {
        0 => format!("{} {}", format_id(record.id), record.premissa),
        n => format!(
            "{} {} ({} evidence)",
            format_id(record.id),
            record.premissa,
            n
        ),
    }
}

// ============================================================================
// list
// ============================================================================

pub fn format_records(records: &[Record]) -> Vec<String> {
    let mut lines = Vec::new();

    for record in records {
        lines.push(record_header(record));
        for (label, value) in record.labeled_fields() {
            lines.push(format!(
                "{}{}: {}",
                indent(1),
                label,
                truncate_field(value, MAX_FIELD_CHARS)
            ));
        }
        for evidence in &record.evidencias {
            lines.push(format!(
                "{}{}: {}",
                indent(1),
                evidence.kind.as_str(),
                evidence.path
            ));
        }
        lines.push(String::new());
    }

    lines.push(plural(records.len(), "record", "records"));
    lines
}

pub fn print_records(records: &[Record]) {
    for line in format_records(records) {
        println!("{}", line);
    }
}

// ============================================================================
// check
// ============================================================================

pub fn format_check(report: &CheckReport) -> Vec<String> {
    let mut lines = Vec::new();

    if !report.missing_media.is_empty() {
        lines.push("Missing media".to_string());
        for missing in &report.missing_media {
            lines.push(format!(
                "{}{} {}",
                indent(1),
                format_id(missing.record_id),
                missing.path
            ));
        }
    }

    if !report.orphan_files.is_empty() {
        lines.push("Orphan files".to_string());
        for orphan in &report.orphan_files {
            lines.push(format!("{}{}", indent(1), orphan.display()));
        }
    }

    if !report.export_issues.is_empty() {
        lines.push("Exports".to_string());
        for issue in &report.export_issues {
            let problem = match issue.problem {
                ExportProblem::Missing => "missing",
                ExportProblem::EvidenceMismatch => "evidence out of date",
            };
            lines.push(format!(
                "{}{} {}: {}",
                indent(1),
                format_id(issue.record_id),
                issue.path.display(),
                problem
            ));
        }
    }

    if !lines.is_empty() {
        lines.push(String::new());
    }

    let checked = plural(report.records, "record", "records");
    if report.is_clean() {
        lines.push(format!("Checked {checked}: no problems"));
    } else {
        lines.push(format!(
            "Checked {checked}: {}",
            plural(report.problem_count(), "problem", "problems")
        ));
    }
    lines
}

pub fn print_check(report: &CheckReport) {
    for line in format_check(report) {
        println!("{}", line);
    }
}

// ============================================================================
// import-posts
// ============================================================================

pub fn format_import(summary: &ImportSummary) -> Vec<String> {
    let mut lines = Vec::new();

    for (index, reason) in &summary.skipped {
        lines.push(format!("Skipped post #{index}: {reason}"));
    }
    if summary.export_failures > 0 {
        lines.push(format!(
            "Export failed for {}",
            plural(summary.export_failures, "record", "records")
        ));
    }

    let ids: Vec<String> = summary.imported.iter().map(|id| format_id(*id)).collect();
    lines.push(format!(
        "Imported {} ({} → {}){}",
        plural(summary.imported.len(), "post", "posts"),
        RecordVersion::V1Post,
        RecordVersion::CURRENT,
        if ids.is_empty() {
            String::new()
        } else {
            format!(": {}", ids.join(", "))
        }
    ));
    lines
}

pub fn print_import(summary: &ImportSummary) {
    for line in format_import(summary) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::{ExportIssue, MissingMedia};
    use crate::record::tests::sample_record;
    use crate::record::{Evidence, MediaKind, RecordError};
    use std::path::PathBuf;

    // =========================================================================
    // Helper tests
    // =========================================================================

    #[test]
    fn format_id_pads() {
        assert_eq!(format_id(RecordId(1)), "001");
        assert_eq!(format_id(RecordId(42)), "042");
        assert_eq!(format_id(RecordId(1234)), "1234");
    }

    #[test]
    fn truncate_field_short() {
        assert_eq!(truncate_field("Curto", 60), "Curto");
    }

    #[test]
    fn truncate_field_counts_chars_not_bytes() {
        let text = "ação".repeat(20);
        let truncated = truncate_field(&text, 6);
        assert_eq!(truncated, "açãoaç...");
    }

    #[test]
    fn truncate_field_flattens_newlines() {
        assert_eq!(truncate_field("a\nb", 60), "a b");
    }

    #[test]
    fn plural_forms() {
        assert_eq!(plural(1, "record", "records"), "1 record");
        assert_eq!(plural(0, "record", "records"), "0 records");
    }

    // =========================================================================
    // list
    // =========================================================================

    #[test]
    fn records_listing() {
        let mut draft = sample_record();
        draft.evidencias = vec![
            Evidence::new("uploads/quadro.jpg", MediaKind::Image),
            Evidence::new("uploads/retro.mp4", MediaKind::Video),
        ];
        let lines = format_records(&[draft.with_id(RecordId(1))]);

        assert_eq!(
            lines,
            vec![
                "001 Trabalho em equipe (2 evidence)",
                "    Competência: Colaboração",
                "    Macro Indicador: Comunicação",
                "    Micro Indicador: Escuta ativa",
                "    Ação: Conduziu a retrospectiva da sprint",
                "    Descrição: Facilitou a discussão e registrou os acordos.",
                "    image: uploads/quadro.jpg",
                "    video: uploads/retro.mp4",
                "",
                "1 record",
            ]
        );
    }

    #[test]
    fn empty_listing() {
        assert_eq!(format_records(&[]), vec!["0 records"]);
    }

    // =========================================================================
    // check
    // =========================================================================

    #[test]
    fn clean_check() {
        let report = CheckReport {
            records: 3,
            ..CheckReport::default()
        };
        assert_eq!(format_check(&report), vec!["Checked 3 records: no problems"]);
    }

    #[test]
    fn check_with_problems() {
        let report = CheckReport {
            records: 3,
            missing_media: vec![MissingMedia {
                record_id: RecordId(3),
                path: "uploads/gone.jpg".to_string(),
            }],
            orphan_files: vec![PathBuf::from("old.png")],
            export_issues: vec![ExportIssue {
                record_id: RecordId(2),
                path: PathBuf::from("posts/2-Autonomia.md"),
                problem: ExportProblem::Missing,
            }],
        };

        assert_eq!(
            format_check(&report),
            vec![
                "Missing media",
                "    003 uploads/gone.jpg",
                "Orphan files",
                "    old.png",
                "Exports",
                "    002 posts/2-Autonomia.md: missing",
                "",
                "Checked 3 records: 3 problems",
            ]
        );
    }

    // =========================================================================
    // import-posts
    // =========================================================================

    #[test]
    fn import_summary() {
        let summary = ImportSummary {
            imported: vec![RecordId(4), RecordId(5)],
            skipped: vec![(2, RecordError::MissingField("premissa"))],
            export_failures: 0,
        };
        assert_eq!(
            format_import(&summary),
            vec![
                "Skipped post #2: required field `premissa` is empty",
                "Imported 2 posts (v1 → v2): 004, 005",
            ]
        );
    }
}

//! # Simple Folio
//!
//! A single-operator evidence portfolio. The operator logs in, fills a
//! structured competency-evaluation form (premise, competency, macro and
//! micro indicator, action, description), attaches images or videos as
//! evidence, and publishes. Anyone can browse the public page listing every
//! published record with its evidence.
//!
//! # Architecture
//!
//! ```text
//!                 ┌──────────── server (axum) ─────────────┐
//!  browser ──────▶│ session cookie → Session → AuthGate     │
//!                 │ publish form  → workflow::Publisher     │
//!                 └───────┬──────────────┬──────────────┬───┘
//!                         ▼              ▼              ▼
//!                   media::MediaStore  store::RecordStore  export::DocumentExporter
//!                   uploads/ (bounded) SQLite (source of   posts/*.md (derived,
//!                                      truth)              human-readable)
//! ```
//!
//! Rendering ([`render`]) re-queries the store on every request; nothing is
//! cached.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | `config.toml` loading, validation, merging; credentials from the environment |
//! | [`record`] | The evaluation record, evidence, media kinds, legacy post migration |
//! | [`imaging`] | Pure-Rust image bounding: dimension math, `ImageBackend`, `RustBackend` |
//! | [`media`] | Writes uploads to the upload root, scaling images down to the bound |
//! | [`db`] | SQLite bootstrap and schema migrations |
//! | [`store`] | `RecordStore` trait and its SQLite implementation |
//! | [`export`] | Markdown export of published records |
//! | [`session`] | Per-client sessions and the login gate |
//! | [`workflow`] | The publish pipeline and legacy import |
//! | [`render`] | Maud HTML views |
//! | [`server`] | Axum router, handlers, session cookie |
//! | [`check`] | Store vs filesystem consistency report |
//! | [`output`] | CLI output formatting |
//! | [`logging`] | Tracing subscriber bootstrap |
//!
//! # Design Decisions
//!
//! ## Explicit Sessions
//!
//! Login state and the current page live in a [`session::Session`] per
//! browser, looked up by cookie on each request and passed to handlers. There
//! is no process-wide "logged in" flag.
//!
//! ## Evidence as Rows
//!
//! Evidence files are stored one row each, with their position and a media
//! kind decided at upload time. Paths may contain any character, and
//! rendering never sniffs file extensions.
//!
//! ## Export Names
//!
//! Exports are named after the record identity by default, so two records
//! with the same premise never overwrite each other's document. The older
//! premise-only naming is available as `export.naming = "title"`.

pub mod check;
pub mod config;
pub mod db;
pub mod export;
pub mod imaging;
pub mod logging;
pub mod media;
pub mod output;
pub mod record;
pub mod render;
pub mod server;
pub mod session;
pub mod store;
pub mod workflow;

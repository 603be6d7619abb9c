//! SQLite storage bootstrap and schema migrations.
//!
//! Connections returned from [`open_db`] / [`open_db_in_memory`] have
//! `foreign_keys=ON` and every migration applied; nothing reads or writes
//! records before that.

use thiserror::Error;

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("database schema version {db_version} is newer than supported {latest_supported}")]
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

//! Connection bootstrap for SQLite.

use super::DbResult;
use super::migrations::apply_migrations;
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{error, info};

/// Opens a SQLite database file and applies all pending migrations.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    let path = path.as_ref();
    let started_at = Instant::now();

    let mut conn = Connection::open(path).inspect_err(|err| {
        error!(path = %path.display(), error = %err, "failed to open database");
    })?;

    bootstrap_connection(&mut conn).inspect_err(|err| {
        error!(path = %path.display(), error = %err, "failed to bootstrap database");
    })?;

    info!(
        path = %path.display(),
        duration_ms = started_at.elapsed().as_millis() as u64,
        "database ready"
    );
    Ok(conn)
}

/// Opens an in-memory SQLite database and applies all pending migrations.
pub fn open_db_in_memory() -> DbResult<Connection> {
    let mut conn = Connection::open_in_memory()?;
    bootstrap_connection(&mut conn)?;
    Ok(conn)
}

fn bootstrap_connection(conn: &mut Connection) -> DbResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_secs(5))?;
    apply_migrations(conn)?;
    Ok(())
}

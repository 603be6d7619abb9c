//! Record persistence.
//!
//! [`RecordStore`] is the seam the publishing workflow talks to;
//! [`SqliteRecordStore`] is the production implementation.
//!
//! A record is one row in `records` plus one row per evidence file in
//! `record_evidence`, written in a single transaction. Listing returns
//! every record in insertion order with its evidence in submission order.
//! There is no update, delete, filtering or pagination.

use crate::db::DbError;
use crate::record::{Evidence, MediaKind, NewRecord, Record, RecordId};
use rusqlite::{Connection, params};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] DbError),
    #[error("invalid persisted data: {0}")]
    InvalidData(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Insert-and-list persistence for evaluation records.
pub trait RecordStore {
    /// Persist a record atomically and return its new identity.
    fn insert(&mut self, record: &NewRecord) -> StoreResult<RecordId>;

    /// All records, oldest first.
    fn list_all(&self) -> StoreResult<Vec<Record>>;
}

/// SQLite-backed record store.
pub struct SqliteRecordStore {
    conn: Connection,
}

impl SqliteRecordStore {
    /// Wrap a connection that has already been migrated
    /// (see [`open_db`](crate::db::open_db)).
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Number of stored records.
    pub fn count(&self) -> StoreResult<u64> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM records;", [], |row| row.get(0))?;
        Ok(n as u64)
    }
}

impl RecordStore for SqliteRecordStore {
    fn insert(&mut self, record: &NewRecord) -> StoreResult<RecordId> {
        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO records (
                premissa,
                competencia,
                macro_indicador,
                micro_indicador,
                acao,
                descricao
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                record.premissa,
                record.competencia,
                record.macro_indicador,
                record.micro_indicador,
                record.acao,
                record.descricao,
            ],
        )?;
        let id = tx.last_insert_rowid();

        {
            let mut stmt = tx.prepare(
                "INSERT INTO record_evidence (record_id, position, path, kind)
                 VALUES (?1, ?2, ?3, ?4);",
            )?;
            for (position, evidence) in record.evidencias.iter().enumerate() {
                stmt.execute(params![
                    id,
                    position as i64,
                    evidence.path,
                    evidence.kind.as_str()
                ])?;
            }
        }

        tx.commit()?;

        tracing::info!(
            record_id = id,
            evidence_count = record.evidencias.len(),
            "record inserted"
        );
        Ok(RecordId(id))
    }

    fn list_all(&self) -> StoreResult<Vec<Record>> {
        let mut evidence_by_record = load_evidence(&self.conn)?;

        let mut stmt = self.conn.prepare(
            "SELECT
                id,
                premissa,
                competencia,
                macro_indicador,
                micro_indicador,
                acao,
                descricao
             FROM records
             ORDER BY id ASC;",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(NewRecord {
                premissa: row.get(1)?,
                competencia: row.get(2)?,
                macro_indicador: row.get(3)?,
                micro_indicador: row.get(4)?,
                acao: row.get(5)?,
                descricao: row.get(6)?,
                evidencias: Vec::new(),
            }
            .with_id(RecordId(row.get(0)?)))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let mut record = row?;
            record.evidencias = evidence_by_record.remove(&record.id).unwrap_or_default();
            records.push(record);
        }
        Ok(records)
    }
}

fn load_evidence(conn: &Connection) -> StoreResult<HashMap<RecordId, Vec<Evidence>>> {
    let mut stmt = conn.prepare(
        "SELECT record_id, path, kind
         FROM record_evidence
         ORDER BY record_id ASC, position ASC;",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            RecordId(row.get(0)?),
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
        ))
    })?;

    let mut map: HashMap<RecordId, Vec<Evidence>> = HashMap::new();
    for row in rows {
        let (record_id, path, kind) = row?;
        let kind = MediaKind::parse(&kind).ok_or_else(|| {
            StoreError::InvalidData(format!("unknown media kind `{kind}` on record {record_id}"))
        })?;
        map.entry(record_id)
            .or_default()
            .push(Evidence::new(path, kind));
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_db_in_memory;
    use crate::record::tests::sample_record;

    fn store() -> SqliteRecordStore {
        SqliteRecordStore::new(open_db_in_memory().unwrap())
    }

    #[test]
    fn empty_store_lists_nothing() {
        assert!(store().list_all().unwrap().is_empty());
    }

    #[test]
    fn insert_then_list_roundtrip() {
        let mut store = store();
        let mut draft = sample_record();
        draft.evidencias = vec![
            Evidence::new("uploads/b.png", MediaKind::Image),
            Evidence::new("uploads/a.mp4", MediaKind::Video),
        ];

        let id = store.insert(&draft).unwrap();
        let records = store.list_all().unwrap();

        assert_eq!(records, vec![draft.with_id(id)]);
    }

    #[test]
    fn identities_are_unique_and_ordered() {
        let mut store = store();
        let first = store.insert(&sample_record()).unwrap();
        let second = store.insert(&sample_record()).unwrap();
        assert!(second > first);

        let ids: Vec<RecordId> = store.list_all().unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![first, second]);
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn evidence_paths_may_contain_commas() {
        let mut store = store();
        let mut draft = sample_record();
        draft.evidencias = vec![Evidence::new("uploads/foto, final.jpg", MediaKind::Image)];

        store.insert(&draft).unwrap();
        let records = store.list_all().unwrap();
        assert_eq!(records[0].evidencias[0].path, "uploads/foto, final.jpg");
        assert_eq!(records[0].evidencias.len(), 1);
    }

    #[test]
    fn evidence_stays_with_its_record() {
        let mut store = store();
        let mut a = sample_record();
        a.evidencias = vec![Evidence::new("uploads/a.png", MediaKind::Image)];
        let b = sample_record();
        let mut c = sample_record();
        c.evidencias = vec![
            Evidence::new("uploads/c1.png", MediaKind::Image),
            Evidence::new("uploads/c2.txt", MediaKind::Other),
        ];

        for draft in [&a, &b, &c] {
            store.insert(draft).unwrap();
        }

        let records = store.list_all().unwrap();
        assert_eq!(records[0].evidencias, a.evidencias);
        assert!(records[1].evidencias.is_empty());
        assert_eq!(records[2].evidencias, c.evidencias);
    }

    #[test]
    fn blank_field_violates_schema() {
        let mut store = store();
        let mut draft = sample_record();
        draft.acao = "  ".to_string();

        let err = store.insert(&draft).unwrap_err();
        assert!(matches!(err, StoreError::Db(_)));
        assert_eq!(store.count().unwrap(), 0);
    }
}

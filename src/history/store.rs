use std::path::PathBuf;
use std::time::Duration;

use rusqlite::{Connection, OptionalExtension, TransactionBehavior};

use crate::error::AppResult;
use crate::history::models::TranscriptionRecord;

/// The whole ledger lives under one key in one table; every write is a
/// read-modify-write of the serialized list inside a single transaction.
const LEDGER_KEY: &str = "list";

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS recent (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)";

pub trait RecentLedger: Send + Sync {
    /// Prepends `record`, trims the ledger to capacity, persists atomically.
    fn append(&self, record: &TranscriptionRecord) -> AppResult<()>;

    /// Snapshot of the ledger, newest-first. Empty when nothing was ever written.
    fn list_all(&self) -> AppResult<Vec<TranscriptionRecord>>;
}

pub struct SqliteLedger {
    db_path: PathBuf,
    capacity: usize,
}

impl SqliteLedger {
    /// Opens (and if necessary creates) the backing database. Safe to call on
    /// an already-initialized path; existing contents are left untouched.
    pub fn open(db_path: PathBuf, capacity: usize) -> AppResult<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let ledger = Self { db_path, capacity };
        ledger.connect()?;
        Ok(ledger)
    }

    pub fn db_path(&self) -> &PathBuf {
        &self.db_path
    }

    fn connect(&self) -> AppResult<Connection> {
        let connection = Connection::open(&self.db_path)?;
        connection.busy_timeout(Duration::from_secs(5))?;
        connection.execute_batch(SCHEMA)?;
        Ok(connection)
    }
}

impl RecentLedger for SqliteLedger {
    fn append(&self, record: &TranscriptionRecord) -> AppResult<()> {
        let mut connection = self.connect()?;
        let tx = connection.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let current: Option<String> = tx
            .query_row(
                "SELECT value FROM recent WHERE key = ?1",
                [LEDGER_KEY],
                |row| row.get(0),
            )
            .optional()?;

        let mut records = decode_ledger(current.as_deref());
        records.insert(0, record.clone());
        records.truncate(self.capacity);

        let encoded = serde_json::to_string(&records)?;
        tx.execute(
            "INSERT INTO recent (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            (LEDGER_KEY, encoded.as_str()),
        )?;
        tx.commit()?;
        Ok(())
    }

    fn list_all(&self) -> AppResult<Vec<TranscriptionRecord>> {
        if !self.db_path.exists() {
            return Ok(Vec::new());
        }

        let connection = self.connect()?;
        let raw: Option<String> = connection
            .query_row(
                "SELECT value FROM recent WHERE key = ?1",
                [LEDGER_KEY],
                |row| row.get(0),
            )
            .optional()?;

        Ok(decode_ledger(raw.as_deref()))
    }
}

/// A blob that fails to decode reads as empty; the next append rewrites it.
fn decode_ledger(raw: Option<&str>) -> Vec<TranscriptionRecord> {
    let Some(raw) = raw else {
        return Vec::new();
    };

    match serde_json::from_str(raw) {
        Ok(records) => records,
        Err(error) => {
            tracing::warn!(%error, "recent ledger blob is unreadable, treating as empty");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{RecentLedger, SqliteLedger, LEDGER_KEY};
    use crate::history::models::TranscriptionRecord;
    use rusqlite::Connection;
    use std::path::Path;

    fn record(index: usize) -> TranscriptionRecord {
        TranscriptionRecord {
            id: format!("id-{index}"),
            text: format!("transcript {index}"),
            duration: index as f64,
            processing_time: 0.5,
            created_at: format!("2026-08-22T10:00:{index:02}+00:00"),
        }
    }

    fn open_ledger(path: &Path, capacity: usize) -> SqliteLedger {
        SqliteLedger::open(path.to_path_buf(), capacity).expect("open ledger")
    }

    #[test]
    fn list_returns_empty_when_db_missing() {
        let temp = tempfile::TempDir::new().expect("tempdir");
        let ledger = SqliteLedger {
            db_path: temp.path().join("missing.db"),
            capacity: 10,
        };
        assert!(ledger.list_all().expect("list").is_empty());
    }

    #[test]
    fn list_returns_empty_before_first_append() {
        let temp = tempfile::TempDir::new().expect("tempdir");
        let ledger = open_ledger(&temp.path().join("sema.db"), 10);
        assert!(ledger.list_all().expect("list").is_empty());
    }

    #[test]
    fn open_creates_missing_parent_directories() {
        let temp = tempfile::TempDir::new().expect("tempdir");
        let nested = temp.path().join("data/nested/sema.db");
        let ledger = open_ledger(&nested, 10);
        ledger.append(&record(1)).expect("append");
        assert!(nested.exists());
    }

    #[test]
    fn appends_cap_length_and_keep_newest_first() {
        let temp = tempfile::TempDir::new().expect("tempdir");
        let ledger = open_ledger(&temp.path().join("sema.db"), 3);

        for index in 1..=5 {
            ledger.append(&record(index)).expect("append");
        }

        let records = ledger.list_all().expect("list");
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].id, "id-5");
        assert_eq!(records[1].id, "id-4");
        assert_eq!(records[2].id, "id-3");
    }

    #[test]
    fn appends_below_capacity_keep_everything() {
        let temp = tempfile::TempDir::new().expect("tempdir");
        let ledger = open_ledger(&temp.path().join("sema.db"), 10);

        ledger.append(&record(1)).expect("append");
        ledger.append(&record(2)).expect("append");

        let records = ledger.list_all().expect("list");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "id-2");
        assert_eq!(records[1].id, "id-1");
    }

    #[test]
    fn reopening_preserves_ledger_contents() {
        let temp = tempfile::TempDir::new().expect("tempdir");
        let db = temp.path().join("sema.db");

        let ledger = open_ledger(&db, 10);
        ledger.append(&record(1)).expect("append");
        ledger.append(&record(2)).expect("append");
        drop(ledger);

        let reopened = open_ledger(&db, 10);
        let records = reopened.list_all().expect("list");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "id-2");
    }

    #[test]
    fn appended_record_reads_back_field_for_field() {
        let temp = tempfile::TempDir::new().expect("tempdir");
        let ledger = open_ledger(&temp.path().join("sema.db"), 10);

        let original = TranscriptionRecord {
            id: "4f1c2c1e-0000-4000-8000-0000000000aa".to_owned(),
            text: "ሰላም ለዓለም hello".to_owned(),
            duration: 3.0,
            processing_time: 1.75,
            created_at: "2026-08-22T10:00:00+00:00".to_owned(),
        };
        ledger.append(&original).expect("append");

        let records = ledger.list_all().expect("list");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0], original);
    }

    #[test]
    fn unreadable_blob_reads_as_empty_and_heals_on_append() {
        let temp = tempfile::TempDir::new().expect("tempdir");
        let db = temp.path().join("sema.db");
        let ledger = open_ledger(&db, 10);

        let connection = Connection::open(&db).expect("raw open");
        connection
            .execute(
                "INSERT INTO recent (key, value) VALUES (?1, ?2)",
                (LEDGER_KEY, "{not json"),
            )
            .expect("poison blob");

        assert!(ledger.list_all().expect("list").is_empty());

        ledger.append(&record(7)).expect("append");
        let records = ledger.list_all().expect("list");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "id-7");
    }
}

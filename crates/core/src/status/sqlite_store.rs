//! SQLite-backed status store implementation.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use tracing::debug;

use super::store::{normalize, StatusError, StatusStore};
use super::types::{ConversionStatus, StatusOutcome, StatusRecord, StatusUpdate};

const SELECT_RECORD: &str = "SELECT id, collection, conversion_status, content_key, duration, created_at, updated_at FROM status_records WHERE collection = ? AND id = ?";

/// SQLite-backed status store.
///
/// The connection is opened explicitly and released with [`SqliteStatusStore::close`].
pub struct SqliteStatusStore {
    conn: Mutex<Connection>,
}

impl SqliteStatusStore {
    /// Open the database at `path`, creating the file and tables if needed.
    pub fn open(path: &Path) -> Result<Self, StatusError> {
        let conn = Connection::open(path).map_err(|e| StatusError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        debug!(path = %path.display(), "Opened status store");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self, StatusError> {
        let conn =
            Connection::open_in_memory().map_err(|e| StatusError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Close the connection, flushing pending writes.
    pub fn close(self) -> Result<(), StatusError> {
        let conn = self
            .conn
            .into_inner()
            .map_err(|e| StatusError::Database(e.to_string()))?;
        conn.close()
            .map_err(|(_, e)| StatusError::Database(e.to_string()))?;
        debug!("Closed status store");
        Ok(())
    }

    fn initialize_schema(conn: &Connection) -> Result<(), StatusError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS status_records (
                id TEXT NOT NULL,
                collection TEXT NOT NULL,
                conversion_status TEXT NOT NULL,
                content_key TEXT,
                duration TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (collection, id)
            );

            CREATE INDEX IF NOT EXISTS idx_status_records_status ON status_records(conversion_status);
            "#,
        )
        .map_err(|e| StatusError::Database(e.to_string()))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StatusError> {
        self.conn
            .lock()
            .map_err(|e| StatusError::Database(e.to_string()))
    }

    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<StatusRecord> {
        let id: String = row.get(0)?;
        let collection: String = row.get(1)?;
        let status_str: String = row.get(2)?;
        let content_key: Option<String> = row.get(3)?;
        let duration: Option<String> = row.get(4)?;
        let created_at_str: String = row.get(5)?;
        let updated_at_str: String = row.get(6)?;

        // Only this store writes the table, so unknown values are not expected
        let conversion_status =
            ConversionStatus::parse(&status_str).unwrap_or(ConversionStatus::Error);

        let created_at = DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());
        let updated_at = DateTime::parse_from_rfc3339(&updated_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        Ok(StatusRecord {
            id,
            collection,
            conversion_status,
            content_key,
            duration,
            created_at,
            updated_at,
        })
    }

    fn query_record(
        conn: &Connection,
        collection: &str,
        id: &str,
    ) -> Result<Option<StatusRecord>, StatusError> {
        match conn.query_row(SELECT_RECORD, params![collection, id], Self::row_to_record) {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StatusError::Database(e.to_string())),
        }
    }
}

impl StatusStore for SqliteStatusStore {
    fn register(&self, id: &str, collection: &str) -> Result<StatusRecord, StatusError> {
        let (id, collection) = normalize(id, collection)?;
        let conn = self.lock()?;
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT OR IGNORE INTO status_records (id, collection, conversion_status, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
            params![id, collection, ConversionStatus::Pending.as_str(), now, now],
        )
        .map_err(|e| StatusError::Database(e.to_string()))?;

        Self::query_record(&conn, collection, id)?.ok_or_else(|| StatusError::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        })
    }

    fn update(&self, update: &StatusUpdate) -> Result<StatusRecord, StatusError> {
        let (id, collection) = normalize(&update.id, &update.collection)?;
        let conn = self.lock()?;
        let now = Utc::now().to_rfc3339();
        let status = update.outcome.status();

        let rows = match &update.outcome {
            StatusOutcome::Success { content_key, .. } => conn.execute(
                "UPDATE status_records SET conversion_status = ?, content_key = ?, duration = ?, updated_at = ? WHERE collection = ? AND id = ?",
                params![
                    status.as_str(),
                    content_key,
                    update.outcome.formatted_duration(),
                    now,
                    collection,
                    id
                ],
            ),
            StatusOutcome::Failure => conn.execute(
                "UPDATE status_records SET conversion_status = ?, updated_at = ? WHERE collection = ? AND id = ?",
                params![status.as_str(), now, collection, id],
            ),
        }
        .map_err(|e| StatusError::Database(e.to_string()))?;

        if rows == 0 {
            return Err(StatusError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }

        debug!(id, collection, status = %status, "Updated status record");
        Self::query_record(&conn, collection, id)?.ok_or_else(|| StatusError::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        })
    }

    fn get(&self, collection: &str, id: &str) -> Result<Option<StatusRecord>, StatusError> {
        let (id, collection) = normalize(id, collection)?;
        let conn = self.lock()?;
        Self::query_record(&conn, collection, id)
    }
}

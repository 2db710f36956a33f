//! Remote identifier to local file mapping.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Database error: {0}")]
    Database(String),
}

/// Persistent map from normalized remote identifiers to downloaded files.
pub trait LocalPathIndex: Send + Sync {
    fn get(&self, remote_id: &str) -> Result<Option<PathBuf>, IndexError>;

    fn set(&self, remote_id: &str, path: &Path) -> Result<(), IndexError>;

    fn remove(&self, remote_id: &str) -> Result<(), IndexError>;

    /// When the mapping for `remote_id` was last written.
    fn recorded_at(&self, remote_id: &str) -> Result<Option<DateTime<Utc>>, IndexError>;
}

/// SQLite-backed path index.
pub struct SqlitePathIndex {
    conn: Mutex<Connection>,
}

impl SqlitePathIndex {
    pub fn new(path: &Path) -> Result<Self, IndexError> {
        let conn = Connection::open(path).map_err(|e| IndexError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory index (useful for testing).
    pub fn in_memory() -> Result<Self, IndexError> {
        let conn =
            Connection::open_in_memory().map_err(|e| IndexError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), IndexError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS net_files (
                remote_id TEXT PRIMARY KEY,
                path TEXT NOT NULL,
                recorded_at TEXT NOT NULL
            );
            "#,
        )
        .map_err(|e| IndexError::Database(e.to_string()))?;
        Ok(())
    }

    fn conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>, IndexError> {
        self.conn
            .lock()
            .map_err(|e| IndexError::Database(format!("Lock poisoned: {}", e)))
    }
}

impl LocalPathIndex for SqlitePathIndex {
    fn get(&self, remote_id: &str) -> Result<Option<PathBuf>, IndexError> {
        let conn = self.conn()?;
        let path: Option<String> = conn
            .query_row(
                "SELECT path FROM net_files WHERE remote_id = ?",
                params![remote_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| IndexError::Database(e.to_string()))?;
        Ok(path.map(PathBuf::from))
    }

    fn set(&self, remote_id: &str, path: &Path) -> Result<(), IndexError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO net_files (remote_id, path, recorded_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(remote_id) DO UPDATE SET path = excluded.path, recorded_at = excluded.recorded_at",
            params![
                remote_id,
                path.to_string_lossy().as_ref(),
                Utc::now().to_rfc3339()
            ],
        )
        .map_err(|e| IndexError::Database(e.to_string()))?;
        Ok(())
    }

    fn remove(&self, remote_id: &str) -> Result<(), IndexError> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM net_files WHERE remote_id = ?", params![remote_id])
            .map_err(|e| IndexError::Database(e.to_string()))?;
        Ok(())
    }

    fn recorded_at(&self, remote_id: &str) -> Result<Option<DateTime<Utc>>, IndexError> {
        let conn = self.conn()?;
        let recorded: Option<String> = conn
            .query_row(
                "SELECT recorded_at FROM net_files WHERE remote_id = ?",
                params![remote_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| IndexError::Database(e.to_string()))?;

        Ok(recorded.and_then(|s| {
            DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_set_get_remove() {
        let index = SqlitePathIndex::in_memory().unwrap();
        assert!(index.get("http://a.org/1").unwrap().is_none());

        index.set("http://a.org/1", Path::new("/books/a.org/1.epub")).unwrap();
        assert_eq!(
            index.get("http://a.org/1").unwrap(),
            Some(PathBuf::from("/books/a.org/1.epub"))
        );
        assert!(index.recorded_at("http://a.org/1").unwrap().is_some());

        index.remove("http://a.org/1").unwrap();
        assert!(index.get("http://a.org/1").unwrap().is_none());
    }

    #[test]
    fn test_set_replaces_mapping() {
        let index = SqlitePathIndex::in_memory().unwrap();
        index.set("id", Path::new("/old")).unwrap();
        index.set("id", Path::new("/new")).unwrap();
        assert_eq!(index.get("id").unwrap(), Some(PathBuf::from("/new")));
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("index.db");
        SqlitePathIndex::new(&db)
            .unwrap()
            .set("id", Path::new("/books/id.epub"))
            .unwrap();

        let reopened = SqlitePathIndex::new(&db).unwrap();
        assert_eq!(
            reopened.get("id").unwrap(),
            Some(PathBuf::from("/books/id.epub"))
        );
    }
}

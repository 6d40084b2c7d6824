use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;

mod embedded {
    refinery::embed_migrations!("migrations");
}

/// Overrides the database location
pub const ENV_DB_PATH: &str = "PAPERSUM_DB";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Migration error: {0}")]
    Migration(#[from] refinery::Error),
    #[error("Lock poisoned")]
    LockPoisoned,
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// SQLite database holding local client state
pub struct LocalStore {
    conn: Arc<Mutex<Connection>>,
    db_path: PathBuf,
}

impl LocalStore {
    /// Open (and migrate) the database at `db_path`, `$PAPERSUM_DB`, or the
    /// platform data directory, in that order.
    pub fn open(db_path: Option<PathBuf>) -> Result<Self> {
        let path = db_path
            .or_else(|| std::env::var_os(ENV_DB_PATH).map(PathBuf::from))
            .unwrap_or_else(default_db_path);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut conn = Connection::open(&path)?;
        embedded::migrations::runner().run(&mut conn)?;

        tracing::info!("Local store initialized at {:?}", path);

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path: path,
        })
    }

    /// Get a clone of the database connection for sharing with services
    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        self.conn.clone()
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("papersum")
        .join("papersum.db")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_creates_parent_dirs_and_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.db");

        let store = LocalStore::open(Some(path.clone())).unwrap();
        assert!(path.exists());
        assert_eq!(store.path(), path.as_path());

        let conn = store.connection();
        let conn = conn.lock().unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'settings'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_reopen_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.db");
        LocalStore::open(Some(path.clone())).unwrap();
        LocalStore::open(Some(path)).unwrap();
    }
}

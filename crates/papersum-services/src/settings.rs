use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::store::{Result, StoreError};

/// String values keyed by name, in the local `settings` table
#[derive(Clone)]
pub struct SettingsService {
    conn: Arc<Mutex<Connection>>,
}

impl SettingsService {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .lock()?
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Insert or replace the value for `key`
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        self.lock()?.execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        debug!(key, "Setting saved");
        Ok(())
    }

    /// Returns whether a row was removed
    pub fn delete(&self, key: &str) -> Result<bool> {
        let removed = self
            .lock()?
            .execute("DELETE FROM settings WHERE key = ?1", params![key])?;
        debug!(key, removed, "Setting deleted");
        Ok(removed > 0)
    }
}

// The only keys persisted locally
pub mod keys {
    pub const AUTH_TOKEN: &str = "auth_token";
    pub const THEME: &str = "theme";
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LocalStore;

    fn service() -> (tempfile::TempDir, SettingsService) {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(Some(dir.path().join("s.db"))).unwrap();
        (dir, SettingsService::new(store.connection()))
    }

    #[test]
    fn test_set_get_overwrite_delete() {
        let (_dir, settings) = service();
        assert_eq!(settings.get(keys::THEME).unwrap(), None);

        settings.set(keys::THEME, "light").unwrap();
        settings.set(keys::THEME, "dark").unwrap();
        assert_eq!(settings.get(keys::THEME).unwrap().as_deref(), Some("dark"));

        assert!(settings.delete(keys::THEME).unwrap());
        assert_eq!(settings.get(keys::THEME).unwrap(), None);
    }

    #[test]
    fn test_delete_reports_missing_key() {
        let (_dir, settings) = service();
        settings.set(keys::AUTH_TOKEN, "tok").unwrap();

        assert!(settings.delete(keys::AUTH_TOKEN).unwrap());
        assert!(!settings.delete(keys::AUTH_TOKEN).unwrap());
    }
}

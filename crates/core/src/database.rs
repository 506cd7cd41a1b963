//! Device-local persistence: the anonymous task cache and remembered view settings.
//!
//! Values live in a small key/value table. Tasks are stored as one JSON array under
//! [`LOCAL_TASKS_KEY`], dates as ISO-8601 strings, so the cache reads the same way the
//! remote payloads do.

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{named_params, Connection, OptionalExtension};

use crate::config::AppConfig;
use crate::model::Task;
use crate::ordering::normalize;
use crate::sort::SortOptions;

pub const LOCAL_TASKS_KEY: &str = "localTasks";
pub const SORT_OPTIONS_KEY: &str = "sortOptions";

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn initialize(config: &AppConfig) -> Result<Self> {
        let conn = Connection::open(config.db_path()).with_context(|| {
            format!("Failed to open database at {}", config.db_path().display())
        })?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .context("Failed to configure SQLite WAL mode")?;

        let db = Self { conn };
        db.apply_migrations()?;
        Ok(db)
    }

    /// A throwaway database, for callers that must not touch the disk.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        let db = Self { conn };
        db.apply_migrations()?;
        Ok(db)
    }

    /// Tasks created while signed out. Records are repaired on the way in.
    pub fn load_local_tasks(&self) -> Result<Vec<Task>> {
        let Some(raw) = self.get(LOCAL_TASKS_KEY)? else {
            return Ok(Vec::new());
        };
        let tasks: Vec<Task> = serde_json::from_str(&raw)
            .with_context(|| format!("Corrupt task cache under '{}'", LOCAL_TASKS_KEY))?;
        Ok(normalize(tasks))
    }

    pub fn save_local_tasks(&self, tasks: &[Task]) -> Result<()> {
        let raw = serde_json::to_string(tasks)?;
        self.put(LOCAL_TASKS_KEY, &raw)
    }

    pub fn clear_local_tasks(&self) -> Result<()> {
        self.remove(LOCAL_TASKS_KEY)
    }

    pub fn load_sort_options(&self) -> Result<SortOptions> {
        match self.get(SORT_OPTIONS_KEY)? {
            Some(raw) => serde_json::from_str(&raw)
                .with_context(|| format!("Corrupt value under '{}'", SORT_OPTIONS_KEY)),
            None => Ok(SortOptions::default()),
        }
    }

    pub fn save_sort_options(&self, options: &SortOptions) -> Result<()> {
        if options.is_empty() {
            return self.remove(SORT_OPTIONS_KEY);
        }
        let raw = serde_json::to_string(options)?;
        self.put(SORT_OPTIONS_KEY, &raw)
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv WHERE key = :key",
                named_params![":key": key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO kv (key, value, updated_at) VALUES (:key, :value, :updated)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            named_params![
                ":key": key,
                ":value": value,
                ":updated": Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM kv WHERE key = :key", named_params![":key": key])?;
        Ok(())
    }

    fn apply_migrations(&self) -> Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
             );",
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Bucket, SortOption};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn temp_config() -> (AppConfig, TempDir) {
        let dir = TempDir::new().expect("temp dir");
        let config = AppConfig::from_data_dir(dir.path().to_path_buf()).expect("config");
        (config, dir)
    }

    #[test]
    fn local_tasks_roundtrip_through_disk() {
        let (config, _dir) = temp_config();
        let db = Database::initialize(&config).expect("init db");
        assert!(db.load_local_tasks().unwrap().is_empty());

        let mut task = Task::new("Buy milk", 0, Utc::now());
        task.set_bucket(Bucket::NotImportantUrgent);
        db.save_local_tasks(&[task.clone()]).unwrap();

        let reopened = Database::initialize(&config).expect("reopen db");
        assert_eq!(reopened.load_local_tasks().unwrap(), vec![task]);

        reopened.clear_local_tasks().unwrap();
        assert!(reopened.load_local_tasks().unwrap().is_empty());
    }

    #[test]
    fn cached_dates_are_iso_strings() {
        let db = Database::in_memory().unwrap();
        db.save_local_tasks(&[Task::new("Stretch", 0, Utc::now())])
            .unwrap();
        let raw = db.get(LOCAL_TASKS_KEY).unwrap().expect("stored");
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let created = value[0]["createdAt"].as_str().expect("string date");
        assert!(chrono::DateTime::parse_from_rfc3339(created).is_ok());
    }

    #[test]
    fn corrupt_cache_is_an_error() {
        let db = Database::in_memory().unwrap();
        db.put(LOCAL_TASKS_KEY, "not json").unwrap();
        assert!(db.load_local_tasks().is_err());
    }

    #[test]
    fn sort_options_persist_and_clear() {
        let db = Database::in_memory().unwrap();
        let mut options = SortOptions::default();
        options.set(Bucket::ImportantUrgent, SortOption::DueSoonFirst);
        db.save_sort_options(&options).unwrap();
        assert_eq!(db.load_sort_options().unwrap(), options);

        db.save_sort_options(&SortOptions::default()).unwrap();
        assert!(db.get(SORT_OPTIONS_KEY).unwrap().is_none());
    }
}

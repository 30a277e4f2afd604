//! SQLite implementation of the story cache.

use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

use super::traits::{CacheStore, StoryRecord};
use crate::error::StoreError;

/// SQLite-based story cache.
pub struct SqliteCacheStore {
  conn: Mutex<Connection>,
}

/// Schema for the cache table.
const CACHE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS story (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    description TEXT NOT NULL,
    photo_url TEXT NOT NULL,
    created_at TEXT NOT NULL,
    lat REAL,
    lon REAL
);
"#;

impl SqliteCacheStore {
  /// Open (or create) the cache database at `path`.
  pub fn open_at(path: &Path) -> Result<Self, StoreError> {
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| StoreError::Io(format!("Failed to create cache directory: {}", e)))?;
    }

    let conn = Connection::open(path).map_err(|e| {
      StoreError::Database(format!(
        "Failed to open cache database at {}: {}",
        path.display(),
        e
      ))
    })?;

    debug!(path = %path.display(), "Opened story cache");
    Self::with_connection(conn)
  }

  /// Cache that lives only as long as this value.
  pub fn open_in_memory() -> Result<Self, StoreError> {
    let conn = Connection::open_in_memory()
      .map_err(|e| StoreError::Database(format!("Failed to open in-memory cache: {}", e)))?;
    Self::with_connection(conn)
  }

  fn with_connection(conn: Connection) -> Result<Self, StoreError> {
    let storage = Self {
      conn: Mutex::new(conn),
    };
    storage.run_migrations()?;
    Ok(storage)
  }

  fn run_migrations(&self) -> Result<(), StoreError> {
    self
      .lock()?
      .execute_batch(CACHE_SCHEMA)
      .map_err(|e| StoreError::Database(format!("Failed to run cache migrations: {}", e)))
  }

  fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
    self
      .conn
      .lock()
      .map_err(|e| StoreError::LockPoisoned(e.to_string()))
  }
}

impl CacheStore for SqliteCacheStore {
  fn list_all(&self) -> Result<Vec<StoryRecord>, StoreError> {
    let conn = self.lock()?;

    let mut stmt = conn
      .prepare(
        "SELECT id, name, description, photo_url, created_at, lat, lon
         FROM story ORDER BY rowid",
      )
      .map_err(|e| StoreError::Database(format!("Failed to prepare query: {}", e)))?;

    let records = stmt
      .query_map([], |row| {
        Ok(StoryRecord {
          id: row.get(0)?,
          name: row.get(1)?,
          description: row.get(2)?,
          photo_url: row.get(3)?,
          created_at: row.get(4)?,
          lat: row.get(5)?,
          lon: row.get(6)?,
        })
      })
      .map_err(|e| StoreError::Database(format!("Failed to query stories: {}", e)))?
      .collect::<Result<Vec<_>, _>>()
      .map_err(|e| StoreError::Database(format!("Failed to read story row: {}", e)))?;

    Ok(records)
  }

  fn insert(&self, record: &StoryRecord) -> Result<(), StoreError> {
    let conn = self.lock()?;

    conn
      .execute(
        "INSERT OR IGNORE INTO story (id, name, description, photo_url, created_at, lat, lon)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
        params![
          record.id,
          record.name,
          record.description,
          record.photo_url,
          record.created_at,
          record.lat,
          record.lon
        ],
      )
      .map_err(|e| StoreError::Database(format!("Failed to insert story {}: {}", record.id, e)))?;

    Ok(())
  }

  fn clear_all(&self) -> Result<(), StoreError> {
    let conn = self.lock()?;

    conn
      .execute("DELETE FROM story", [])
      .map_err(|e| StoreError::Database(format!("Failed to clear stories: {}", e)))?;

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn record(id: &str, name: &str) -> StoryRecord {
    StoryRecord {
      id: id.to_string(),
      name: name.to_string(),
      description: format!("{} says hi", name),
      photo_url: format!("http://x/{}.jpg", id),
      created_at: "2024-01-01T00:00:00Z".to_string(),
      lat: None,
      lon: None,
    }
  }

  #[test]
  fn test_empty_cache_lists_nothing() {
    let store = SqliteCacheStore::open_in_memory().unwrap();
    assert!(store.list_all().unwrap().is_empty());
  }

  #[test]
  fn test_insertion_order_is_kept() {
    let store = SqliteCacheStore::open_in_memory().unwrap();
    store.insert(&record("b", "Bob")).unwrap();
    store.insert(&record("a", "Alice")).unwrap();

    let ids: Vec<String> = store.list_all().unwrap().into_iter().map(|r| r.id).collect();
    assert_eq!(ids, vec!["b", "a"]);
  }

  #[test]
  fn test_duplicate_insert_keeps_existing_row() {
    let store = SqliteCacheStore::open_in_memory().unwrap();
    store.insert(&record("s1", "Alice")).unwrap();
    store.insert(&record("s1", "Mallory")).unwrap();

    let rows = store.list_all().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].name, "Alice");
  }

  #[test]
  fn test_clear_all() {
    let store = SqliteCacheStore::open_in_memory().unwrap();
    store.insert(&record("s1", "Alice")).unwrap();
    store.insert(&record("s2", "Bob")).unwrap();
    store.clear_all().unwrap();
    assert!(store.list_all().unwrap().is_empty());
  }

  #[test]
  fn test_coordinates_round_trip_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.db");

    let mut located = record("s1", "Alice");
    located.lat = Some(-6.2);
    located.lon = Some(106.8);

    {
      let store = SqliteCacheStore::open_at(&path).unwrap();
      store.insert(&located).unwrap();
    }

    let store = SqliteCacheStore::open_at(&path).unwrap();
    assert_eq!(store.list_all().unwrap(), vec![located]);
  }
}

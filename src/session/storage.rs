//! Session store implementations.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::sync::watch;
use tracing::{debug, warn};

use super::traits::{Session, SessionStore};
use crate::error::StoreError;

/// Session store backed by a JSON document on disk.
pub struct FileSessionStore {
  path: PathBuf,
  tx: watch::Sender<Session>,
  /// Serializes writers so the file and the channel agree on the last write
  write_lock: Mutex<()>,
}

impl FileSessionStore {
  /// Open the session document at `path`, starting logged out if it does not
  /// exist yet.
  pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
    let path = path.into();

    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| StoreError::Io(format!("Failed to create session directory: {}", e)))?;
    }

    let session = Self::read(&path)?;
    debug!(path = %path.display(), logged_in = session.is_logged_in, "Opened session store");

    let (tx, _rx) = watch::channel(session);
    Ok(Self {
      path,
      tx,
      write_lock: Mutex::new(()),
    })
  }

  fn read(path: &Path) -> Result<Session, StoreError> {
    match std::fs::read(path) {
      Ok(bytes) => {
        let session: Session = serde_json::from_slice(&bytes).map_err(|e| {
          StoreError::Corrupt(format!(
            "Failed to parse session at {}: {}",
            path.display(),
            e
          ))
        })?;
        Ok(session.normalized())
      }
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Session::default()),
      Err(e) => Err(StoreError::Io(format!(
        "Failed to read session at {}: {}",
        path.display(),
        e
      ))),
    }
  }

  /// Write to a sibling temp file, then rename over the document.
  fn write(&self, session: &Session) -> Result<(), StoreError> {
    let data = serde_json::to_vec_pretty(session)
      .map_err(|e| StoreError::Corrupt(format!("Failed to serialize session: {}", e)))?;

    let tmp = self.path.with_extension("json.tmp");
    std::fs::write(&tmp, data)
      .map_err(|e| StoreError::Io(format!("Failed to write session: {}", e)))?;
    std::fs::rename(&tmp, &self.path)
      .map_err(|e| StoreError::Io(format!("Failed to replace session: {}", e)))?;

    Ok(())
  }
}

impl SessionStore for FileSessionStore {
  fn subscribe(&self) -> watch::Receiver<Session> {
    self.tx.subscribe()
  }

  fn save(&self, session: Session) -> Result<(), StoreError> {
    let session = session.normalized();
    let _guard = self
      .write_lock
      .lock()
      .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;

    if let Err(e) = self.write(&session) {
      warn!(error = %e, "Session save failed");
      return Err(e);
    }

    self.tx.send_replace(session);
    Ok(())
  }
}

/// Session store that only lives in memory.
/// Used by hosts that do not persist the session across restarts.
pub struct MemorySessionStore {
  tx: watch::Sender<Session>,
}

impl MemorySessionStore {
  pub fn new() -> Self {
    let (tx, _rx) = watch::channel(Session::default());
    Self { tx }
  }
}

impl Default for MemorySessionStore {
  fn default() -> Self {
    Self::new()
  }
}

impl SessionStore for MemorySessionStore {
  fn subscribe(&self) -> watch::Receiver<Session> {
    self.tx.subscribe()
  }

  fn save(&self, session: Session) -> Result<(), StoreError> {
    self.tx.send_replace(session.normalized());
    Ok(())
  }
}

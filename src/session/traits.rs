use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::error::StoreError;

/// The current user session.
///
/// `is_logged_in` is true exactly when `token` is non-empty; stores restore
/// that on every save.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
  pub user_id: String,
  pub display_name: String,
  pub email: String,
  pub token: String,
  pub is_logged_in: bool,
}

impl Session {
  /// Session for a successful login
  pub fn authenticated(
    user_id: impl Into<String>,
    display_name: impl Into<String>,
    email: impl Into<String>,
    token: impl Into<String>,
  ) -> Self {
    Self {
      user_id: user_id.into(),
      display_name: display_name.into(),
      email: email.into(),
      token: token.into(),
      is_logged_in: true,
    }
    .normalized()
  }

  /// Re-derive `is_logged_in` from the token.
  pub fn normalized(mut self) -> Self {
    self.is_logged_in = !self.token.is_empty();
    self
  }
}

/// Trait for session persistence backends.
///
/// Writes are serialized inside the store; concurrent saves are
/// last-write-wins.
pub trait SessionStore: Send + Sync {
  /// Subscribe to the session. The receiver holds the current value
  /// immediately and is notified on every later save.
  fn subscribe(&self) -> watch::Receiver<Session>;

  /// Replace the stored session wholesale.
  fn save(&self, session: Session) -> Result<(), StoreError>;

  /// Snapshot of the current session
  fn current(&self) -> Session {
    let rx = self.subscribe();
    let session = rx.borrow().clone();
    session
  }

  /// Reset to the unauthenticated default
  fn clear(&self) -> Result<(), StoreError> {
    self.save(Session::default())
  }
}

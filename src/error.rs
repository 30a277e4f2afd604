//! Error types shared by the remote client, the stores and the coordinator.

/// Failure of a single use case.
///
/// Every failure that reaches the coordinator is one of these three kinds and
/// ends up as the terminal `Error` state of an operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
  /// Transport failure, or a response without a structured message
  #[error("Network error: {0}")]
  Network(String),

  /// The backend answered with a structured error body
  #[error("{message}")]
  Api { status: u16, message: String },

  /// Local session or cache store failure
  #[error("Storage error: {0}")]
  Storage(String),
}

impl Error {
  /// Text shown to the user for this failure.
  ///
  /// For backend errors this is the server's `message` verbatim.
  pub fn message(&self) -> String {
    self.to_string()
  }
}

/// Failure of a local persistence primitive.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
  #[error("Database error: {0}")]
  Database(String),

  #[error("I/O error: {0}")]
  Io(String),

  #[error("Corrupt record: {0}")]
  Corrupt(String),

  #[error("Lock poisoned: {0}")]
  LockPoisoned(String),
}

impl From<StoreError> for Error {
  fn from(e: StoreError) -> Self {
    Error::Storage(e.to_string())
  }
}

/// Input rejected before anything is sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
  #[error("Select an image first")]
  MissingImage,

  #[error("Image is empty")]
  EmptyImage,

  #[error("Enter a description first")]
  EmptyDescription,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_api_message_is_verbatim() {
    let e = Error::Api {
      status: 401,
      message: "invalid token".to_string(),
    };
    assert_eq!(e.message(), "invalid token");
  }

  #[test]
  fn test_store_error_maps_to_storage() {
    let e: Error = StoreError::Io("disk full".to_string()).into();
    assert_eq!(e, Error::Storage("I/O error: disk full".to_string()));
  }
}

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Acknowledgement carrying the server's message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
  pub message: String,
}

pub type RegisterAck = Ack;

/// Successful login
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginAck {
  pub user_id: String,
  pub name: String,
  pub token: String,
}

/// Story as returned by the list endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteStory {
  pub id: String,
  pub name: String,
  pub description: String,
  pub photo_url: String,
  pub created_at: String, // ISO-8601
  pub lat: Option<f64>,
  pub lon: Option<f64>,
}

/// Story as returned by the detail endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteStoryDetail {
  pub id: String,
  pub name: String,
  pub description: String,
  pub photo_url: String,
  pub created_at: String,
  pub lat: Option<f64>,
  pub lon: Option<f64>,
}

/// A validated story upload.
///
/// Can only be built with a non-empty image and a non-empty description, so
/// an invalid upload never reaches the client.
#[derive(Debug, Clone)]
pub struct NewStory {
  image: Vec<u8>,
  mime_type: String,
  description: String,
}

impl NewStory {
  pub fn new(
    image: Vec<u8>,
    mime_type: impl Into<String>,
    description: impl Into<String>,
  ) -> Result<Self, ValidationError> {
    let description = description.into();
    if image.is_empty() {
      return Err(ValidationError::EmptyImage);
    }
    if description.trim().is_empty() {
      return Err(ValidationError::EmptyDescription);
    }

    Ok(Self {
      image,
      mime_type: mime_type.into(),
      description,
    })
  }

  pub fn image(&self) -> &[u8] {
    &self.image
  }

  pub fn mime_type(&self) -> &str {
    &self.mime_type
  }

  pub fn description(&self) -> &str {
    &self.description
  }

  /// File name sent with the photo part
  pub fn file_name(&self) -> String {
    let ext = match self.mime_type.as_str() {
      "image/jpeg" | "image/jpg" => "jpg",
      other => other.rsplit('/').next().unwrap_or("bin"),
    };
    format!("photo.{}", ext)
  }
}

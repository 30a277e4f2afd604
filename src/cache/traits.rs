//! Core trait and row type for the story cache.

use serde::{Deserialize, Serialize};

use crate::api::RemoteStory;
use crate::error::StoreError;

/// A cached story row, keyed by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryRecord {
  pub id: String,
  pub name: String,
  pub description: String,
  pub photo_url: String,
  pub created_at: String,
  pub lat: Option<f64>,
  pub lon: Option<f64>,
}

impl From<&RemoteStory> for StoryRecord {
  fn from(story: &RemoteStory) -> Self {
    Self {
      id: story.id.clone(),
      name: story.name.clone(),
      description: story.description.clone(),
      photo_url: story.photo_url.clone(),
      created_at: story.created_at.clone(),
      lat: story.lat,
      lon: story.lon,
    }
  }
}

/// Trait for cache storage backends.
///
/// These three calls are the only persistence primitives; refreshing is
/// composed from them by the repository.
pub trait CacheStore: Send + Sync {
  /// Every cached row, in insertion order. Empty when nothing is cached.
  fn list_all(&self) -> Result<Vec<StoryRecord>, StoreError>;

  /// Insert a row. A row whose id is already cached is left untouched.
  fn insert(&self, record: &StoryRecord) -> Result<(), StoreError>;

  /// Remove every row.
  fn clear_all(&self) -> Result<(), StoreError>;
}

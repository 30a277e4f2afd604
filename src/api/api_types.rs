//! Serde-deserializable types matching the story API responses.
//!
//! Every response is wrapped in an envelope carrying `error` and `message`.
//! Fields the backend may omit or send as null decode to defaults.

use serde::Deserialize;

use super::types::{Ack, LoginAck, RemoteStory, RemoteStoryDetail};

/// Common `{error, message}` envelope fields.
pub trait Envelope {
  fn is_error(&self) -> bool;
  fn message(&self) -> Option<&str>;
}

macro_rules! impl_envelope {
  ($($ty:ty),*) => {
    $(
      impl Envelope for $ty {
        fn is_error(&self) -> bool {
          self.error
        }

        fn message(&self) -> Option<&str> {
          self.message.as_deref()
        }
      }
    )*
  };
}

// ============================================================================
// Plain message responses (register, add story, every error body)
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiMessage {
  #[serde(default)]
  pub error: bool,
  #[serde(default)]
  pub message: Option<String>,
}

impl From<ApiMessage> for Ack {
  fn from(m: ApiMessage) -> Self {
    Ack {
      message: m.message.unwrap_or_default(),
    }
  }
}

// ============================================================================
// Login
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiLoginResult {
  #[serde(rename = "userId", default)]
  pub user_id: Option<String>,
  #[serde(default)]
  pub name: Option<String>,
  #[serde(default)]
  pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiLoginResponse {
  #[serde(default)]
  pub error: bool,
  #[serde(default)]
  pub message: Option<String>,
  #[serde(rename = "loginResult")]
  pub login_result: Option<ApiLoginResult>,
}

impl ApiLoginResponse {
  /// `None` unless the response carries a non-empty token
  pub fn into_ack(self) -> Option<LoginAck> {
    let result = self.login_result?;
    let token = result.token.filter(|t| !t.is_empty())?;
    Some(LoginAck {
      user_id: result.user_id.unwrap_or_default(),
      name: result.name.unwrap_or_default(),
      token,
    })
  }
}

// ============================================================================
// Stories
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiStory {
  #[serde(default)]
  pub id: Option<String>,
  #[serde(default)]
  pub name: Option<String>,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(rename = "photoUrl", default)]
  pub photo_url: Option<String>,
  #[serde(rename = "createdAt", default)]
  pub created_at: Option<String>,
  #[serde(default)]
  pub lat: Option<f64>,
  #[serde(default)]
  pub lon: Option<f64>,
}

impl ApiStory {
  /// `None` for a story without an id; the id keys the cache
  pub fn into_story(self) -> Option<RemoteStory> {
    let id = self.id.filter(|id| !id.is_empty())?;
    Some(RemoteStory {
      id,
      name: self.name.unwrap_or_default(),
      description: self.description.unwrap_or_default(),
      photo_url: self.photo_url.unwrap_or_default(),
      created_at: self.created_at.unwrap_or_default(),
      lat: self.lat,
      lon: self.lon,
    })
  }

  pub fn into_detail(self) -> RemoteStoryDetail {
    RemoteStoryDetail {
      id: self.id.unwrap_or_default(),
      name: self.name.unwrap_or_default(),
      description: self.description.unwrap_or_default(),
      photo_url: self.photo_url.unwrap_or_default(),
      created_at: self.created_at.unwrap_or_default(),
      lat: self.lat,
      lon: self.lon,
    }
  }
}

#[derive(Debug, Deserialize)]
pub struct ApiStoriesResponse {
  #[serde(default)]
  pub error: bool,
  #[serde(default)]
  pub message: Option<String>,
  #[serde(rename = "listStory", default)]
  pub list_story: Vec<ApiStory>,
}

#[derive(Debug, Deserialize)]
pub struct ApiStoryDetailResponse {
  #[serde(default)]
  pub error: bool,
  #[serde(default)]
  pub message: Option<String>,
  pub story: Option<ApiStory>,
}

impl_envelope!(
  ApiMessage,
  ApiLoginResponse,
  ApiStoriesResponse,
  ApiStoryDetailResponse
);

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_stories_with_nulls() {
    let body = r#"{
      "error": false,
      "message": "Stories fetched successfully",
      "listStory": [
        {"id": "s1", "name": "Alice", "description": null, "photoUrl": "http://x/1.jpg",
         "createdAt": "2024-01-01T00:00:00Z", "lat": null}
      ]
    }"#;

    let response: ApiStoriesResponse = serde_json::from_str(body).unwrap();
    assert!(!response.is_error());
    let stories: Vec<RemoteStory> = response
      .list_story
      .into_iter()
      .filter_map(ApiStory::into_story)
      .collect();
    assert_eq!(stories.len(), 1);
    assert_eq!(stories[0].id, "s1");
    assert_eq!(stories[0].description, "");
    assert_eq!(stories[0].lat, None);
    assert_eq!(stories[0].lon, None);
  }

  #[test]
  fn test_login_result() {
    let body = r#"{"error":false,"message":"success",
      "loginResult":{"userId":"user-1","name":"Alice","token":"tok"}}"#;
    let response: ApiLoginResponse = serde_json::from_str(body).unwrap();
    let ack = response.into_ack().unwrap();
    assert_eq!(ack.user_id, "user-1");
    assert_eq!(ack.token, "tok");
  }

  #[test]
  fn test_login_without_token_has_no_ack() {
    for body in [
      r#"{"error":false,"loginResult":{"userId":"user-1","name":"Alice","token":null}}"#,
      r#"{"error":false,"loginResult":{"userId":"user-1","name":"Alice","token":""}}"#,
      r#"{"error":false,"loginResult":{"userId":"user-1","name":"Alice"}}"#,
      r#"{"error":false,"message":"success"}"#,
    ] {
      let response: ApiLoginResponse = serde_json::from_str(body).unwrap();
      assert!(response.into_ack().is_none(), "{}", body);
    }
  }

  #[test]
  fn test_story_without_id_is_dropped() {
    let body = r#"{"error":false,"listStory":[
      {"id":null,"name":"Ghost"},
      {"name":"Nameless"},
      {"id":"s1","name":"Alice"}
    ]}"#;
    let response: ApiStoriesResponse = serde_json::from_str(body).unwrap();
    let ids: Vec<String> = response
      .list_story
      .into_iter()
      .filter_map(ApiStory::into_story)
      .map(|s| s.id)
      .collect();
    assert_eq!(ids, vec!["s1"]);
  }

  #[test]
  fn test_error_body() {
    let body = r#"{"error":true,"message":"invalid token"}"#;
    let response: ApiMessage = serde_json::from_str(body).unwrap();
    assert!(response.is_error());
    assert_eq!(response.message(), Some("invalid token"));
  }
}

use reqwest::{multipart, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::api::api_types::{
  ApiLoginResponse, ApiMessage, ApiStoriesResponse, ApiStory, ApiStoryDetailResponse, Envelope,
};
use crate::api::types::{Ack, LoginAck, NewStory, RegisterAck, RemoteStory, RemoteStoryDetail};
use crate::config::ApiConfig;
use crate::error::Error;

/// Story API client.
///
/// Each call is a single request/response round trip. Failures come back as
/// [`Error::Api`] when the body carries a message, [`Error::Network`] otherwise.
#[derive(Clone)]
pub struct StoryClient {
  http: reqwest::Client,
  base_url: Url,
}

impl StoryClient {
  pub fn new(config: &ApiConfig) -> Result<Self, Error> {
    // Url::join drops the last segment unless the base ends with '/'
    let mut base = config.base_url.clone();
    if !base.ends_with('/') {
      base.push('/');
    }
    let base_url = Url::parse(&base)
      .map_err(|e| Error::Network(format!("Invalid API base URL {}: {}", base, e)))?;

    let http = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()
      .map_err(|e| Error::Network(format!("Failed to create HTTP client: {}", e)))?;

    Ok(Self { http, base_url })
  }

  fn endpoint(&self, path: &str) -> Result<Url, Error> {
    self
      .base_url
      .join(path)
      .map_err(|e| Error::Network(format!("Invalid endpoint {}: {}", path, e)))
  }

  fn authorized(&self, request: RequestBuilder, token: &str) -> RequestBuilder {
    if token.is_empty() {
      request
    } else {
      request.bearer_auth(token)
    }
  }

  /// Create an account
  pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<RegisterAck, Error> {
    let request = self
      .http
      .post(self.endpoint("register")?)
      .form(&[("name", name), ("email", email), ("password", password)]);

    let response: ApiMessage = self.send(request).await?;
    Ok(response.into())
  }

  /// Exchange credentials for a token
  pub async fn login(&self, email: &str, password: &str) -> Result<LoginAck, Error> {
    let request = self
      .http
      .post(self.endpoint("login")?)
      .form(&[("email", email), ("password", password)]);

    let response: ApiLoginResponse = self.send(request).await?;
    response
      .into_ack()
      .ok_or_else(|| Error::Network("Login response did not contain a token".to_string()))
  }

  /// Fetch every story visible to the session
  pub async fn list_stories(&self, token: &str) -> Result<Vec<RemoteStory>, Error> {
    let request = self.authorized(self.http.get(self.endpoint("stories")?), token);

    let response: ApiStoriesResponse = self.send(request).await?;
    let total = response.list_story.len();
    let stories: Vec<RemoteStory> = response
      .list_story
      .into_iter()
      .filter_map(ApiStory::into_story)
      .collect();
    if stories.len() < total {
      warn!(skipped = total - stories.len(), "Skipping stories without an id");
    }
    Ok(stories)
  }

  /// Fetch a single story by id
  pub async fn get_story_detail(&self, token: &str, id: &str) -> Result<RemoteStoryDetail, Error> {
    let endpoint = self.endpoint(&format!("stories/{}", id))?;
    let request = self.authorized(self.http.get(endpoint), token);

    let response: ApiStoryDetailResponse = self.send(request).await?;
    response
      .story
      .map(ApiStory::into_detail)
      .ok_or_else(|| Error::Network(format!("Detail response for story {} had no story", id)))
  }

  /// Upload a story as multipart `photo` + `description`
  pub async fn add_story(&self, token: &str, story: &NewStory) -> Result<Ack, Error> {
    let photo = multipart::Part::bytes(story.image().to_vec())
      .file_name(story.file_name())
      .mime_str(story.mime_type())
      .map_err(|e| Error::Network(format!("Invalid MIME type {}: {}", story.mime_type(), e)))?;

    let form = multipart::Form::new()
      .part("photo", photo)
      .text("description", story.description().to_string());

    let request = self.authorized(self.http.post(self.endpoint("stories")?), token).multipart(form);

    let response: ApiMessage = self.send(request).await?;
    Ok(response.into())
  }

  /// Send a request and decode its envelope, mapping every failure to [`Error`].
  async fn send<T>(&self, request: RequestBuilder) -> Result<T, Error>
  where
    T: DeserializeOwned + Envelope,
  {
    let response = request
      .send()
      .await
      .map_err(|e| Error::Network(format!("Request failed: {}", e)))?;

    let status = response.status();
    let body = response
      .bytes()
      .await
      .map_err(|e| Error::Network(format!("Failed to read response: {}", e)))?;

    if !status.is_success() {
      let error = error_from_body(status, &body);
      debug!(status = status.as_u16(), error = %error, "Request rejected");
      return Err(error);
    }

    let parsed: T = serde_json::from_slice(&body)
      .map_err(|e| Error::Network(format!("Malformed response: {}", e)))?;

    if parsed.is_error() {
      return Err(Error::Api {
        status: status.as_u16(),
        message: parsed.message().unwrap_or("Request failed").to_string(),
      });
    }

    Ok(parsed)
  }
}

/// Build the error for a non-2xx response.
fn error_from_body(status: StatusCode, body: &[u8]) -> Error {
  match serde_json::from_slice::<ApiMessage>(body) {
    Ok(ApiMessage {
      message: Some(message),
      ..
    }) => Error::Api {
      status: status.as_u16(),
      message,
    },
    _ => Error::Network(format!("Request failed with status {}", status.as_u16())),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;
  use wiremock::matchers::{body_string_contains, header, method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  fn client_for(server: &MockServer) -> StoryClient {
    StoryClient::new(&ApiConfig {
      base_url: server.uri(),
      timeout_secs: 5,
    })
    .unwrap()
  }

  #[tokio::test]
  async fn test_login_sends_form_and_returns_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/login"))
      .and(body_string_contains("email=alice%40example.com"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "error": false,
        "message": "success",
        "loginResult": {"userId": "user-1", "name": "Alice", "token": "tok-123"}
      })))
      .mount(&server)
      .await;

    let ack = client_for(&server)
      .login("alice@example.com", "secret")
      .await
      .unwrap();

    assert_eq!(
      ack,
      LoginAck {
        user_id: "user-1".to_string(),
        name: "Alice".to_string(),
        token: "tok-123".to_string(),
      }
    );
  }

  #[tokio::test]
  async fn test_login_without_token_is_network_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/login"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "error": false,
        "message": "success",
        "loginResult": {"userId": "user-1", "name": "Alice", "token": null}
      })))
      .mount(&server)
      .await;

    let err = client_for(&server)
      .login("alice@example.com", "secret")
      .await
      .unwrap_err();

    assert!(matches!(err, Error::Network(_)));
  }

  #[tokio::test]
  async fn test_list_stories_skips_stories_without_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/stories"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "error": false,
        "message": "ok",
        "listStory": [
          {"id": null, "name": "Ghost"},
          {"id": "s1", "name": "Alice"},
          {"name": "Nameless"},
          {"id": "s2", "name": "Bob"}
        ]
      })))
      .mount(&server)
      .await;

    let stories = client_for(&server).list_stories("tok").await.unwrap();

    let ids: Vec<&str> = stories.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["s1", "s2"]);
  }

  #[tokio::test]
  async fn test_list_stories_sends_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/stories"))
      .and(header("authorization", "Bearer tok-123"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "error": false,
        "message": "ok",
        "listStory": [{
          "id": "s1", "name": "Alice", "description": "Hello",
          "photoUrl": "http://x/1.jpg", "createdAt": "2024-01-01T00:00:00Z",
          "lat": 1.0, "lon": 2.0
        }]
      })))
      .mount(&server)
      .await;

    let stories = client_for(&server).list_stories("tok-123").await.unwrap();
    assert_eq!(stories.len(), 1);
    assert_eq!(stories[0].photo_url, "http://x/1.jpg");
    assert_eq!(stories[0].lat, Some(1.0));
  }

  #[tokio::test]
  async fn test_unauthorized_carries_server_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/stories"))
      .respond_with(
        ResponseTemplate::new(401).set_body_json(json!({"error": true, "message": "invalid token"})),
      )
      .mount(&server)
      .await;

    let err = client_for(&server).list_stories("bad").await.unwrap_err();
    assert_eq!(
      err,
      Error::Api {
        status: 401,
        message: "invalid token".to_string(),
      }
    );
  }

  #[tokio::test]
  async fn test_unparseable_error_body_is_network_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/stories/s1"))
      .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
      .mount(&server)
      .await;

    let err = client_for(&server)
      .get_story_detail("tok", "s1")
      .await
      .unwrap_err();
    assert_eq!(
      err,
      Error::Network("Request failed with status 502".to_string())
    );
  }

  #[tokio::test]
  async fn test_error_flag_on_success_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/register"))
      .respond_with(
        ResponseTemplate::new(200).set_body_json(json!({"error": true, "message": "Email is already taken"})),
      )
      .mount(&server)
      .await;

    let err = client_for(&server)
      .register("Alice", "alice@example.com", "secret")
      .await
      .unwrap_err();
    assert_eq!(err.message(), "Email is already taken");
  }

  #[tokio::test]
  async fn test_add_story_uploads_multipart() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/stories"))
      .and(body_string_contains("name=\"description\""))
      .and(body_string_contains("A sunny day"))
      .and(body_string_contains("filename=\"photo.jpg\""))
      .respond_with(
        ResponseTemplate::new(201).set_body_json(json!({"error": false, "message": "Story created successfully"})),
      )
      .expect(1)
      .mount(&server)
      .await;

    let story = NewStory::new(b"jpeg-bytes".to_vec(), "image/jpeg", "A sunny day").unwrap();
    let ack = client_for(&server).add_story("tok", &story).await.unwrap();
    assert_eq!(ack.message, "Story created successfully");
  }

  #[tokio::test]
  async fn test_transport_failure_is_network_error() {
    // Nothing listens on port 9 locally
    let client = StoryClient::new(&ApiConfig {
      base_url: "http://127.0.0.1:9/v1".to_string(),
      timeout_secs: 2,
    })
    .unwrap();

    let err = client.list_stories("").await.unwrap_err();
    assert!(matches!(err, Error::Network(_)));
  }
}

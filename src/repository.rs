//! Story repository: the session-aware sync coordinator.
//!
//! Owns the remote client, the session store and the cache store. Every
//! network-backed use case returns an [`Operation`] stream; store
//! pass-throughs return plain results.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::{Ack, LoginAck, NewStory, RegisterAck, RemoteStory, RemoteStoryDetail, StoryClient};
use crate::cache::{CacheStore, StoryRecord};
use crate::error::Error;
use crate::operation::Operation;
use crate::session::{Session, SessionStore};

/// Coordinates the remote API with the local session and cache stores.
///
/// Holds no locks of its own. Callers must not run [`refresh_cache`] and a
/// logout-triggered [`clear_cache`] concurrently; their steps can interleave.
///
/// [`refresh_cache`]: StoryRepository::refresh_cache
/// [`clear_cache`]: StoryRepository::clear_cache
pub struct StoryRepository<S: SessionStore, C: CacheStore> {
  client: StoryClient,
  session: Arc<S>,
  cache: Arc<C>,
}

impl<S, C> StoryRepository<S, C>
where
  S: SessionStore + 'static,
  C: CacheStore + 'static,
{
  pub fn new(client: StoryClient, session: Arc<S>, cache: Arc<C>) -> Self {
    Self {
      client,
      session,
      cache,
    }
  }

  /// Token of the current session, empty when logged out
  fn token(&self) -> String {
    self.session.current().token
  }

  pub fn register(&self, name: &str, email: &str, password: &str) -> Operation<RegisterAck> {
    let client = self.client.clone();
    let (name, email, password) = (name.to_string(), email.to_string(), password.to_string());

    Operation::spawn("register", async move {
      client.register(&name, &email, &password).await
    })
  }

  /// Log in. The session is not saved here; callers save it on success.
  pub fn login(&self, email: &str, password: &str) -> Operation<LoginAck> {
    let client = self.client.clone();
    let (email, password) = (email.to_string(), password.to_string());

    Operation::spawn("login", async move { client.login(&email, &password).await })
  }

  /// Fetch the story list. Does not touch the cache; callers decide whether
  /// to persist the result with [`refresh_cache`](Self::refresh_cache).
  pub fn list_stories(&self) -> Operation<Vec<RemoteStory>> {
    let client = self.client.clone();
    let token = self.token();

    Operation::spawn("list_stories", async move {
      let stories = client.list_stories(&token).await?;
      debug!(count = stories.len(), "Fetched stories");
      Ok(stories)
    })
  }

  pub fn get_story_detail(&self, id: &str) -> Operation<RemoteStoryDetail> {
    let client = self.client.clone();
    let token = self.token();
    let id = id.to_string();

    Operation::spawn("get_story_detail", async move {
      client.get_story_detail(&token, &id).await
    })
  }

  /// Upload a story. [`NewStory`] is validated at construction, so an empty
  /// description or image never gets this far.
  pub fn add_story(&self, story: NewStory) -> Operation<Ack> {
    let client = self.client.clone();
    let token = self.token();

    Operation::spawn("add_story", async move {
      client.add_story(&token, &story).await
    })
  }

  /// Replace the cache with `records`: clear everything, then insert each
  /// record in order.
  ///
  /// Not atomic. If interrupted after the clear, the cache is left empty or
  /// partial until the next successful refresh. Duplicate ids keep the first
  /// occurrence.
  pub async fn refresh_cache(&self, records: &[StoryRecord]) -> Result<(), Error> {
    self.cache.clear_all().map_err(|e| {
      warn!(error = %e, "Failed to clear story cache");
      Error::from(e)
    })?;

    for record in records {
      self.cache.insert(record).map_err(|e| {
        warn!(id = %record.id, error = %e, "Cache refresh stopped part way");
        Error::from(e)
      })?;
    }

    info!(count = records.len(), "Refreshed story cache");
    Ok(())
  }

  /// Remove every cached story
  pub async fn clear_cache(&self) -> Result<(), Error> {
    self.cache.clear_all()?;
    info!("Cleared story cache");
    Ok(())
  }

  /// Current cache contents, for instant or offline display
  pub async fn cached_stories(&self) -> Result<Vec<StoryRecord>, Error> {
    Ok(self.cache.list_all()?)
  }

  pub async fn save_session(&self, session: Session) -> Result<(), Error> {
    self.session.save(session)?;
    Ok(())
  }

  /// Observe the session: current value first, then every change.
  pub fn get_session(&self) -> watch::Receiver<Session> {
    self.session.subscribe()
  }

  /// Reset the session to logged out. Callers are expected to follow this
  /// with [`clear_cache`](Self::clear_cache).
  pub async fn logout(&self) -> Result<(), Error> {
    self.session.clear()?;
    info!("Logged out");
    Ok(())
  }
}

impl<S: SessionStore, C: CacheStore> Clone for StoryRepository<S, C> {
  fn clone(&self) -> Self {
    Self {
      client: self.client.clone(),
      session: Arc::clone(&self.session),
      cache: Arc::clone(&self.cache),
    }
  }
}

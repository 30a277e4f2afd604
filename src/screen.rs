//! Per-screen state holders over the repository.
//!
//! A holder remembers whether its screen's data was already loaded during
//! this holder's lifetime, plus the last successful payload, so a recreated
//! view renders the snapshot instead of fetching again. A failed fetch leaves
//! the holder unloaded; the next entry fetches again.

use tokio::sync::watch;
use tracing::warn;

use crate::api::{Ack, NewStory, RegisterAck, RemoteStory, RemoteStoryDetail};
use crate::cache::{CacheStore, StoryRecord};
use crate::error::ValidationError;
use crate::operation::{Operation, OperationResult};
use crate::repository::StoryRepository;
use crate::session::{Session, SessionStore};

/// Loaded flag plus last successful payload.
#[derive(Debug, Clone)]
pub struct ScreenState<T> {
  data_loaded: bool,
  last_snapshot: Option<T>,
}

impl<T> Default for ScreenState<T> {
  fn default() -> Self {
    Self {
      data_loaded: false,
      last_snapshot: None,
    }
  }
}

impl<T: Clone> ScreenState<T> {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn data_loaded(&self) -> bool {
    self.data_loaded
  }

  pub fn snapshot(&self) -> Option<&T> {
    self.last_snapshot.as_ref()
  }

  /// Snapshot to render without fetching, if the data was loaded
  fn loaded_snapshot(&self) -> Option<T> {
    if self.data_loaded {
      self.last_snapshot.clone()
    } else {
      None
    }
  }

  /// Apply one observed state. Only success changes anything.
  pub fn record(&mut self, state: &OperationResult<T>) {
    if let OperationResult::Success(value) = state {
      self.last_snapshot = Some(value.clone());
      self.data_loaded = true;
    }
  }
}

/// Drive an operation to completion, handing every state to `observe` and
/// `state`.
async fn drive<T, F>(
  mut op: Operation<T>,
  state: &mut ScreenState<T>,
  mut observe: F,
) -> Result<T, String>
where
  T: Clone,
  F: FnMut(&OperationResult<T>),
{
  let mut outcome = Err("Operation ended without a result".to_string());

  while let Some(current) = op.next_state().await {
    observe(&current);
    state.record(&current);
    match current {
      OperationResult::Loading => {}
      OperationResult::Success(value) => outcome = Ok(value),
      OperationResult::Error(message) => outcome = Err(message),
    }
  }

  outcome
}

/// Main story list screen.
pub struct StoriesScreen<S: SessionStore, C: CacheStore> {
  repo: StoryRepository<S, C>,
  state: ScreenState<Vec<RemoteStory>>,
}

impl<S, C> StoriesScreen<S, C>
where
  S: SessionStore + 'static,
  C: CacheStore + 'static,
{
  pub fn new(repo: StoryRepository<S, C>) -> Self {
    Self {
      repo,
      state: ScreenState::new(),
    }
  }

  pub fn state(&self) -> &ScreenState<Vec<RemoteStory>> {
    &self.state
  }

  /// The screen leaves for login as soon as this reports logged out
  pub fn session(&self) -> watch::Receiver<Session> {
    self.repo.get_session()
  }

  /// Screen entry: the snapshot when already loaded, otherwise a fetch.
  pub async fn show<F>(&mut self, observe: F) -> Result<Vec<RemoteStory>, String>
  where
    F: FnMut(&OperationResult<Vec<RemoteStory>>),
  {
    if let Some(stories) = self.state.loaded_snapshot() {
      return Ok(stories);
    }
    self.refresh(observe).await
  }

  /// Fetch regardless of the loaded flag. On success the cache is replaced
  /// with the fetched list.
  pub async fn refresh<F>(&mut self, observe: F) -> Result<Vec<RemoteStory>, String>
  where
    F: FnMut(&OperationResult<Vec<RemoteStory>>),
  {
    let stories = drive(self.repo.list_stories(), &mut self.state, observe).await?;

    let records: Vec<StoryRecord> = stories.iter().map(StoryRecord::from).collect();
    if let Err(e) = self.repo.refresh_cache(&records).await {
      // The list is still shown; the next refresh repairs the cache
      warn!(error = %e, "Failed to persist fetched stories");
    }

    Ok(stories)
  }

  /// Log out and drop the cached stories
  pub async fn logout(&self) -> Result<(), String> {
    self.repo.logout().await.map_err(|e| e.message())?;
    self.repo.clear_cache().await.map_err(|e| e.message())
  }
}

/// Story detail screen.
pub struct StoryDetailScreen<S: SessionStore, C: CacheStore> {
  repo: StoryRepository<S, C>,
  story_id: String,
  state: ScreenState<RemoteStoryDetail>,
}

impl<S, C> StoryDetailScreen<S, C>
where
  S: SessionStore + 'static,
  C: CacheStore + 'static,
{
  pub fn new(repo: StoryRepository<S, C>, story_id: impl Into<String>) -> Self {
    Self {
      repo,
      story_id: story_id.into(),
      state: ScreenState::new(),
    }
  }

  pub fn state(&self) -> &ScreenState<RemoteStoryDetail> {
    &self.state
  }

  pub async fn show<F>(&mut self, observe: F) -> Result<RemoteStoryDetail, String>
  where
    F: FnMut(&OperationResult<RemoteStoryDetail>),
  {
    if let Some(story) = self.state.loaded_snapshot() {
      return Ok(story);
    }
    let op = self.repo.get_story_detail(&self.story_id);
    drive(op, &mut self.state, observe).await
  }
}

/// Add-story screen. Holds the selected image across view recreation.
pub struct AddStoryScreen<S: SessionStore, C: CacheStore> {
  repo: StoryRepository<S, C>,
  image: Option<(Vec<u8>, String)>,
}

impl<S, C> AddStoryScreen<S, C>
where
  S: SessionStore + 'static,
  C: CacheStore + 'static,
{
  pub fn new(repo: StoryRepository<S, C>) -> Self {
    Self { repo, image: None }
  }

  pub fn select_image(&mut self, bytes: Vec<u8>, mime_type: impl Into<String>) {
    self.image = Some((bytes, mime_type.into()));
  }

  /// Validate the form and start the upload.
  pub fn submit(&self, description: &str) -> Result<Operation<Ack>, ValidationError> {
    let (bytes, mime_type) = self.image.as_ref().ok_or(ValidationError::MissingImage)?;
    let story = NewStory::new(bytes.clone(), mime_type.clone(), description)?;
    Ok(self.repo.add_story(story))
  }
}

/// Login and registration screens.
pub struct AuthScreen<S: SessionStore, C: CacheStore> {
  repo: StoryRepository<S, C>,
}

impl<S, C> AuthScreen<S, C>
where
  S: SessionStore + 'static,
  C: CacheStore + 'static,
{
  pub fn new(repo: StoryRepository<S, C>) -> Self {
    Self { repo }
  }

  pub fn register(&self, name: &str, email: &str, password: &str) -> Operation<RegisterAck> {
    self.repo.register(name, email, password)
  }

  /// Log in and persist the resulting session.
  pub async fn login<F>(&self, email: &str, password: &str, mut observe: F) -> Result<Session, String>
  where
    F: FnMut(&OperationResult<Session>),
  {
    let mut op = self.repo.login(email, password);
    let mut outcome = Err("Operation ended without a result".to_string());

    while let Some(state) = op.next_state().await {
      match state {
        OperationResult::Loading => observe(&OperationResult::Loading),
        OperationResult::Success(ack) => {
          let session = Session::authenticated(ack.user_id, ack.name, email, ack.token);
          match self.repo.save_session(session.clone()).await {
            Ok(()) => {
              observe(&OperationResult::Success(session.clone()));
              outcome = Ok(session);
            }
            Err(e) => {
              let message = e.message();
              observe(&OperationResult::Error(message.clone()));
              outcome = Err(message);
            }
          }
        }
        OperationResult::Error(message) => {
          observe(&OperationResult::Error(message.clone()));
          outcome = Err(message);
        }
      }
    }

    outcome
  }
}

use color_eyre::{eyre::eyre, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use storysync::api::StoryClient;
use storysync::cache::{SqliteCacheStore, StoryRecord};
use storysync::config::Config;
use storysync::screen::{AddStoryScreen, AuthScreen, StoriesScreen, StoryDetailScreen};
use storysync::session::FileSessionStore;
use storysync::widget::{self, HttpImageLoader, WidgetRenderer};
use storysync::{OperationResult, StoryRepository};

use crate::Command;

type Repository = StoryRepository<FileSessionStore, SqliteCacheStore>;

/// CLI host: wires the stores and client together and runs one command.
pub struct App {
  config: Config,
  repo: Repository,
  cache: Arc<SqliteCacheStore>,
}

impl App {
  pub fn open(config: Config) -> Result<Self> {
    let client = StoryClient::new(&config.api)?;
    let session = Arc::new(FileSessionStore::open(config.session_path()?)?);
    let cache = Arc::new(SqliteCacheStore::open_at(&config.cache_path()?)?);
    let repo = StoryRepository::new(client, session, Arc::clone(&cache));

    Ok(Self {
      config,
      repo,
      cache,
    })
  }

  pub async fn run(self, command: Command) -> Result<()> {
    info!(command = command.name(), "Running command");

    match command {
      Command::Register {
        name,
        email,
        password,
      } => {
        let screen = AuthScreen::new(self.repo.clone());
        let ack = finish(screen.register(&name, &email, &password).outcome().await)?;
        println!("{}", ack.message);
      }
      Command::Login { email, password } => {
        let screen = AuthScreen::new(self.repo.clone());
        let session = finish(screen.login(&email, &password, report("Logging in")).await)?;
        println!("Logged in as {} <{}>", session.display_name, session.email);
      }
      Command::Logout => {
        StoriesScreen::new(self.repo.clone())
          .logout()
          .await
          .map_err(|e| eyre!(e))?;
        println!("Logged out");
      }
      Command::Session => {
        let session = self.repo.get_session().borrow().clone();
        if session.is_logged_in {
          println!("{} <{}> (user {})", session.display_name, session.email, session.user_id);
        } else {
          println!("Not logged in");
        }
      }
      Command::Stories { no_cache } => {
        self.require_login()?;
        let stories = if no_cache {
          finish(self.repo.list_stories().outcome().await)?
        } else {
          let mut screen = StoriesScreen::new(self.repo.clone());
          finish(screen.show(report("Fetching stories")).await)?
        };
        for story in &stories {
          println!("{}  {}  {}", story.id, story.name, story.created_at);
        }
      }
      Command::Story { id } => {
        self.require_login()?;
        let mut screen = StoryDetailScreen::new(self.repo.clone(), id);
        let story = finish(screen.show(report("Fetching story")).await)?;
        println!("{} ({})", story.name, story.created_at);
        println!("{}", story.description);
        println!("{}", story.photo_url);
        if let (Some(lat), Some(lon)) = (story.lat, story.lon) {
          println!("at {}, {}", lat, lon);
        }
      }
      Command::Add {
        image,
        description,
        mime,
      } => {
        self.require_login()?;
        let bytes = std::fs::read(&image)
          .map_err(|e| eyre!("Failed to read image {}: {}", image.display(), e))?;
        let mime = mime.unwrap_or_else(|| guess_mime(&image).to_string());

        let mut screen = AddStoryScreen::new(self.repo.clone());
        screen.select_image(bytes, mime);
        let op = screen.submit(&description)?;
        eprintln!("Uploading...");
        let ack = finish(op.outcome().await)?;
        println!("{}", ack.message);
      }
      Command::Cached => {
        let records: Vec<StoryRecord> = self.repo.cached_stories().await?;
        if records.is_empty() {
          println!("Cache is empty");
        }
        for record in &records {
          println!("{}  {}  {}", record.id, record.name, record.created_at);
        }
      }
      Command::Widget { width } => {
        let loader = HttpImageLoader::new(Duration::from_secs(self.config.api.timeout_secs))?;
        let renderer = WidgetRenderer::new(self.cache, loader, self.config.widget.max_rows);
        let rows = renderer.render().await?;
        for line in widget::render_lines(&rows, width) {
          println!("{}", line);
        }
      }
    }

    Ok(())
  }

  fn require_login(&self) -> Result<()> {
    if self.repo.get_session().borrow().is_logged_in {
      Ok(())
    } else {
      Err(eyre!("Not logged in. Run `storysync login <email> <password>` first."))
    }
  }
}

/// Observer that announces the loading state on stderr
fn report<T>(label: &'static str) -> impl FnMut(&OperationResult<T>) {
  move |state: &OperationResult<T>| {
    if let OperationResult::Loading = state {
      eprintln!("{}...", label);
    }
  }
}

fn finish<T>(outcome: std::result::Result<T, String>) -> Result<T> {
  outcome.map_err(|message| eyre!(message))
}

fn guess_mime(path: &Path) -> &'static str {
  match path
    .extension()
    .and_then(|e| e.to_str())
    .map(|e| e.to_lowercase())
    .as_deref()
  {
    Some("png") => "image/png",
    Some("webp") => "image/webp",
    Some("gif") => "image/gif",
    _ => "image/jpeg",
  }
}

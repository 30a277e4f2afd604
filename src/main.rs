mod app;

use clap::{Parser, Subcommand};
use color_eyre::Result;
use std::path::PathBuf;
use storysync::{config, logging};

#[derive(Parser, Debug)]
#[command(name = "storysync")]
#[command(about = "Story client with an offline cache and a widget view")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/storysync/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Also log to stderr
  #[arg(short, long)]
  verbose: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Create an account
  Register {
    name: String,
    email: String,
    password: String,
  },
  /// Log in and save the session
  Login { email: String, password: String },
  /// Log out and clear the cached stories
  Logout,
  /// Show the current session
  Session,
  /// Fetch stories and refresh the cache
  Stories {
    /// Only fetch, leave the cache as it is
    #[arg(long)]
    no_cache: bool,
  },
  /// Show one story
  Story { id: String },
  /// Upload a story
  Add {
    #[arg(short, long)]
    image: PathBuf,
    #[arg(short, long)]
    description: String,
    /// MIME type of the image (guessed from the extension by default)
    #[arg(long)]
    mime: Option<String>,
  },
  /// List cached stories without going to the network
  Cached,
  /// Render the widget from the cache
  Widget {
    #[arg(long, default_value_t = 60)]
    width: u16,
  },
}

impl Command {
  /// Name for logs; arguments may hold credentials
  pub fn name(&self) -> &'static str {
    match self {
      Command::Register { .. } => "register",
      Command::Login { .. } => "login",
      Command::Logout => "logout",
      Command::Session => "session",
      Command::Stories { .. } => "stories",
      Command::Story { .. } => "story",
      Command::Add { .. } => "add",
      Command::Cached => "cached",
      Command::Widget { .. } => "widget",
    }
  }
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  let config = config::Config::load(args.config.as_deref())?;
  let _log_guard = logging::init(&config.log_dir()?, args.verbose)?;

  let app = app::App::open(config)?;
  app.run(args.command).await?;

  Ok(())
}

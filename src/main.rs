use clap::{Parser, Subcommand};
use color_eyre::Result;
use std::path::PathBuf;
use std::time::Duration;

use quranquest_offline::{Config, OfflineService};

#[derive(Parser, Debug)]
#[command(name = "quranquest-offline")]
#[command(about = "Offline cache tool for the QuranicQuest API")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/quranquest/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Show connectivity and cache status
  Status,
  /// Run the one-time cache bootstrap
  Init,
  /// Download a resource for offline use (content types: surah, lesson)
  Download {
    content_type: String,
    content_id: String,
  },
  /// Fetch an API path through the caching pipeline
  Fetch { path: String },
  /// Clear cached entries
  Clear {
    /// Only clear keys under this prefix
    #[arg(long)]
    prefix: Option<String>,
  },
}

fn init_tracing() -> tracing_appender::non_blocking::WorkerGuard {
  let (writer, guard) = tracing_appender::non_blocking(std::io::stderr());
  tracing_subscriber::fmt()
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .with_writer(writer)
    .init();
  guard
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;
  let _guard = init_tracing();

  let args = Args::parse();

  // An explicit config path must load; otherwise fall back to the
  // production endpoint when no config file is found.
  let config = match &args.config {
    Some(path) => Config::load(Some(path))?,
    None => Config::load(None).unwrap_or_else(|_| Config::default_remote()),
  };

  let mut service = OfflineService::new(&config)?;

  match args.command {
    Command::Status => {
      // Give the probe a moment to take its first reading.
      let mut rx = service.reachability().subscribe();
      let _ = tokio::time::timeout(Duration::from_secs(2), rx.changed()).await;

      println!("online: {}", service.is_online());
      println!("initialized: {}", service.cache().is_initialized()?);
      println!("cached entries: {}", service.cache().managed_entry_count()?);
    }
    Command::Init => {
      service.initialize().await;
      println!("initialized: {}", service.cache().is_initialized()?);
    }
    Command::Download {
      content_type,
      content_id,
    } => {
      let outcome = service
        .download_content_for_offline(&content_type, &content_id)
        .await;
      match outcome.error {
        None => println!("downloaded {} {}", content_type, content_id),
        Some(error) => {
          println!("download failed: {}", error);
          std::process::exit(1);
        }
      }
    }
    Command::Fetch { path } => {
      let response = service.client().get(&path).await?;
      let source = if response.served_from_cache {
        "cache"
      } else {
        "network"
      };
      eprintln!("[{}] {}", source, response.status);
      println!("{}", serde_json::to_string_pretty(&response.body)?);
    }
    Command::Clear { prefix } => {
      let removed = match prefix {
        Some(prefix) => service.clear_cache(&prefix)?,
        None => service.clear_all_cache()?,
      };
      println!("removed {} entries", removed);
    }
  }

  service.shutdown();

  Ok(())
}

use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Production API endpoint.
const DEFAULT_API_URL: &str = "https://api.quranicquest.com";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub api: ApiConfig,
  #[serde(default)]
  pub probe: ProbeConfig,
  #[serde(default)]
  pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  pub url: String,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProbeConfig {
  /// URL probed to decide reachability. Defaults to the API base URL.
  pub url: Option<String>,
  #[serde(default = "default_probe_interval_secs")]
  pub interval_secs: u64,
}

impl Default for ProbeConfig {
  fn default() -> Self {
    Self {
      url: None,
      interval_secs: default_probe_interval_secs(),
    }
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheConfig {
  /// Override for the cache database directory.
  pub dir: Option<PathBuf>,
}

fn default_timeout_secs() -> u64 {
  10
}

fn default_probe_interval_secs() -> u64 {
  30
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./quranquest.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/quranquest/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/quranquest/config.yaml"
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("quranquest.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("quranquest").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }

  /// Configuration pointing at the production API.
  pub fn default_remote() -> Self {
    Self {
      api: ApiConfig {
        url: DEFAULT_API_URL.to_string(),
        timeout_secs: default_timeout_secs(),
      },
      probe: ProbeConfig::default(),
      cache: CacheConfig::default(),
    }
  }

  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.api.timeout_secs)
  }

  pub fn probe_interval(&self) -> Duration {
    Duration::from_secs(self.probe.interval_secs)
  }

  /// URL the reachability probe targets.
  pub fn probe_url(&self) -> &str {
    self.probe.url.as_deref().unwrap_or(&self.api.url)
  }
}

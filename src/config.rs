use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::sync::SyncPolicy;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub backend: BackendConfig,
  #[serde(default)]
  pub sync: SyncConfig,
  /// Name recorded on metric events (defaults to anonymous)
  pub username: Option<String>,
  /// Custom title for header (defaults to backend domain if not set)
  pub title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
  pub url: String,
  #[serde(default = "default_listings_table")]
  pub listings_table: String,
  #[serde(default = "default_request_timeout_secs")]
  pub request_timeout_secs: u64,
}

impl BackendConfig {
  pub fn request_timeout(&self) -> Duration {
    Duration::from_secs(self.request_timeout_secs)
  }
}

fn default_listings_table() -> String {
  "listings".to_string()
}

fn default_request_timeout_secs() -> u64 {
  15
}

/// Retry and watchdog tuning for the listings store
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
  pub max_retries: u32,
  pub retry_delay_ms: u64,
  pub watchdog_ms: u64,
}

impl Default for SyncConfig {
  fn default() -> Self {
    let policy = SyncPolicy::default();
    Self {
      max_retries: policy.max_retries,
      retry_delay_ms: policy.retry_delay.as_millis() as u64,
      watchdog_ms: policy.watchdog.as_millis() as u64,
    }
  }
}

impl From<&SyncConfig> for SyncPolicy {
  fn from(config: &SyncConfig) -> Self {
    SyncPolicy {
      max_retries: config.max_retries,
      retry_delay: Duration::from_millis(config.retry_delay_ms),
      watchdog: Duration::from_millis(config.watchdog_ms),
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./haven.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/haven/config.yaml
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
        "No configuration file found. Create one at ~/.config/haven/config.yaml\n\
                 See haven.example.yaml for the format."
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("haven.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("haven").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;
    if config.backend.url.trim().is_empty() {
      return Err(eyre!("backend.url must not be empty"));
    }
    Ok(config)
  }

  /// Get the backend API key from environment variables.
  ///
  /// Checks HAVEN_API_KEY first, then SUPABASE_ANON_KEY as fallback.
  pub fn get_api_key() -> Result<String> {
    std::env::var("HAVEN_API_KEY")
      .or_else(|_| std::env::var("SUPABASE_ANON_KEY"))
      .map_err(|_| {
        eyre!("Backend API key not found. Set HAVEN_API_KEY or SUPABASE_ANON_KEY environment variable.")
      })
  }

  pub fn sync_policy(&self) -> SyncPolicy {
    SyncPolicy::from(&self.sync)
  }

  /// Header title, falling back to the backend host
  pub fn display_title(&self) -> String {
    match &self.title {
      Some(title) => title.clone(),
      None => url::Url::parse(&self.backend.url)
        .ok()
        .and_then(|u| u.host_str().map(String::from))
        .unwrap_or_else(|| self.backend.url.clone()),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_minimal_config_uses_defaults() {
    let config = Config::parse("backend:\n  url: https://abc.supabase.co\n").unwrap();
    assert_eq!(config.backend.listings_table, "listings");
    assert_eq!(config.backend.request_timeout(), Duration::from_secs(15));

    let policy = config.sync_policy();
    assert_eq!(policy.max_retries, 2);
    assert_eq!(policy.retry_delay, Duration::from_millis(1500));
    assert_eq!(policy.watchdog, Duration::from_secs(20));
    assert_eq!(config.display_title(), "abc.supabase.co");
  }

  #[test]
  fn test_sync_overrides() {
    let yaml = r#"
backend:
  url: http://localhost:54321
  listings_table: rentals
sync:
  max_retries: 5
  watchdog_ms: 3000
title: My Haven
"#;
    let config = Config::parse(yaml).unwrap();
    assert_eq!(config.backend.listings_table, "rentals");
    let policy = config.sync_policy();
    assert_eq!(policy.max_retries, 5);
    assert_eq!(policy.retry_delay, Duration::from_millis(1500));
    assert_eq!(policy.watchdog, Duration::from_secs(3));
    assert_eq!(config.display_title(), "My Haven");
  }

  #[test]
  fn test_empty_url_rejected() {
    assert!(Config::parse("backend:\n  url: \"  \"\n").is_err());
  }
}

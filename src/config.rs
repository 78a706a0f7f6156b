use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::cache::Scope;
use crate::notice::client::DEFAULT_LIST_TITLE;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub site: SiteConfig,
  /// User identifier attached to dismissal events
  pub user: Option<String>,
  #[serde(default)]
  pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
  /// Absolute URL of the web hosting the notices list
  pub url: String,
  /// Web id used to partition the cache (defaults to the url)
  pub id: Option<String>,
  #[serde(default = "default_list_title")]
  pub list_title: String,
}

fn default_list_title() -> String {
  DEFAULT_LIST_TITLE.to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// Store snapshots on disk; when false nothing is cached
  #[serde(default = "default_true")]
  pub enabled: bool,
  /// Seconds before a cached snapshot is refetched
  #[serde(default = "default_stale_secs")]
  pub stale_secs: u64,
  /// Fetch on every request regardless of freshness
  #[serde(default)]
  pub always_refresh: bool,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      stale_secs: default_stale_secs(),
      always_refresh: false,
    }
  }
}

fn default_true() -> bool {
  true
}

fn default_stale_secs() -> u64 {
  120
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./coachmarks.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/coachmarks/config.yaml
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
        "No configuration file found. Create one at ~/.config/coachmarks/config.yaml"
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("coachmarks.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("coachmarks").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn from_yaml(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;

    if config.site.url.trim().is_empty() {
      return Err(eyre!("site.url must not be empty"));
    }

    Ok(config)
  }

  /// Cache partition for the configured site.
  pub fn scope(&self) -> Scope {
    let id = self
      .site
      .id
      .clone()
      .unwrap_or_else(|| self.site.url.trim_end_matches('/').to_string());
    Scope::new(id, self.site.url.clone())
  }

  pub fn stale_time(&self) -> chrono::Duration {
    let secs = i64::try_from(self.cache.stale_secs)
      .unwrap_or(i64::MAX)
      .min(i64::MAX / 1000);
    chrono::Duration::seconds(secs)
  }

  /// Get the list access token from environment variables, if any.
  ///
  /// Checks COACHMARKS_TOKEN first, then SHAREPOINT_TOKEN as fallback.
  pub fn get_token() -> Option<String> {
    std::env::var("COACHMARKS_TOKEN")
      .or_else(|_| std::env::var("SHAREPOINT_TOKEN"))
      .ok()
      .filter(|t| !t.is_empty())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_minimal_config_uses_defaults() {
    let config = Config::from_yaml(
      "site:\n  url: https://contoso.sharepoint.com/sites/intranet/\n",
    )
    .unwrap();

    assert_eq!(config.site.list_title, "Coachmarks");
    assert!(config.cache.enabled);
    assert!(!config.cache.always_refresh);
    assert_eq!(config.stale_time(), chrono::Duration::minutes(2));
    assert_eq!(
      config.scope().id,
      "https://contoso.sharepoint.com/sites/intranet"
    );
  }

  #[test]
  fn test_full_config() {
    let config = Config::from_yaml(
      r#"
site:
  url: https://contoso.sharepoint.com/sites/hr
  id: 6C1E0B7A-1111-4222-8333-944455556666
  list_title: Onboarding Tips
user: someone@contoso.com
cache:
  enabled: false
  stale_secs: 30
  always_refresh: true
"#,
    )
    .unwrap();

    assert_eq!(config.site.list_title, "Onboarding Tips");
    assert_eq!(config.user.as_deref(), Some("someone@contoso.com"));
    assert!(!config.cache.enabled);
    assert!(config.cache.always_refresh);
    assert_eq!(config.stale_time(), chrono::Duration::seconds(30));
    assert_eq!(config.scope().id, "6C1E0B7A-1111-4222-8333-944455556666");
  }

  #[test]
  fn test_empty_url_is_rejected() {
    assert!(Config::from_yaml("site:\n  url: \"  \"\n").is_err());
  }

  #[test]
  fn test_missing_explicit_path() {
    let err = Config::load(Some(Path::new("/nonexistent/coachmarks.yaml"))).unwrap_err();
    assert!(err.to_string().contains("Config file not found"));
  }
}

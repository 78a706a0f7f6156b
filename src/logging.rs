//! Log output goes to a file so it never mixes with command output.

use color_eyre::{eyre::eyre, Result};
use std::path::{Path, PathBuf};
use tracing::warn;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const LOG_FILE: &str = "coachmarks.log";
const DEFAULT_FILTER: &str = "coachmarks=info";

/// Install the global subscriber. Keep the returned guard alive until exit
/// or buffered lines are lost.
///
/// Never fails: when the log directory cannot be used, warnings and errors
/// go to stderr instead and `None` is returned.
pub fn init() -> Option<WorkerGuard> {
  match log_dir().and_then(|dir| prepare_log_dir(&dir).map(|()| dir)) {
    Ok(dir) => {
      let appender = tracing_appender::rolling::never(&dir, LOG_FILE);
      let (writer, guard) = tracing_appender::non_blocking(appender);

      let installed = tracing_subscriber::fmt()
        .with_env_filter(filter(DEFAULT_FILTER))
        .with_writer(writer)
        .with_ansi(false)
        .try_init();
      installed.is_ok().then_some(guard)
    }
    Err(e) => {
      let _ = tracing_subscriber::fmt()
        .with_env_filter(filter("coachmarks=warn"))
        .with_writer(std::io::stderr)
        .try_init();
      warn!(error = %e, "file logging unavailable, logging to stderr");
      None
    }
  }
}

fn filter(default: &str) -> EnvFilter {
  EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

fn prepare_log_dir(dir: &Path) -> Result<()> {
  std::fs::create_dir_all(dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))
}

fn log_dir() -> Result<PathBuf> {
  let data_dir = dirs::data_dir()
    .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
    .ok_or_else(|| eyre!("Could not determine data directory"))?;

  Ok(data_dir.join("coachmarks"))
}

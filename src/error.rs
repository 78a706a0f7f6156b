use thiserror::Error;

/// Failure to obtain notices from the remote list.
///
/// Cloneable so a single refresh outcome can be handed to every caller
/// waiting on it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
  #[error("Unable to get items: {status} ({status_text})")]
  Status { status: u16, status_text: String },

  #[error("Request to {url} failed: {message}")]
  Transport { url: String, message: String },

  #[error("Failed to parse list response: {0}")]
  Parse(String),

  #[error("Invalid site url '{url}': {message}")]
  InvalidUrl { url: String, message: String },

  #[error("Refresh task did not complete: {0}")]
  Aborted(String),
}

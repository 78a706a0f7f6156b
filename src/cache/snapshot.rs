//! Per-scope cache contents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::notice::Notice;

/// When the user last acknowledged a notice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcknowledgmentRecord {
  #[serde(rename = "Id")]
  pub id: i64,
  #[serde(rename = "AcknowledgedAt")]
  pub acknowledged_at: DateTime<Utc>,
}

/// Everything cached for one scope: the last fetched notices and the
/// user's acknowledgment log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheSnapshot {
  /// Absent until the first successful fetch
  #[serde(rename = "LoadedAt", default)]
  pub loaded_at: Option<DateTime<Utc>>,
  #[serde(rename = "Notices", default)]
  pub notices: Vec<Notice>,
  #[serde(rename = "Acknowledgments", default)]
  pub acknowledgments: Vec<AcknowledgmentRecord>,
}

impl CacheSnapshot {
  /// Whether the snapshot was loaded less than `stale_time` before `now`.
  pub fn is_fresh(&self, now: DateTime<Utc>, stale_time: chrono::Duration) -> bool {
    match self.loaded_at {
      Some(loaded_at) => now - loaded_at < stale_time,
      None => false,
    }
  }

  pub fn acknowledgment(&self, id: i64) -> Option<&AcknowledgmentRecord> {
    self.acknowledgments.iter().find(|ack| ack.id == id)
  }

  /// Install freshly fetched notices and drop acknowledgments for notices
  /// that no longer exist.
  pub fn replace_notices(&mut self, notices: Vec<Notice>, loaded_at: DateTime<Utc>) {
    let active: HashSet<i64> = notices.iter().map(|n| n.id).collect();
    self.acknowledgments.retain(|ack| active.contains(&ack.id));
    self.notices = notices;
    self.loaded_at = Some(loaded_at);
  }

  /// Record an acknowledgment, updating an existing record in place.
  pub fn acknowledge(&mut self, id: i64, at: DateTime<Utc>) {
    match self.acknowledgments.iter_mut().find(|ack| ack.id == id) {
      Some(existing) => existing.acknowledged_at = at,
      None => self.acknowledgments.push(AcknowledgmentRecord {
        id,
        acknowledged_at: at,
      }),
    }
  }
}

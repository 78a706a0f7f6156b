//! Time source for freshness and acknowledgment timestamps.

use chrono::{DateTime, Utc};
use std::sync::Mutex;

/// Source of the current time.
pub trait Clock: Send + Sync {
  fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> {
    Utc::now()
  }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct FixedClock {
  now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
  pub fn new(now: DateTime<Utc>) -> Self {
    Self {
      now: Mutex::new(now),
    }
  }

  pub fn set(&self, now: DateTime<Utc>) {
    if let Ok(mut guard) = self.now.lock() {
      *guard = now;
    }
  }

  pub fn advance(&self, by: chrono::Duration) {
    if let Ok(mut guard) = self.now.lock() {
      *guard += by;
    }
  }
}

impl Clock for FixedClock {
  fn now(&self) -> DateTime<Utc> {
    match self.now.lock() {
      Ok(guard) => *guard,
      Err(poisoned) => *poisoned.into_inner(),
    }
  }
}

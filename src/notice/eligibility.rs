//! Decides which cached notices are shown right now.

use chrono::{DateTime, FixedOffset, Local, TimeZone, Utc};

use crate::cache::CacheSnapshot;
use crate::notice::types::{Frequency, Notice};

/// Time zone whose calendar days bound the daily frequency.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ViewerZone {
  /// Zone of the machine running the process
  #[default]
  Local,
  Fixed(FixedOffset),
}

impl ViewerZone {
  pub fn same_calendar_day(&self, a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
    match self {
      ViewerZone::Local => same_calendar_day(a, b, &Local),
      ViewerZone::Fixed(offset) => same_calendar_day(a, b, offset),
    }
  }
}

/// True when `a` and `b` fall on the same year, month and day in `tz`.
pub fn same_calendar_day<Tz: TimeZone>(a: DateTime<Utc>, b: DateTime<Utc>, tz: &Tz) -> bool {
  a.with_timezone(tz).date_naive() == b.with_timezone(tz).date_naive()
}

/// Notices from `snapshot` eligible for display at `now`, in cached order.
///
/// Disabled notices stay in the cache so their acknowledgments survive, but
/// are never returned.
pub fn reduce(snapshot: &CacheSnapshot, now: DateTime<Utc>, zone: ViewerZone) -> Vec<Notice> {
  snapshot
    .notices
    .iter()
    .filter(|notice| is_eligible(snapshot, notice, now, zone))
    .cloned()
    .collect()
}

fn is_eligible(
  snapshot: &CacheSnapshot,
  notice: &Notice,
  now: DateTime<Utc>,
  zone: ViewerZone,
) -> bool {
  if !notice.enabled {
    return false;
  }

  let Some(ack) = snapshot.acknowledgment(notice.id) else {
    return true;
  };

  match notice.frequency {
    Frequency::Once => false,
    Frequency::Always => true,
    Frequency::Daily => !zone.same_calendar_day(ack.acknowledged_at, now),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Duration;

  fn notice(id: i64, frequency: Frequency, enabled: bool) -> Notice {
    Notice {
      id,
      title: format!("notice {}", id),
      description: String::new(),
      frequency,
      enabled,
      element_id: format!("id='anchor-{}'", id),
      page_list: None,
      visible: true,
    }
  }

  fn utc() -> ViewerZone {
    ViewerZone::Fixed(FixedOffset::east_opt(0).unwrap())
  }

  fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 19, 15, 0, 0).unwrap()
  }

  fn ids(notices: &[Notice]) -> Vec<i64> {
    notices.iter().map(|n| n.id).collect()
  }

  #[test]
  fn test_unacknowledged_notices_are_shown_in_order() {
    let snapshot = CacheSnapshot {
      loaded_at: Some(now()),
      notices: vec![
        notice(3, Frequency::Daily, true),
        notice(1, Frequency::Once, true),
        notice(2, Frequency::Always, true),
      ],
      acknowledgments: Vec::new(),
    };
    assert_eq!(ids(&reduce(&snapshot, now(), utc())), vec![3, 1, 2]);
  }

  #[test]
  fn test_disabled_notice_is_never_shown() {
    let mut snapshot = CacheSnapshot {
      loaded_at: Some(now()),
      notices: vec![notice(2, Frequency::Always, false)],
      acknowledgments: Vec::new(),
    };
    assert!(reduce(&snapshot, now(), utc()).is_empty());

    snapshot.acknowledge(2, now() - Duration::days(10));
    assert!(reduce(&snapshot, now(), utc()).is_empty());
  }

  #[test]
  fn test_once_is_hidden_after_any_acknowledgment() {
    let mut snapshot = CacheSnapshot {
      loaded_at: Some(now()),
      notices: vec![notice(1, Frequency::Once, true)],
      acknowledgments: Vec::new(),
    };
    assert_eq!(ids(&reduce(&snapshot, now(), utc())), vec![1]);

    snapshot.acknowledge(1, now() - Duration::days(400));
    assert!(reduce(&snapshot, now(), utc()).is_empty());

    snapshot.acknowledge(1, now());
    assert!(reduce(&snapshot, now(), utc()).is_empty());
  }

  #[test]
  fn test_always_ignores_acknowledgments() {
    let mut snapshot = CacheSnapshot {
      loaded_at: Some(now()),
      notices: vec![notice(4, Frequency::Always, true)],
      acknowledgments: Vec::new(),
    };
    snapshot.acknowledge(4, now());
    assert_eq!(ids(&reduce(&snapshot, now(), utc())), vec![4]);
  }

  #[test]
  fn test_daily_hidden_same_day_shown_next_day() {
    let mut snapshot = CacheSnapshot {
      loaded_at: Some(now()),
      notices: vec![notice(5, Frequency::Daily, true)],
      acknowledgments: Vec::new(),
    };

    snapshot.acknowledge(5, now() - Duration::hours(14));
    assert!(reduce(&snapshot, now(), utc()).is_empty());

    snapshot.acknowledge(5, now() - Duration::hours(16));
    assert_eq!(ids(&reduce(&snapshot, now(), utc())), vec![5]);
  }

  #[test]
  fn test_daily_same_day_number_other_month_is_shown() {
    let mut snapshot = CacheSnapshot {
      loaded_at: Some(now()),
      notices: vec![notice(6, Frequency::Daily, true)],
      acknowledgments: Vec::new(),
    };
    snapshot.acknowledge(6, Utc.with_ymd_and_hms(2026, 9, 19, 15, 0, 0).unwrap());
    assert_eq!(ids(&reduce(&snapshot, now(), utc())), vec![6]);
  }

  #[test]
  fn test_calendar_day_follows_viewer_zone() {
    let ack = Utc.with_ymd_and_hms(2026, 10, 19, 23, 30, 0).unwrap();
    let later = Utc.with_ymd_and_hms(2026, 10, 20, 0, 30, 0).unwrap();

    assert!(!same_calendar_day(ack, later, &Utc));

    // Both instants are on the 20th in UTC+2
    let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
    assert!(same_calendar_day(ack, later, &plus_two));
    assert!(ViewerZone::Fixed(plus_two).same_calendar_day(ack, later));
  }

  #[test]
  fn test_reduce_is_idempotent() {
    let mut snapshot = CacheSnapshot {
      loaded_at: Some(now()),
      notices: vec![
        notice(1, Frequency::Once, true),
        notice(2, Frequency::Daily, true),
        notice(3, Frequency::Always, false),
      ],
      acknowledgments: Vec::new(),
    };
    snapshot.acknowledge(2, now());

    let first = reduce(&snapshot, now(), utc());
    let second = reduce(&snapshot, now(), utc());
    assert_eq!(first, second);
    assert_eq!(ids(&first), vec![1]);
  }
}

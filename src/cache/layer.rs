//! Cache layer that decides between cached notices and a remote refresh.

use chrono::{DateTime, Duration, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

use super::clock::{Clock, SystemClock};
use super::keys::Scope;
use super::snapshot::CacheSnapshot;
use super::storage::{KeyValueStore, SnapshotStore};
use crate::error::FetchError;
use crate::notice::eligibility::{reduce, ViewerZone};
use crate::notice::{Notice, NoticeSource};

type RefreshResult = Result<CacheSnapshot, FetchError>;
type PendingRefresh = Shared<BoxFuture<'static, RefreshResult>>;

struct InFlight {
  generation: u64,
  pending: PendingRefresh,
}

#[derive(Default)]
struct Registry {
  next_generation: u64,
  refreshes: HashMap<String, InFlight>,
}

impl Registry {
  /// Drop the entry for `key` if it still belongs to `generation`.
  fn finish(&mut self, key: &str, generation: u64) {
    if self
      .refreshes
      .get(key)
      .is_some_and(|entry| entry.generation == generation)
    {
      self.refreshes.remove(key);
    }
  }
}

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
  registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Serves eligible notices per scope, refreshing from the remote list when
/// the cached snapshot is stale.
///
/// At most one remote fetch runs per scope. Callers that arrive while a fetch
/// is running wait for that fetch instead of starting another; fetches for
/// different scopes run independently.
pub struct NoticeCache<S: KeyValueStore + 'static> {
  store: Arc<SnapshotStore<S>>,
  source: Arc<dyn NoticeSource>,
  clock: Arc<dyn Clock>,
  zone: ViewerZone,
  /// How long before cached data is considered stale
  stale_time: Duration,
  always_refresh: bool,
  in_flight: Arc<Mutex<Registry>>,
}

impl<S: KeyValueStore + 'static> NoticeCache<S> {
  /// Create a new cache over the given storage backend and notice source.
  pub fn new(storage: S, source: Arc<dyn NoticeSource>) -> Self {
    Self {
      store: Arc::new(SnapshotStore::new(storage)),
      source,
      clock: Arc::new(SystemClock),
      zone: ViewerZone::Local,
      stale_time: Duration::minutes(2),
      always_refresh: false,
      in_flight: Arc::new(Mutex::new(Registry::default())),
    }
  }

  /// Set the stale time for cached data.
  pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
    self.stale_time = stale_time;
    self
  }

  /// Ignore cache freshness and fetch on every request.
  pub fn with_always_refresh(mut self, always_refresh: bool) -> Self {
    self.always_refresh = always_refresh;
    self
  }

  /// Use `clock` for freshness checks and acknowledgment timestamps.
  pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
    self.clock = clock;
    self
  }

  /// Set the zone whose calendar days bound daily notices.
  pub fn with_zone(mut self, zone: ViewerZone) -> Self {
    self.zone = zone;
    self
  }

  /// Notices eligible for display in `scope` right now.
  ///
  /// 1. If the cached snapshot is fresh, reduce it without touching the network
  /// 2. Otherwise join the scope's running refresh, or start one
  /// 3. Reduce the refreshed snapshot
  ///
  /// Fetch failures are returned as is; nothing is retried.
  pub async fn current_notices(&self, scope: &Scope) -> Result<Vec<Notice>, FetchError> {
    let snapshot = self.store.load(scope);
    let now = self.clock.now();

    if !self.always_refresh && snapshot.is_fresh(now, self.stale_time) {
      debug!(scope = %scope.id, "serving notices from cache");
      return Ok(reduce(&snapshot, now, self.zone));
    }

    let refreshed = self.refresh(scope).await?;
    Ok(reduce(&refreshed, self.clock.now(), self.zone))
  }

  /// Fetch notices for `scope` and store them, sharing any fetch already
  /// running for the same scope.
  ///
  /// A refresh that finished after the caller found the cache stale is not
  /// repeated: the stored snapshot is checked again before a new fetch starts.
  async fn refresh(&self, scope: &Scope) -> RefreshResult {
    let pending = {
      let mut registry = lock(&self.in_flight);
      let key = scope.storage_key();

      match registry.refreshes.get(&key) {
        Some(entry) => {
          debug!(scope = %scope.id, "joining refresh in progress");
          entry.pending.clone()
        }
        None => {
          let snapshot = self.store.load(scope);
          if !self.always_refresh && snapshot.is_fresh(self.clock.now(), self.stale_time) {
            debug!(scope = %scope.id, "refreshed by an earlier request");
            return Ok(snapshot);
          }

          let generation = registry.next_generation;
          registry.next_generation += 1;

          let pending = self.spawn_refresh(scope.clone(), generation);
          registry.refreshes.insert(
            key,
            InFlight {
              generation,
              pending: pending.clone(),
            },
          );
          pending
        }
      }
    };

    pending.await
  }

  /// Record that the user dismissed notice `id` in `scope`.
  ///
  /// Local write only: no fetch, no re-evaluation of eligibility.
  pub fn acknowledge(&self, scope: &Scope, id: i64) {
    let now = self.clock.now();
    self.store.modify(scope, |snapshot| snapshot.acknowledge(id, now));
    debug!(scope = %scope.id, notice = id, "acknowledged notice");
  }

  /// The stored snapshot for `scope`, as is.
  pub fn snapshot(&self, scope: &Scope) -> CacheSnapshot {
    self.store.load(scope)
  }

  /// Run the fetch on its own task so it finishes even if every caller
  /// waiting on it goes away.
  fn spawn_refresh(&self, scope: Scope, generation: u64) -> PendingRefresh {
    let store = Arc::clone(&self.store);
    let source = Arc::clone(&self.source);
    let clock = Arc::clone(&self.clock);
    let registry = Arc::clone(&self.in_flight);
    let key = scope.storage_key();

    let task = {
      let registry = Arc::clone(&registry);
      let key = key.clone();
      tokio::spawn(async move {
        let result = fetch_and_store(&store, source.as_ref(), clock.as_ref(), &scope).await;
        lock(&registry).finish(&key, generation);
        result
      })
    };

    async move {
      match task.await {
        Ok(result) => result,
        Err(e) => {
          lock(&registry).finish(&key, generation);
          Err(FetchError::Aborted(e.to_string()))
        }
      }
    }
    .boxed()
    .shared()
  }
}

async fn fetch_and_store<S: KeyValueStore>(
  store: &SnapshotStore<S>,
  source: &dyn NoticeSource,
  clock: &dyn Clock,
  scope: &Scope,
) -> RefreshResult {
  let started: DateTime<Utc> = clock.now();
  debug!(scope = %scope.id, url = %scope.base_url, "fetching notices");

  let notices = source
    .fetch_active_notices(&scope.base_url, started)
    .await
    .inspect_err(|e| warn!(scope = %scope.id, error = %e, "failed to fetch notices"))?;

  // Re-read so acknowledgments written during the fetch are kept
  let loaded_at = clock.now();
  let snapshot = store.modify(scope, |snapshot| snapshot.replace_notices(notices, loaded_at));

  info!(
    scope = %scope.id,
    notices = snapshot.notices.len(),
    acknowledgments = snapshot.acknowledgments.len(),
    "refreshed notices"
  );

  Ok(snapshot)
}

impl<S: KeyValueStore + 'static> Clone for NoticeCache<S> {
  fn clone(&self) -> Self {
    Self {
      store: Arc::clone(&self.store),
      source: Arc::clone(&self.source),
      clock: Arc::clone(&self.clock),
      zone: self.zone,
      stale_time: self.stale_time,
      always_refresh: self.always_refresh,
      in_flight: Arc::clone(&self.in_flight),
    }
  }
}

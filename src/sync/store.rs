//! The listings synchronization store.

use color_eyre::Result;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::cancel::CancelToken;
use super::policy::{tokio_delay, DelayFn, SyncPolicy};
use crate::listings::{Listing, RawListing};

/// Remote collaborator that returns the full listings collection in one call.
pub trait ListingSource: Send + Sync + 'static {
  fn fetch_all(&self) -> impl Future<Output = Result<Vec<RawListing>>> + Send;
}

/// Read-only view of the cached collection handed to consumers.
#[derive(Debug, Clone)]
pub struct Snapshot {
  pub items: Arc<Vec<Listing>>,
  pub is_loading: bool,
}

impl Default for Snapshot {
  fn default() -> Self {
    Self {
      items: Arc::new(Vec::new()),
      is_loading: true,
    }
  }
}

/// The load sequence currently considered "in progress".
struct ActiveLoad {
  id: u64,
  token: CancelToken,
  watchdog: JoinHandle<()>,
}

struct Shared<S> {
  source: S,
  policy: SyncPolicy,
  delay: DelayFn,
  state: watch::Sender<Snapshot>,
  scope: CancelToken,
  active: Mutex<Option<ActiveLoad>>,
  next_id: AtomicU64,
}

impl<S> Shared<S> {
  fn lock_active(&self) -> MutexGuard<'_, Option<ActiveLoad>> {
    // Critical sections never panic midway, so a poisoned guard is still consistent
    self.active.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Apply a write unless `token` was cancelled. Runs under the channel's
  /// write lock, which is also where the scope gets cancelled.
  fn write_if_live(&self, token: &CancelToken, update: impl FnOnce(&mut Snapshot)) -> bool {
    self.state.send_if_modified(|snapshot| {
      if token.is_cancelled() {
        return false;
      }
      update(snapshot);
      true
    })
  }
}

/// Owns the client-side copy of the remote listings collection.
///
/// Cloning yields another handle to the same store.
pub struct SyncStore<S> {
  shared: Arc<Shared<S>>,
}

impl<S> Clone for SyncStore<S> {
  fn clone(&self) -> Self {
    Self {
      shared: Arc::clone(&self.shared),
    }
  }
}

impl<S: ListingSource> SyncStore<S> {
  /// Create an inactive store with an empty, loading snapshot.
  pub fn new(source: S, policy: SyncPolicy) -> Self {
    let (state, _rx) = watch::channel(Snapshot::default());
    Self {
      shared: Arc::new(Shared {
        source,
        policy,
        delay: tokio_delay(),
        state,
        scope: CancelToken::new(),
        active: Mutex::new(None),
        next_id: AtomicU64::new(0),
      }),
    }
  }

  /// Replace the pause used between retries.
  ///
  /// Must be called before the store is shared.
  pub fn with_delay(mut self, delay: DelayFn) -> Self {
    match Arc::get_mut(&mut self.shared) {
      Some(shared) => shared.delay = delay,
      None => warn!("with_delay called on a shared store, ignoring"),
    }
    self
  }

  /// Start the initial load. Called once by the owner.
  pub fn activate(&self) {
    info!("Activating listings store");
    self.begin_load();
  }

  /// Reload the collection and wait until it settles.
  ///
  /// If a load is already running no new fetch is made; this waits for the
  /// running one instead.
  pub async fn refresh(&self) {
    match self.begin_load() {
      Some(handle) => {
        if let Err(e) = handle.await {
          error!("Listings load task failed: {}", e);
        }
      }
      None => self.settled().await,
    }
  }

  /// Stop the store. Pending results are dropped and the current snapshot
  /// is left as is.
  pub fn deactivate(&self) {
    info!("Deactivating listings store");
    if let Some(load) = self.shared.lock_active().take() {
      load.watchdog.abort();
      load.token.cancel();
    }
    self.shared.state.send_if_modified(|_| {
      self.shared.scope.cancel();
      false
    });
  }

  pub fn is_active(&self) -> bool {
    !self.shared.scope.is_cancelled()
  }

  pub fn snapshot(&self) -> Snapshot {
    self.shared.state.borrow().clone()
  }

  pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
    self.shared.state.subscribe()
  }

  pub fn is_loading(&self) -> bool {
    self.shared.state.borrow().is_loading
  }

  /// Wait until nothing is loading, or the store is deactivated.
  async fn settled(&self) {
    let mut rx = self.subscribe();
    tokio::select! {
      _ = rx.wait_for(|snapshot| !snapshot.is_loading) => {}
      _ = self.shared.scope.cancelled() => {}
    }
  }

  /// Start a load sequence unless one is already in progress.
  fn begin_load(&self) -> Option<JoinHandle<()>> {
    let shared = &self.shared;
    if shared.scope.is_cancelled() {
      debug!("Store inactive, skipping load");
      return None;
    }

    let mut active = shared.lock_active();
    if active.is_some() {
      debug!("Listings load already in progress, skipping");
      return None;
    }

    let id = shared.next_id.fetch_add(1, Ordering::Relaxed);
    let token = shared.scope.child();
    shared.write_if_live(&token, |snapshot| snapshot.is_loading = true);

    let watchdog = tokio::spawn(watchdog(Arc::clone(shared), id));
    *active = Some(ActiveLoad {
      id,
      token: token.clone(),
      watchdog,
    });
    drop(active);

    debug!(load = id, "Starting listings load");
    Some(tokio::spawn(run_load(Arc::clone(shared), id, token)))
  }
}

/// Fetch with bounded retries, then publish the outcome.
async fn run_load<S: ListingSource>(shared: Arc<Shared<S>>, id: u64, token: CancelToken) {
  let policy = shared.policy;
  let mut attempt = 0u32;

  let items = loop {
    let fetched = tokio::select! {
      biased;
      _ = token.cancelled() => {
        debug!(load = id, attempt, "Listings load cancelled");
        return;
      }
      result = shared.source.fetch_all() => result,
    };

    match fetched {
      Ok(raw) => {
        info!(load = id, count = raw.len(), "Loaded listings");
        break raw.into_iter().map(Listing::from).collect::<Vec<_>>();
      }
      Err(e) if attempt < policy.max_retries => {
        attempt += 1;
        warn!(
          load = id,
          attempt,
          max_retries = policy.max_retries,
          "Failed to load listings, retrying: {}",
          e
        );
        tokio::select! {
          biased;
          _ = token.cancelled() => {
            debug!(load = id, attempt, "Listings load cancelled during backoff");
            return;
          }
          _ = (shared.delay)(policy.retry_delay) => {}
        }
      }
      Err(e) => {
        error!(load = id, "Giving up on listings after {} attempts: {}", attempt + 1, e);
        break Vec::new();
      }
    }
  };

  settle(&shared, id, items);
}

/// Finish load `id` if it is still the active one.
fn settle<S>(shared: &Shared<S>, id: u64, items: Vec<Listing>) {
  let mut active = shared.lock_active();
  match active.as_ref() {
    Some(load) if load.id == id => {}
    _ => {
      debug!(load = id, "Load was superseded, dropping result");
      return;
    }
  }
  let Some(load) = active.take() else {
    return;
  };
  load.watchdog.abort();

  let items = Arc::new(items);
  shared.write_if_live(&load.token, |snapshot| {
    snapshot.items = items;
    snapshot.is_loading = false;
  });
}

/// Force `is_loading` off if load `id` has not settled within the ceiling.
async fn watchdog<S>(shared: Arc<Shared<S>>, id: u64) {
  tokio::time::sleep(shared.policy.watchdog).await;

  let mut active = shared.lock_active();
  match active.as_ref() {
    Some(load) if load.id == id => {}
    _ => return,
  }
  let Some(load) = active.take() else {
    return;
  };
  warn!(
    load = id,
    "Listings load exceeded {:?}, forcing loading off", shared.policy.watchdog
  );

  // The scope token rather than the load token: the load is being cut off,
  // but the store itself is still live.
  shared.write_if_live(&shared.scope, |snapshot| snapshot.is_loading = false);
  load.token.cancel();
}

#[cfg(test)]
mod tests {
  use super::*;
  use color_eyre::eyre::eyre;
  use std::collections::VecDeque;
  use std::sync::atomic::AtomicUsize;
  use std::time::Duration;

  /// Scripted source: pops one response per call, optionally after a delay.
  struct ScriptedSource {
    calls: Arc<AtomicUsize>,
    responses: Mutex<VecDeque<Result<Vec<RawListing>>>>,
    latency: Duration,
  }

  impl ScriptedSource {
    fn new(responses: Vec<Result<Vec<RawListing>>>) -> (Self, Arc<AtomicUsize>) {
      let calls = Arc::new(AtomicUsize::new(0));
      let source = Self {
        calls: Arc::clone(&calls),
        responses: Mutex::new(responses.into()),
        latency: Duration::ZERO,
      };
      (source, calls)
    }

    fn with_latency(mut self, latency: Duration) -> Self {
      self.latency = latency;
      self
    }
  }

  impl ListingSource for ScriptedSource {
    async fn fetch_all(&self) -> Result<Vec<RawListing>> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      let next = self.responses.lock().unwrap().pop_front();
      if !self.latency.is_zero() {
        tokio::time::sleep(self.latency).await;
      }
      next.unwrap_or_else(|| Err(eyre!("no scripted response left")))
    }
  }

  /// Source whose fetch never completes.
  struct HangingSource;

  impl ListingSource for HangingSource {
    async fn fetch_all(&self) -> Result<Vec<RawListing>> {
      std::future::pending().await
    }
  }

  fn raw(id: &str, price: &str) -> RawListing {
    serde_json::from_value(serde_json::json!({
      "id": id,
      "title": format!("Listing {}", id),
      "address": "1 Main St",
      "price": price,
      "latitude": "40.5",
      "longitude": -73.25,
    }))
    .unwrap()
  }

  fn ids(snapshot: &Snapshot) -> Vec<&str> {
    snapshot.items.iter().map(|l| l.id.as_str()).collect()
  }

  #[tokio::test(start_paused = true)]
  async fn test_first_attempt_success_keeps_order_and_coerces() {
    let (source, calls) = ScriptedSource::new(vec![Ok(vec![
      raw("b", "1200"),
      raw("a", "950.50"),
      raw("c", "2000"),
    ])]);
    let store = SyncStore::new(source, SyncPolicy::default());

    assert!(store.is_loading());
    store.refresh().await;

    let snapshot = store.snapshot();
    assert!(!snapshot.is_loading);
    assert_eq!(ids(&snapshot), vec!["b", "a", "c"]);
    assert_eq!(snapshot.items[1].price, 950.5);
    let location = snapshot.items[0].location.unwrap();
    assert_eq!(location.latitude, 40.5);
    assert_eq!(location.longitude, -73.25);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn test_retries_are_transparent() {
    let (source, calls) = ScriptedSource::new(vec![
      Err(eyre!("503")),
      Err(eyre!("timeout")),
      Ok(vec![raw("x", "800")]),
    ]);
    let store = SyncStore::new(source, SyncPolicy::default());

    store.refresh().await;

    let snapshot = store.snapshot();
    assert!(!snapshot.is_loading);
    assert_eq!(ids(&snapshot), vec!["x"]);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
  }

  #[tokio::test(start_paused = true)]
  async fn test_exhausted_retries_fail_open_to_empty() {
    let (source, calls) = ScriptedSource::new(vec![
      Ok(vec![raw("old", "100")]),
      Err(eyre!("down")),
      Err(eyre!("down")),
      Err(eyre!("down")),
    ]);
    let store = SyncStore::new(source, SyncPolicy::default());

    store.refresh().await;
    assert_eq!(ids(&store.snapshot()), vec!["old"]);

    store.refresh().await;
    let snapshot = store.snapshot();
    assert!(snapshot.items.is_empty());
    assert!(!snapshot.is_loading);
    assert_eq!(calls.load(Ordering::SeqCst), 4);
  }

  #[tokio::test(start_paused = true)]
  async fn test_retry_uses_injected_delay() {
    let delays = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&delays);
    let delay: DelayFn = Arc::new(move |d| {
      recorded.lock().unwrap().push(d);
      Box::pin(async {})
    });

    let (source, _calls) = ScriptedSource::new(vec![Err(eyre!("a")), Err(eyre!("b")), Err(eyre!("c"))]);
    let policy = SyncPolicy {
      retry_delay: Duration::from_secs(7),
      ..SyncPolicy::default()
    };
    let store = SyncStore::new(source, policy).with_delay(delay);

    store.refresh().await;

    assert_eq!(*delays.lock().unwrap(), vec![Duration::from_secs(7); 2]);
  }

  #[tokio::test(start_paused = true)]
  async fn test_refresh_while_loading_is_coalesced() {
    let (source, calls) = ScriptedSource::new(vec![Ok(vec![raw("a", "1")]), Ok(vec![raw("b", "2")])]);
    let store = SyncStore::new(source.with_latency(Duration::from_secs(1)), SyncPolicy::default());

    store.activate();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // Waits for the running load instead of starting another
    store.refresh().await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(ids(&store.snapshot()), vec!["a"]);
    assert!(!store.is_loading());

    // Once settled, a new refresh fetches again
    store.refresh().await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(ids(&store.snapshot()), vec!["b"]);
  }

  #[tokio::test(start_paused = true)]
  async fn test_refresh_during_backoff_is_coalesced() {
    let (source, calls) = ScriptedSource::new(vec![
      Err(eyre!("503")),
      Err(eyre!("503")),
      Ok(vec![raw("a", "1")]),
      Ok(vec![raw("b", "2")]),
    ]);
    let store = SyncStore::new(source, SyncPolicy::default());

    store.activate();
    // First attempt failed, now sleeping before the retry
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(store.is_loading());

    store.refresh().await;
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(ids(&store.snapshot()), vec!["a"]);
    assert!(!store.is_loading());
  }

  #[tokio::test(start_paused = true)]
  async fn test_deactivate_during_backoff_stops_retries() {
    let (source, calls) = ScriptedSource::new(vec![Err(eyre!("503")), Ok(vec![raw("a", "1")])]);
    let store = SyncStore::new(source, SyncPolicy::default());

    store.activate();
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    store.deactivate();
    tokio::time::sleep(Duration::from_secs(60)).await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(store.snapshot().items.is_empty());
  }

  #[tokio::test(start_paused = true)]
  async fn test_late_result_after_deactivate_is_dropped() {
    let (source, calls) = ScriptedSource::new(vec![Ok(vec![raw("late", "1")])]);
    let store = SyncStore::new(source.with_latency(Duration::from_secs(5)), SyncPolicy::default());

    store.activate();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    store.deactivate();
    tokio::time::sleep(Duration::from_secs(30)).await;

    let snapshot = store.snapshot();
    assert!(snapshot.items.is_empty());
    assert!(snapshot.is_loading);
    assert!(!store.is_active());

    // Further loads are ignored and refresh does not hang
    store.refresh().await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn test_watchdog_clears_loading() {
    let policy = SyncPolicy::default();
    let store = SyncStore::new(HangingSource, policy);
    let mut rx = store.subscribe();

    let started = tokio::time::Instant::now();
    store.activate();
    assert!(store.is_loading());

    rx.wait_for(|snapshot| !snapshot.is_loading).await.unwrap();
    assert!(started.elapsed() <= policy.watchdog);
    assert!(store.snapshot().items.is_empty());
  }

  #[tokio::test(start_paused = true)]
  async fn test_watchdog_drops_result_of_cut_off_load() {
    let policy = SyncPolicy {
      watchdog: Duration::from_secs(2),
      ..SyncPolicy::default()
    };
    let (source, calls) = ScriptedSource::new(vec![Ok(vec![raw("slow", "1")]), Ok(vec![raw("fast", "1")])]);
    let store = SyncStore::new(source.with_latency(Duration::from_secs(3)), policy);

    store.activate();
    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert!(!store.is_loading());
    assert!(store.snapshot().items.is_empty());

    // A new load may start even though the first fetch never settled
    let refresh = tokio::spawn({
      let store = store.clone();
      async move { store.refresh().await }
    });
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(store.snapshot().items.is_empty());

    refresh.await.unwrap();
    // The second fetch also outlives its watchdog
    assert!(!store.is_loading());
    assert!(store.snapshot().items.is_empty());
  }

  #[tokio::test(start_paused = true)]
  async fn test_watchdog_disarmed_after_success() {
    let policy = SyncPolicy {
      watchdog: Duration::from_secs(2),
      ..SyncPolicy::default()
    };
    let (source, _calls) = ScriptedSource::new(vec![Ok(vec![raw("a", "1")])]);
    let store = SyncStore::new(source, policy);
    let mut rx = store.subscribe();

    store.refresh().await;
    rx.borrow_and_update();

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(!rx.has_changed().unwrap());
    assert_eq!(ids(&store.snapshot()), vec!["a"]);
  }
}

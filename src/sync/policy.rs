use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;

/// Retry and watchdog limits for a load sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncPolicy {
  /// Retries after the first attempt (2 means 3 attempts in total)
  pub max_retries: u32,
  /// Fixed pause between attempts
  pub retry_delay: Duration,
  /// Hard ceiling after which `is_loading` is forced off
  pub watchdog: Duration,
}

impl Default for SyncPolicy {
  fn default() -> Self {
    Self {
      max_retries: 2,
      retry_delay: Duration::from_millis(1500),
      watchdog: Duration::from_secs(20),
    }
  }
}

/// Pause used between retries. Swappable so tests do not wait on real time.
pub type DelayFn = Arc<dyn Fn(Duration) -> BoxFuture<'static, ()> + Send + Sync>;

pub fn tokio_delay() -> DelayFn {
  Arc::new(|duration| Box::pin(tokio::time::sleep(duration)))
}

//! Consumer side of the listings store.

use crate::sync::Snapshot;
use tokio::sync::watch;

/// Latest listings snapshot as seen by one view.
///
/// Views call [`SnapshotFeed::poll`] on every tick instead of awaiting, the
/// same way the render loop never blocks on I/O.
pub struct SnapshotFeed {
  rx: watch::Receiver<Snapshot>,
  current: Snapshot,
}

impl SnapshotFeed {
  pub fn new(mut rx: watch::Receiver<Snapshot>) -> Self {
    let current = rx.borrow_and_update().clone();
    Self { rx, current }
  }

  /// Take the newest snapshot if there is one. Returns true if it changed.
  pub fn poll(&mut self) -> bool {
    match self.rx.has_changed() {
      Ok(true) => {
        self.current = self.rx.borrow_and_update().clone();
        true
      }
      // Store dropped; keep showing the last snapshot
      Ok(false) | Err(_) => false,
    }
  }

  pub fn snapshot(&self) -> &Snapshot {
    &self.current
  }

  pub fn is_loading(&self) -> bool {
    self.current.is_loading
  }
}

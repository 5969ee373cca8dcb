//! Hierarchical cancellation tokens.
//!
//! A child token reports cancelled as soon as it or any of its ancestors is
//! cancelled. Cancelling a child never affects the parent.

use futures::future::select_all;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone)]
pub struct CancelToken {
  own: Arc<watch::Sender<bool>>,
  /// Ancestors, outermost first
  ancestors: Vec<Arc<watch::Sender<bool>>>,
}

impl Default for CancelToken {
  fn default() -> Self {
    Self::new()
  }
}

impl CancelToken {
  pub fn new() -> Self {
    let (tx, _rx) = watch::channel(false);
    Self {
      own: Arc::new(tx),
      ancestors: Vec::new(),
    }
  }

  /// Create a token that is cancelled together with this one.
  pub fn child(&self) -> Self {
    let (tx, _rx) = watch::channel(false);
    let mut ancestors = self.ancestors.clone();
    ancestors.push(Arc::clone(&self.own));
    Self {
      own: Arc::new(tx),
      ancestors,
    }
  }

  pub fn cancel(&self) {
    self.own.send_replace(true);
  }

  pub fn is_cancelled(&self) -> bool {
    self.chain().any(|tx| *tx.borrow())
  }

  /// Resolves once this token or any ancestor is cancelled.
  pub async fn cancelled(&self) {
    let waiters = self.chain().map(|tx| {
      let mut rx = tx.subscribe();
      Box::pin(async move {
        // The sender lives as long as the token, so this only returns on cancel
        let _ = rx.wait_for(|cancelled| *cancelled).await;
      })
    });
    select_all(waiters).await;
  }

  fn chain(&self) -> impl Iterator<Item = &Arc<watch::Sender<bool>>> {
    self.ancestors.iter().chain(std::iter::once(&self.own))
  }
}

mod listing_detail;
mod liked_list;
mod preferences;
mod stats;
mod swipe_deck;

pub use listing_detail::ListingDetailView;
pub use liked_list::LikedListView;
pub use preferences::PreferencesView;
pub use stats::StatsView;
pub use swipe_deck::SwipeDeckView;

use color_eyre::Result;
use tracing::warn;

/// Log a failed write and turn it into a footer message
fn failure_status<T>(action: &str, result: Result<T>) -> Option<String> {
  match result {
    Ok(_) => None,
    Err(e) => {
      warn!("{} failed: {}", action, e);
      Some(format!("{} failed: {}", action, e))
    }
  }
}

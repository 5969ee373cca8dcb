//! Liked listings, persisted locally with optimistic updates.
//!
//! The in-memory set changes first so views react immediately; the write to
//! SQLite follows, and if it fails the in-memory change is rolled back.

use color_eyre::{eyre::eyre, Result};
use rusqlite::params;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

use crate::db::Database;
use crate::listings::Listing;

#[derive(Clone)]
pub struct LikedListings {
  db: Arc<Database>,
  ids: Arc<Mutex<HashSet<String>>>,
}

impl LikedListings {
  /// Load the persisted set
  pub fn load(db: Arc<Database>) -> Result<Self> {
    let ids = {
      let conn = db.conn()?;
      let mut stmt = conn
        .prepare("SELECT listing_id FROM liked_listings")
        .map_err(|e| eyre!("Failed to prepare liked query: {}", e))?;
      let ids: HashSet<String> = stmt
        .query_map([], |row| row.get(0))
        .map_err(|e| eyre!("Failed to query liked listings: {}", e))?
        .collect::<rusqlite::Result<_>>()
        .map_err(|e| eyre!("Failed to read liked listings: {}", e))?;
      ids
    };
    debug!(count = ids.len(), "Loaded liked listings");

    Ok(Self {
      db,
      ids: Arc::new(Mutex::new(ids)),
    })
  }

  fn ids_mut(&self) -> MutexGuard<'_, HashSet<String>> {
    self.ids.lock().unwrap_or_else(PoisonError::into_inner)
  }

  pub fn contains(&self, listing_id: &str) -> bool {
    self.ids_mut().contains(listing_id)
  }

  pub fn count(&self) -> usize {
    self.ids_mut().len()
  }

  pub fn ids(&self) -> HashSet<String> {
    self.ids_mut().clone()
  }

  /// Returns true if the listing was not liked before
  pub fn like(&self, listing_id: &str) -> Result<bool> {
    if !self.ids_mut().insert(listing_id.to_string()) {
      return Ok(false);
    }
    self.persist(listing_id, true).map(|_| true)
  }

  /// Returns true if the listing was liked before
  pub fn unlike(&self, listing_id: &str) -> Result<bool> {
    if !self.ids_mut().remove(listing_id) {
      return Ok(false);
    }
    self.persist(listing_id, false).map(|_| true)
  }

  /// Flip the like state, returning the new state
  pub fn toggle(&self, listing_id: &str) -> Result<bool> {
    if self.contains(listing_id) {
      self.unlike(listing_id).map(|_| false)
    } else {
      self.like(listing_id).map(|_| true)
    }
  }

  /// Liked listings in the order they appear in `listings`
  pub fn filter(&self, listings: &[Listing]) -> Vec<Listing> {
    let ids = self.ids_mut();
    listings
      .iter()
      .filter(|l| ids.contains(&l.id))
      .cloned()
      .collect()
  }

  fn persist(&self, listing_id: &str, liked: bool) -> Result<()> {
    let written = self.write(listing_id, liked);
    if let Err(e) = &written {
      warn!(listing_id, liked, "Rolling back like: {}", e);
      let mut ids = self.ids_mut();
      if liked {
        ids.remove(listing_id);
      } else {
        ids.insert(listing_id.to_string());
      }
    }
    written
  }

  fn write(&self, listing_id: &str, liked: bool) -> Result<()> {
    let conn = self.db.conn()?;
    let sql = if liked {
      "INSERT OR IGNORE INTO liked_listings (listing_id) VALUES (?)"
    } else {
      "DELETE FROM liked_listings WHERE listing_id = ?"
    };
    conn
      .execute(sql, params![listing_id])
      .map_err(|e| eyre!("Failed to save like for {}: {}", listing_id, e))?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::listings::RawListing;

  fn listing(id: &str) -> Listing {
    let raw: RawListing = serde_json::from_value(serde_json::json!({ "id": id })).unwrap();
    Listing::from(raw)
  }

  fn liked() -> (LikedListings, Arc<Database>) {
    let db = Arc::new(Database::open_in_memory().unwrap());
    (LikedListings::load(Arc::clone(&db)).unwrap(), db)
  }

  #[test]
  fn test_like_and_unlike() {
    let (liked, _db) = liked();
    assert_eq!(liked.count(), 0);

    assert!(liked.like("a").unwrap());
    assert!(!liked.like("a").unwrap());
    assert!(liked.contains("a"));
    assert_eq!(liked.count(), 1);

    assert!(liked.unlike("a").unwrap());
    assert!(!liked.unlike("a").unwrap());
    assert!(!liked.contains("a"));
  }

  #[test]
  fn test_toggle_returns_new_state() {
    let (liked, _db) = liked();
    assert!(liked.toggle("x").unwrap());
    assert!(!liked.toggle("x").unwrap());
    assert!(liked.toggle("x").unwrap());
  }

  #[test]
  fn test_likes_survive_reload() {
    let (liked, db) = liked();
    liked.like("a").unwrap();
    liked.like("b").unwrap();
    liked.unlike("a").unwrap();

    let reloaded = LikedListings::load(db).unwrap();
    assert_eq!(reloaded.ids(), HashSet::from(["b".to_string()]));
  }

  #[test]
  fn test_failed_write_rolls_back() {
    let (liked, db) = liked();
    db.conn()
      .unwrap()
      .execute_batch("DROP TABLE liked_listings")
      .unwrap();

    assert!(liked.like("a").is_err());
    assert!(!liked.contains("a"));
  }

  #[test]
  fn test_filter_keeps_listing_order() {
    let (liked, _db) = liked();
    liked.like("c").unwrap();
    liked.like("a").unwrap();

    let listings = vec![listing("a"), listing("b"), listing("c")];
    let ids: Vec<String> = liked.filter(&listings).into_iter().map(|l| l.id).collect();
    assert_eq!(ids, vec!["a", "c"]);
  }
}

//! Swipe analytics: per-listing counters plus a timestamped event log.

use chrono::{DateTime, SecondsFormat, Utc};
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, OptionalExtension};
use std::sync::Arc;

use crate::db::Database;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
  View,
  SwipeRight,
  SwipeLeft,
  Share,
  /// A like withdrawn from the liked list
  Unlike,
}

impl MetricKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      MetricKind::View => "view",
      MetricKind::SwipeRight => "swipe_right",
      MetricKind::SwipeLeft => "swipe_left",
      MetricKind::Share => "share",
      MetricKind::Unlike => "unlike",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    match s {
      "view" => Some(MetricKind::View),
      "swipe_right" => Some(MetricKind::SwipeRight),
      "swipe_left" => Some(MetricKind::SwipeLeft),
      "share" => Some(MetricKind::Share),
      "unlike" => Some(MetricKind::Unlike),
      _ => None,
    }
  }

  /// Counter update applied to the listing's row
  fn counter_update(&self) -> &'static str {
    match self {
      MetricKind::View => "views = views + 1",
      MetricKind::SwipeRight => "swipe_rights = swipe_rights + 1",
      MetricKind::SwipeLeft => "swipe_lefts = swipe_lefts + 1",
      MetricKind::Share => "shares = shares + 1",
      MetricKind::Unlike => "swipe_rights = MAX(0, swipe_rights - 1)",
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingMetrics {
  pub listing_id: String,
  pub views: u32,
  pub swipe_rights: u32,
  pub swipe_lefts: u32,
  pub shares: u32,
}

impl ListingMetrics {
  /// Share of swipes that went right, if there were any swipes
  pub fn like_rate(&self) -> Option<f64> {
    let swipes = self.swipe_rights + self.swipe_lefts;
    (swipes > 0).then(|| self.swipe_rights as f64 / swipes as f64)
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricEvent {
  pub listing_id: String,
  pub kind: MetricKind,
  pub user_id: Option<String>,
  pub recorded_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct MetricsRecorder {
  db: Arc<Database>,
  user: Option<String>,
}

impl MetricsRecorder {
  pub fn new(db: Arc<Database>, user: Option<String>) -> Self {
    Self { db, user }
  }

  pub fn record(&self, listing_id: &str, kind: MetricKind) -> Result<()> {
    self.record_at(listing_id, kind, Utc::now())
  }

  fn record_at(&self, listing_id: &str, kind: MetricKind, at: DateTime<Utc>) -> Result<()> {
    let mut conn = self.db.conn()?;
    let tx = conn
      .transaction()
      .map_err(|e| eyre!("Failed to begin transaction: {}", e))?;

    tx.execute(
      "INSERT OR IGNORE INTO listing_metrics (listing_id) VALUES (?)",
      params![listing_id],
    )
    .map_err(|e| eyre!("Failed to create metrics row: {}", e))?;

    tx.execute(
      &format!(
        "UPDATE listing_metrics SET {} WHERE listing_id = ?",
        kind.counter_update()
      ),
      params![listing_id],
    )
    .map_err(|e| eyre!("Failed to update metrics: {}", e))?;

    tx.execute(
      "INSERT INTO metric_events (listing_id, kind, user_id, recorded_at) VALUES (?, ?, ?, ?)",
      params![listing_id, kind.as_str(), self.user, timestamp(at)],
    )
    .map_err(|e| eyre!("Failed to store metric event: {}", e))?;

    tx.commit()
      .map_err(|e| eyre!("Failed to commit transaction: {}", e))?;
    Ok(())
  }

  /// Counters for one listing (all zero if never seen)
  pub fn for_listing(&self, listing_id: &str) -> Result<ListingMetrics> {
    let conn = self.db.conn()?;
    let metrics = conn
      .query_row(
        "SELECT listing_id, views, swipe_rights, swipe_lefts, shares
         FROM listing_metrics WHERE listing_id = ?",
        params![listing_id],
        row_to_metrics,
      )
      .optional()
      .map_err(|e| eyre!("Failed to query metrics: {}", e))?;

    Ok(metrics.unwrap_or_else(|| ListingMetrics {
      listing_id: listing_id.to_string(),
      ..Default::default()
    }))
  }

  /// All counters, most liked first
  pub fn all(&self) -> Result<Vec<ListingMetrics>> {
    let conn = self.db.conn()?;
    let mut stmt = conn
      .prepare(
        "SELECT listing_id, views, swipe_rights, swipe_lefts, shares
         FROM listing_metrics
         ORDER BY swipe_rights DESC, views DESC, listing_id",
      )
      .map_err(|e| eyre!("Failed to prepare metrics query: {}", e))?;

    let rows = stmt
      .query_map([], row_to_metrics)
      .map_err(|e| eyre!("Failed to query metrics: {}", e))?
      .collect::<rusqlite::Result<Vec<_>>>()
      .map_err(|e| eyre!("Failed to read metrics: {}", e))?;
    Ok(rows)
  }

  /// Events recorded at or after `since`, oldest first
  pub fn events_since(&self, since: DateTime<Utc>) -> Result<Vec<MetricEvent>> {
    let conn = self.db.conn()?;
    let mut stmt = conn
      .prepare(
        "SELECT listing_id, kind, user_id, recorded_at FROM metric_events
         WHERE recorded_at >= ? ORDER BY recorded_at, id",
      )
      .map_err(|e| eyre!("Failed to prepare events query: {}", e))?;

    let rows = stmt
      .query_map(params![timestamp(since)], |row| {
        Ok((
          row.get::<_, String>(0)?,
          row.get::<_, String>(1)?,
          row.get::<_, Option<String>>(2)?,
          row.get::<_, String>(3)?,
        ))
      })
      .map_err(|e| eyre!("Failed to query events: {}", e))?
      .collect::<rusqlite::Result<Vec<_>>>()
      .map_err(|e| eyre!("Failed to read events: {}", e))?;

    rows
      .into_iter()
      .map(|(listing_id, kind, user_id, recorded_at)| {
        let kind = MetricKind::parse(&kind).ok_or_else(|| eyre!("Unknown metric kind '{}'", kind))?;
        let recorded_at = DateTime::parse_from_rfc3339(&recorded_at)
          .map_err(|e| eyre!("Failed to parse event time '{}': {}", recorded_at, e))?
          .with_timezone(&Utc);
        Ok(MetricEvent {
          listing_id,
          kind,
          user_id,
          recorded_at,
        })
      })
      .collect()
  }
}

/// Fixed-width UTC timestamps so text ordering matches time ordering
fn timestamp(at: DateTime<Utc>) -> String {
  at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn row_to_metrics(row: &rusqlite::Row<'_>) -> rusqlite::Result<ListingMetrics> {
  Ok(ListingMetrics {
    listing_id: row.get(0)?,
    views: row.get(1)?,
    swipe_rights: row.get(2)?,
    swipe_lefts: row.get(3)?,
    shares: row.get(4)?,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Duration;

  fn recorder() -> MetricsRecorder {
    let db = Arc::new(Database::open_in_memory().unwrap());
    MetricsRecorder::new(db, Some("renter1".to_string()))
  }

  #[test]
  fn test_counters_accumulate() {
    let metrics = recorder();
    metrics.record("a", MetricKind::View).unwrap();
    metrics.record("a", MetricKind::View).unwrap();
    metrics.record("a", MetricKind::SwipeRight).unwrap();
    metrics.record("a", MetricKind::SwipeLeft).unwrap();
    metrics.record("a", MetricKind::Share).unwrap();

    let a = metrics.for_listing("a").unwrap();
    assert_eq!(
      a,
      ListingMetrics {
        listing_id: "a".to_string(),
        views: 2,
        swipe_rights: 1,
        swipe_lefts: 1,
        shares: 1,
      }
    );
    assert_eq!(a.like_rate(), Some(0.5));
  }

  #[test]
  fn test_unlike_never_goes_negative() {
    let metrics = recorder();
    metrics.record("a", MetricKind::SwipeRight).unwrap();
    metrics.record("a", MetricKind::Unlike).unwrap();
    metrics.record("a", MetricKind::Unlike).unwrap();

    assert_eq!(metrics.for_listing("a").unwrap().swipe_rights, 0);
  }

  #[test]
  fn test_unknown_listing_is_zero() {
    let metrics = recorder();
    let m = metrics.for_listing("nope").unwrap();
    assert_eq!(m.views, 0);
    assert_eq!(m.like_rate(), None);
  }

  #[test]
  fn test_all_orders_by_likes() {
    let metrics = recorder();
    metrics.record("low", MetricKind::View).unwrap();
    metrics.record("high", MetricKind::SwipeRight).unwrap();
    metrics.record("high", MetricKind::SwipeRight).unwrap();
    metrics.record("mid", MetricKind::SwipeRight).unwrap();

    let ids: Vec<String> = metrics
      .all()
      .unwrap()
      .into_iter()
      .map(|m| m.listing_id)
      .collect();
    assert_eq!(ids, vec!["high", "mid", "low"]);
  }

  #[test]
  fn test_events_since() {
    let metrics = recorder();
    let now = Utc::now();
    metrics
      .record_at("old", MetricKind::View, now - Duration::days(3))
      .unwrap();
    metrics
      .record_at("new", MetricKind::SwipeRight, now - Duration::hours(1))
      .unwrap();
    metrics.record_at("new", MetricKind::Unlike, now).unwrap();

    let events = metrics.events_since(now - Duration::days(1)).unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].kind, MetricKind::SwipeRight);
    assert_eq!(events[1].kind, MetricKind::Unlike);
    assert_eq!(events[0].user_id.as_deref(), Some("renter1"));
    assert!(events.iter().all(|e| e.listing_id == "new"));
  }
}

//! Serde-deserializable types matching the backend's listings rows.
//!
//! Rows are loosely typed: numeric columns may come back as JSON numbers or
//! as strings (Postgres `numeric`), and optional columns may be null or
//! missing entirely. [`RawListing`] accepts all of that and the
//! `From<RawListing> for Listing` conversion does the coercion.

use serde::Deserialize;
use tracing::warn;

use super::types::{GeoPoint, Listing, Rating};

/// A number that may have been serialized as a string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum LooseNumber {
  Number(f64),
  Text(String),
}

impl LooseNumber {
  /// Finite numeric value, if any
  pub fn as_f64(&self) -> Option<f64> {
    let n = match self {
      LooseNumber::Number(n) => *n,
      LooseNumber::Text(s) => s.trim().parse().ok()?,
    };
    n.is_finite().then_some(n)
  }
}

/// Row identifiers are uuids on most deployments but numbers on some.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawId {
  Text(String),
  Integer(i64),
  Number(f64),
}

impl std::fmt::Display for RawId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      RawId::Text(s) => f.write_str(s),
      RawId::Integer(n) => write!(f, "{}", n),
      RawId::Number(n) => write!(f, "{}", n),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawListing {
  pub id: RawId,
  pub title: Option<String>,
  pub address: Option<String>,
  pub latitude: Option<LooseNumber>,
  pub longitude: Option<LooseNumber>,
  pub price: Option<LooseNumber>,
  pub bedrooms: Option<LooseNumber>,
  pub bathrooms: Option<LooseNumber>,
  pub sqft: Option<LooseNumber>,
  pub images: Option<Vec<Option<String>>>,
  pub amenities: Option<Vec<Option<String>>>,
  pub description: Option<String>,
  pub available_from: Option<String>,
  pub average_rating: Option<LooseNumber>,
  pub total_ratings: Option<LooseNumber>,
}

/// Decode rows one at a time so a malformed row only costs itself.
pub fn decode_rows(rows: Vec<serde_json::Value>) -> Vec<RawListing> {
  let total = rows.len();
  let decoded: Vec<RawListing> = rows
    .into_iter()
    .enumerate()
    .filter_map(|(index, row)| match serde_json::from_value(row) {
      Ok(raw) => Some(raw),
      Err(e) => {
        warn!(index, "Skipping malformed listing row: {}", e);
        None
      }
    })
    .collect();
  if decoded.len() < total {
    warn!(skipped = total - decoded.len(), total, "Some listing rows were skipped");
  }
  decoded
}

/// Zero, missing and unparseable values all count as absent.
fn truthy(value: &Option<LooseNumber>) -> Option<f64> {
  value.as_ref().and_then(LooseNumber::as_f64).filter(|n| *n != 0.0)
}

fn count(value: &Option<LooseNumber>) -> u32 {
  value
    .as_ref()
    .and_then(LooseNumber::as_f64)
    .map(|n| n.max(0.0).round() as u32)
    .unwrap_or(0)
}

/// Drop blank labels and repeats, keeping first-seen order.
fn dedup_labels(labels: Vec<Option<String>>) -> Vec<String> {
  let mut seen = std::collections::HashSet::new();
  labels
    .into_iter()
    .flatten()
    .map(|l| l.trim().to_string())
    .filter(|l| !l.is_empty() && seen.insert(l.to_lowercase()))
    .collect()
}

impl From<RawListing> for Listing {
  fn from(raw: RawListing) -> Self {
    let location = match (truthy(&raw.latitude), truthy(&raw.longitude)) {
      (Some(latitude), Some(longitude)) => Some(GeoPoint {
        latitude,
        longitude,
      }),
      _ => None,
    };

    let rating = truthy(&raw.average_rating).map(|average| Rating {
      average,
      count: count(&raw.total_ratings),
    });

    Listing {
      id: raw.id.to_string(),
      title: raw.title.unwrap_or_default(),
      address: raw.address.unwrap_or_default(),
      location,
      price: raw.price.as_ref().and_then(LooseNumber::as_f64).unwrap_or(0.0),
      bedrooms: count(&raw.bedrooms),
      bathrooms: raw
        .bathrooms
        .as_ref()
        .and_then(LooseNumber::as_f64)
        .map(|n| n.max(0.0) as f32)
        .unwrap_or(0.0),
      sqft: count(&raw.sqft),
      images: raw
        .images
        .unwrap_or_default()
        .into_iter()
        .flatten()
        .filter(|url| !url.trim().is_empty())
        .collect(),
      amenities: dedup_labels(raw.amenities.unwrap_or_default()),
      description: raw.description.unwrap_or_default(),
      available_from: raw.available_from.filter(|s| !s.trim().is_empty()),
      rating,
    }
  }
}

use serde::{Deserialize, Serialize};

/// A rental listing as shown to renters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
  pub id: String,
  pub title: String,
  pub address: String,
  pub location: Option<GeoPoint>,
  pub price: f64,
  pub bedrooms: u32,
  pub bathrooms: f32,
  pub sqft: u32,
  pub images: Vec<String>,
  pub amenities: Vec<String>,
  pub description: String,
  pub available_from: Option<String>,
  pub rating: Option<Rating>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
  pub latitude: f64,
  pub longitude: f64,
}

/// Aggregate review score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rating {
  pub average: f64,
  pub count: u32,
}

impl Listing {
  /// Case-insensitive match on title, address and amenities
  pub fn matches(&self, query: &str) -> bool {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
      return true;
    }
    self.title.to_lowercase().contains(&query)
      || self.address.to_lowercase().contains(&query)
      || self
        .amenities
        .iter()
        .any(|a| a.to_lowercase().contains(&query))
  }
}

use crate::listings::{Listing, Rating};
use ratatui::prelude::Color;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Monthly rent with thousands separators, e.g. `$2,450/mo`
pub fn format_price(price: f64) -> String {
  let whole = price.max(0.0).round() as u64;
  let digits = whole.to_string();
  let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
  for (i, c) in digits.chars().enumerate() {
    if i > 0 && (digits.len() - i) % 3 == 0 {
      grouped.push(',');
    }
    grouped.push(c);
  }
  format!("${}/mo", grouped)
}

/// One-line summary of rooms and size
pub fn format_layout(listing: &Listing) -> String {
  let mut parts = vec![
    match listing.bedrooms {
      0 => "Studio".to_string(),
      1 => "1 bed".to_string(),
      n => format!("{} beds", n),
    },
    format!("{} bath", listing.bathrooms),
  ];
  if listing.sqft > 0 {
    parts.push(format!("{} sqft", listing.sqft));
  }
  parts.join(" · ")
}

pub fn rating_label(rating: Option<&Rating>) -> String {
  match rating {
    Some(r) if r.count > 0 => format!("★ {:.1} ({})", r.average, r.count),
    Some(r) => format!("★ {:.1}", r.average),
    None => "No ratings yet".to_string(),
  }
}

/// Color for a price relative to the others in the deck
pub fn price_color(price: f64, median: f64) -> Color {
  if median <= 0.0 {
    Color::White
  } else if price <= median * 0.9 {
    Color::Green
  } else if price >= median * 1.1 {
    Color::Yellow
  } else {
    Color::White
  }
}

pub fn median_price(listings: &[&Listing]) -> f64 {
  let mut prices: Vec<f64> = listings.iter().map(|l| l.price).filter(|p| *p > 0.0).collect();
  if prices.is_empty() {
    return 0.0;
  }
  prices.sort_by(|a, b| a.total_cmp(b));
  let mid = prices.len() / 2;
  if prices.len() % 2 == 0 {
    (prices[mid - 1] + prices[mid]) / 2.0
  } else {
    prices[mid]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::listings::RawListing;

  fn listing(value: serde_json::Value) -> Listing {
    let raw: RawListing = serde_json::from_value(value).unwrap();
    Listing::from(raw)
  }

  #[test]
  fn test_truncate_short_string() {
    assert_eq!(truncate("hello", 10), "hello");
  }

  #[test]
  fn test_truncate_exact_length() {
    assert_eq!(truncate("hello", 5), "hello");
  }

  #[test]
  fn test_truncate_long_string() {
    assert_eq!(truncate("hello world", 8), "hello...");
  }

  #[test]
  fn test_truncate_multibyte() {
    assert_eq!(truncate("café au lait", 7), "café...");
  }

  #[test]
  fn test_format_price() {
    assert_eq!(format_price(950.0), "$950/mo");
    assert_eq!(format_price(2450.4), "$2,450/mo");
    assert_eq!(format_price(1234567.0), "$1,234,567/mo");
    assert_eq!(format_price(0.0), "$0/mo");
  }

  #[test]
  fn test_format_layout() {
    let studio = listing(serde_json::json!({ "id": "s", "bathrooms": 1 }));
    assert_eq!(format_layout(&studio), "Studio · 1 bath");

    let big = listing(serde_json::json!({ "id": "b", "bedrooms": 3, "bathrooms": "2.5", "sqft": 1400 }));
    assert_eq!(format_layout(&big), "3 beds · 2.5 bath · 1400 sqft");
  }

  #[test]
  fn test_rating_label() {
    let rated = Rating {
      average: 4.3,
      count: 8,
    };
    assert_eq!(rating_label(Some(&rated)), "★ 4.3 (8)");
    assert_eq!(rating_label(None), "No ratings yet");
  }

  #[test]
  fn test_median_and_color() {
    let a = listing(serde_json::json!({ "id": "a", "price": 1000 }));
    let b = listing(serde_json::json!({ "id": "b", "price": 2000 }));
    let c = listing(serde_json::json!({ "id": "c", "price": 3000 }));
    let median = median_price(&[&a, &b, &c]);
    assert_eq!(median, 2000.0);
    assert_eq!(price_color(a.price, median), Color::Green);
    assert_eq!(price_color(b.price, median), Color::White);
    assert_eq!(price_color(c.price, median), Color::Yellow);
    assert_eq!(price_color(500.0, 0.0), Color::White);
  }
}

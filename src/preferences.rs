//! Renter preferences: home address and how they plan to commute.

use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::db::Database;

const ADDRESS_KEY: &str = "address";
const COMMUTE_KEY: &str = "commute";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommuteMode {
  Car,
  PublicTransit,
  Walk,
  Bike,
}

impl CommuteMode {
  /// Display order, also the order selections are kept in
  pub const ALL: [CommuteMode; 4] = [
    CommuteMode::Car,
    CommuteMode::PublicTransit,
    CommuteMode::Walk,
    CommuteMode::Bike,
  ];

  pub fn label(&self) -> &'static str {
    match self {
      CommuteMode::Car => "Car",
      CommuteMode::PublicTransit => "Public Transit",
      CommuteMode::Walk => "Walk",
      CommuteMode::Bike => "Bike",
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Preferences {
  pub address: Option<String>,
  pub commute: Vec<CommuteMode>,
}

impl Preferences {
  pub fn commute_label(&self) -> String {
    commute_label(&self.commute)
  }
}

pub fn commute_label(modes: &[CommuteMode]) -> String {
  if modes.is_empty() {
    return "None".to_string();
  }
  modes.iter().map(CommuteMode::label).collect::<Vec<_>>().join(", ")
}

/// Add or remove `mode`, keeping the selection in display order
pub fn toggle_mode(selection: &mut Vec<CommuteMode>, mode: CommuteMode) {
  if let Some(pos) = selection.iter().position(|m| *m == mode) {
    selection.remove(pos);
  } else {
    selection.push(mode);
    selection.sort_by_key(|m| CommuteMode::ALL.iter().position(|a| a == m));
  }
}

/// Replacing an existing, different choice needs an explicit confirm.
/// A first-time choice does not.
pub fn needs_confirmation(saved: &[CommuteMode], draft: &[CommuteMode]) -> bool {
  if saved.is_empty() {
    return false;
  }
  let mut a = saved.to_vec();
  let mut b = draft.to_vec();
  a.sort_by_key(|m| m.label());
  b.sort_by_key(|m| m.label());
  a != b
}

/// Reads and writes [`Preferences`] in the local database
#[derive(Clone)]
pub struct PreferencesStore {
  db: Arc<Database>,
}

impl PreferencesStore {
  pub fn new(db: Arc<Database>) -> Self {
    Self { db }
  }

  pub fn load(&self) -> Result<Preferences> {
    let address = self.get(ADDRESS_KEY)?.filter(|a| !a.trim().is_empty());
    let commute = match self.get(COMMUTE_KEY)? {
      Some(json) => parse_commute(&json),
      None => Vec::new(),
    };
    Ok(Preferences { address, commute })
  }

  /// Store the address; blank clears it
  pub fn set_address(&self, address: &str) -> Result<()> {
    let address = address.trim();
    if address.is_empty() {
      let conn = self.db.conn()?;
      conn
        .execute("DELETE FROM preferences WHERE key = ?", params![ADDRESS_KEY])
        .map_err(|e| eyre!("Failed to clear address: {}", e))?;
      return Ok(());
    }
    self.put(ADDRESS_KEY, address)
  }

  /// Store the commute selection. At least one mode is required.
  pub fn set_commute(&self, modes: &[CommuteMode]) -> Result<()> {
    if modes.is_empty() {
      return Err(eyre!("Pick at least one way to commute"));
    }
    let json = serde_json::to_string(modes).map_err(|e| eyre!("Failed to encode commute: {}", e))?;
    self.put(COMMUTE_KEY, &json)
  }

  fn get(&self, key: &str) -> Result<Option<String>> {
    let conn = self.db.conn()?;
    conn
      .query_row("SELECT value FROM preferences WHERE key = ?", params![key], |row| row.get(0))
      .optional()
      .map_err(|e| eyre!("Failed to read preference {}: {}", key, e))
  }

  fn put(&self, key: &str, value: &str) -> Result<()> {
    let conn = self.db.conn()?;
    conn
      .execute(
        "INSERT INTO preferences (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        params![key, value],
      )
      .map_err(|e| eyre!("Failed to save preference {}: {}", key, e))?;
    debug!(key, "Saved preference");
    Ok(())
  }
}

/// Unknown or malformed entries are skipped rather than failing the load
fn parse_commute(json: &str) -> Vec<CommuteMode> {
  let values: Vec<serde_json::Value> = match serde_json::from_str(json) {
    Ok(values) => values,
    Err(e) => {
      warn!("Ignoring unreadable commute preference: {}", e);
      return Vec::new();
    }
  };
  let mut modes = Vec::new();
  for value in values {
    match serde_json::from_value::<CommuteMode>(value) {
      Ok(mode) if !modes.contains(&mode) => toggle_mode(&mut modes, mode),
      Ok(_) => {}
      Err(e) => warn!("Skipping unknown commute mode: {}", e),
    }
  }
  modes
}

#[cfg(test)]
mod tests {
  use super::*;

  fn store() -> (PreferencesStore, Arc<Database>) {
    let db = Arc::new(Database::open_in_memory().unwrap());
    (PreferencesStore::new(Arc::clone(&db)), db)
  }

  #[test]
  fn test_empty_by_default() {
    let (prefs, _db) = store();
    assert_eq!(prefs.load().unwrap(), Preferences::default());
    assert_eq!(prefs.load().unwrap().commute_label(), "None");
  }

  #[test]
  fn test_save_and_reload() {
    let (prefs, db) = store();
    prefs.set_address("  221B Baker St ").unwrap();
    prefs
      .set_commute(&[CommuteMode::PublicTransit, CommuteMode::Bike])
      .unwrap();

    let loaded = PreferencesStore::new(db).load().unwrap();
    assert_eq!(loaded.address.as_deref(), Some("221B Baker St"));
    assert_eq!(loaded.commute, vec![CommuteMode::PublicTransit, CommuteMode::Bike]);
    assert_eq!(loaded.commute_label(), "Public Transit, Bike");
  }

  #[test]
  fn test_commute_is_stored_as_kebab_case_json() {
    let (prefs, _db) = store();
    prefs.set_commute(&[CommuteMode::PublicTransit]).unwrap();
    assert_eq!(prefs.get(COMMUTE_KEY).unwrap().as_deref(), Some(r#"["public-transit"]"#));
  }

  #[test]
  fn test_blank_address_clears() {
    let (prefs, _db) = store();
    prefs.set_address("1 Elm").unwrap();
    prefs.set_address("   ").unwrap();
    assert!(prefs.load().unwrap().address.is_none());
  }

  #[test]
  fn test_empty_commute_rejected() {
    let (prefs, _db) = store();
    prefs.set_commute(&[CommuteMode::Walk]).unwrap();
    assert!(prefs.set_commute(&[]).is_err());
    assert_eq!(prefs.load().unwrap().commute, vec![CommuteMode::Walk]);
  }

  #[test]
  fn test_unknown_stored_modes_are_skipped() {
    assert_eq!(
      parse_commute(r#"["bike", "teleport", 3, "car", "bike"]"#),
      vec![CommuteMode::Car, CommuteMode::Bike]
    );
    assert!(parse_commute("not json").is_empty());
  }

  #[test]
  fn test_toggle_keeps_display_order() {
    let mut selection = Vec::new();
    toggle_mode(&mut selection, CommuteMode::Bike);
    toggle_mode(&mut selection, CommuteMode::Car);
    assert_eq!(selection, vec![CommuteMode::Car, CommuteMode::Bike]);
    toggle_mode(&mut selection, CommuteMode::Bike);
    assert_eq!(selection, vec![CommuteMode::Car]);
  }

  #[test]
  fn test_confirmation_only_when_changing_existing_choice() {
    use CommuteMode::*;
    assert!(!needs_confirmation(&[], &[Car]));
    assert!(!needs_confirmation(&[Car, Walk], &[Walk, Car]));
    assert!(needs_confirmation(&[Car], &[Car, Bike]));
  }
}

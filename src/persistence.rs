//! Snapshot persistence for the cart store.
//!
//! The store writes a full [`CartSnapshot`] after every transition through a
//! [`CartPersistence`] port and reads it once when opened.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use crate::domain::aggregates::cart::{CartLine, CartState};
use crate::domain::events::CartEvent;
use crate::domain::value_objects::{lenient, Region};

/// Well-known key the snapshot is stored under.
pub const SNAPSHOT_KEY: &str = "cartState";
pub const SNAPSHOT_VERSION: u32 = 1;

fn current_version() -> u32 { SNAPSHOT_VERSION }

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSnapshot {
    /// Snapshots written before versioning carry no tag and read as version 1.
    #[serde(default = "current_version")]
    pub version: u32,
    #[serde(default, alias = "products")]
    pub lines: Vec<CartLine>,
    #[serde(default)]
    pub selected_items: u32,
    #[serde(default, alias = "totalPrice")]
    pub subtotal: Decimal,
    #[serde(default, alias = "shippingFee")]
    pub shipping_fee_hint: Decimal,
    /// Older snapshots stored the shopper's country name instead.
    #[serde(default, alias = "country", deserialize_with = "lenient::region")]
    pub region: Region,
    #[serde(default = "Utc::now")]
    pub saved_at: DateTime<Utc>,
}

impl CartSnapshot {
    pub fn capture(state: &CartState) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            lines: state.lines().to_vec(),
            selected_items: state.selected_items(),
            subtotal: state.subtotal(),
            shipping_fee_hint: state.shipping_fee_hint(),
            region: state.region(),
            saved_at: Utc::now(),
        }
    }

    /// Rebuilds the state from the stored lines. Stored totals are ignored and
    /// recomputed by the normalization pass.
    pub fn into_state(self) -> (CartState, Vec<CartEvent>) {
        CartState::restore(self.lines, self.region)
    }

    pub fn decode(raw: &str) -> Result<Self, PersistenceError> {
        let snapshot: Self = serde_json::from_str(raw)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(PersistenceError::UnsupportedVersion(snapshot.version));
        }
        Ok(snapshot)
    }

    pub fn encode(&self) -> Result<String, PersistenceError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("snapshot io: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot encoding: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u32),

    #[error("snapshot slot lock poisoned")]
    Poisoned,
}

/// Load/save port the cart store is constructed with.
pub trait CartPersistence: Send {
    fn load(&self) -> Result<Option<CartSnapshot>, PersistenceError>;
    fn save(&self, snapshot: &CartSnapshot) -> Result<(), PersistenceError>;
}

/// Keeps the encoded snapshot in memory. Clones share the same slot.
#[derive(Clone, Debug, Default)]
pub struct InMemoryPersistence {
    slot: Arc<Mutex<Option<String>>>,
}

impl InMemoryPersistence {
    pub fn new() -> Self { Self::default() }

    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self { slot: Arc::new(Mutex::new(Some(raw.into()))) }
    }

    /// The encoded snapshot as last written.
    pub fn raw(&self) -> Option<String> {
        self.slot.lock().ok().and_then(|s| s.clone())
    }
}

impl CartPersistence for InMemoryPersistence {
    fn load(&self) -> Result<Option<CartSnapshot>, PersistenceError> {
        let slot = self.slot.lock().map_err(|_| PersistenceError::Poisoned)?;
        slot.as_deref().map(CartSnapshot::decode).transpose()
    }

    fn save(&self, snapshot: &CartSnapshot) -> Result<(), PersistenceError> {
        let encoded = snapshot.encode()?;
        *self.slot.lock().map_err(|_| PersistenceError::Poisoned)? = Some(encoded);
        Ok(())
    }
}

/// One JSON file per cart, replaced atomically on save.
#[derive(Clone, Debug)]
pub struct JsonFilePersistence {
    path: PathBuf,
}

impl JsonFilePersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<dir>/<owner>.cartState.json`
    pub fn in_dir(dir: &Path, owner: &str) -> Self {
        Self::new(dir.join(format!("{owner}.{SNAPSHOT_KEY}.json")))
    }

    pub fn path(&self) -> &Path { &self.path }
}

impl CartPersistence for JsonFilePersistence {
    fn load(&self) -> Result<Option<CartSnapshot>, PersistenceError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => CartSnapshot::decode(&raw).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, snapshot: &CartSnapshot) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, snapshot.encode()?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(qty: u32) -> CartLine {
        CartLine { product_id: "P1".into(), unit_price: Decimal::new(325, 2), quantity: qty, stock: Some(10), ..CartLine::default() }
    }

    #[test]
    fn test_snapshot_round_trip_in_memory() {
        let (state, _) = CartState::restore(vec![line(3)], Region::Emirates);
        let port = InMemoryPersistence::new();
        port.save(&CartSnapshot::capture(&state)).unwrap();
        assert!(port.raw().unwrap().contains("\"version\":1"));

        let (restored, events) = port.load().unwrap().unwrap().into_state();
        assert!(events.is_empty());
        assert_eq!(restored, state);
    }

    #[test]
    fn test_unversioned_legacy_snapshot() {
        let raw = r#"{"products":[{"_id":"P1","price":2,"quantity":"2","stock":1}],"selectedItems":2,"totalPrice":4}"#;
        let (state, _) = CartSnapshot::decode(raw).unwrap().into_state();
        assert_eq!(state.lines()[0].quantity, 1);
        assert_eq!(state.subtotal(), Decimal::from(2));
    }

    #[test]
    fn test_legacy_country_maps_to_region() {
        let raw = r#"{"products":[],"country":"الإمارات"}"#;
        assert_eq!(CartSnapshot::decode(raw).unwrap().region, Region::Emirates);
        let raw = r#"{"products":[],"country":"دول الخليج"}"#;
        assert_eq!(CartSnapshot::decode(raw).unwrap().region, Region::Gulf);
        let raw = r#"{"lines":[],"region":"emirates"}"#;
        assert_eq!(CartSnapshot::decode(raw).unwrap().region, Region::Emirates);
        let raw = r#"{"lines":[],"region":"atlantis"}"#;
        assert_eq!(CartSnapshot::decode(raw).unwrap().region, Region::Oman);
    }

    #[test]
    fn test_future_version_rejected() {
        let port = InMemoryPersistence::with_raw(r#"{"version":7,"lines":[]}"#);
        assert!(matches!(port.load(), Err(PersistenceError::UnsupportedVersion(7))));
    }

    #[test]
    fn test_json_file_persistence() {
        let dir = tempfile::tempdir().unwrap();
        let port = JsonFilePersistence::in_dir(dir.path(), "session-1");
        assert!(port.load().unwrap().is_none());

        let (state, _) = CartState::restore(vec![line(4)], Region::Oman);
        port.save(&CartSnapshot::capture(&state)).unwrap();
        assert!(port.path().ends_with("session-1.cartState.json"));
        let loaded = port.load().unwrap().unwrap();
        assert_eq!(loaded.lines, state.lines());
        assert_eq!(loaded.subtotal, Decimal::new(1300, 2));
    }
}

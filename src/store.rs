//! Cart store: the one owner of the cart state.
//!
//! Every transition mutates the state, runs the full normalization pass,
//! then writes a snapshot through the persistence port. A failed write is
//! logged and otherwise ignored; the in-memory state stays authoritative.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use crate::domain::aggregates::cart::{CartLine, CartState};
use crate::domain::events::CartEvent;
use crate::domain::reservation::line_ceiling;
use crate::domain::stock::clamp_to;
use crate::domain::value_objects::Region;
use crate::domain::variant::{VariantSelection, VariantSource};
use crate::persistence::{CartPersistence, CartSnapshot};

/// What `remove` does when the selector names a bare product id.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemovePolicy {
    /// Drop every line of that product, whatever its variant. Also lets
    /// `update_quantity` fall back to the first line of the product.
    #[default]
    Legacy,
    /// Only the line whose variant key matches exactly.
    Exact,
}

impl std::str::FromStr for RemovePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "legacy" => Ok(Self::Legacy),
            "exact" => Ok(Self::Exact),
            other => Err(format!("unknown remove policy `{other}`")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuantityChange {
    Increment,
    Decrement,
}

pub struct CartStore<P: CartPersistence> {
    state: CartState,
    persistence: P,
    remove_policy: RemovePolicy,
    events: Vec<CartEvent>,
}

impl<P: CartPersistence> CartStore<P> {
    /// Restores the persisted snapshot, or starts an empty cart in `region`
    /// when there is none or it cannot be read.
    pub fn open(persistence: P, region: Region, remove_policy: RemovePolicy) -> Self {
        let (state, events) = match persistence.load() {
            Ok(Some(snapshot)) => snapshot.into_state(),
            Ok(None) => (CartState::new(region), Vec::new()),
            Err(e) => {
                warn!(error = %e, "failed to load cart snapshot, starting empty");
                (CartState::new(region), Vec::new())
            }
        };
        if !events.is_empty() {
            info!(adjusted = events.len(), "restored cart adjusted to current stock");
        }
        Self { state, persistence, remove_policy, events }
    }

    pub fn state(&self) -> &CartState { &self.state }
    pub fn snapshot(&self) -> CartSnapshot { CartSnapshot::capture(&self.state) }
    pub fn take_events(&mut self) -> Vec<CartEvent> { std::mem::take(&mut self.events) }

    /// Adds `requested` of `item`'s variant. Returns the line's quantity
    /// afterwards, or `None` when the variant has no stock left.
    pub fn add(&mut self, item: CartLine, requested: u32) -> Option<u32> {
        let requested = requested.max(1);
        let key = item.variant_key();

        match self.state.lines().iter().position(|l| l.variant_key() == key) {
            Some(at) => {
                self.state.lines_mut()[at].absorb_ledger(&item);
                let lines = self.state.lines();
                let ceiling = line_ceiling(&lines[at], &lines[..at]);
                let from = lines[at].quantity;
                let desired = from.saturating_add(requested);
                let granted = clamp_to(desired, ceiling);
                if granted < desired {
                    self.events.push(CartEvent::LineClamped { key: key.clone(), requested: desired, granted });
                }
                // A ceiling of zero is left for normalization to drop.
                if granted != from && granted > 0 {
                    self.events.push(CartEvent::QuantityChanged { key: key.clone(), from, to: granted });
                    self.state.lines_mut()[at].quantity = granted;
                }
            }
            None => {
                let ceiling = line_ceiling(&item, self.state.lines());
                if ceiling == Some(0) {
                    debug!(%key, requested, "variant sold out, nothing added");
                    self.events.push(CartEvent::LineDropped { key, quantity: requested });
                    return None;
                }
                let granted = clamp_to(requested, ceiling);
                if granted < requested {
                    self.events.push(CartEvent::LineClamped { key: key.clone(), requested, granted });
                }
                self.events.push(CartEvent::LineAdded { key: key.clone(), quantity: granted });
                self.state.lines_mut().push(CartLine { quantity: granted, ..item });
            }
        }

        self.commit();
        self.state.line(&key).map(|l| l.quantity)
    }

    /// Steps a line's quantity by one. Increments stop at the stock ceiling
    /// left by earlier lines, decrements stop at one. A step that cannot move
    /// the quantity changes nothing. Returns `None` when no line matches.
    pub fn update_quantity(&mut self, selection: &VariantSelection, change: QuantityChange) -> Option<u32> {
        let at = self.locate(selection)?;
        let lines = self.state.lines();
        let line = &lines[at];
        let key = line.variant_key();
        let from = line.quantity;
        let to = match change {
            QuantityChange::Increment => clamp_to(from.saturating_add(1), line_ceiling(line, &lines[..at])).max(from),
            QuantityChange::Decrement => from.saturating_sub(1).max(1),
        };
        if to == from {
            debug!(%key, ?change, "quantity change had no effect");
            return Some(from);
        }
        self.state.lines_mut()[at].quantity = to;
        self.events.push(CartEvent::QuantityChanged { key: key.clone(), from, to });
        self.commit();
        self.state.line(&key).map(|l| l.quantity)
    }

    /// Removes the matching line, or under [`RemovePolicy::Legacy`] every line
    /// of the product when the selector has no variant dimensions. Returns how
    /// many lines went.
    pub fn remove(&mut self, selection: &VariantSelection) -> usize {
        let key = selection.variant_key();
        let product_wide = self.remove_policy == RemovePolicy::Legacy && !selection.has_dimensions();
        let (removed, kept): (Vec<CartLine>, Vec<CartLine>) = std::mem::take(self.state.lines_mut())
            .into_iter()
            .partition(|l| l.variant_key() == key || (product_wide && l.product_id.trim() == key.product_id));
        *self.state.lines_mut() = kept;

        for line in &removed {
            self.events.push(CartEvent::LineRemoved { key: line.variant_key(), quantity: line.quantity });
        }
        self.commit();
        removed.len()
    }

    pub fn clear(&mut self) {
        self.state.clear();
        self.events.push(CartEvent::Cleared);
        self.commit();
    }

    pub fn set_region(&mut self, region: Region) {
        let from = self.state.region();
        self.state.set_region(region);
        if from != region {
            self.events.push(CartEvent::RegionChanged { from, to: region });
        }
        self.commit();
    }

    fn locate(&self, selection: &VariantSelection) -> Option<usize> {
        let key = selection.variant_key();
        let lines = self.state.lines();
        lines.iter().position(|l| l.variant_key() == key).or_else(|| {
            (self.remove_policy == RemovePolicy::Legacy && !selection.has_dimensions())
                .then(|| lines.iter().position(|l| l.product_id.trim() == key.product_id))
                .flatten()
        })
    }

    fn commit(&mut self) {
        let adjustments = self.state.normalize();
        self.events.extend(adjustments);
        if let Err(e) = self.persistence.save(&CartSnapshot::capture(&self.state)) {
            warn!(error = %e, "failed to persist cart snapshot");
        }
    }
}

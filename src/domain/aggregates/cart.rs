//! Cart Aggregate

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;
use crate::domain::events::CartEvent;
use crate::domain::reservation::line_ceiling;
use crate::domain::stock::{clamp_to, StockLedger};
use crate::domain::value_objects::{lenient, saturating_add, Money, Region};
use crate::domain::variant::{VariantKey, VariantSource};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    #[serde(alias = "_id", alias = "id")]
    pub product_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, alias = "price")]
    pub unit_price: Decimal,
    #[serde(default = "lenient::default_quantity", deserialize_with = "lenient::quantity")]
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chosen_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chosen_size: Option<String>,
    #[serde(default, alias = "optionLabel", skip_serializing_if = "Option::is_none")]
    pub chosen_option_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chosen_count: Option<String>,
    #[serde(default, deserialize_with = "lenient::stock", skip_serializing_if = "Option::is_none")]
    pub color_stock: Option<u32>,
    #[serde(default, deserialize_with = "lenient::stock", skip_serializing_if = "Option::is_none")]
    pub option_stock: Option<u32>,
    #[serde(default, deserialize_with = "lenient::stock", skip_serializing_if = "Option::is_none")]
    pub max_stock: Option<u32>,
    #[serde(default, deserialize_with = "lenient::stock", skip_serializing_if = "Option::is_none")]
    pub stock: Option<u32>,
}

impl CartLine {
    pub fn ledger(&self) -> StockLedger {
        StockLedger {
            max_stock: self.max_stock,
            color_stock: self.color_stock,
            option_stock: self.option_stock,
            base_stock: self.stock,
        }
    }

    pub fn line_total(&self) -> Money { Money::base(self.unit_price).multiply(self.quantity) }

    /// Fills stock figures this line lacks from another reading of the same variant.
    pub(crate) fn absorb_ledger(&mut self, other: &CartLine) {
        self.color_stock = self.color_stock.or(other.color_stock);
        self.option_stock = self.option_stock.or(other.option_stock);
        self.max_stock = self.max_stock.or(other.max_stock);
        self.stock = self.stock.or(other.stock);
    }
}

impl VariantSource for CartLine {
    fn product_id(&self) -> &str { &self.product_id }
    fn color(&self) -> Option<&str> { self.chosen_color.as_deref() }
    fn size(&self) -> Option<&str> { self.chosen_size.as_deref() }
    fn option_label(&self) -> Option<&str> { self.chosen_option_label.as_deref() }
    fn count_label(&self) -> Option<&str> { self.chosen_count.as_deref() }
}

/// Ordered cart lines plus the totals derived from them. Line order is the
/// priority order for stock reservation: earlier lines keep their stock.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CartState {
    lines: Vec<CartLine>,
    region: Region,
    selected_items: u32,
    subtotal: Decimal,
    shipping_fee_hint: Decimal,
}

impl CartState {
    pub fn new(region: Region) -> Self {
        Self { region, shipping_fee_hint: region.shipping_fee_hint(), ..Self::default() }
    }

    /// Restores a state from raw lines; the result is already normalized.
    pub fn restore(lines: Vec<CartLine>, region: Region) -> (Self, Vec<CartEvent>) {
        let mut state = Self { lines, ..Self::new(region) };
        let events = state.normalize();
        (state, events)
    }

    pub fn lines(&self) -> &[CartLine] { &self.lines }
    pub fn region(&self) -> Region { self.region }
    pub fn selected_items(&self) -> u32 { self.selected_items }
    pub fn subtotal(&self) -> Decimal { self.subtotal }
    pub fn shipping_fee_hint(&self) -> Decimal { self.shipping_fee_hint }
    pub fn is_empty(&self) -> bool { self.lines.is_empty() }

    pub fn line(&self, key: &VariantKey) -> Option<&CartLine> {
        self.lines.iter().find(|l| &l.variant_key() == key)
    }

    pub(crate) fn lines_mut(&mut self) -> &mut Vec<CartLine> { &mut self.lines }

    pub(crate) fn set_region(&mut self, region: Region) {
        self.region = region;
        self.shipping_fee_hint = region.shipping_fee_hint();
    }

    /// Full re-normalization pass: merge lines that share a variant key,
    /// clamp each line (in order) to what earlier lines left of its stock,
    /// drop lines that have nothing left, then recompute the totals.
    /// Running it on an already normalized state changes nothing.
    pub fn normalize(&mut self) -> Vec<CartEvent> {
        let mut events = Vec::new();
        let mut kept: Vec<CartLine> = Vec::with_capacity(self.lines.len());

        for mut line in merge_lines(std::mem::take(&mut self.lines)) {
            let key = line.variant_key();
            let ceiling = line_ceiling(&line, &kept);
            if ceiling == Some(0) {
                debug!(%key, quantity = line.quantity, "dropping sold out cart line");
                events.push(CartEvent::LineDropped { key, quantity: line.quantity });
                continue;
            }
            let granted = clamp_to(line.quantity.max(1), ceiling);
            if granted != line.quantity {
                debug!(%key, requested = line.quantity, granted, "clamped cart line");
                events.push(CartEvent::LineClamped { key, requested: line.quantity, granted });
                line.quantity = granted;
            }
            kept.push(line);
        }

        self.lines = kept;
        self.recalculate();
        events
    }

    pub(crate) fn clear(&mut self) {
        self.lines.clear();
        self.recalculate();
    }

    fn recalculate(&mut self) {
        self.selected_items = self.lines.iter().fold(0u32, |acc, l| acc.saturating_add(l.quantity));
        self.subtotal = self.lines.iter().fold(Decimal::ZERO, |acc, l| saturating_add(acc, l.line_total().amount()));
    }
}

/// Collapses lines with equal variant keys into the first of them.
fn merge_lines(lines: Vec<CartLine>) -> Vec<CartLine> {
    let mut index: HashMap<VariantKey, usize> = HashMap::with_capacity(lines.len());
    let mut merged: Vec<CartLine> = Vec::with_capacity(lines.len());
    for line in lines {
        match index.get(&line.variant_key()) {
            Some(&at) => {
                let existing = &mut merged[at];
                existing.quantity = existing.quantity.saturating_add(line.quantity);
                existing.absorb_ledger(&line);
            }
            None => {
                index.insert(line.variant_key(), merged.len());
                merged.push(line);
            }
        }
    }
    merged
}

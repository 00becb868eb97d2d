//! Stock resolution for a single variant selection.

use serde::{Deserialize, Serialize};

/// The stock figures a line or selection carries. `None` means the figure
/// is unknown, never zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLedger {
    pub max_stock: Option<u32>,
    pub color_stock: Option<u32>,
    pub option_stock: Option<u32>,
    pub base_stock: Option<u32>,
}

/// Effective available stock, first match wins:
/// explicit combined cap, then the scarcer of color and option stock, then
/// whichever of the two is present, then base stock. `None` is unconstrained.
pub fn effective_stock(ledger: &StockLedger) -> Option<u32> {
    if let Some(cap) = ledger.max_stock {
        return Some(cap);
    }
    match (ledger.color_stock, ledger.option_stock) {
        (Some(color), Some(option)) => Some(color.min(option)),
        (Some(one), None) | (None, Some(one)) => Some(one),
        (None, None) => ledger.base_stock,
    }
}

/// Clamps a desired quantity to an optional ceiling.
pub fn clamp_to(desired: u32, ceiling: Option<u32>) -> u32 {
    ceiling.map_or(desired, |c| desired.min(c))
}

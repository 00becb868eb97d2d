//! Domain events
use serde::Serialize;
use crate::domain::value_objects::Region;
use crate::domain::variant::VariantKey;

/// What a cart transition did. Clamping and dropping are reported here
/// instead of as errors.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CartEvent {
    LineAdded { key: VariantKey, quantity: u32 },
    QuantityChanged { key: VariantKey, from: u32, to: u32 },
    /// The line could not take the requested quantity.
    LineClamped { key: VariantKey, requested: u32, granted: u32 },
    /// Stock for the line ran out under it.
    LineDropped { key: VariantKey, quantity: u32 },
    LineRemoved { key: VariantKey, quantity: u32 },
    Cleared,
    RegionChanged { from: Region, to: Region },
}


//! Reservation accounting: how much of a variant, or of one stock
//! dimension, earlier cart lines already hold.

use crate::domain::aggregates::cart::CartLine;
use crate::domain::stock::effective_stock;
use crate::domain::variant::{same_dimension, VariantKey, VariantSource};

/// Matching granularity for a reservation query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selector {
    /// One exact variant.
    Exact(VariantKey),
    /// Every line of the product in this color, whatever its bulk option.
    Color { product_id: String, color: String },
    /// Every line of the product with this bulk option, whatever its color.
    Option { product_id: String, label: String },
    /// Every line of the product.
    Product(String),
}

impl Selector {
    pub fn color(product_id: impl Into<String>, color: impl Into<String>) -> Self {
        Self::Color { product_id: product_id.into(), color: color.into() }
    }

    pub fn option(product_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self::Option { product_id: product_id.into(), label: label.into() }
    }

    pub fn matches(&self, line: &CartLine) -> bool {
        match self {
            Self::Exact(key) => &line.variant_key() == key,
            Self::Color { product_id, color } => {
                line.product_id.trim() == product_id.trim() && same_dimension(line.color(), Some(color))
            }
            Self::Option { product_id, label } => {
                line.product_id.trim() == product_id.trim() && same_dimension(line.option_label(), Some(label))
            }
            Self::Product(product_id) => line.product_id.trim() == product_id.trim(),
        }
    }
}

/// Sum of quantities over matching lines, skipping `exclude` if given.
pub fn reserved_by_others(lines: &[CartLine], selector: &Selector, exclude: Option<usize>) -> u32 {
    lines
        .iter()
        .enumerate()
        .filter(|(i, line)| Some(*i) != exclude && selector.matches(line))
        .fold(0u32, |acc, (_, line)| acc.saturating_add(line.quantity))
}

/// Remaining stock for a (color, option) pair: each ledger is reduced by
/// every reservation touching its dimension, and the pair gets the scarcer
/// remainder. A `None` ledger does not constrain; both `None` is unconstrained.
pub fn remaining_for_pair(
    lines: &[CartLine],
    product_id: &str,
    color: (&str, Option<u32>),
    option: (&str, Option<u32>),
) -> Option<u32> {
    let (color_name, color_stock) = color;
    let (label, option_stock) = option;
    let by_color = color_stock
        .map(|stock| stock.saturating_sub(reserved_by_others(lines, &Selector::color(product_id, color_name), None)));
    let by_option = option_stock
        .map(|stock| stock.saturating_sub(reserved_by_others(lines, &Selector::option(product_id, label), None)));
    min_known(by_color, by_option)
}

/// Ceiling for `line` given the lines ahead of it: its effective stock less
/// what earlier lines of the same variant hold, further limited by its color
/// and option ledgers less what earlier lines of that color or option hold.
pub fn line_ceiling(line: &CartLine, earlier: &[CartLine]) -> Option<u32> {
    let same_variant = reserved_by_others(earlier, &Selector::Exact(line.variant_key()), None);
    let mut ceiling = effective_stock(&line.ledger()).map(|s| s.saturating_sub(same_variant));

    if let (Some(stock), Some(color)) = (line.color_stock, line.color().filter(|c| !c.trim().is_empty())) {
        let held = reserved_by_others(earlier, &Selector::color(&line.product_id, color), None);
        ceiling = min_known(ceiling, Some(stock.saturating_sub(held)));
    }
    if let (Some(stock), Some(label)) = (line.option_stock, line.option_label().filter(|o| !o.trim().is_empty())) {
        let held = reserved_by_others(earlier, &Selector::option(&line.product_id, label), None);
        ceiling = min_known(ceiling, Some(stock.saturating_sub(held)));
    }
    ceiling
}

pub(crate) fn min_known(a: Option<u32>, b: Option<u32>) -> Option<u32> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (Some(x), None) | (None, Some(x)) => Some(x),
        (None, None) => None,
    }
}

//! Which variant choices a product page can still offer, given what the
//! cart already holds.
//!
//! The projector is a pure read over a product and a cart snapshot. It never
//! touches UI selection state; [`ProductAvailability::deselect_color`] and
//! [`ProductAvailability::deselect_option`] tell the caller when a held
//! choice has been sold out by other cart lines.

use serde::Serialize;
use crate::domain::aggregates::cart::{CartLine, CartState};
use crate::domain::aggregates::product::Product;
use crate::domain::reservation::{remaining_for_pair, reserved_by_others, Selector};
use crate::domain::variant::{same_dimension, VariantSource};

pub struct AvailabilityProjector<'a> {
    product: &'a Product,
    lines: &'a [CartLine],
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceAvailability {
    pub name: String,
    pub selectable: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductAvailability {
    pub product_id: String,
    pub any_available: bool,
    pub colors: Vec<ChoiceAvailability>,
    pub options: Vec<ChoiceAvailability>,
    /// Ceiling for the current selection; `None` is unconstrained.
    pub remaining: Option<u32>,
    pub deselect_color: bool,
    pub deselect_option: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_percentage: Option<u32>,
}

fn chosen(dimension: Option<&str>) -> Option<&str> {
    dimension.map(str::trim).filter(|d| !d.is_empty())
}

impl<'a> AvailabilityProjector<'a> {
    pub fn new(product: &'a Product, state: &'a CartState) -> Self {
        Self::from_lines(product, state.lines())
    }

    pub fn from_lines(product: &'a Product, lines: &'a [CartLine]) -> Self {
        Self { product, lines }
    }

    fn color_remaining(&self, color: &str) -> Option<u32> {
        let held = reserved_by_others(self.lines, &Selector::color(&self.product.id, color), None);
        self.product.color_stock(color).map(|stock| stock.saturating_sub(held))
    }

    fn option_remaining(&self, label: &str) -> Option<u32> {
        let held = reserved_by_others(self.lines, &Selector::option(&self.product.id, label), None);
        self.product.option_stock(label).map(|stock| stock.saturating_sub(held))
    }

    /// Base stock less the lines of this product that share the chosen dimensions.
    fn base_remaining(&self, color: Option<&str>, option: Option<&str>) -> Option<u32> {
        let stock = self.product.stock?;
        let held = self
            .lines
            .iter()
            .filter(|l| l.product_id.trim() == self.product.id.trim())
            .filter(|l| color.map_or(true, |c| same_dimension(l.color(), Some(c))))
            .filter(|l| option.map_or(true, |o| same_dimension(l.option_label(), Some(o))))
            .fold(0u32, |acc, l| acc.saturating_add(l.quantity));
        Some(stock.saturating_sub(held))
    }

    /// Remaining quantity for whatever subset of dimensions is chosen.
    /// Dimension ledgers take precedence; base stock only applies when no
    /// chosen dimension has one.
    pub fn remaining_for_selection(&self, color: Option<&str>, option: Option<&str>) -> Option<u32> {
        let (color, option) = (chosen(color), chosen(option));
        let by_ledger = match (color, option) {
            (Some(c), Some(o)) => remaining_for_pair(
                self.lines,
                &self.product.id,
                (c, self.product.color_stock(c)),
                (o, self.product.option_stock(o)),
            ),
            (Some(c), None) => self.color_remaining(c),
            (None, Some(o)) => self.option_remaining(o),
            (None, None) => None,
        };
        by_ledger.or_else(|| self.base_remaining(color, option))
    }

    pub fn is_color_selectable(&self, color: &str) -> bool {
        if self.product.has_options() {
            self.product
                .option_labels()
                .into_iter()
                .any(|o| self.remaining_for_selection(Some(color), Some(o)) != Some(0))
        } else {
            self.remaining_for_selection(Some(color), None) != Some(0)
        }
    }

    pub fn is_option_selectable(&self, label: &str) -> bool {
        if self.product.has_colors() {
            self.product
                .color_names()
                .into_iter()
                .any(|c| self.remaining_for_selection(Some(c), Some(label)) != Some(0))
        } else {
            self.remaining_for_selection(None, Some(label)) != Some(0)
        }
    }

    pub fn any_variant_available(&self) -> bool {
        match (self.product.has_colors(), self.product.has_options()) {
            (true, _) => self.product.color_names().into_iter().any(|c| self.is_color_selectable(c)),
            (false, true) => self.product.option_labels().into_iter().any(|o| self.is_option_selectable(o)),
            (false, false) => self.remaining_for_selection(None, None) != Some(0),
        }
    }

    /// Everything a product page needs for the current selection in one pass.
    pub fn project(&self, color: Option<&str>, option: Option<&str>) -> ProductAvailability {
        let (color, option) = (chosen(color), chosen(option));
        let colors: Vec<ChoiceAvailability> = self
            .product
            .color_names()
            .into_iter()
            .map(|c| ChoiceAvailability { name: c.to_string(), selectable: self.is_color_selectable(c) })
            .collect();
        let options: Vec<ChoiceAvailability> = self
            .product
            .option_labels()
            .into_iter()
            .map(|o| ChoiceAvailability { name: o.to_string(), selectable: self.is_option_selectable(o) })
            .collect();

        let deselect_color = color.is_some_and(|c| !self.is_color_selectable(c));
        let deselect_option = option.is_some_and(|o| !self.is_option_selectable(o));
        let remaining = self.remaining_for_selection(color, option);

        ProductAvailability {
            product_id: self.product.id.clone(),
            any_available: self.any_variant_available(),
            colors,
            options,
            remaining,
            deselect_color,
            deselect_option,
            discount_percentage: self.product.discount_percentage(),
        }
    }
}

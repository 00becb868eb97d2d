//! Product record as served by the catalog API
//!
//! Read-only to the cart. When `colorsStock` or `countPrices[].stock` are
//! present they are the stock source for that dimension; `stock` is the
//! fallback.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use crate::domain::aggregates::cart::CartLine;
use crate::domain::value_objects::{coerce_quantity, lenient, saturating_mul, saturating_sub};
use crate::domain::variant::{same_dimension, VariantSelection};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub price: Decimal,
    #[serde(default)]
    pub regular_price: Option<Decimal>,
    #[serde(default)]
    pub old_price: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient::stock")]
    pub stock: Option<u32>,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub colors_stock: Vec<ColorStock>,
    #[serde(default)]
    pub count_prices: Vec<CountPrice>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub count: Option<String>,
    #[serde(default)]
    pub image: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorStock {
    pub color: String,
    #[serde(default, deserialize_with = "lenient::stock")]
    pub stock: Option<u32>,
}

/// A bulk-count option, e.g. "10-pack", with its own price and stock ledger.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CountPrice {
    #[serde(alias = "label")]
    pub count: String,
    #[serde(default)]
    pub price: Decimal,
    #[serde(default, deserialize_with = "lenient::stock")]
    pub stock: Option<u32>,
}

impl Product {
    pub fn has_colors(&self) -> bool { !self.colors.is_empty() || !self.colors_stock.is_empty() }
    pub fn has_options(&self) -> bool { !self.count_prices.is_empty() }

    /// Offered colors: the `colors` list, plus any color that only appears in `colorsStock`.
    pub fn color_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.colors.iter().map(String::as_str).collect();
        for entry in &self.colors_stock {
            if !names.iter().any(|n| same_dimension(Some(n), Some(&entry.color))) {
                names.push(&entry.color);
            }
        }
        names
    }

    pub fn option_labels(&self) -> Vec<&str> {
        self.count_prices.iter().map(|o| o.count.as_str()).collect()
    }

    pub fn offers_color(&self, color: &str) -> bool {
        self.color_names().iter().any(|n| same_dimension(Some(n), Some(color)))
    }

    pub fn option(&self, label: &str) -> Option<&CountPrice> {
        self.count_prices.iter().find(|o| same_dimension(Some(&o.count), Some(label)))
    }

    /// Per-color stock, `None` when the color has no ledger entry.
    pub fn color_stock(&self, color: &str) -> Option<u32> {
        self.colors_stock.iter().find(|c| same_dimension(Some(&c.color), Some(color))).and_then(|c| c.stock)
    }

    pub fn option_stock(&self, label: &str) -> Option<u32> {
        self.option(label).and_then(|o| o.stock)
    }

    /// Price before any bulk option is applied.
    pub fn unit_price(&self) -> Decimal {
        self.regular_price.filter(|p| !p.is_zero()).unwrap_or(self.price)
    }

    /// Whole-percent discount against `oldPrice`, when one is shown.
    pub fn discount_percentage(&self) -> Option<u32> {
        let old = self.old_price.filter(|o| o.is_sign_positive() && !o.is_zero())?;
        let price = self.unit_price();
        if old == price { return None; }
        let pct = saturating_mul(saturating_sub(old, price) / old, Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        pct.to_u32()
    }

    /// Builds the cart line for a selection on this product. Size and count
    /// label default to the product's own when the selection leaves them out,
    /// and a product offering a single color gets that color.
    pub fn line_for(&self, selection: &VariantSelection, quantity: i64) -> Result<CartLine, SelectionError> {
        let color = selection.color.as_deref().map(str::trim).filter(|c| !c.is_empty()).or_else(|| {
            match self.color_names().as_slice() {
                [only] => Some(*only),
                _ => None,
            }
        });
        let option = selection.option_label.as_deref().map(str::trim).filter(|o| !o.is_empty());

        if self.has_colors() && color.is_none() { return Err(SelectionError::ColorRequired); }
        if let Some(c) = color {
            if !self.offers_color(c) { return Err(SelectionError::UnknownColor(c.to_string())); }
        }
        let chosen_option = match option {
            Some(label) => Some(self.option(label).ok_or_else(|| SelectionError::UnknownOption(label.to_string()))?),
            None => None,
        };

        Ok(CartLine {
            product_id: self.id.clone(),
            name: self.name.clone(),
            image: self.image.first().cloned(),
            unit_price: chosen_option.map_or_else(|| self.unit_price(), |o| o.price),
            quantity: coerce_quantity(quantity),
            chosen_color: color.map(str::to_string),
            chosen_size: selection.size.clone().or_else(|| self.size.clone()).filter(|s| !s.trim().is_empty()),
            chosen_option_label: chosen_option.map(|o| o.count.clone()),
            chosen_count: selection.count_label.clone().or_else(|| self.count.clone()).filter(|s| !s.trim().is_empty()),
            color_stock: color.and_then(|c| self.color_stock(c)),
            option_stock: chosen_option.and_then(|o| o.stock),
            max_stock: None,
            stock: self.stock,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum SelectionError { ColorRequired, UnknownColor(String), UnknownOption(String) }
impl std::error::Error for SelectionError {}
impl std::fmt::Display for SelectionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ColorRequired => write!(f, "A color must be chosen"),
            Self::UnknownColor(c) => write!(f, "Color `{c}` is not offered"),
            Self::UnknownOption(o) => write!(f, "Option `{o}` is not offered"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Product {
        serde_json::from_str(r#"{
            "_id": "p1", "name": "Coffee beans", "price": 4.5, "oldPrice": 6, "stock": "9",
            "colors": ["Red"], "colorsStock": [{"color": "Red", "stock": 3}, {"color": "Green", "stock": -1}],
            "countPrices": [{"count": "10-pack", "price": 40, "stock": 2}, {"count": "20-pack", "price": 75}],
            "image": ["a.jpg", "b.jpg"]
        }"#).unwrap()
    }

    #[test]
    fn test_parse_api_record() {
        let p = sample();
        assert_eq!(p.stock, Some(9));
        assert_eq!(p.color_names(), vec!["Red", "Green"]);
        assert_eq!(p.color_stock("red"), Some(3));
        assert_eq!(p.color_stock("Green"), Some(0));
        assert_eq!(p.option_stock("20-PACK"), None);
        assert_eq!(p.discount_percentage(), Some(25));
    }

    #[test]
    fn test_line_for_selection() {
        let p = sample();
        let line = p.line_for(&VariantSelection::product("ignored").with_color("red").with_option("10-pack"), 0).unwrap();
        assert_eq!(line.product_id, "p1");
        assert_eq!(line.quantity, 1);
        assert_eq!(line.unit_price, Decimal::from(40));
        assert_eq!((line.color_stock, line.option_stock, line.stock), (Some(3), Some(2), Some(9)));
        assert_eq!(line.image.as_deref(), Some("a.jpg"));
    }

    #[test]
    fn test_line_for_defaults_the_only_color() {
        let p = Product {
            id: "p2".into(),
            colors: vec!["Black".into()],
            colors_stock: vec![ColorStock { color: "Black".into(), stock: Some(4) }],
            ..Product::default()
        };
        let line = p.line_for(&VariantSelection::product("p2"), 1).unwrap();
        assert_eq!(line.chosen_color.as_deref(), Some("Black"));
        assert_eq!(line.color_stock, Some(4));
    }

    #[test]
    fn test_discount_with_extreme_prices() {
        let p = Product { old_price: Some(Decimal::from(10)), price: Decimal::MIN, ..Product::default() };
        assert_eq!(p.discount_percentage(), None);
        let p = Product { old_price: Some(Decimal::from(10)), price: Decimal::MAX, ..Product::default() };
        assert_eq!(p.discount_percentage(), None);
    }

    #[test]
    fn test_line_for_rejects_bad_selection() {
        let p = sample();
        assert_eq!(p.line_for(&VariantSelection::product("p1"), 1), Err(SelectionError::ColorRequired));
        assert_eq!(
            p.line_for(&VariantSelection::product("p1").with_color("Blue"), 1),
            Err(SelectionError::UnknownColor("Blue".into()))
        );
        assert!(matches!(
            p.line_for(&VariantSelection::product("p1").with_color("Red").with_option("5-pack"), 1),
            Err(SelectionError::UnknownOption(_))
        ));
    }
}

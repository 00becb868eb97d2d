//! Value Objects for the storefront cart

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Currency every price in the catalog is quoted in.
pub const BASE_CURRENCY: &str = "OMR";

/// Money value object
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money { amount: Decimal, currency: String }

impl Money {
    pub fn new(amount: Decimal, currency: &str) -> Self { Self { amount, currency: currency.to_string() } }
    pub fn base(amount: Decimal) -> Self { Self::new(amount, BASE_CURRENCY) }
    pub fn zero(currency: &str) -> Self { Self::new(Decimal::ZERO, currency) }
    pub fn amount(&self) -> Decimal { self.amount }
    pub fn currency(&self) -> &str { &self.currency }
    pub fn multiply(&self, qty: u32) -> Money { Money::new(saturating_mul(self.amount, Decimal::from(qty)), &self.currency) }

    /// Converts a base-currency amount for display in `region`, rounded to two places.
    pub fn display_in(&self, region: Region) -> Money {
        let converted = saturating_mul(self.amount, region.exchange_rate())
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        Money::new(converted, region.currency())
    }
}

impl Default for Money { fn default() -> Self { Self::zero(BASE_CURRENCY) } }

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{:.2} {}", self.amount, self.currency) }
}

/// Decimal product pinned to the representable range instead of overflowing.
pub fn saturating_mul(a: Decimal, b: Decimal) -> Decimal {
    a.checked_mul(b).unwrap_or(if a.is_sign_negative() != b.is_sign_negative() { Decimal::MIN } else { Decimal::MAX })
}

pub fn saturating_add(a: Decimal, b: Decimal) -> Decimal {
    a.checked_add(b).unwrap_or(if a.is_sign_negative() { Decimal::MIN } else { Decimal::MAX })
}

pub fn saturating_sub(a: Decimal, b: Decimal) -> Decimal {
    a.checked_sub(b).unwrap_or(if a.is_sign_negative() { Decimal::MIN } else { Decimal::MAX })
}

/// Shopper's country or region. Only affects the displayed currency and the
/// legacy shipping fee hint; prices are always stored in [`BASE_CURRENCY`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    #[default]
    Oman,
    Emirates,
    Gulf,
}

impl Region {
    pub fn currency(self) -> &'static str {
        match self { Self::Oman => BASE_CURRENCY, Self::Emirates | Self::Gulf => "AED" }
    }

    /// Fixed display rate from the base currency.
    pub fn exchange_rate(self) -> Decimal {
        match self { Self::Oman => Decimal::ONE, Self::Emirates | Self::Gulf => Decimal::new(95, 1) }
    }

    /// Flat shipping fee kept in the snapshot for older readers. The order
    /// summary computes the real fee from the subtotal.
    pub fn shipping_fee_hint(self) -> Decimal {
        match self { Self::Emirates => Decimal::from(4), Self::Oman | Self::Gulf => Decimal::from(2) }
    }
}

impl std::str::FromStr for Region {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "oman" | "om" | "عُمان" | "عمان" => Ok(Self::Oman),
            "emirates" | "uae" | "ae" | "الإمارات" => Ok(Self::Emirates),
            "gulf" | "gcc" | "دول الخليج" => Ok(Self::Gulf),
            other => Err(format!("unknown region `{other}`")),
        }
    }
}

/// Clamps a raw stock figure into the non-negative range.
pub fn coerce_stock(raw: i64) -> u32 {
    u32::try_from(raw.max(0)).unwrap_or(u32::MAX)
}

/// Raw quantities below one become one.
pub fn coerce_quantity(raw: i64) -> u32 {
    u32::try_from(raw.max(1)).unwrap_or(u32::MAX)
}

/// Serde helpers that accept whatever the product API or an old snapshot
/// put in a numeric field: integers, floats, numeric strings or null.
/// Anything that is not a finite number reads as absent.
pub mod lenient {
    use super::{coerce_quantity, coerce_stock, Region};
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn number(value: Option<Value>) -> Option<i64> {
        match value? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
            Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.trunc() as i64),
            _ => None,
        }
    }

    pub fn stock<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
        Ok(number(Option::<Value>::deserialize(d)?).map(coerce_stock))
    }

    pub fn quantity<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
        Ok(number(Option::<Value>::deserialize(d)?).map_or(1, coerce_quantity))
    }

    pub fn default_quantity() -> u32 { 1 }

    /// Region names or the storefront's Arabic country names. Unknown values
    /// read as the default region.
    pub fn region<'de, D: Deserializer<'de>>(d: D) -> Result<Region, D::Error> {
        Ok(Option::<String>::deserialize(d)?.and_then(|s| s.parse().ok()).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Probe {
        #[serde(default, deserialize_with = "lenient::stock")]
        stock: Option<u32>,
        #[serde(default = "lenient::default_quantity", deserialize_with = "lenient::quantity")]
        quantity: u32,
    }

    #[test]
    fn test_money_saturates_instead_of_overflowing() {
        let huge = Money::base(Decimal::MAX);
        assert_eq!(huge.multiply(2).amount(), Decimal::MAX);
        assert_eq!(huge.display_in(Region::Emirates).amount(), Decimal::MAX);
        assert_eq!(Money::base(Decimal::MIN).multiply(3).amount(), Decimal::MIN);
        assert_eq!(saturating_add(Decimal::MAX, Decimal::ONE), Decimal::MAX);
        assert_eq!(saturating_sub(Decimal::TEN, Decimal::MIN), Decimal::MAX);
        assert_eq!(Money::base(Decimal::new(250, 2)).multiply(2).amount(), Decimal::from(5));
    }

    #[test]
    fn test_display_conversion() {
        let price = Money::base(Decimal::new(1234, 2));
        assert_eq!(price.display_in(Region::Oman), Money::new(Decimal::new(1234, 2), "OMR"));
        assert_eq!(price.display_in(Region::Emirates), Money::new(Decimal::new(11723, 2), "AED"));
        assert_eq!(price.display_in(Region::Gulf).currency(), "AED");
    }

    #[test]
    fn test_region_parse() {
        assert_eq!("UAE".parse::<Region>().unwrap(), Region::Emirates);
        assert_eq!(" oman ".parse::<Region>().unwrap(), Region::Oman);
        assert_eq!("الإمارات".parse::<Region>().unwrap(), Region::Emirates);
        assert_eq!("عُمان".parse::<Region>().unwrap(), Region::Oman);
        assert_eq!("دول الخليج".parse::<Region>().unwrap(), Region::Gulf);
        assert!("mars".parse::<Region>().is_err());
    }

    #[test]
    fn test_coercion() {
        assert_eq!(coerce_stock(-4), 0);
        assert_eq!(coerce_quantity(0), 1);
        assert_eq!(coerce_quantity(-3), 1);
        assert_eq!(coerce_quantity(7), 7);
    }

    #[test]
    fn test_lenient_numbers() {
        let p: Probe = serde_json::from_str(r#"{"stock": "12", "quantity": 2.9}"#).unwrap();
        assert_eq!((p.stock, p.quantity), (Some(12), 2));
        let p: Probe = serde_json::from_str(r#"{"stock": -5, "quantity": "abc"}"#).unwrap();
        assert_eq!((p.stock, p.quantity), (Some(0), 1));
        let p: Probe = serde_json::from_str(r#"{"stock": null}"#).unwrap();
        assert_eq!((p.stock, p.quantity), (None, 1));
    }
}

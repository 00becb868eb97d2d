//! Order summary shown next to the cart: tiered shipping, grand total and
//! the "spend X more" incentives, converted for display.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use crate::domain::aggregates::cart::CartState;
use crate::domain::value_objects::{saturating_add, saturating_mul, saturating_sub, Money, Region};

/// Below this subtotal shipping costs [`FULL_SHIPPING_FEE`].
pub const CHEAPER_SHIPPING_THRESHOLD: Decimal = Decimal::from_parts(10, 0, 0, false, 0);
/// Above this subtotal shipping is free.
pub const FREE_SHIPPING_THRESHOLD: Decimal = Decimal::from_parts(20, 0, 0, false, 0);
pub const FULL_SHIPPING_FEE: Decimal = Decimal::from_parts(2, 0, 0, false, 0);
pub const REDUCED_SHIPPING_FEE: Decimal = Decimal::ONE;

/// Shipping fee in the base currency for a given subtotal.
pub fn shipping_fee(subtotal: Decimal) -> Decimal {
    if subtotal < CHEAPER_SHIPPING_THRESHOLD {
        FULL_SHIPPING_FEE
    } else if subtotal <= FREE_SHIPPING_THRESHOLD {
        REDUCED_SHIPPING_FEE
    } else {
        Decimal::ZERO
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingIncentives {
    pub to_cheaper_shipping: Money,
    pub to_free_shipping: Money,
    /// Percent of the way to free shipping, 0..=100.
    pub progress_to_free: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub region: Region,
    pub item_count: u32,
    pub subtotal: Money,
    pub shipping_fee: Money,
    pub grand_total: Money,
    pub incentives: ShippingIncentives,
}

impl OrderSummary {
    /// Summary with every amount in the region's display currency.
    pub fn for_state(state: &CartState) -> Self {
        let region = state.region();
        let subtotal = state.subtotal();
        let fee = shipping_fee(subtotal);
        let shortfall = |threshold: Decimal| saturating_sub(threshold, subtotal).max(Decimal::ZERO);
        let progress = saturating_mul(subtotal / FREE_SHIPPING_THRESHOLD, Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .clamp(Decimal::ZERO, Decimal::ONE_HUNDRED);

        Self {
            region,
            item_count: state.selected_items(),
            subtotal: Money::base(subtotal).display_in(region),
            shipping_fee: Money::base(fee).display_in(region),
            grand_total: Money::base(saturating_add(subtotal, fee)).display_in(region),
            incentives: ShippingIncentives {
                to_cheaper_shipping: Money::base(shortfall(CHEAPER_SHIPPING_THRESHOLD)).display_in(region),
                to_free_shipping: Money::base(shortfall(FREE_SHIPPING_THRESHOLD)).display_in(region),
                progress_to_free: progress.to_u32().unwrap_or(0),
            },
        }
    }
}

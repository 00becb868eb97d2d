//! Aggregates module
pub mod product;
pub mod cart;

pub use product::{ColorStock, CountPrice, Product, SelectionError};
pub use cart::{CartLine, CartState};

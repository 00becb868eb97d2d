//! Cart domain: variant identity, stock resolution, reservations and the
//! availability projection built on them.
pub mod aggregates;
pub mod availability;
pub mod events;
pub mod reservation;
pub mod stock;
pub mod value_objects;
pub mod variant;

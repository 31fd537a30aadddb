//! Stock and reservation domain module.
//!
//! This crate contains the business rules for stock records and reservations,
//! implemented purely as deterministic domain logic (no IO, no locking, no storage).
//! Every state change is computed as a new record with the next revision; the
//! infrastructure layer decides whether that record may be committed.

pub mod item;
pub mod reservation;

pub use item::StockItem;
pub use reservation::{Reservation, ReservationStatus, StockEffect, Transition};

//! `stockhold-core` — foundation building blocks shared by the stock and
//! reservation crates.
//!
//! This crate contains **pure** primitives (no infrastructure concerns).

pub mod clock;
pub mod entity;
pub mod error;
pub mod id;
pub mod revision;

pub use clock::{Clock, ManualClock, SystemClock};
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{ItemCode, ReservationId};
pub use revision::{ExpectedRevision, Versioned};

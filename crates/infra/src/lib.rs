//! Infrastructure layer: record stores, the reservation engine, background
//! workers and configuration.

pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod store;
pub mod workers;


pub use config::{ConfigError, EngineConfig};
pub use engine::{ConfirmOutcome, InMemoryEngine, ReservationEngine, Sweep, SweepReport};
pub use error::{ErrorKind, ReservationError, ReservationResult};
pub use workers::{ExpirySweeper, SweeperHandle, SweeperStats};

//! HTTP API application wiring (Axum router + engine wiring).
//!
//! - `routes/`: HTTP routes + handlers (one file per resource)
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

use stockhold_core::{Clock, SystemClock};
use stockhold_infra::store::{InMemoryReservationStore, InMemoryStockStore};
use stockhold_infra::{EngineConfig, ReservationEngine};

pub mod dto;
pub mod errors;
pub mod routes;

/// Engine type served over HTTP. The clock is boxed so tests can drive time.
pub type AppEngine =
    ReservationEngine<InMemoryStockStore, InMemoryReservationStore, Arc<dyn Clock>>;

/// In-memory engine on the wall clock.
pub fn build_engine(config: &EngineConfig) -> AppEngine {
    build_engine_with_clock(config, Arc::new(SystemClock))
}

pub fn build_engine_with_clock(config: &EngineConfig, clock: Arc<dyn Clock>) -> AppEngine {
    ReservationEngine::with_clock(
        InMemoryStockStore::new(),
        InMemoryReservationStore::new(),
        clock,
        config,
    )
}

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(engine: Arc<AppEngine>) -> Router {
    Router::new()
        .route("/health", get(routes::system::health))
        .nest("/api", routes::router())
        .layer(ServiceBuilder::new().layer(Extension(engine)))
}

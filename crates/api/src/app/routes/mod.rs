use axum::Router;

pub mod products;
pub mod reservations;
pub mod system;

/// Router for everything under `/api`.
pub fn router() -> Router {
    Router::new()
        .nest("/products", products::router())
        .nest("/reservations", reservations::router())
}

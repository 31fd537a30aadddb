use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use stockhold_core::{ItemCode, ReservationId};

use crate::app::{dto, errors, AppEngine};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_reservation))
        .route("/:id", get(get_reservation))
        .route("/:id/confirm", post(confirm_reservation))
}

fn parse_id(raw: &str) -> Result<ReservationId, axum::response::Response> {
    raw.parse()
        .map_err(|_| errors::validation_error("invalid reservation id"))
}

pub async fn create_reservation(
    Extension(engine): Extension<Arc<AppEngine>>,
    Json(body): Json<dto::CreateReservationRequest>,
) -> axum::response::Response {
    let code: ItemCode = match body.sku.parse() {
        Ok(v) => v,
        Err(e) => return errors::validation_error(format!("{e}")),
    };
    // Zero reaches the engine, which owns the rule; negatives never fit a u64.
    let quantity = match u64::try_from(body.quantity) {
        Ok(q) => q,
        Err(_) => return errors::validation_error("quantity must be positive"),
    };

    match engine.create_reservation(&code, quantity) {
        Ok(reservation) => (
            StatusCode::CREATED,
            Json(dto::ReservationResponse::from(&reservation)),
        )
            .into_response(),
        Err(e) => errors::reservation_error_to_response(e),
    }
}

pub async fn get_reservation(
    Extension(engine): Extension<Arc<AppEngine>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };

    match engine.get_reservation(id) {
        Ok(reservation) => Json(dto::ReservationResponse::from(&reservation)).into_response(),
        Err(e) => errors::reservation_error_to_response(e),
    }
}

pub async fn confirm_reservation(
    Extension(engine): Extension<Arc<AppEngine>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(res) => return res,
    };

    match engine.confirm_reservation(id) {
        Ok(outcome) => Json(dto::ConfirmResponse::from(&outcome)).into_response(),
        Err(e) => errors::reservation_error_to_response(e),
    }
}

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use stockhold_core::ItemCode;

use crate::app::{dto, errors, AppEngine};

pub fn router() -> Router {
    Router::new()
        .route("/", post(upsert_product))
        .route("/:sku/stock", get(get_stock))
}

pub async fn upsert_product(
    Extension(engine): Extension<Arc<AppEngine>>,
    Json(body): Json<dto::UpsertProductRequest>,
) -> axum::response::Response {
    let code: ItemCode = match body.sku.parse() {
        Ok(v) => v,
        Err(e) => return errors::validation_error(format!("{e}")),
    };

    match engine.upsert_item(&code, &body.name, body.available_stock) {
        Ok(item) => Json(dto::ProductResponse::from(&item)).into_response(),
        Err(e) => errors::reservation_error_to_response(e),
    }
}

pub async fn get_stock(
    Extension(engine): Extension<Arc<AppEngine>>,
    Path(sku): Path<String>,
) -> axum::response::Response {
    let code: ItemCode = match sku.parse() {
        Ok(v) => v,
        Err(e) => return errors::validation_error(format!("{e}")),
    };

    match engine.available_stock(&code) {
        Ok(available_stock) => Json(dto::StockResponse {
            sku: code.to_string(),
            available_stock,
        })
        .into_response(),
        Err(e) => errors::reservation_error_to_response(e),
    }
}

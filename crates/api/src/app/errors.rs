use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use stockhold_infra::{ErrorKind, ReservationError};

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::InsufficientStock | ErrorKind::InvalidState | ErrorKind::Conflict => {
            StatusCode::CONFLICT
        }
        ErrorKind::Unexpected => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn reservation_error_to_response(err: ReservationError) -> axum::response::Response {
    let kind = err.kind();
    if let ReservationError::Unexpected(detail) = &err {
        tracing::error!(error = %detail, "request failed unexpectedly");
    }
    json_error(status_for(kind), kind.as_str(), err.to_string())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn validation_error(message: impl Into<String>) -> axum::response::Response {
    json_error(
        StatusCode::BAD_REQUEST,
        ErrorKind::Validation.as_str(),
        message,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_has_a_status() {
        assert_eq!(status_for(ErrorKind::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_for(ErrorKind::Validation), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorKind::InsufficientStock), StatusCode::CONFLICT);
        assert_eq!(status_for(ErrorKind::InvalidState), StatusCode::CONFLICT);
        assert_eq!(status_for(ErrorKind::Conflict), StatusCode::CONFLICT);
        assert_eq!(
            status_for(ErrorKind::Unexpected),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn unexpected_detail_is_not_exposed() {
        let res = reservation_error_to_response(ReservationError::unexpected("lock poisoned"));
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use catalog::CatalogError;
use domain::{PlacementError, QueryError};

const INTERNAL_MESSAGE: &str = "internal server error";

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Order request body that could not be read as a cart.
    InvalidCart(String),
    /// Order placement error.
    Placement(PlacementError),
    /// Order read error.
    Query(QueryError),
    /// Catalog lookup or search error.
    Catalog(CatalogError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, serde_json::json!({ "error": msg })),
            ApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, serde_json::json!({ "error": msg }))
            }
            ApiError::InvalidCart(msg) => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({ "error": msg, "reason": "validation" }),
            ),
            ApiError::Placement(err) => placement_error_to_response(err),
            ApiError::Query(err) => internal(&err),
            ApiError::Catalog(err) => internal(&err),
        };

        (status, axum::Json(body)).into_response()
    }
}

/// Client errors carry the reason and the offending product; server errors
/// are logged and answered with an opaque message.
fn placement_error_to_response(err: PlacementError) -> (StatusCode, serde_json::Value) {
    if !err.is_client_error() {
        return internal(&err);
    }

    let mut body = serde_json::json!({
        "error": err.to_string(),
        "reason": err.reason(),
    });
    if let Some(product_id) = err.product_id() {
        body["product_id"] = serde_json::json!(product_id);
    }
    if let PlacementError::InsufficientStock {
        requested,
        available,
        ..
    } = &err
    {
        body["requested"] = serde_json::json!(requested);
        body["available"] = serde_json::json!(available);
    }
    (StatusCode::BAD_REQUEST, body)
}

fn internal(err: &dyn std::error::Error) -> (StatusCode, serde_json::Value) {
    tracing::error!(error = %err, "internal server error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        serde_json::json!({ "error": INTERNAL_MESSAGE }),
    )
}

impl From<PlacementError> for ApiError {
    fn from(err: PlacementError) -> Self {
        ApiError::Placement(err)
    }
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        ApiError::Query(err)
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        ApiError::Catalog(err)
    }
}

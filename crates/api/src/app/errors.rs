use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use almox_infra::lifecycle::LifecycleError;

pub fn lifecycle_error_to_response(err: LifecycleError) -> axum::response::Response {
    let message = err.to_string();
    match err {
        LifecycleError::ProductNotFound => {
            json_error(StatusCode::NOT_FOUND, "product_not_found", message)
        }
        LifecycleError::UserNotFound => json_error(StatusCode::NOT_FOUND, "user_not_found", message),
        LifecycleError::RequestNotFound => {
            json_error(StatusCode::NOT_FOUND, "request_not_found", message)
        }
        LifecycleError::InsufficientStock { .. } => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "insufficient_stock", message)
        }
        LifecycleError::InvalidState(_) => json_error(StatusCode::CONFLICT, "invalid_state", message),
        LifecycleError::Validation(_) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", message)
        }
        LifecycleError::Busy(_) => json_error(StatusCode::SERVICE_UNAVAILABLE, "busy", message),
        LifecycleError::Store(_) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", message)
        }
        LifecycleError::Directory(_) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "directory_error", message)
        }
    }
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

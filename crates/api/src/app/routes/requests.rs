use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};

use almox_core::{ProductId, RequestId, UserId};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_request).get(list_requests))
        .route(
            "/:id",
            get(get_request).put(update_request).delete(delete_request),
        )
        .route("/:id/deliver", put(mark_delivered))
        .route("/:id/cancel-delivery", put(cancel_delivery))
}

pub async fn create_request(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CreateRequestRequest>,
) -> axum::response::Response {
    let user_id: UserId = match body.user_id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid user id"),
    };
    let product_id: ProductId = match body.product_id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid product id")
        }
    };

    match services.create(user_id, product_id, body.quantity).await {
        Ok(entry) => (StatusCode::CREATED, Json(dto::entry_to_json(&entry))).into_response(),
        Err(e) => errors::lifecycle_error_to_response(e),
    }
}

pub async fn list_requests(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.list().await {
        Ok(views) => {
            let items: Vec<_> = views.iter().map(dto::view_to_json).collect();
            (StatusCode::OK, Json(serde_json::json!(items))).into_response()
        }
        Err(e) => errors::lifecycle_error_to_response(e),
    }
}

pub async fn get_request(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: RequestId = match id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid request id")
        }
    };

    match services.get(id).await {
        Ok(view) => (StatusCode::OK, Json(dto::view_to_json(&view))).into_response(),
        Err(e) => errors::lifecycle_error_to_response(e),
    }
}

pub async fn update_request(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateRequestRequest>,
) -> axum::response::Response {
    let id: RequestId = match id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid request id")
        }
    };

    match services.update(id, body.quantity).await {
        Ok(entry) => (StatusCode::OK, Json(dto::entry_to_json(&entry))).into_response(),
        Err(e) => errors::lifecycle_error_to_response(e),
    }
}

pub async fn delete_request(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: RequestId = match id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid request id")
        }
    };

    match services.delete(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::lifecycle_error_to_response(e),
    }
}

pub async fn mark_delivered(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: RequestId = match id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid request id")
        }
    };

    match services.mark_delivered(id).await {
        Ok(entry) => (StatusCode::OK, Json(dto::entry_to_json(&entry))).into_response(),
        Err(e) => errors::lifecycle_error_to_response(e),
    }
}

pub async fn cancel_delivery(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: RequestId = match id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid request id")
        }
    };

    match services.cancel_delivery(id).await {
        Ok(entry) => (StatusCode::OK, Json(dto::entry_to_json(&entry))).into_response(),
        Err(e) => errors::lifecycle_error_to_response(e),
    }
}

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use almox_core::{CategoryId, ProductId};
use almox_directory::{Category, ProductRecord};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(register_product))
        .route("/:id", get(get_product))
}

/// Collaborator seed surface: the catalog owns product metadata; the ledger
/// owns the quantity. Registration writes both in one call so the system is
/// operable end-to-end.
pub async fn register_product(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::RegisterProductRequest>,
) -> axum::response::Response {
    let category_id = match body.category_id.as_deref().map(|s| s.parse::<CategoryId>()) {
        None => CategoryId::new(),
        Some(Ok(v)) => v,
        Some(Err(_)) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid category id")
        }
    };

    let record = ProductRecord {
        id: ProductId::new(),
        name: body.name,
        category: Category {
            id: category_id,
            name: body.category_name,
        },
    };

    match services.register_product(record.clone(), body.quantity).await {
        Ok(()) => (
            StatusCode::CREATED,
            Json(serde_json::json!({
                "id": record.id.to_string(),
                "category_id": record.category.id.to_string(),
            })),
        )
            .into_response(),
        Err(e) => errors::lifecycle_error_to_response(e),
    }
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: ProductId = match id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid product id")
        }
    };

    let record = match services.product_record(id).await {
        Ok(Some(record)) => record,
        Ok(None) => {
            return errors::json_error(StatusCode::NOT_FOUND, "product_not_found", "product not found")
        }
        Err(e) => return errors::lifecycle_error_to_response(e),
    };

    match services.product_availability(id).await {
        Ok(quantity) => {
            (StatusCode::OK, Json(dto::product_to_json(&record, quantity))).into_response()
        }
        Err(e) => errors::lifecycle_error_to_response(e),
    }
}

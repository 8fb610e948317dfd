use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use chrono::Utc;

use almox_core::{SectorId, UserId};
use almox_directory::{Sector, UserRecord};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new().route("/", post(register_user))
}

/// Collaborator seed surface: identity/profile data is owned elsewhere; this
/// endpoint only registers what the ledger needs (name + sector).
pub async fn register_user(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::RegisterUserRequest>,
) -> axum::response::Response {
    let sector_id = match body.sector_id.as_deref().map(|s| s.parse::<SectorId>()) {
        None => SectorId::new(),
        Some(Ok(v)) => v,
        Some(Err(_)) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid sector id")
        }
    };

    let record = UserRecord {
        id: UserId::new(),
        name: body.name,
        sector: Sector {
            id: sector_id,
            name: body.sector_name,
            created_at: Utc::now(),
        },
    };

    match services.register_user(record.clone()).await {
        Ok(()) => (
            StatusCode::CREATED,
            Json(serde_json::json!({
                "id": record.id.to_string(),
                "sector_id": record.sector.id.to_string(),
            })),
        )
            .into_response(),
        Err(e) => errors::lifecycle_error_to_response(e),
    }
}

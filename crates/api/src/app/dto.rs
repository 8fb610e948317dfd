use serde::Deserialize;

use almox_directory::ProductRecord;
use almox_infra::lifecycle::RequestView;
use almox_ledger::LedgerEntry;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateRequestRequest {
    pub user_id: String,
    pub product_id: String,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRequestRequest {
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct RegisterUserRequest {
    pub name: String,
    /// Reuse an existing sector by id; omitted means a new one is created.
    pub sector_id: Option<String>,
    pub sector_name: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterProductRequest {
    pub name: String,
    /// Reuse an existing category by id; omitted means a new one is created.
    pub category_id: Option<String>,
    pub category_name: String,
    pub quantity: i64,
}

// -------------------------
// Response mapping
// -------------------------

pub fn entry_to_json(entry: &LedgerEntry) -> serde_json::Value {
    serde_json::json!({
        "id": entry.id.to_string(),
        "user_id": entry.user_id.to_string(),
        "product_id": entry.product_id.to_string(),
        "quantity": entry.quantity,
        "created_at": entry.created_at,
        "delivered": entry.delivery.is_delivered(),
        "delivered_at": entry.delivery.delivered_at(),
    })
}

pub fn view_to_json(view: &RequestView) -> serde_json::Value {
    serde_json::json!({
        "id": view.id.to_string(),
        "user_name": view.user_name,
        "user_sector": {
            "id": view.user_sector.id.to_string(),
            "name": view.user_sector.name,
            "created_at": view.user_sector.created_at,
        },
        "product_name": view.product_name,
        "quantity": view.quantity,
        "created_at": view.created_at,
        "category_id": view.category.id.to_string(),
        "category_name": view.category.name,
        "delivered": view.delivery.is_delivered(),
        "delivered_at": view.delivery.delivered_at(),
    })
}

pub fn product_to_json(record: &ProductRecord, quantity: i64) -> serde_json::Value {
    serde_json::json!({
        "id": record.id.to_string(),
        "name": record.name,
        "category_id": record.category.id.to_string(),
        "category_name": record.category.name,
        "quantity": quantity,
    })
}

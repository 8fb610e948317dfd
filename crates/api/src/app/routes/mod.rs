use axum::Router;

pub mod products;
pub mod requests;
pub mod system;
pub mod users;

/// Router for all resource endpoints.
pub fn router() -> Router {
    Router::new()
        .nest("/requests", requests::router())
        .nest("/products", products::router())
        .nest("/users", users::router())
}

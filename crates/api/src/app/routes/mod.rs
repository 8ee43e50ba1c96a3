use axum::Router;

use stockroom_inventory::RequestKind;

pub mod items;
pub mod requests;
pub mod system;

/// Router for everything under `/api`.
pub fn router() -> Router {
    Router::new()
        .nest("/items", items::router())
        .nest("/requests", requests::router(RequestKind::Checkout))
        .nest("/returns", requests::router(RequestKind::Return))
}

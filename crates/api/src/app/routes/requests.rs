//! Approval request endpoints.
//!
//! One set of handlers serves both `/api/requests` (checkout) and
//! `/api/returns` (return); the kind is injected per-router via `Extension`
//! and selects the backing collection.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch},
    Json, Router,
};

use stockroom_core::RequestId;
use stockroom_inventory::{ApprovalStatus, NewRequest, RequestKind};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router(kind: RequestKind) -> Router {
    Router::new()
        .route("/", get(list_requests).post(submit_request))
        .route("/pending", get(list_pending))
        .route("/processed", get(list_processed))
        .route("/:request_id", get(get_request))
        .route("/:request_id/status", patch(update_status))
        .layer(Extension(kind))
}

fn parse_id(raw: &str) -> Result<RequestId, axum::response::Response> {
    raw.parse::<RequestId>().map_err(|_| {
        errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid request id")
    })
}

pub async fn list_requests(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(kind): Extension<RequestKind>,
) -> axum::response::Response {
    match services.requests.list(kind).await {
        Ok(records) => (StatusCode::OK, Json(records)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn list_pending(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(kind): Extension<RequestKind>,
) -> axum::response::Response {
    match services
        .requests
        .list_by_status(kind, ApprovalStatus::Pending)
        .await
    {
        Ok(records) => (StatusCode::OK, Json(records)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

/// Approved followed by declined: two filtered reads concatenated, not one
/// inequality query, so the order is partition order rather than
/// chronological.
pub async fn list_processed(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(kind): Extension<RequestKind>,
) -> axum::response::Response {
    let approved = match services
        .requests
        .list_by_status(kind, ApprovalStatus::Approved)
        .await
    {
        Ok(records) => records,
        Err(e) => return errors::store_error_to_response(e),
    };
    let declined = match services
        .requests
        .list_by_status(kind, ApprovalStatus::Declined)
        .await
    {
        Ok(records) => records,
        Err(e) => return errors::store_error_to_response(e),
    };

    let mut records = approved;
    records.extend(declined);
    (StatusCode::OK, Json(records)).into_response()
}

pub async fn get_request(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(kind): Extension<RequestKind>,
    Path(request_id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&request_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.requests.get(kind, id).await {
        Ok(Some(record)) => (StatusCode::OK, Json(record)).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "request not found"),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn submit_request(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(kind): Extension<RequestKind>,
    body: Result<Json<dto::SubmitRequestBody>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };
    let new: NewRequest = body.into();
    if let Err(e) = new.validate() {
        return errors::domain_error_to_response(e);
    }

    match services.requests.create(kind, new).await {
        Ok(record) => (StatusCode::CREATED, Json(record)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn update_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(kind): Extension<RequestKind>,
    Path(request_id): Path<String>,
    body: Result<Json<dto::UpdateStatusBody>, JsonRejection>,
) -> axum::response::Response {
    let id = match parse_id(&request_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };

    match services.workflow.process(kind, id, body.status).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use stockroom_core::DomainError;
use stockroom_infra::{StoreError, WorkflowError};

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

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation { field, message } => (
            StatusCode::BAD_REQUEST,
            axum::Json(json!({
                "error": "validation_error",
                "field": field,
                "message": message,
            })),
        )
            .into_response(),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
    }
}

/// Body extraction failures (malformed JSON, missing or mistyped fields) are
/// schema violations: 400 with the standard envelope, not axum's plain-text
/// 422 default.
pub fn json_rejection_to_response(rejection: JsonRejection) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_body", rejection.body_text())
}

/// Store failures map to a generic 500; the detail stays in the log.
pub fn store_error_to_response(err: StoreError) -> axum::response::Response {
    tracing::error!(error = %err, "store operation failed");
    json_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "store_error",
        "storage backend failure",
    )
}

pub fn workflow_error_to_response(err: WorkflowError) -> axum::response::Response {
    match err {
        WorkflowError::NotFound => {
            json_error(StatusCode::NOT_FOUND, "not_found", "request not found")
        }
        WorkflowError::AlreadyProcessed(status) => json_error(
            StatusCode::CONFLICT,
            "already_processed",
            format!("request already {status}"),
        ),
        WorkflowError::InvalidDecision(status) => json_error(
            StatusCode::BAD_REQUEST,
            "invalid_decision",
            format!("'{status}' is not a valid decision"),
        ),
        WorkflowError::InsufficientStock(lines) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            axum::Json(serde_json::json!({
                "error": "insufficient_stock",
                "message": "one or more lines cannot be satisfied",
                "lines": lines,
            })),
        )
            .into_response(),
        WorkflowError::Store(e) => store_error_to_response(e),
    }
}

pub mod category_handlers;
pub mod comment_handlers;
pub mod post_handlers;
pub mod profile_handlers;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;

/// A single failed form field, reported back to the client instead of a
/// created/updated row.
#[derive(Debug, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// 422 response carrying per-field validation errors.
pub fn validation_error(errors: Vec<FieldError>) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(serde_json::json!({ "errors": errors })),
    )
        .into_response()
}

/// JSON error body with the given status.
pub fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

#[derive(Serialize)]
struct StaticPage {
    title: &'static str,
    text: &'static str,
}

pub async fn about_handler() -> impl IntoResponse {
    Json(StaticPage {
        title: "About",
        text: "A small blog where authors publish posts under categories and \
               locations, and readers leave comments.",
    })
}

pub async fn rules_handler() -> impl IntoResponse {
    Json(StaticPage {
        title: "Rules",
        text: "Be civil. Post your own writing. Authors may edit or delete \
               only their own posts and comments.",
    })
}

/// Fallback for unknown routes.
pub async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

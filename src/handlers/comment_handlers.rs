use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::Deserialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    auth::AuthenticatedUser,
    handlers::{error_response, validation_error, FieldError},
    repositories::{comment_repository, post_repository},
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct CommentPayload {
    text: String,
}

fn validate_comment_text(text: &str) -> Result<String, Response> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(validation_error(vec![FieldError::new(
            "text",
            "Comment text is required",
        )]));
    }
    Ok(trimmed.to_string())
}

/// Handler for `POST /posts/:post_id/comment`. Attaches a comment to an
/// existing post, then redirects back to the post.
pub async fn add_comment_handler(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    user: AuthenticatedUser,
    Json(payload): Json<CommentPayload>,
) -> Response {
    match post_repository::get_post_author(&state.db_pool, post_id).await {
        Ok(Some(_)) => { /* Post exists, continue */ }
        Ok(None) => return error_response(StatusCode::NOT_FOUND, "Post not found"),
        Err(e) => {
            error!(error = %e, post_id = %post_id, "DB error checking post before comment creation");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Error checking post");
        }
    }

    let text = match validate_comment_text(&payload.text) {
        Ok(text) => text,
        Err(response) => return response,
    };

    match comment_repository::create_comment(&state.db_pool, post_id, user.id, &text).await {
        Ok(comment) => {
            info!(comment_id = %comment.id, post_id = %post_id, author_id = %user.id, "Created comment");
            Redirect::to(&format!("/posts/{}", post_id)).into_response()
        }
        Err(e) => {
            error!(error = %e, post_id = %post_id, "Failed to create comment");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to create comment")
        }
    }
}

/// Handler for `POST /posts/:post_id/edit_comment/:comment_id`. Only the
/// comment's author may edit; anyone else is quietly redirected to the post
/// without changes.
pub async fn edit_comment_handler(
    State(state): State<AppState>,
    Path((post_id, comment_id)): Path<(Uuid, Uuid)>,
    user: AuthenticatedUser,
    Json(payload): Json<CommentPayload>,
) -> Response {
    let existing = match comment_repository::get_comment(&state.db_pool, comment_id, post_id).await
    {
        Ok(Some(comment)) => comment,
        Ok(None) => return error_response(StatusCode::NOT_FOUND, "Comment not found"),
        Err(e) => {
            error!(error = %e, comment_id = %comment_id, "Failed to fetch comment for edit");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Error fetching comment");
        }
    };

    if existing.author_id != user.id {
        warn!(comment_id = %comment_id, user_id = %user.id, actual_author = %existing.author_id,
              "User attempted to edit a comment they did not write");
        return Redirect::to(&format!("/posts/{}", post_id)).into_response();
    }

    let text = match validate_comment_text(&payload.text) {
        Ok(text) => text,
        Err(response) => return response,
    };

    match comment_repository::update_comment(&state.db_pool, comment_id, &text).await {
        Ok(Some(updated)) => {
            info!(comment_id = %updated.id, "Updated comment");
            Redirect::to(&format!("/posts/{}", post_id)).into_response()
        }
        Ok(None) => {
            warn!(comment_id = %comment_id, "Comment disappeared during update");
            error_response(StatusCode::NOT_FOUND, "Comment not found during update")
        }
        Err(e) => {
            error!(error = %e, comment_id = %comment_id, "Failed to update comment");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to update comment")
        }
    }
}

/// Handler for `POST /posts/:post_id/delete_comment/:comment_id`. Only the
/// comment's author may delete; anyone else is quietly redirected to the
/// post without changes.
pub async fn delete_comment_handler(
    State(state): State<AppState>,
    Path((post_id, comment_id)): Path<(Uuid, Uuid)>,
    user: AuthenticatedUser,
) -> Response {
    let existing = match comment_repository::get_comment(&state.db_pool, comment_id, post_id).await
    {
        Ok(Some(comment)) => comment,
        Ok(None) => return error_response(StatusCode::NOT_FOUND, "Comment not found"),
        Err(e) => {
            error!(error = %e, comment_id = %comment_id, "Failed to fetch comment before deletion");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Error fetching comment");
        }
    };

    if existing.author_id != user.id {
        warn!(comment_id = %comment_id, user_id = %user.id, actual_author = %existing.author_id,
              "User attempted to delete a comment they did not write");
        return Redirect::to(&format!("/posts/{}", post_id)).into_response();
    }

    match comment_repository::delete_comment(&state.db_pool, comment_id).await {
        Ok(1) => {
            info!(comment_id = %comment_id, deleted_by = %user.id, "Deleted comment");
            Redirect::to(&format!("/posts/{}", post_id)).into_response()
        }
        Ok(_) => {
            warn!(comment_id = %comment_id, "Comment already gone during delete (0 rows affected)");
            error_response(StatusCode::NOT_FOUND, "Comment not found")
        }
        Err(e) => {
            error!(error = %e, comment_id = %comment_id, "Failed to delete comment");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to delete comment")
        }
    }
}

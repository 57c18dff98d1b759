use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::{
    auth::AuthenticatedUser,
    handlers::{error_response, validation_error, FieldError},
    models::{PostSummary, PublicUser},
    repositories::{post_repository, user_repository},
    utils::{clamp_page, page_offset, total_pages, Page, PageParams, PAGE_SIZE},
    AppState,
};

#[derive(Serialize)]
struct ProfilePage {
    profile: PublicUser,
    posts: Page<PostSummary>,
}

/// Handler for `GET /profile/:username`. Returns the user's posts, newest
/// first. Visitors see only the publicly visible subset; the owner sees
/// everything of theirs.
pub async fn profile_handler(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(params): Query<PageParams>,
    viewer: Option<AuthenticatedUser>,
) -> Response {
    let user = match user_repository::get_user_by_username(&state.db_pool, &username).await {
        Ok(Some(user)) => user,
        Ok(None) => return error_response(StatusCode::NOT_FOUND, "User not found"),
        Err(e) => {
            error!(error = %e, username = %username, "Failed to fetch user profile");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch profile");
        }
    };

    let is_owner = viewer.as_ref().map(|v| v.id == user.id).unwrap_or(false);
    let only_visible = !is_owner;

    let total_items =
        match post_repository::count_by_author(&state.db_pool, user.id, only_visible).await {
            Ok(count) => count as u64,
            Err(e) => {
                error!(error = %e, author_id = %user.id, "Failed to count posts for profile");
                return error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to fetch posts",
                );
            }
        };

    let page = clamp_page(params.page(), total_items);
    match post_repository::list_by_author(
        &state.db_pool,
        user.id,
        only_visible,
        PAGE_SIZE,
        page_offset(page),
    )
    .await
    {
        Ok(items) => Json(ProfilePage {
            profile: PublicUser::from(user),
            posts: Page {
                items,
                page,
                total_pages: total_pages(total_items),
                total_items,
            },
        })
        .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to fetch posts for profile");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch posts")
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct EditProfilePayload {
    display_name: Option<String>,
    email: Option<String>,
}

/// Handler for `POST /profile/edit`. Updates the caller's own profile, then
/// redirects to it.
pub async fn edit_profile_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<EditProfilePayload>,
) -> Response {
    let mut errors: Vec<FieldError> = Vec::new();
    if let Some(email) = payload.email.as_deref() {
        if !email.contains('@') {
            errors.push(FieldError::new("email", "Enter a valid email address"));
        }
    }
    if !errors.is_empty() {
        return validation_error(errors);
    }

    match user_repository::update_profile(
        &state.db_pool,
        user.id,
        payload.display_name.as_deref().map(str::trim),
        payload.email.as_deref().map(str::trim),
    )
    .await
    {
        Ok(Some(updated)) => {
            info!(user_id = %updated.id, "Updated profile");
            Redirect::to(&format!("/profile/{}", updated.username)).into_response()
        }
        Ok(None) => error_response(StatusCode::NOT_FOUND, "User not found"),
        Err(e) => {
            error!(error = %e, user_id = %user.id, "Failed to update profile");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to update profile")
        }
    }
}

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use tracing::error;

use crate::{
    handlers::error_response,
    models::{Category, PostSummary},
    repositories::{category_repository, post_repository},
    utils::{clamp_page, page_offset, total_pages, Page, PageParams, PAGE_SIZE},
    AppState,
};

#[derive(Serialize)]
struct CategoryPage {
    category: Category,
    posts: Page<PostSummary>,
}

/// Handler for `GET /category/:slug`. Returns a page of the visible posts in
/// a published category.
/// An unpublished or unknown category is 404.
pub async fn category_posts_handler(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(params): Query<PageParams>,
) -> Response {
    let category = match category_repository::get_category_by_slug(&state.db_pool, &slug).await {
        Ok(Some(category)) if category.is_published => category,
        Ok(_) => return error_response(StatusCode::NOT_FOUND, "Category not found"),
        Err(e) => {
            error!(error = %e, slug = %slug, "Failed to fetch category");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch category");
        }
    };

    let total_items =
        match post_repository::count_visible_in_category(&state.db_pool, category.id).await {
            Ok(count) => count as u64,
            Err(e) => {
                error!(error = %e, category_id = %category.id, "Failed to count posts in category");
                return error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to fetch posts",
                );
            }
        };

    let page = clamp_page(params.page(), total_items);
    match post_repository::list_visible_in_category(
        &state.db_pool,
        category.id,
        PAGE_SIZE,
        page_offset(page),
    )
    .await
    {
        Ok(items) => Json(CategoryPage {
            category,
            posts: Page {
                items,
                page,
                total_pages: total_pages(total_items),
                total_items,
            },
        })
        .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to fetch posts in category");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch posts")
        }
    }
}

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use std::path::PathBuf;
use tower_http::{limit::RequestBodyLimitLayer, services::ServeDir};

pub mod auth;
pub mod config;
pub mod handlers;
pub mod models;
pub mod repositories;
pub mod seeder;
pub mod storage;
pub mod utils;

use auth::{login_handler, logout_handler, register_handler, SessionStore};
use config::BlogConfig;
use handlers::{
    about_handler,
    category_handlers::category_posts_handler,
    comment_handlers::{add_comment_handler, delete_comment_handler, edit_comment_handler},
    not_found_handler,
    post_handlers::{
        create_post_handler, delete_post_handler, edit_post_handler, list_posts_handler,
        post_detail_handler,
    },
    profile_handlers::{edit_profile_handler, profile_handler},
    rules_handler,
};
use storage::LocalImageStorage;

// Uploaded image cap is 10 MB; leave headroom for the other form fields.
const MAX_BODY_SIZE: usize = 12 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub image_storage: LocalImageStorage,
    pub session_store: SessionStore,
    pub config: BlogConfig,
}

/// Builds the application router with all blog routes and static media
/// serving.
pub fn create_router(db_pool: PgPool, config: BlogConfig) -> Router {
    let image_storage =
        LocalImageStorage::new(config.media_dir.clone(), config.media_base_url.clone());
    let session_store = SessionStore::new(config.session_ttl);
    let media_dir = PathBuf::from(&config.media_dir);

    let app_state = AppState {
        db_pool,
        image_storage,
        session_store,
        config,
    };

    Router::new()
        .route("/", get(list_posts_handler))
        .route("/about", get(about_handler))
        .route("/rules", get(rules_handler))
        .route("/auth/register", post(register_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/logout", post(logout_handler))
        .route("/posts/create", post(create_post_handler))
        .route("/posts/:post_id", get(post_detail_handler))
        .route("/posts/:post_id/edit", post(edit_post_handler))
        .route("/posts/:post_id/delete", post(delete_post_handler))
        .route("/posts/:post_id/comment", post(add_comment_handler))
        .route(
            "/posts/:post_id/edit_comment/:comment_id",
            post(edit_comment_handler),
        )
        .route(
            "/posts/:post_id/delete_comment/:comment_id",
            post(delete_comment_handler),
        )
        .route("/category/:slug", get(category_posts_handler))
        .route("/profile/edit", post(edit_profile_handler))
        .route("/profile/:username", get(profile_handler))
        .nest_service("/media", ServeDir::new(media_dir))
        .fallback(not_found_handler)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .with_state(app_state)
}

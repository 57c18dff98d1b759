// tests/common/helpers.rs
//! Shared helper functions for integration tests

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{self, Request},
    response::Response,
    Router,
};
use blog_server::{auth::LoginResponse, config::BlogConfig, create_router};
use chrono::{DateTime, Utc};
use http_body_util::BodyExt;
use serde_json::json;
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_PASSWORD: &str = "correct horse battery staple";

// Function to generate a random boundary string
pub fn generate_boundary() -> String {
    format!("----WebKitFormBoundary{}", Uuid::new_v4().simple())
}

pub async fn create_test_app(pool: PgPool) -> Router {
    let config = BlogConfig::new("./test_media".to_string(), "/media".to_string());
    create_router(pool, config)
}

/// Collects a response body and parses it as JSON.
pub async fn body_json<T: serde::de::DeserializeOwned>(response: Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap_or_else(|e| {
        panic!(
            "failed to parse body: {} ({})",
            e,
            String::from_utf8_lossy(&bytes)
        )
    })
}

/// Registers a user and logs them in, returning the session token and id.
pub async fn register_and_login(app: &Router, username: &str) -> (String, Uuid) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(http::Method::POST)
                .uri("/auth/register")
                .header(http::header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
                .body(Body::from(
                    json!({
                        "username": username,
                        "email": format!("{username}@example.com"),
                        "password": TEST_PASSWORD,
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(
        response.status(),
        http::StatusCode::CREATED,
        "registration failed for {username}"
    );

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(http::Method::POST)
                .uri("/auth/login")
                .header(http::header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
                .body(Body::from(
                    json!({ "username": username, "password": TEST_PASSWORD }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), http::StatusCode::OK);
    let login: LoginResponse = body_json(response).await;
    (login.token, login.user.id)
}

/// Builds a multipart/form-data body from text fields.
pub fn multipart_body(boundary: &str, fields: &[(&str, &str)]) -> String {
    let mut body = String::new();
    for (name, value) in fields {
        body.push_str(&format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        ));
    }
    body.push_str(&format!("--{boundary}--\r\n"));
    body
}

/// Builds a multipart/form-data body with text fields plus one file part.
pub fn multipart_body_with_file(
    boundary: &str,
    fields: &[(&str, &str)],
    file: (&str, &str, &str, &[u8]),
) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    let (name, filename, content_type, data) = file;
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}

/// Submits the post form to the given URI (create or edit) as multipart.
pub async fn submit_post_form(
    app: &Router,
    uri: &str,
    token: &str,
    fields: &[(&str, &str)],
) -> Response {
    let boundary = generate_boundary();
    let body = multipart_body(&boundary, fields);
    app.clone()
        .oneshot(
            Request::builder()
                .method(http::Method::POST)
                .uri(uri)
                .header(
                    http::header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={boundary}"),
                )
                .header(http::header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap()
}

/// Submits the post form with an attached PNG image part.
pub async fn submit_post_form_with_image(
    app: &Router,
    uri: &str,
    token: &str,
    fields: &[(&str, &str)],
    filename: &str,
    data: &[u8],
) -> Response {
    let boundary = generate_boundary();
    let body = multipart_body_with_file(&boundary, fields, ("image", filename, "image/png", data));
    app.clone()
        .oneshot(
            Request::builder()
                .method(http::Method::POST)
                .uri(uri)
                .header(
                    http::header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={boundary}"),
                )
                .header(http::header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap()
}

/// Sends a JSON POST with an optional bearer token.
pub async fn post_json(
    app: &Router,
    uri: &str,
    token: Option<&str>,
    payload: serde_json::Value,
) -> Response {
    let mut builder = Request::builder()
        .method(http::Method::POST)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref());
    if let Some(token) = token {
        builder = builder.header(http::header::AUTHORIZATION, format!("Bearer {token}"));
    }
    app.clone()
        .oneshot(builder.body(Body::from(payload.to_string())).unwrap())
        .await
        .unwrap()
}

/// Sends a GET with an optional bearer token.
pub async fn get(app: &Router, uri: &str, token: Option<&str>) -> Response {
    let mut builder = Request::builder().method(http::Method::GET).uri(uri);
    if let Some(token) = token {
        builder = builder.header(http::header::AUTHORIZATION, format!("Bearer {token}"));
    }
    app.clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

// --- Direct row fixtures, for listing scenarios ---

pub async fn insert_category(pool: &PgPool, title: &str, slug: &str, published: bool) -> Uuid {
    sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO categories (title, slug, is_published) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(title)
    .bind(slug)
    .bind(published)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn insert_post(
    pool: &PgPool,
    author_id: Uuid,
    title: &str,
    published: bool,
    pub_date: DateTime<Utc>,
    category_id: Option<Uuid>,
) -> Uuid {
    sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO posts (author_id, title, text, is_published, pub_date, category_id)
        VALUES ($1, $2, 'some text', $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(author_id)
    .bind(title)
    .bind(published)
    .bind(pub_date)
    .bind(category_id)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn insert_comment(pool: &PgPool, post_id: Uuid, author_id: Uuid, text: &str) -> Uuid {
    sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO comments (post_id, author_id, text) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(post_id)
    .bind(author_id)
    .bind(text)
    .fetch_one(pool)
    .await
    .unwrap()
}

/// Maps an uploaded image URL back to a path under the test media dir and
/// reports whether the file is on disk.
pub fn media_file_exists(image_url: &str) -> bool {
    let name = image_url.trim_start_matches("/media/");
    std::path::Path::new("./test_media").join(name).exists()
}

pub fn location_of(response: &Response) -> &str {
    response
        .headers()
        .get(http::header::LOCATION)
        .expect("expected a Location header")
        .to_str()
        .unwrap()
}

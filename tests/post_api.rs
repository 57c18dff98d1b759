// tests/post_api.rs

mod common;

use axum::http::StatusCode;
use blog_server::{
    models::{PostDetail, PostSummary},
    utils::Page,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use common::helpers::{
    body_json, create_test_app, get, insert_category, insert_comment, insert_post, location_of,
    media_file_exists, register_and_login, submit_post_form, submit_post_form_with_image,
};

// --- Listing visibility ---

#[sqlx::test]
async fn index_lists_only_visible_posts(pool: PgPool) {
    let app = create_test_app(pool.clone()).await;
    let (_token, author_id) = register_and_login(&app, "alice").await;

    let published_cat = insert_category(&pool, "Travel", "travel", true).await;
    let hidden_cat = insert_category(&pool, "Drafts", "drafts", false).await;

    let past = Utc::now() - Duration::hours(1);
    let future = Utc::now() + Duration::days(1);

    let visible_in_cat =
        insert_post(&pool, author_id, "in category", true, past, Some(published_cat)).await;
    let visible_no_cat = insert_post(&pool, author_id, "no category", true, past, None).await;
    let unpublished = insert_post(&pool, author_id, "unpublished", false, past, None).await;
    let future_dated = insert_post(&pool, author_id, "scheduled", true, future, None).await;
    let in_hidden_cat =
        insert_post(&pool, author_id, "hidden category", true, past, Some(hidden_cat)).await;

    let response = get(&app, "/", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let page: Page<PostSummary> = body_json(response).await;

    let ids: Vec<Uuid> = page.items.iter().map(|p| p.id).collect();
    assert!(ids.contains(&visible_in_cat));
    assert!(ids.contains(&visible_no_cat));
    assert!(!ids.contains(&unpublished));
    assert!(!ids.contains(&future_dated));
    assert!(!ids.contains(&in_hidden_cat));
    assert_eq!(page.total_items, 2);
}

#[sqlx::test]
async fn index_orders_newest_first_with_comment_counts(pool: PgPool) {
    let app = create_test_app(pool.clone()).await;
    let (_token, author_id) = register_and_login(&app, "alice").await;

    let older = insert_post(
        &pool,
        author_id,
        "older",
        true,
        Utc::now() - Duration::days(2),
        None,
    )
    .await;
    let newer = insert_post(
        &pool,
        author_id,
        "newer",
        true,
        Utc::now() - Duration::days(1),
        None,
    )
    .await;
    insert_comment(&pool, older, author_id, "first!").await;
    insert_comment(&pool, older, author_id, "second!").await;

    let response = get(&app, "/", None).await;
    let page: Page<PostSummary> = body_json(response).await;

    assert_eq!(page.items[0].id, newer);
    assert_eq!(page.items[1].id, older);
    assert_eq!(page.items[1].comment_count, 2);
    assert_eq!(page.items[0].comment_count, 0);
}

#[sqlx::test]
async fn index_paginates_in_tens_and_clamps(pool: PgPool) {
    let app = create_test_app(pool.clone()).await;
    let (_token, author_id) = register_and_login(&app, "alice").await;

    for i in 0..25 {
        let pub_date = Utc::now() - Duration::minutes(i + 1);
        insert_post(&pool, author_id, &format!("post {i}"), true, pub_date, None).await;
    }

    let response = get(&app, "/?page=1", None).await;
    let page: Page<PostSummary> = body_json(response).await;
    assert_eq!(page.items.len(), 10);
    assert_eq!(page.page, 1);
    assert_eq!(page.total_pages, 3);
    assert_eq!(page.total_items, 25);

    let response = get(&app, "/?page=3", None).await;
    let page: Page<PostSummary> = body_json(response).await;
    assert_eq!(page.items.len(), 5);
    assert_eq!(page.page, 3);

    // Past the end clamps to the last page instead of returning nothing.
    let response = get(&app, "/?page=4", None).await;
    let page: Page<PostSummary> = body_json(response).await;
    assert_eq!(page.page, 3);
    assert_eq!(page.items.len(), 5);
}

// --- Detail visibility ---

#[sqlx::test]
async fn unpublished_post_is_404_except_for_author(pool: PgPool) {
    let app = create_test_app(pool.clone()).await;
    let (alice_token, alice_id) = register_and_login(&app, "alice").await;
    let (bob_token, _bob_id) = register_and_login(&app, "bob").await;

    let post_id = insert_post(&pool, alice_id, "draft", false, Utc::now(), None).await;
    let uri = format!("/posts/{post_id}");

    let response = get(&app, &uri, None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = get(&app, &uri, Some(&bob_token)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = get(&app, &uri, Some(&alice_token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let detail: PostDetail = body_json(response).await;
    assert_eq!(detail.post.id, post_id);
}

#[sqlx::test]
async fn future_dated_post_is_404_for_non_author(pool: PgPool) {
    let app = create_test_app(pool.clone()).await;
    let (alice_token, alice_id) = register_and_login(&app, "alice").await;

    let post_id = insert_post(
        &pool,
        alice_id,
        "scheduled",
        true,
        Utc::now() + Duration::days(3),
        None,
    )
    .await;
    let uri = format!("/posts/{post_id}");

    let response = get(&app, &uri, None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = get(&app, &uri, Some(&alice_token)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[sqlx::test]
async fn missing_post_is_404(pool: PgPool) {
    let app = create_test_app(pool).await;
    let response = get(&app, &format!("/posts/{}", Uuid::new_v4()), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// --- Create ---

#[sqlx::test]
async fn create_post_persists_and_redirects_to_profile(pool: PgPool) {
    let app = create_test_app(pool.clone()).await;
    let (token, author_id) = register_and_login(&app, "alice").await;

    let response = submit_post_form(
        &app,
        "/posts/create",
        &token,
        &[("title", "My first post"), ("text", "Hello, world!")],
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location_of(&response), "/profile/alice");

    let (title, saved_author): (String, Uuid) =
        sqlx::query_as("SELECT title, author_id FROM posts WHERE title = $1")
            .bind("My first post")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(title, "My first post");
    assert_eq!(saved_author, author_id);
}

#[sqlx::test]
async fn create_post_without_title_is_rejected(pool: PgPool) {
    let app = create_test_app(pool.clone()).await;
    let (token, _author_id) = register_and_login(&app, "alice").await;

    let response =
        submit_post_form(&app, "/posts/create", &token, &[("text", "No title here")]).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: serde_json::Value = body_json(response).await;
    assert_eq!(body["errors"][0]["field"], "title");

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[sqlx::test]
async fn create_post_with_overlong_title_is_rejected(pool: PgPool) {
    let app = create_test_app(pool.clone()).await;
    let (token, _author_id) = register_and_login(&app, "alice").await;

    let title = "x".repeat(257);
    let response = submit_post_form(
        &app,
        "/posts/create",
        &token,
        &[("title", title.as_str()), ("text", "body")],
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: serde_json::Value = body_json(response).await;
    assert_eq!(body["errors"][0]["field"], "title");

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[sqlx::test]
async fn create_post_accepts_date_only_pub_date(pool: PgPool) {
    let app = create_test_app(pool.clone()).await;
    let (token, _author_id) = register_and_login(&app, "alice").await;

    let response = submit_post_form(
        &app,
        "/posts/create",
        &token,
        &[
            ("title", "dated"),
            ("text", "body"),
            ("pub_date", "2026-01-15"),
        ],
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let pub_date: DateTime<Utc> =
        sqlx::query_scalar("SELECT pub_date FROM posts WHERE title = 'dated'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(pub_date, Utc.with_ymd_and_hms(2026, 1, 15, 0, 0, 0).unwrap());
}

#[sqlx::test]
async fn create_post_with_unknown_category_is_rejected(pool: PgPool) {
    let app = create_test_app(pool.clone()).await;
    let (token, _author_id) = register_and_login(&app, "alice").await;

    let bogus = Uuid::new_v4().to_string();
    let response = submit_post_form(
        &app,
        "/posts/create",
        &token,
        &[("title", "t"), ("text", "x"), ("category", &bogus)],
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[sqlx::test]
async fn create_post_requires_auth(pool: PgPool) {
    let app = create_test_app(pool).await;
    let response = submit_post_form(
        &app,
        "/posts/create",
        "not-a-real-token",
        &[("title", "t"), ("text", "x")],
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// --- Ownership-gated mutation ---

#[sqlx::test]
async fn edit_by_non_author_redirects_without_mutating(pool: PgPool) {
    let app = create_test_app(pool.clone()).await;
    let (_alice_token, alice_id) = register_and_login(&app, "alice").await;
    let (bob_token, _bob_id) = register_and_login(&app, "bob").await;

    let post_id = insert_post(&pool, alice_id, "original title", true, Utc::now(), None).await;

    let response = submit_post_form(
        &app,
        &format!("/posts/{post_id}/edit"),
        &bob_token,
        &[("title", "hijacked"), ("text", "pwned")],
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location_of(&response), format!("/posts/{post_id}"));

    let title: String = sqlx::query_scalar("SELECT title FROM posts WHERE id = $1")
        .bind(post_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(title, "original title");
}

#[sqlx::test]
async fn edit_by_author_updates_post(pool: PgPool) {
    let app = create_test_app(pool.clone()).await;
    let (token, author_id) = register_and_login(&app, "alice").await;

    let post_id = insert_post(&pool, author_id, "before", true, Utc::now(), None).await;

    let response = submit_post_form(
        &app,
        &format!("/posts/{post_id}/edit"),
        &token,
        &[("title", "after"), ("text", "updated text")],
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let (title, text): (String, String) =
        sqlx::query_as("SELECT title, text FROM posts WHERE id = $1")
            .bind(post_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(title, "after");
    assert_eq!(text, "updated text");
}

#[sqlx::test]
async fn edit_replacing_image_swaps_the_stored_file(pool: PgPool) {
    let app = create_test_app(pool.clone()).await;
    let (token, _author_id) = register_and_login(&app, "alice").await;

    let response = submit_post_form_with_image(
        &app,
        "/posts/create",
        &token,
        &[("title", "with image"), ("text", "body")],
        "first.png",
        b"first bytes",
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let (post_id, old_url): (Uuid, String) =
        sqlx::query_as("SELECT id, image_url FROM posts WHERE title = 'with image'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert!(old_url.starts_with("/media/"));
    assert!(media_file_exists(&old_url));

    let response = submit_post_form_with_image(
        &app,
        &format!("/posts/{post_id}/edit"),
        &token,
        &[("title", "with image"), ("text", "body")],
        "second.png",
        b"second bytes",
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let new_url: String = sqlx::query_scalar("SELECT image_url FROM posts WHERE id = $1")
        .bind(post_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_ne!(new_url, old_url);
    assert!(media_file_exists(&new_url));
    assert!(!media_file_exists(&old_url));
}

#[sqlx::test]
async fn delete_by_non_author_redirects_without_mutating(pool: PgPool) {
    let app = create_test_app(pool.clone()).await;
    let (_alice_token, alice_id) = register_and_login(&app, "alice").await;
    let (bob_token, _bob_id) = register_and_login(&app, "bob").await;

    let post_id = insert_post(&pool, alice_id, "keep me", true, Utc::now(), None).await;

    let response = common::helpers::post_json(
        &app,
        &format!("/posts/{post_id}/delete"),
        Some(&bob_token),
        serde_json::json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location_of(&response), "/");

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE id = $1")
        .bind(post_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[sqlx::test]
async fn delete_by_author_removes_post_and_comments(pool: PgPool) {
    let app = create_test_app(pool.clone()).await;
    let (token, author_id) = register_and_login(&app, "alice").await;

    let post_id = insert_post(&pool, author_id, "goodbye", true, Utc::now(), None).await;
    insert_comment(&pool, post_id, author_id, "a comment").await;

    let response = common::helpers::post_json(
        &app,
        &format!("/posts/{post_id}/delete"),
        Some(&token),
        serde_json::json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location_of(&response), "/");

    let posts: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE id = $1")
        .bind(post_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    let comments: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE post_id = $1")
        .bind(post_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(posts, 0);
    assert_eq!(comments, 0);
}

#[sqlx::test]
async fn unknown_route_is_404(pool: PgPool) {
    let app = create_test_app(pool).await;
    let response = get(&app, "/definitely/not/a/route", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

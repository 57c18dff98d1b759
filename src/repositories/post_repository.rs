use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Post, PostSummary};

// Input data for creating a new post.
pub struct CreatePostData {
    pub author_id: Uuid,
    pub title: String,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub category_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub is_published: bool,
    pub image_url: Option<String>,
}

// Input data for updating a post. `new_image_url` keeps the stored image
// when `None`; the classification fields replace the stored values outright.
pub struct UpdatePostData {
    pub title: String,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub category_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub is_published: bool,
    pub new_image_url: Option<String>,
}

const POST_COLUMNS: &str = "id, title, text, pub_date, author_id, category_id, location_id, \
                            is_published, image_url, created_at";

// Joined projection served by listings and the detail view.
const SUMMARY_SELECT: &str = r#"
    SELECT p.id, p.title, p.text, p.pub_date,
           p.author_id, u.username AS author_username,
           p.category_id, c.title AS category_title, c.is_published AS category_is_published,
           p.location_id, l.name AS location_name,
           p.is_published, p.image_url,
           (SELECT COUNT(*) FROM comments cm WHERE cm.post_id = p.id) AS comment_count
    FROM posts p
    JOIN users u ON u.id = p.author_id
    LEFT JOIN categories c ON c.id = p.category_id
    LEFT JOIN locations l ON l.id = p.location_id
"#;

// The public visibility rule: published, not future-dated, category (if any)
// itself published. Shared by every listing query.
const VISIBLE: &str =
    "p.is_published AND p.pub_date <= now() AND (p.category_id IS NULL OR c.is_published)";

/// Counts posts visible to the public.
pub async fn count_visible(pool: &PgPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(&format!(
        "SELECT COUNT(*) FROM posts p LEFT JOIN categories c ON c.id = p.category_id WHERE {VISIBLE}"
    ))
    .fetch_one(pool)
    .await
}

/// Fetches one page of publicly visible posts, newest first.
pub async fn list_visible(
    pool: &PgPool,
    limit: u64,
    offset: u64,
) -> Result<Vec<PostSummary>, sqlx::Error> {
    sqlx::query_as::<_, PostSummary>(&format!(
        "{SUMMARY_SELECT} WHERE {VISIBLE} ORDER BY p.pub_date DESC LIMIT $1 OFFSET $2"
    ))
    .bind(limit as i64)
    .bind(offset as i64)
    .fetch_all(pool)
    .await
}

pub async fn count_visible_in_category(
    pool: &PgPool,
    category_id: Uuid,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(&format!(
        "SELECT COUNT(*) FROM posts p LEFT JOIN categories c ON c.id = p.category_id \
         WHERE p.category_id = $1 AND {VISIBLE}"
    ))
    .bind(category_id)
    .fetch_one(pool)
    .await
}

pub async fn list_visible_in_category(
    pool: &PgPool,
    category_id: Uuid,
    limit: u64,
    offset: u64,
) -> Result<Vec<PostSummary>, sqlx::Error> {
    sqlx::query_as::<_, PostSummary>(&format!(
        "{SUMMARY_SELECT} WHERE p.category_id = $1 AND {VISIBLE} \
         ORDER BY p.pub_date DESC LIMIT $2 OFFSET $3"
    ))
    .bind(category_id)
    .bind(limit as i64)
    .bind(offset as i64)
    .fetch_all(pool)
    .await
}

/// Counts an author's posts. With `only_visible` the public visibility rule
/// applies; without it every post counts (the author viewing their own
/// profile).
pub async fn count_by_author(
    pool: &PgPool,
    author_id: Uuid,
    only_visible: bool,
) -> Result<i64, sqlx::Error> {
    let predicate = if only_visible { VISIBLE } else { "TRUE" };
    sqlx::query_scalar::<_, i64>(&format!(
        "SELECT COUNT(*) FROM posts p LEFT JOIN categories c ON c.id = p.category_id \
         WHERE p.author_id = $1 AND {predicate}"
    ))
    .bind(author_id)
    .fetch_one(pool)
    .await
}

pub async fn list_by_author(
    pool: &PgPool,
    author_id: Uuid,
    only_visible: bool,
    limit: u64,
    offset: u64,
) -> Result<Vec<PostSummary>, sqlx::Error> {
    let predicate = if only_visible { VISIBLE } else { "TRUE" };
    sqlx::query_as::<_, PostSummary>(&format!(
        "{SUMMARY_SELECT} WHERE p.author_id = $1 AND {predicate} \
         ORDER BY p.pub_date DESC LIMIT $2 OFFSET $3"
    ))
    .bind(author_id)
    .bind(limit as i64)
    .bind(offset as i64)
    .fetch_all(pool)
    .await
}

/// Fetches the joined summary for a single post, visible or not. The caller
/// decides whether the viewer may see it.
pub async fn get_post_summary(
    pool: &PgPool,
    post_id: Uuid,
) -> Result<Option<PostSummary>, sqlx::Error> {
    sqlx::query_as::<_, PostSummary>(&format!("{SUMMARY_SELECT} WHERE p.id = $1"))
        .bind(post_id)
        .fetch_optional(pool)
        .await
}

pub async fn get_post_by_id(pool: &PgPool, post_id: Uuid) -> Result<Option<Post>, sqlx::Error> {
    sqlx::query_as::<_, Post>(&format!("SELECT {POST_COLUMNS} FROM posts WHERE id = $1"))
        .bind(post_id)
        .fetch_optional(pool)
        .await
}

/// Fetches only the author of a post, for ownership checks before mutation.
pub async fn get_post_author(pool: &PgPool, post_id: Uuid) -> Result<Option<Uuid>, sqlx::Error> {
    sqlx::query_scalar::<_, Uuid>("SELECT author_id FROM posts WHERE id = $1")
        .bind(post_id)
        .fetch_optional(pool)
        .await
}

/// Inserts a new post.
pub async fn create_post(pool: &PgPool, data: CreatePostData) -> Result<Post, sqlx::Error> {
    sqlx::query_as::<_, Post>(&format!(
        r#"
        INSERT INTO posts (author_id, title, text, pub_date, category_id, location_id,
                           is_published, image_url)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING {POST_COLUMNS}
        "#
    ))
    .bind(data.author_id)
    .bind(data.title)
    .bind(data.text)
    .bind(data.pub_date)
    .bind(data.category_id)
    .bind(data.location_id)
    .bind(data.is_published)
    .bind(data.image_url)
    .fetch_one(pool)
    .await
}

/// Updates an existing post. Ownership is checked by the handler.
pub async fn update_post(
    pool: &PgPool,
    post_id: Uuid,
    data: UpdatePostData,
) -> Result<Option<Post>, sqlx::Error> {
    sqlx::query_as::<_, Post>(&format!(
        r#"
        UPDATE posts
        SET title = $1, text = $2, pub_date = $3, category_id = $4, location_id = $5,
            is_published = $6, image_url = COALESCE($7, image_url)
        WHERE id = $8
        RETURNING {POST_COLUMNS}
        "#
    ))
    .bind(data.title)
    .bind(data.text)
    .bind(data.pub_date)
    .bind(data.category_id)
    .bind(data.location_id)
    .bind(data.is_published)
    .bind(data.new_image_url)
    .bind(post_id)
    .fetch_optional(pool)
    .await
}

/// Deletes a post; comments go with it via the cascade. Returns rows
/// affected.
pub async fn delete_post(pool: &PgPool, post_id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM posts WHERE id = $1")
        .bind(post_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

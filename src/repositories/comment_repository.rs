use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Comment;

const COMMENT_SELECT: &str = r#"
    SELECT cm.id, cm.post_id, cm.author_id, u.username AS author_username,
           cm.text, cm.created_at
    FROM comments cm
    JOIN users u ON u.id = cm.author_id
"#;

/// Fetches all comments under a post, oldest first.
pub async fn list_comments_for_post(
    pool: &PgPool,
    post_id: Uuid,
) -> Result<Vec<Comment>, sqlx::Error> {
    sqlx::query_as::<_, Comment>(&format!(
        "{COMMENT_SELECT} WHERE cm.post_id = $1 ORDER BY cm.created_at ASC"
    ))
    .bind(post_id)
    .fetch_all(pool)
    .await
}

/// Fetches a comment scoped to its post, so a comment id from another post's
/// URL does not resolve.
pub async fn get_comment(
    pool: &PgPool,
    comment_id: Uuid,
    post_id: Uuid,
) -> Result<Option<Comment>, sqlx::Error> {
    sqlx::query_as::<_, Comment>(&format!(
        "{COMMENT_SELECT} WHERE cm.id = $1 AND cm.post_id = $2"
    ))
    .bind(comment_id)
    .bind(post_id)
    .fetch_optional(pool)
    .await
}

pub async fn create_comment(
    pool: &PgPool,
    post_id: Uuid,
    author_id: Uuid,
    text: &str,
) -> Result<Comment, sqlx::Error> {
    let comment_id = sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO comments (post_id, author_id, text)
        VALUES ($1, $2, $3)
        RETURNING id
        "#,
    )
    .bind(post_id)
    .bind(author_id)
    .bind(text)
    .fetch_one(pool)
    .await?;

    // Re-read through the join to pick up the author username.
    let comment = sqlx::query_as::<_, Comment>(&format!("{COMMENT_SELECT} WHERE cm.id = $1"))
        .bind(comment_id)
        .fetch_one(pool)
        .await?;
    Ok(comment)
}

pub async fn update_comment(
    pool: &PgPool,
    comment_id: Uuid,
    text: &str,
) -> Result<Option<Comment>, sqlx::Error> {
    let updated = sqlx::query_scalar::<_, Uuid>(
        "UPDATE comments SET text = $1 WHERE id = $2 RETURNING id",
    )
    .bind(text)
    .bind(comment_id)
    .fetch_optional(pool)
    .await?;

    match updated {
        Some(id) => {
            let comment =
                sqlx::query_as::<_, Comment>(&format!("{COMMENT_SELECT} WHERE cm.id = $1"))
                    .bind(id)
                    .fetch_optional(pool)
                    .await?;
            Ok(comment)
        }
        None => Ok(None),
    }
}

/// Deletes a comment. Returns rows affected.
pub async fn delete_comment(pool: &PgPool, comment_id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM comments WHERE id = $1")
        .bind(comment_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

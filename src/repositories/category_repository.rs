use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Category;

const CATEGORY_COLUMNS: &str = "id, title, slug, description, is_published, created_at";

/// Fetches a category by slug, published or not.
pub async fn get_category_by_slug(
    pool: &PgPool,
    slug: &str,
) -> Result<Option<Category>, sqlx::Error> {
    sqlx::query_as::<_, Category>(&format!(
        "SELECT {CATEGORY_COLUMNS} FROM categories WHERE slug = $1"
    ))
    .bind(slug)
    .fetch_optional(pool)
    .await
}

pub async fn get_category_by_id(
    pool: &PgPool,
    category_id: Uuid,
) -> Result<Option<Category>, sqlx::Error> {
    sqlx::query_as::<_, Category>(&format!(
        "SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1"
    ))
    .bind(category_id)
    .fetch_optional(pool)
    .await
}

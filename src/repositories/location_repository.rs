use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Location;

const LOCATION_COLUMNS: &str = "id, name, is_published, created_at";

pub async fn get_location_by_id(
    pool: &PgPool,
    location_id: Uuid,
) -> Result<Option<Location>, sqlx::Error> {
    sqlx::query_as::<_, Location>(&format!(
        "SELECT {LOCATION_COLUMNS} FROM locations WHERE id = $1"
    ))
    .bind(location_id)
    .fetch_optional(pool)
    .await
}

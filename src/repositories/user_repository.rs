use sqlx::PgPool;
use uuid::Uuid;

use crate::models::User;

pub struct CreateUserData {
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub password_hash: String,
}

const USER_COLUMNS: &str = "id, username, email, display_name, password_hash, created_at";

/// Inserts a new user row. Fails with a unique violation when the username
/// is taken.
pub async fn create_user(pool: &PgPool, data: CreateUserData) -> Result<User, sqlx::Error> {
    let user = sqlx::query_as::<_, User>(&format!(
        r#"
        INSERT INTO users (username, email, display_name, password_hash)
        VALUES ($1, $2, $3, $4)
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(data.username)
    .bind(data.email)
    .bind(data.display_name)
    .bind(data.password_hash)
    .fetch_one(pool)
    .await?;
    Ok(user)
}

pub async fn get_user_by_username(
    pool: &PgPool,
    username: &str,
) -> Result<Option<User>, sqlx::Error> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
    ))
    .bind(username)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

/// Updates the profile fields a user may edit about themselves. Fields left
/// as `None` keep their current value.
pub async fn update_profile(
    pool: &PgPool,
    user_id: Uuid,
    display_name: Option<&str>,
    email: Option<&str>,
) -> Result<Option<User>, sqlx::Error> {
    let user = sqlx::query_as::<_, User>(&format!(
        r#"
        UPDATE users
        SET display_name = COALESCE($1, display_name),
            email = COALESCE($2, email)
        WHERE id = $3
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(display_name)
    .bind(email)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

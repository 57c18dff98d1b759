use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A registered author. The full row (including the password hash) never
/// leaves the server; responses carry [`PublicUser`] instead.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            display_name: user.display_name,
            created_at: user.created_at,
        }
    }
}

/// A classification a post can be filed under. Unpublished categories hide
/// every post filed under them.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Location {
    pub id: Uuid,
    pub name: String,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
}

/// A blog post as stored. `image_url` points under the media base URL when
/// an image was uploaded with the post.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub author_id: Uuid,
    pub category_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub is_published: bool,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A post row joined with its author, category and comment count, as served
/// by the listing and detail endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PostSummary {
    pub id: Uuid,
    pub title: String,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub author_id: Uuid,
    pub author_username: String,
    pub category_id: Option<Uuid>,
    pub category_title: Option<String>,
    pub category_is_published: Option<bool>,
    pub location_id: Option<Uuid>,
    pub location_name: Option<String>,
    pub is_published: bool,
    pub image_url: Option<String>,
    pub comment_count: i64,
}

impl PostSummary {
    /// Whether the post is visible to the public: published, not
    /// future-dated, and its category (if any) published.
    pub fn is_visible(&self, now: DateTime<Utc>) -> bool {
        self.is_published && self.pub_date <= now && self.category_is_published.unwrap_or(true)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub author_username: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Response body for the single-post view.
#[derive(Debug, Serialize, Deserialize)]
pub struct PostDetail {
    pub post: PostSummary,
    pub comments: Vec<Comment>,
}

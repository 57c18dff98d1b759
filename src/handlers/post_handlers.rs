use axum::{
    extract::{multipart::Field, Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Redirect, Response},
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    auth::AuthenticatedUser,
    handlers::{error_response, validation_error, FieldError},
    models::PostDetail,
    repositories::{
        category_repository, comment_repository, location_repository,
        post_repository::{self, CreatePostData, UpdatePostData},
    },
    utils::{clamp_page, page_offset, total_pages, Page, PageParams, PAGE_SIZE},
    AppState,
};

const MAX_TITLE_LENGTH: usize = 256;
const MAX_IMAGE_SIZE_MB: u64 = 10;
const MAX_IMAGE_SIZE_BYTES: u64 = MAX_IMAGE_SIZE_MB * 1024 * 1024;

#[derive(Debug)]
struct TempImageField {
    filename: Option<String>,
    content_type: Option<String>,
    data: Vec<u8>,
}

/// Raw fields collected from the post form before validation.
#[derive(Debug, Default)]
struct PostFormFields {
    title: Option<String>,
    text: Option<String>,
    pub_date: Option<String>,
    category: Option<String>,
    location: Option<String>,
    is_published: Option<String>,
    image: Option<TempImageField>,
}

/// Post form after validation, ready to persist.
struct ValidatedPostForm {
    title: String,
    text: String,
    pub_date: DateTime<Utc>,
    category_id: Option<Uuid>,
    location_id: Option<Uuid>,
    is_published: bool,
    image: Option<TempImageField>,
}

async fn read_text_field(field: Field<'_>, name: &'static str) -> Result<String, Response> {
    field.text().await.map_err(|e| {
        error_response(
            StatusCode::BAD_REQUEST,
            &format!("Failed to read {} field: {}", name, e),
        )
    })
}

/// Drains the multipart stream into [`PostFormFields`]. Unknown parts are
/// ignored.
async fn collect_post_form(multipart: &mut Multipart) -> Result<PostFormFields, Response> {
    let mut form = PostFormFields::default();

    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                let field_name = match field.name() {
                    Some(name) => name.to_string(),
                    None => continue,
                };

                match field_name.as_str() {
                    "title" => form.title = Some(read_text_field(field, "title").await?),
                    "text" => form.text = Some(read_text_field(field, "text").await?),
                    "pub_date" => form.pub_date = Some(read_text_field(field, "pub_date").await?),
                    "category" => form.category = Some(read_text_field(field, "category").await?),
                    "location" => form.location = Some(read_text_field(field, "location").await?),
                    "is_published" => {
                        form.is_published = Some(read_text_field(field, "is_published").await?)
                    }
                    "image" => {
                        let filename = field.file_name().map(|s| s.to_string());
                        let content_type = field.content_type().map(|s| s.to_string());
                        match field.bytes().await {
                            Ok(data) => {
                                if data.len() as u64 > MAX_IMAGE_SIZE_BYTES {
                                    return Err(error_response(
                                        StatusCode::PAYLOAD_TOO_LARGE,
                                        &format!(
                                            "Image size exceeds limit ({} MB)",
                                            MAX_IMAGE_SIZE_MB
                                        ),
                                    ));
                                }
                                form.image = Some(TempImageField {
                                    filename,
                                    content_type,
                                    data: data.to_vec(),
                                });
                            }
                            Err(e) => {
                                return Err(error_response(
                                    StatusCode::BAD_REQUEST,
                                    &format!("Failed to read image data: {}", e),
                                ))
                            }
                        }
                    }
                    _ => { /* Ignore */ }
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "Multipart processing error");
                if e.to_string().contains("body limit exceeded") {
                    return Err(error_response(
                        StatusCode::PAYLOAD_TOO_LARGE,
                        "Total upload size limit exceeded",
                    ));
                }
                return Err(error_response(
                    StatusCode::BAD_REQUEST,
                    &format!("Multipart processing error: {}", e),
                ));
            }
        }
    }

    Ok(form)
}

/// Accepts RFC 3339 or the plain `YYYY-MM-DD` the date widget submits.
fn parse_pub_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    raw.parse::<NaiveDate>()
        .ok()
        .map(|date| DateTime::from_naive_utc_and_offset(date.and_time(NaiveTime::MIN), Utc))
}

fn parse_bool_field(raw: &str) -> Option<bool> {
    match raw.trim() {
        "true" | "on" | "1" => Some(true),
        "false" | "off" | "0" => Some(false),
        _ => None,
    }
}

/// Field-level validation plus resolution of the category/location
/// references. Returns a 422 response when anything fails.
async fn validate_post_form(state: &AppState, form: PostFormFields) -> Result<ValidatedPostForm, Response> {
    let mut errors: Vec<FieldError> = Vec::new();

    let title = form.title.as_deref().unwrap_or("").trim().to_string();
    if title.is_empty() {
        errors.push(FieldError::new("title", "Title is required"));
    } else if title.chars().count() > MAX_TITLE_LENGTH {
        errors.push(FieldError::new(
            "title",
            format!("Title exceeds maximum length of {} characters", MAX_TITLE_LENGTH),
        ));
    }

    let text = form.text.as_deref().unwrap_or("").trim().to_string();
    if text.is_empty() {
        errors.push(FieldError::new("text", "Text is required"));
    }

    let pub_date = match form.pub_date.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => match parse_pub_date(raw) {
            Some(dt) => dt,
            None => {
                errors.push(FieldError::new(
                    "pub_date",
                    "Enter a date as YYYY-MM-DD or RFC 3339",
                ));
                Utc::now()
            }
        },
        None => Utc::now(),
    };

    let category_id = match form.category.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => match Uuid::parse_str(raw) {
            Ok(id) => match category_repository::get_category_by_id(&state.db_pool, id).await {
                Ok(Some(_)) => Some(id),
                Ok(None) => {
                    errors.push(FieldError::new("category", "Unknown category"));
                    None
                }
                Err(e) => {
                    error!(error = %e, category_id = %id, "DB error resolving category");
                    return Err(error_response(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Error resolving category",
                    ));
                }
            },
            Err(_) => {
                errors.push(FieldError::new("category", "Invalid category id"));
                None
            }
        },
        None => None,
    };

    let location_id = match form.location.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => match Uuid::parse_str(raw) {
            Ok(id) => match location_repository::get_location_by_id(&state.db_pool, id).await {
                Ok(Some(_)) => Some(id),
                Ok(None) => {
                    errors.push(FieldError::new("location", "Unknown location"));
                    None
                }
                Err(e) => {
                    error!(error = %e, location_id = %id, "DB error resolving location");
                    return Err(error_response(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Error resolving location",
                    ));
                }
            },
            Err(_) => {
                errors.push(FieldError::new("location", "Invalid location id"));
                None
            }
        },
        None => None,
    };

    // Absent checkbox means the model default: published.
    let is_published = match form.is_published.as_deref() {
        Some(raw) => match parse_bool_field(raw) {
            Some(value) => value,
            None => {
                errors.push(FieldError::new("is_published", "Expected a boolean"));
                true
            }
        },
        None => true,
    };

    if let Some(image) = &form.image {
        let is_image = image
            .content_type
            .as_deref()
            .map(|ct| ct.starts_with("image/"))
            .unwrap_or(false);
        if !is_image {
            errors.push(FieldError::new("image", "Upload must be an image"));
        }
    }

    if !errors.is_empty() {
        return Err(validation_error(errors));
    }

    Ok(ValidatedPostForm {
        title,
        text,
        pub_date,
        category_id,
        location_id,
        is_published,
        image: form.image,
    })
}

/// Handler for `GET /`. Returns a page of publicly visible posts, newest
/// first.
pub async fn list_posts_handler(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Response {
    let total_items = match post_repository::count_visible(&state.db_pool).await {
        Ok(count) => count as u64,
        Err(e) => {
            error!(error = %e, "Failed to count visible posts");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch posts");
        }
    };

    let page = clamp_page(params.page(), total_items);
    match post_repository::list_visible(&state.db_pool, PAGE_SIZE, page_offset(page)).await {
        Ok(items) => Json(Page {
            items,
            page,
            total_pages: total_pages(total_items),
            total_items,
        })
        .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to fetch visible posts");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch posts")
        }
    }
}

/// Handler for `GET /posts/:post_id`. Returns a single post with its
/// comments. A post failing the visibility check is 404 to everyone but its
/// author.
pub async fn post_detail_handler(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    user: Option<AuthenticatedUser>,
) -> Response {
    let summary = match post_repository::get_post_summary(&state.db_pool, post_id).await {
        Ok(Some(summary)) => summary,
        Ok(None) => return error_response(StatusCode::NOT_FOUND, "Post not found"),
        Err(e) => {
            error!(error = %e, post_id = %post_id, "Failed to fetch post");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch post");
        }
    };

    let is_author = user
        .as_ref()
        .map(|u| u.id == summary.author_id)
        .unwrap_or(false);
    if !summary.is_visible(Utc::now()) && !is_author {
        return error_response(StatusCode::NOT_FOUND, "Post not found");
    }

    match comment_repository::list_comments_for_post(&state.db_pool, post_id).await {
        Ok(comments) => Json(PostDetail {
            post: summary,
            comments,
        })
        .into_response(),
        Err(e) => {
            error!(error = %e, post_id = %post_id, "Failed to fetch comments for post");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch comments")
        }
    }
}

/// Handler for `POST /posts/create`. Accepts the multipart post form and
/// redirects to the author's profile on success.
pub async fn create_post_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    mut multipart: Multipart,
) -> Response {
    let form = match collect_post_form(&mut multipart).await {
        Ok(form) => form,
        Err(response) => return response,
    };
    let validated = match validate_post_form(&state, form).await {
        Ok(validated) => validated,
        Err(response) => return response,
    };

    let image_url = match validated.image {
        Some(image) => {
            let filename_for_log = image.filename.clone();
            match state
                .image_storage
                .save_image(image.data.into(), image.filename)
                .await
            {
                Ok(url) => Some(url),
                Err(e) => {
                    error!(error = %e, filename = ?filename_for_log, "Failed to save image during post creation");
                    return error_response(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Failed to save image",
                    );
                }
            }
        }
        None => None,
    };

    let post_data = CreatePostData {
        author_id: user.id,
        title: validated.title,
        text: validated.text,
        pub_date: validated.pub_date,
        category_id: validated.category_id,
        location_id: validated.location_id,
        is_published: validated.is_published,
        image_url,
    };

    match post_repository::create_post(&state.db_pool, post_data).await {
        Ok(post) => {
            info!(post_id = %post.id, author_id = %user.id, "Created post");
            Redirect::to(&format!("/profile/{}", user.username)).into_response()
        }
        Err(e) => {
            error!(error = %e, author_id = %user.id, "Failed to create post");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to create post")
        }
    }
}

/// Handler for `POST /posts/:post_id/edit`. Only the author may edit; anyone
/// else is quietly redirected to the post without changes.
pub async fn edit_post_handler(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    user: AuthenticatedUser,
    mut multipart: Multipart,
) -> Response {
    let existing = match post_repository::get_post_by_id(&state.db_pool, post_id).await {
        Ok(Some(post)) => post,
        Ok(None) => return error_response(StatusCode::NOT_FOUND, "Post not found"),
        Err(e) => {
            error!(error = %e, post_id = %post_id, "Failed to fetch post for edit");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Error fetching post");
        }
    };

    if existing.author_id != user.id {
        warn!(post_id = %post_id, user_id = %user.id, actual_author = %existing.author_id,
              "User attempted to edit a post they did not write");
        return Redirect::to(&format!("/posts/{}", post_id)).into_response();
    }

    let form = match collect_post_form(&mut multipart).await {
        Ok(form) => form,
        Err(response) => return response,
    };
    let validated = match validate_post_form(&state, form).await {
        Ok(validated) => validated,
        Err(response) => return response,
    };

    let new_image_url = match validated.image {
        Some(image) => {
            let filename_for_log = image.filename.clone();
            match state
                .image_storage
                .save_image(image.data.into(), image.filename)
                .await
            {
                Ok(url) => Some(url),
                Err(e) => {
                    error!(error = %e, filename = ?filename_for_log, "Failed to save replacement image");
                    return error_response(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Failed to save image",
                    );
                }
            }
        }
        None => None,
    };

    let replaced_image = new_image_url.is_some();
    let update_data = UpdatePostData {
        title: validated.title,
        text: validated.text,
        pub_date: validated.pub_date,
        category_id: validated.category_id,
        location_id: validated.location_id,
        is_published: validated.is_published,
        new_image_url,
    };

    match post_repository::update_post(&state.db_pool, post_id, update_data).await {
        Ok(Some(updated)) => {
            // The old file is only orphaned once the row points at the
            // replacement, so drop it after the update, best-effort.
            if replaced_image {
                if let Some(old_url) = &existing.image_url {
                    if let Err(e) = state.image_storage.delete_image(old_url).await {
                        warn!(error = %e, post_id = %post_id, "Failed to remove replaced image file");
                    }
                }
            }
            info!(post_id = %updated.id, "Updated post");
            Redirect::to(&format!("/posts/{}", post_id)).into_response()
        }
        Ok(None) => {
            warn!(post_id = %post_id, "Post disappeared during update");
            error_response(StatusCode::NOT_FOUND, "Post not found during update")
        }
        Err(e) => {
            error!(error = %e, post_id = %post_id, "Failed to update post");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to update post")
        }
    }
}

/// Handler for `POST /posts/:post_id/delete`. Only the author may delete;
/// anyone else is redirected home without changes.
pub async fn delete_post_handler(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    user: AuthenticatedUser,
) -> Response {
    let existing = match post_repository::get_post_by_id(&state.db_pool, post_id).await {
        Ok(Some(post)) => post,
        Ok(None) => return error_response(StatusCode::NOT_FOUND, "Post not found"),
        Err(e) => {
            error!(error = %e, post_id = %post_id, "Failed to fetch post before deletion");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Error fetching post");
        }
    };

    if existing.author_id != user.id {
        warn!(post_id = %post_id, user_id = %user.id, actual_author = %existing.author_id,
              "User attempted to delete a post they did not write");
        return Redirect::to("/").into_response();
    }

    match post_repository::delete_post(&state.db_pool, post_id).await {
        Ok(1) => {
            if let Some(image_url) = &existing.image_url {
                if let Err(e) = state.image_storage.delete_image(image_url).await {
                    warn!(error = %e, post_id = %post_id, "Failed to remove image of deleted post");
                }
            }
            info!(post_id = %post_id, deleted_by = %user.id, "Deleted post");
            Redirect::to("/").into_response()
        }
        Ok(_) => {
            warn!(post_id = %post_id, "Post already gone during delete (0 rows affected)");
            error_response(StatusCode::NOT_FOUND, "Post not found")
        }
        Err(e) => {
            error!(error = %e, post_id = %post_id, "Failed to delete post");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to delete post")
        }
    }
}

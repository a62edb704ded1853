// Post handlers
// HTTP handlers for post management operations

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use tracing::info;

use crate::{
    auth::AuthUser,
    db::PostChanges,
    error::{ApiError, ApiResult},
    handlers::parse_id,
    media::POSTS_FOLDER,
    models::post::{CreatePostRequest, Post, UpdatePostRequest},
    state::AppState,
    upload::MultipartForm,
};

/// Query parameters for listing posts
#[derive(Debug, Deserialize)]
pub struct ListPostsQuery {
    pub user_id: Option<String>,
}

async fn load_owned_post(state: &AppState, auth_user: AuthUser, post_id: &str) -> ApiResult<Post> {
    let post = state.db.get_post_by_id(parse_id(post_id, "post")?).await?;

    if !post.is_authored_by(auth_user.id) {
        return Err(ApiError::forbidden("You can only modify your own posts"));
    }

    Ok(post)
}

/// Create a new post
/// POST /api/posts (multipart: title, content, optional image)
pub async fn create_post(
    State(state): State<AppState>,
    auth_user: AuthUser,
    form: MultipartForm,
) -> ApiResult<impl IntoResponse> {
    let request = CreatePostRequest::from_form(&form);
    request.validate().map_err(ApiError::Validation)?;

    info!("Creating new post for user_id: {} with title: {}", auth_user.id, request.title);

    let image = match form.file("image") {
        Some(file) => Some(state.media.upload_image(file, POSTS_FOLDER).await?),
        None => None,
    };

    let mut post = request.into_post(auth_user.id);
    if let Some(ref image) = image {
        post.image_url = Some(image.secure_url.clone());
        post.image_public_id = Some(image.public_id.clone());
    }

    let post = match state.db.create_post(post).await {
        Ok(post) => post,
        Err(e) => {
            if let Some(image) = image {
                state.media.destroy_quietly(&image.public_id).await;
            }
            return Err(e);
        }
    };

    info!("Successfully created post with id: {}", post.id);
    Ok((StatusCode::CREATED, Json(post)))
}

/// Get post by ID
/// GET /api/posts/:id
pub async fn get_post_by_id(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    info!("Fetching post with id: {}", post_id);

    let post = state.db.get_post_by_id(parse_id(&post_id, "post")?).await?;

    Ok((StatusCode::OK, Json(post)))
}

/// Get all posts, optionally filtered by user_id
/// GET /api/posts?user_id=<id>
pub async fn get_all_posts(
    State(state): State<AppState>,
    Query(params): Query<ListPostsQuery>,
) -> ApiResult<impl IntoResponse> {
    let user_id = params
        .user_id
        .as_deref()
        .map(|raw| parse_id(raw, "user"))
        .transpose()?;

    let posts = state.db.get_all_posts(user_id).await?;

    match user_id {
        Some(user_id) => info!("Retrieved {} posts for user_id: {}", posts.len(), user_id),
        None => info!("Retrieved {} posts", posts.len()),
    }

    Ok((StatusCode::OK, Json(posts)))
}

/// Update a post owned by the caller
/// PUT /api/posts/:id (multipart: title?, content?, image?)
pub async fn update_post(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(post_id): Path<String>,
    form: MultipartForm,
) -> ApiResult<impl IntoResponse> {
    let existing = load_owned_post(&state, auth_user, &post_id).await?;

    let request = UpdatePostRequest::from_form(&form);
    let new_image = form.file("image");
    request.validate(new_image.is_some()).map_err(ApiError::Validation)?;

    info!("Updating post with id: {}", existing.id);

    let image = match new_image {
        Some(file) => Some(state.media.upload_image(file, POSTS_FOLDER).await?),
        None => None,
    };

    let changes = PostChanges {
        title: request.get_normalized_title(),
        content: request.get_normalized_content(),
        image: image.clone(),
    };

    let post = match state.db.update_post(existing.id, changes).await {
        Ok(post) => post,
        Err(e) => {
            if let Some(image) = image {
                state.media.destroy_quietly(&image.public_id).await;
            }
            return Err(e);
        }
    };

    // The replaced image is only released once the row points at the new one
    if image.is_some() {
        if let Some(old_public_id) = existing.image_public_id {
            state.media.destroy_quietly(&old_public_id).await;
        }
    }

    info!("Successfully updated post with id: {}", post.id);
    Ok((StatusCode::OK, Json(post)))
}

/// Delete a post owned by the caller
/// DELETE /api/posts/:id
pub async fn delete_post(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(post_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let existing = load_owned_post(&state, auth_user, &post_id).await?;

    info!("Deleting post with id: {}", existing.id);

    state.db.delete_post(existing.id).await?;

    if let Some(public_id) = existing.image_public_id {
        state.media.destroy_quietly(&public_id).await;
    }

    info!("Successfully deleted post with id: {}", existing.id);
    Ok(StatusCode::NO_CONTENT)
}

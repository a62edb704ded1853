// User handlers
// Registration, sessions and account management

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;
use serde_json::json;
use tracing::info;

use crate::{
    auth::{self, AuthUser},
    db::UserChanges,
    error::{ApiError, ApiResult},
    extract::Payload,
    handlers::parse_id,
    media::AVATARS_FOLDER,
    models::user::{LoginRequest, RegisterRequest, UpdateUserRequest, User},
    state::AppState,
    upload::MultipartForm,
};

/// Body returned when a session is opened.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: User,
    pub token: String,
}

/// POST /api/users/register
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Payload(request): Payload<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    info!("Registering new user with email: {}", request.email);

    request.validate().map_err(ApiError::Validation)?;

    let password_hash = auth::hash_password(&request.password)?;
    let user = User::new(
        request.get_normalized_name(),
        request.get_normalized_email(),
        password_hash,
    );
    let user = state.db.create_user(user).await?;

    let token = auth::issue_token(user.id, &state.auth)?;
    let jar = jar.add(auth::session_cookie(token.clone(), &state.auth));

    info!("Successfully registered user with id: {}", user.id);
    Ok((StatusCode::CREATED, jar, Json(SessionResponse { user, token })))
}

/// POST /api/users/login
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Payload(request): Payload<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    request.validate().map_err(ApiError::Validation)?;

    let invalid = || ApiError::unauthorized("Invalid email or password");

    let user = state
        .db
        .find_user_by_email(&request.get_normalized_email())
        .await?
        .ok_or_else(invalid)?;

    if !auth::verify_password(&request.password, &user.password_hash)? {
        return Err(invalid());
    }

    let token = auth::issue_token(user.id, &state.auth)?;
    let jar = jar.add(auth::session_cookie(token.clone(), &state.auth));

    info!("User {} logged in", user.id);
    Ok((StatusCode::OK, jar, Json(SessionResponse { user, token })))
}

/// POST /api/users/logout
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    let jar = auth::clear_session(jar, &state.auth);
    (StatusCode::OK, jar, Json(json!({ "message": "Logged out" })))
}

/// GET /api/users/me
pub async fn current_user(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> ApiResult<impl IntoResponse> {
    let user = state.db.get_user_by_id(auth_user.id).await?;
    Ok((StatusCode::OK, Json(user)))
}

/// GET /api/users/:id
pub async fn get_user_by_id(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    info!("Fetching user with id: {}", user_id);

    let user = state.db.get_user_by_id(parse_id(&user_id, "user")?).await?;

    Ok((StatusCode::OK, Json(user)))
}

/// GET /api/users
pub async fn get_all_users(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    info!("Fetching all users");

    let users = state.db.get_all_users().await?;

    info!("Retrieved {} users", users.len());
    Ok((StatusCode::OK, Json(users)))
}

/// PUT /api/users/:id
pub async fn update_user(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(user_id): Path<String>,
    Payload(request): Payload<UpdateUserRequest>,
) -> ApiResult<impl IntoResponse> {
    let user_id = parse_id(&user_id, "user")?;
    auth_user.ensure_self(user_id)?;

    info!("Updating user with id: {}", user_id);
    request.validate().map_err(ApiError::Validation)?;

    let password_hash = match request.password {
        Some(ref password) => Some(auth::hash_password(password)?),
        None => None,
    };

    let changes = UserChanges {
        name: request.get_normalized_name(),
        email: request.get_normalized_email(),
        password_hash,
        avatar: None,
    };
    let user = state.db.update_user(user_id, changes).await?;

    info!("Successfully updated user with id: {}", user_id);
    Ok((StatusCode::OK, Json(user)))
}

/// PUT /api/users/:id/avatar
///
/// Expects a multipart body with an `avatar` image. The previous avatar is
/// removed from the media host once the new one is recorded.
pub async fn update_avatar(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(user_id): Path<String>,
    form: MultipartForm,
) -> ApiResult<impl IntoResponse> {
    let user_id = parse_id(&user_id, "user")?;
    auth_user.ensure_self(user_id)?;

    let file = form
        .file("avatar")
        .ok_or_else(|| ApiError::validation("An 'avatar' image file is required"))?;

    let previous = state.db.get_user_by_id(user_id).await?;
    let stored = state.media.upload_image(file, AVATARS_FOLDER).await?;

    let changes = UserChanges {
        avatar: Some(stored.clone()),
        ..UserChanges::default()
    };
    let user = match state.db.update_user(user_id, changes).await {
        Ok(user) => user,
        Err(e) => {
            state.media.destroy_quietly(&stored.public_id).await;
            return Err(e);
        }
    };

    if let Some(old_public_id) = previous.avatar_public_id {
        state.media.destroy_quietly(&old_public_id).await;
    }

    info!("Updated avatar for user {}", user_id);
    Ok((StatusCode::OK, Json(user)))
}

/// DELETE /api/users/:id
///
/// Removes the account, its posts, and every image they referenced.
pub async fn delete_user(
    State(state): State<AppState>,
    auth_user: AuthUser,
    jar: CookieJar,
    Path(user_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let user_id = parse_id(&user_id, "user")?;
    auth_user.ensure_self(user_id)?;

    info!("Deleting user with id: {}", user_id);

    let public_ids = state.db.delete_user(user_id).await?;
    for public_id in &public_ids {
        state.media.destroy_quietly(public_id).await;
    }

    let jar = auth::clear_session(jar, &state.auth);

    info!("Successfully deleted user with id: {} ({} images released)", user_id, public_ids.len());
    Ok((StatusCode::NO_CONTENT, jar))
}

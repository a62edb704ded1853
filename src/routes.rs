use axum::{
    routing::{get, post, put},
    Router,
};

use crate::{
    handlers::{
        health_check,
        posts::{create_post, delete_post, get_all_posts, get_post_by_id, update_post},
        route_not_found,
        users::{
            current_user, delete_user, get_all_users, get_user_by_id, login, logout, register,
            update_avatar, update_user,
        },
    },
    middleware::apply_request_pipeline,
    state::AppState,
};

/// Create the Axum router with all endpoints and middleware
pub fn create_router(state: AppState) -> Router {
    let router = Router::new()
        // Health check endpoint
        .route("/health", get(health_check))
        // User endpoints
        .route("/api/users", get(get_all_users))
        .route("/api/users/register", post(register))
        .route("/api/users/login", post(login))
        .route("/api/users/logout", post(logout))
        .route("/api/users/me", get(current_user))
        .route(
            "/api/users/:id",
            get(get_user_by_id).put(update_user).delete(delete_user),
        )
        .route("/api/users/:id/avatar", put(update_avatar))
        // Post endpoints
        .route("/api/posts", get(get_all_posts).post(create_post))
        .route(
            "/api/posts/:id",
            get(get_post_by_id).put(update_post).delete(delete_post),
        )
        .fallback(route_not_found)
        .with_state(state);

    apply_request_pipeline(router)
}

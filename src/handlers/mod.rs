// Handlers module
// HTTP handlers for the REST API

pub mod users;
pub mod posts;

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

/// Returns "OK" once the database answers.
pub async fn health_check(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    state.db.health_check().await?;
    Ok((StatusCode::OK, "OK"))
}

/// Fallback for unknown routes.
pub async fn route_not_found() -> ApiError {
    ApiError::not_found("Route")
}

pub(crate) fn parse_id(raw: &str, resource: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| ApiError::validation(format!("Invalid {} ID format", resource)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id() {
        let id = Uuid::new_v4();
        assert_eq!(parse_id(&id.to_string(), "post").unwrap(), id);

        match parse_id("42", "post") {
            Err(ApiError::Validation(message)) => assert_eq!(message, "Invalid post ID format"),
            other => panic!("expected validation error, got {:?}", other),
        }
    }
}

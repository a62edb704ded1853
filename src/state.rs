use std::sync::Arc;

use axum::extract::FromRef;

use crate::{config::AuthConfig, db::Database, media::MediaClient};

/// Everything a handler can reach. All of it is read-only after startup.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub media: Arc<MediaClient>,
    pub auth: Arc<AuthConfig>,
}

impl FromRef<AppState> for Arc<AuthConfig> {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

// Library root for the blog API

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod fault;
pub mod handlers;
pub mod media;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;
pub mod upload;

// Re-export commonly used types
pub use db::Database;
pub use error::ApiError;
pub use media::MediaClient;
pub use models::{User, Post};
pub use state::AppState;

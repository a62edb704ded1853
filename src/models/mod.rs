// Models module

pub mod user;
pub mod post;

pub use user::{User, RegisterRequest, LoginRequest, UpdateUserRequest};
pub use post::{Post, CreatePostRequest, UpdatePostRequest};

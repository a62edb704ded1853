use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

use crate::upload::MultipartForm;

pub const MAX_TITLE_LENGTH: usize = 200;
pub const MAX_CONTENT_LENGTH: usize = 10_000;

/// A blog post, optionally illustrated by one image held on the media host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub content: String,
    pub image_url: Option<String>,
    pub image_public_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Text part of a post creation request. Arrives as multipart fields
/// alongside the optional `image` file.
#[derive(Debug)]
pub struct CreatePostRequest {
    pub title: String,
    pub content: String,
}

#[derive(Debug)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub content: Option<String>,
}

impl Post {
    pub fn new(user_id: Uuid, title: String, content: String) -> Self {
        let now = Utc::now();

        Post {
            id: Uuid::new_v4(),
            user_id,
            title,
            content,
            image_url: None,
            image_public_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_authored_by(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }
}

impl CreatePostRequest {
    pub fn from_form(form: &MultipartForm) -> Self {
        CreatePostRequest {
            title: form.text("title").unwrap_or_default().to_string(),
            content: form.text("content").unwrap_or_default().to_string(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        validate_title(&self.title)?;
        validate_content(&self.content)?;
        Ok(())
    }

    pub fn into_post(self, user_id: Uuid) -> Post {
        Post::new(
            user_id,
            self.title.trim().to_string(),
            self.content.trim().to_string(),
        )
    }
}

impl UpdatePostRequest {
    pub fn from_form(form: &MultipartForm) -> Self {
        UpdatePostRequest {
            title: form.text("title").map(str::to_string),
            content: form.text("content").map(str::to_string),
        }
    }

    /// `has_image` lets an image-only update through the at-least-one-field rule.
    pub fn validate(&self, has_image: bool) -> Result<(), String> {
        if self.title.is_none() && self.content.is_none() && !has_image {
            return Err(
                "At least one field (title, content or image) must be provided for update".to_string(),
            );
        }

        if let Some(ref title) = self.title {
            validate_title(title)?;
        }

        if let Some(ref content) = self.content {
            validate_content(content)?;
        }

        Ok(())
    }

    pub fn get_normalized_title(&self) -> Option<String> {
        self.title.as_ref().map(|t| t.trim().to_string())
    }

    pub fn get_normalized_content(&self) -> Option<String> {
        self.content.as_ref().map(|c| c.trim().to_string())
    }
}

fn validate_title(title: &str) -> Result<(), String> {
    if title.trim().is_empty() {
        return Err("Title cannot be empty".to_string());
    }

    if title.trim().chars().count() > MAX_TITLE_LENGTH {
        return Err(format!("Title cannot exceed {} characters", MAX_TITLE_LENGTH));
    }

    Ok(())
}

fn validate_content(content: &str) -> Result<(), String> {
    if content.trim().is_empty() {
        return Err("Content cannot be empty".to_string());
    }

    if content.trim().chars().count() > MAX_CONTENT_LENGTH {
        return Err(format!("Content cannot exceed {} characters", MAX_CONTENT_LENGTH));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(title: &str, content: &str) -> CreatePostRequest {
        CreatePostRequest {
            title: title.to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn test_post_creation() {
        let user_id = Uuid::new_v4();
        let post = Post::new(user_id, "Test Title".to_string(), "Test content".to_string());

        assert_ne!(post.id, Uuid::nil());
        assert_eq!(post.user_id, user_id);
        assert_eq!(post.title, "Test Title");
        assert!(post.image_url.is_none());
        assert_eq!(post.created_at, post.updated_at);
        assert!(post.is_authored_by(user_id));
        assert!(!post.is_authored_by(Uuid::new_v4()));
    }

    #[test]
    fn test_create_post_request_validation() {
        assert!(create("Test Title", "Test content").validate().is_ok());

        assert!(create("", "Test content").validate().is_err());
        assert!(create("   ", "Test content").validate().is_err());
        assert!(create(&"a".repeat(201), "Test content").validate().is_err());
        assert!(create("Test Title", "").validate().is_err());
        assert!(create("Test Title", &"a".repeat(10_001)).validate().is_err());

        // Boundaries are inclusive
        assert!(create(&"a".repeat(200), &"a".repeat(10_000)).validate().is_ok());
    }

    #[test]
    fn test_create_post_request_into_post() {
        let user_id = Uuid::new_v4();
        let post = create("  Test Title  ", "  Test content  ").into_post(user_id);

        assert_eq!(post.user_id, user_id);
        assert_eq!(post.title, "Test Title");
        assert_eq!(post.content, "Test content");
    }

    #[test]
    fn test_update_post_request_validation() {
        let empty = UpdatePostRequest {
            title: None,
            content: None,
        };
        assert!(empty.validate(false).is_err());
        assert!(empty.validate(true).is_ok());

        let blank_title = UpdatePostRequest {
            title: Some(" ".to_string()),
            content: None,
        };
        assert!(blank_title.validate(true).is_err());

        let content_only = UpdatePostRequest {
            title: None,
            content: Some("  New body ".to_string()),
        };
        assert!(content_only.validate(false).is_ok());
        assert_eq!(content_only.get_normalized_content(), Some("New body".to_string()));
        assert_eq!(content_only.get_normalized_title(), None);
    }

    #[test]
    fn test_post_serialization() {
        let post = Post {
            id: Uuid::parse_str("123e4567-e89b-12d3-a456-426614174000").unwrap(),
            user_id: Uuid::parse_str("987fcdeb-51a2-43d1-9f12-345678901234").unwrap(),
            title: "Test Post".to_string(),
            content: "This is test content".to_string(),
            image_url: Some("https://res.cloudinary.com/demo/image/upload/v1/blog/posts/abc.jpg".to_string()),
            image_public_id: Some("blog/posts/abc".to_string()),
            created_at: DateTime::parse_from_rfc3339("2022-01-01T00:00:00Z").unwrap().with_timezone(&Utc),
            updated_at: DateTime::parse_from_rfc3339("2022-01-01T00:00:00Z").unwrap().with_timezone(&Utc),
        };

        let json = serde_json::to_string(&post).expect("Failed to serialize post");
        let expected = r#"{"id":"123e4567-e89b-12d3-a456-426614174000","user_id":"987fcdeb-51a2-43d1-9f12-345678901234","title":"Test Post","content":"This is test content","image_url":"https://res.cloudinary.com/demo/image/upload/v1/blog/posts/abc.jpg","image_public_id":"blog/posts/abc","created_at":"2022-01-01T00:00:00Z","updated_at":"2022-01-01T00:00:00Z"}"#;
        assert_eq!(json, expected);
    }
}

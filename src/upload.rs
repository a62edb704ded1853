// Upload adapter
// Buffers multipart bodies in memory so handlers can forward files to the media host.

use std::collections::HashMap;

use axum::{
    async_trait,
    extract::{FromRequest, Multipart, Request},
};
use bytes::Bytes;
use tracing::debug;

use crate::error::ApiError;

/// A file field held entirely in process memory. No disk staging.
#[derive(Debug, Clone)]
pub struct MemoryFile {
    pub field_name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl MemoryFile {
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_image(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.starts_with("image/"))
            .unwrap_or(false)
    }

    /// Only images are forwarded to the media host.
    pub fn ensure_image(&self) -> Result<(), ApiError> {
        if self.is_image() {
            Ok(())
        } else {
            Err(ApiError::validation(format!(
                "Field '{}' must be an image file",
                self.field_name
            )))
        }
    }
}

/// A fully buffered `multipart/form-data` body: text fields by name plus every file part.
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    files: Vec<MemoryFile>,
}

impl MultipartForm {
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = MultipartForm::default();

        while let Some(field) = multipart.next_field().await? {
            let field_name = field.name().unwrap_or_default().to_string();

            if field.file_name().is_some() {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await?;

                // Browsers send an empty part when a file input is left blank
                if bytes.is_empty() && file_name.as_deref().map_or(true, str::is_empty) {
                    continue;
                }

                debug!(
                    "Buffered file field '{}' ({} bytes, {:?})",
                    field_name,
                    bytes.len(),
                    content_type
                );

                form.files.push(MemoryFile {
                    field_name,
                    file_name,
                    content_type,
                    bytes,
                });
            } else {
                let value = field.text().await?;
                form.fields.insert(field_name, value);
            }
        }

        Ok(form)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn file(&self, name: &str) -> Option<&MemoryFile> {
        self.files.iter().find(|f| f.field_name == name)
    }
}

#[async_trait]
impl<S> FromRequest<S> for MultipartForm
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let multipart = Multipart::from_request(req, state).await?;
        Self::from_multipart(multipart).await
    }
}

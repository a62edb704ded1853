// Body extractors
// JSON and urlencoded bodies decode into the same request types.

use axum::{
    async_trait,
    extract::{FromRequest, Request},
    http::header::CONTENT_TYPE,
    Form, Json,
};
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// A request body accepted as either `application/json` or
/// `application/x-www-form-urlencoded`, chosen by `Content-Type`.
///
/// Rejections surface as [`ApiError`], so an oversized body is a 413 with the
/// usual JSON error envelope.
#[derive(Debug, Clone, Copy, Default)]
pub struct Payload<T>(pub T);

fn is_form_encoded(req: &Request) -> bool {
    req.headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.starts_with("application/x-www-form-urlencoded"))
        .unwrap_or(false)
}

#[async_trait]
impl<T, S> FromRequest<S> for Payload<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if is_form_encoded(&req) {
            let Form(value) = Form::<T>::from_request(req, state).await?;
            Ok(Payload(value))
        } else {
            let Json(value) = Json::<T>::from_request(req, state).await?;
            Ok(Payload(value))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Login {
        email: String,
        password: String,
    }

    fn request(content_type: &str, body: &'static str) -> Request {
        Request::builder()
            .method("POST")
            .uri("/api/users/login")
            .header(CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_json_and_form_decode_to_same_value() {
        let Payload(from_json) = Payload::<Login>::from_request(
            request("application/json", r#"{"email":"a@b.co","password":"secret1"}"#),
            &(),
        )
        .await
        .expect("json body should decode");

        let Payload(from_form) = Payload::<Login>::from_request(
            request(
                "application/x-www-form-urlencoded; charset=utf-8",
                "email=a%40b.co&password=secret1",
            ),
            &(),
        )
        .await
        .expect("form body should decode");

        assert_eq!(from_json, from_form);
        assert_eq!(from_json.email, "a@b.co");
    }

    #[tokio::test]
    async fn test_malformed_json_is_a_validation_error() {
        let result =
            Payload::<Login>::from_request(request("application/json", r#"{"email":"#), &()).await;

        assert!(matches!(result, Err(ApiError::Validation(_))));
    }

    #[tokio::test]
    async fn test_missing_content_type_is_a_validation_error() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/users/login")
            .body(Body::from(r#"{"email":"a@b.co","password":"secret1"}"#))
            .unwrap();

        let result = Payload::<Login>::from_request(request, &()).await;
        assert!(matches!(result, Err(ApiError::Validation(_))));
    }
}

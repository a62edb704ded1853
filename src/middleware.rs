use axum::{
    extract::{DefaultBodyLimit, Request},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE, ORIGIN},
        HeaderValue, Method,
    },
    middleware::{self, Next},
    response::Response,
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::ApiError;

/// Browser origins allowed to call the API.
pub const ALLOWED_ORIGINS: [&str; 2] = [
    "http://localhost:5173",
    "https://blog-frontend-app.onrender.com",
];

/// Ceiling for JSON, urlencoded and multipart bodies.
pub const MAX_BODY_BYTES: usize = 50 * 1024 * 1024;

/// Wraps `router` in the request pipeline.
///
/// Outermost first: request tracing, the origin guard, the CORS policy, then
/// the body size ceiling. Cookies are parsed lazily by `CookieJar` in the
/// handlers that need them.
pub fn apply_request_pipeline(router: Router) -> Router {
    router
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(create_cors_layer())
        .layer(middleware::from_fn(reject_disallowed_origin))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

pub fn is_allowed_origin(origin: &str) -> bool {
    ALLOWED_ORIGINS.contains(&origin)
}

/// Fails closed: a request carrying an `Origin` outside the allow-list never
/// reaches a route. Requests without an `Origin` (curl, server-to-server) pass.
pub async fn reject_disallowed_origin(request: Request, next: Next) -> Result<Response, ApiError> {
    if let Some(origin) = request.headers().get(ORIGIN) {
        let allowed = origin.to_str().map(is_allowed_origin).unwrap_or(false);
        if !allowed {
            return Err(ApiError::OriginRejected(
                String::from_utf8_lossy(origin.as_bytes()).into_owned(),
            ));
        }
    }

    Ok(next.run(request).await)
}

fn create_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(
            ALLOWED_ORIGINS.map(HeaderValue::from_static),
        ))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true)
}

/// Initialize structured logging with JSON format
pub fn init_tracing() -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(true)
                .with_target(true)
                .with_thread_ids(true)
                .with_thread_names(true)
        )
        .try_init()?;

    tracing::info!("Structured logging initialized with JSON format");
    Ok(())
}

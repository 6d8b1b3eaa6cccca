use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{
        HeaderValue, Method,
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, ORIGIN},
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::warn;

use crate::error::ApiError;

/// Origins allowed to make credentialed cross-origin requests.
#[derive(Debug, Clone)]
pub struct AllowList(Arc<Vec<String>>);

impl AllowList {
    pub fn new(origins: impl IntoIterator<Item = String>) -> Self {
        let origins = origins
            .into_iter()
            .map(|o| o.trim().trim_end_matches('/').to_string())
            .filter(|o| !o.is_empty())
            .collect();
        Self(Arc::new(origins))
    }

    pub fn allows(&self, origin: &str) -> bool {
        let origin = origin.trim_end_matches('/');
        self.0.iter().any(|allowed| allowed == origin)
    }

    fn allows_header(&self, origin: &HeaderValue) -> bool {
        origin.to_str().is_ok_and(|o| self.allows(o))
    }
}

pub fn layer(allow: AllowList) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(move |origin, _| allow.allows_header(origin)))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([ACCEPT, AUTHORIZATION, CONTENT_TYPE])
}

/// Reject requests from unlisted origins before they reach a handler.
/// Requests without an `Origin` header (curl, same-host tools) pass.
pub async fn reject_unlisted(State(allow): State<AllowList>, req: Request, next: Next) -> Response {
    if let Some(origin) = req.headers().get(ORIGIN) {
        if !allow.allows_header(origin) {
            warn!(origin = ?origin, path = %req.uri().path(), "origin not allowed");
            return ApiError::Forbidden("Not allowed by CORS".to_string()).into_response();
        }
    }
    next.run(req).await
}

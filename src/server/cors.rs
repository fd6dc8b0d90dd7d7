//! Origin allow-list. Requests without an `Origin` header pass untouched;
//! listed origins get credentialed CORS headers; anything else is refused.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, ORIGIN};
use axum::http::{HeaderValue, Method};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::warn;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct AllowedOrigins(Arc<Vec<String>>);

impl AllowedOrigins {
    pub fn new(origins: Vec<String>) -> Self { Self(Arc::new(origins)) }

    pub fn allows(&self, origin: &HeaderValue) -> bool {
        origin.to_str().map(|o| self.0.iter().any(|a| a == o)).unwrap_or(false)
    }

    pub fn cors_layer(&self) -> CorsLayer {
        let this = self.clone();
        CorsLayer::new()
            .allow_origin(AllowOrigin::predicate(move |origin: &HeaderValue, _| this.allows(origin)))
            .allow_credentials(true)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
            .allow_headers([AUTHORIZATION, CONTENT_TYPE])
    }
}

pub async fn origin_gate(State(allowed): State<AllowedOrigins>, req: Request, next: Next) -> Response {
    if let Some(origin) = req.headers().get(ORIGIN) {
        if !allowed.allows(origin) {
            warn!(target: "cors", origin = ?origin, "origin rejected");
            return AppError::forbidden_with("cors_rejected", "Not allowed by CORS").into_response();
        }
    }
    next.run(req).await
}

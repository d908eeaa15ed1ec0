//! HTTP surface: routing, CORS and the static front-end fallback.

mod login;
mod quotations;

#[cfg(test)]
mod tests;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};

use crate::auth::PasswordHasher;
use crate::db::QuotationStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn QuotationStore>,
    pub hasher: PasswordHasher,
}

/// Builds the API router. Paths that match no route are served from
/// `static_dir`, with `index.html` answering for client-side routes.
pub fn router(state: AppState, static_dir: &Path) -> Router {
    let front_end =
        ServeDir::new(static_dir).fallback(ServeFile::new(static_dir.join("index.html")));

    Router::new()
        .route("/", get(quotations::list_quotations))
        .route("/login", post(login::login))
        .route("/create", post(quotations::create_quotation))
        .route("/update/:id", put(quotations::update_quotation))
        .route("/delete/:id", delete(quotations::delete_quotation))
        .route("/pdf/:id", get(quotations::get_quotation))
        .fallback_service(front_end)
        .with_state(state)
}

/// CORS for the configured front-end origins, with credentials allowed.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring unparseable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION, ACCEPT])
        .max_age(Duration::from_secs(3600))
}

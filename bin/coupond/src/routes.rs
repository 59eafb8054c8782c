//! Route registration — collects module routes + system endpoints.

use axum::Router;
use axum::http::{HeaderValue, Method, header};
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

use crate::config::CorsConfig;

/// Build the complete router with all routes.
pub fn build_router(module_routes: Vec<(&str, Router)>, cors: &CorsConfig) -> Router {
    // System endpoints (public, no state needed).
    let mut app = Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/version", get(version));

    // Mount each module's routes under /{module_name}.
    // Module routes are already Router<()> (they called .with_state() internally).
    for (name, router) in module_routes {
        app = app.nest(&format!("/{name}"), router);
    }

    app.layer(cors_layer(cors))
}

/// CORS policy: a configured frontend origin gets credentials (the
/// claim marker cookie); otherwise stay permissive without them.
fn cors_layer(config: &CorsConfig) -> CorsLayer {
    match config
        .allowed_origin
        .as_deref()
        .and_then(|o| o.parse::<HeaderValue>().ok())
    {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE])
            .allow_credentials(true),
        None => {
            if config.allowed_origin.is_some() {
                warn!("cors.allowed_origin is not a valid origin; falling back to permissive CORS");
            }
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        }
    }
}

async fn index() -> impl IntoResponse {
    Html("<h1>coupond</h1>")
}

async fn health() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "status": "ok",
    }))
}

async fn version() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "name": "coupond",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

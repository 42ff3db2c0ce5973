use std::sync::Arc;

use axum::{
    extract::Request,
    middleware::{self, Next},
    response::Response,
    routing::get,
    Router,
};
use tower_http::trace::TraceLayer;

use crate::AppState;

pub mod approve;

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route("/approve", get(approve::approve))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(response_hygiene))
}

/// Middleware: the approval token travels in the query string, so keep
/// responses out of shared caches and strip referrers on outbound clicks.
async fn response_hygiene(req: Request, next: Next) -> Response {
    let mut resp = next.run(req).await;
    let headers = resp.headers_mut();
    headers.insert("Cache-Control", "no-store".parse().unwrap());
    headers.insert("Referrer-Policy", "no-referrer".parse().unwrap());
    headers.insert("X-Content-Type-Options", "nosniff".parse().unwrap());
    resp
}

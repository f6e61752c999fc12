//! Single-page application shell.
//!
//! Every guarded page path serves the same `index.html`; the client-side
//! router renders the page. Built assets under `/assets` and files at the
//! root of the build output (`/favicon.ico`, `/manifest.json`) are public.

use crate::guard::AppRoute;
use crate::middleware::guard_pages;
use crate::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use std::path::Path;
use std::sync::Arc;
use tower_http::services::ServeDir;

/// Served when the build output is missing (local API-only runs).
const FALLBACK_SHELL: &str =
    "<!doctype html><html><head><meta charset=\"utf-8\"><title>SynapseX</title></head><body><div id=\"root\"></div></body></html>";

/// Page routes behind the guard, plus the static build output.
pub fn routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let guard = middleware::from_fn_with_state(state.clone(), guard_pages);
    let assets = ServeDir::new(Path::new(&state.config.static_dir).join("assets"));

    // Anything that is not a file in the build output gets the guarded shell
    let shell: Router = Router::new()
        .fallback(serve_shell)
        .layer(guard.clone())
        .with_state(state.clone());
    let static_files = ServeDir::new(&state.config.static_dir)
        .append_index_html_on_directories(false)
        .call_fallback_on_method_not_allowed(true)
        .fallback(shell);

    AppRoute::KNOWN
        .iter()
        .fold(Router::new(), |router, route| {
            router.route(route.path(), get(serve_shell))
        })
        .route_layer(guard)
        .nest_service("/assets", assets)
        .fallback_service(static_files)
}

async fn serve_shell(State(state): State<Arc<AppState>>) -> Response {
    let index = Path::new(&state.config.static_dir).join("index.html");
    match tokio::fs::read_to_string(&index).await {
        Ok(html) => Html(html).into_response(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %index.display(), "No built index.html, serving fallback shell");
            Html(FALLBACK_SHELL).into_response()
        }
        Err(e) => {
            tracing::error!(path = %index.display(), error = %e, "Failed to read index.html");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

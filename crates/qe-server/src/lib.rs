//! qe-server - HTTP surface (A2)
//!
//! Exposes the four routes in §6.2 over the validate -> plan -> build ->
//! execute pipeline. Grounded on the docs server in this crate's teacher
//! (`axum::Router` + `AppState` + `axum::serve`).

pub mod error;
pub mod handlers;
pub mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

pub use state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/models", get(handlers::get_models))
        .route("/query", post(handlers::post_query))
        .route("/info", get(handlers::get_info))
        .route("/health", get(handlers::get_health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: Arc<AppState>) -> std::io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("listening on http://{addr}");
    axum::serve(listener, app).await
}

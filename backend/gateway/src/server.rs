//! Main HTTP Gateway Server.
//!
//! Routing table, shared state, and the serve loop.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use receiptforge_extractor::FieldExtractor;
use receiptforge_store::RecordStore;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

use crate::{api, pages, receipts, upload};

/// Application state shared across routes.
#[derive(Clone)]
pub struct GatewayState {
    pub records: RecordStore,
    pub extractor: Arc<FieldExtractor>,
    pub started_at: Instant,
}

impl GatewayState {
    pub fn new(records: RecordStore, extractor: FieldExtractor) -> Self {
        Self {
            records,
            extractor: Arc::new(extractor),
            started_at: Instant::now(),
        }
    }
}

/// Build the router. `max_upload_bytes` caps every request body.
pub fn build_router(state: GatewayState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(pages::index))
        .route("/upload", post(upload::upload_receipt))
        .route("/receipts", get(receipts::list_receipts))
        .route("/receipt/:id", get(receipts::get_receipt_file))
        // JSON API
        .route("/api/health", get(api::get_health))
        .route("/api/receipts", get(api::list_receipts))
        .route("/api/receipts/:id", get(api::get_receipt))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Starts the main Axum HTTP server and runs until Ctrl-C.
#[instrument(skip(state))]
pub async fn start_server(
    addr: SocketAddr,
    state: GatewayState,
    max_upload_bytes: usize,
) -> Result<()> {
    let app = build_router(state, max_upload_bytes);

    let listener = TcpListener::bind(&addr).await?;
    info!("Receipt gateway listening on http://{}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Receipt gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Could not install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

//! Web server module.
//!
//! Provides the HTTP API (Axum) that accepts images and display commands
//! and forwards them to the e-paper controller.

pub mod routes;

use crate::image_proc::ImageProcessor;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use routes::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;

/// Web server errors
#[derive(Error, Debug)]
pub enum WebError {
    #[error("Failed to bind to address: {0}")]
    BindError(#[from] std::io::Error),

    #[error("Server error: {0}")]
    ServerError(String),
}

/// Web server configuration
pub struct WebServer {
    processor: Arc<ImageProcessor>,
    max_image_bytes: usize,
}

impl WebServer {
    /// Create a new web server
    pub fn new(processor: ImageProcessor, max_image_bytes: usize) -> Self {
        Self {
            processor: Arc::new(processor),
            max_image_bytes,
        }
    }

    /// Build the router with all routes
    pub fn build_router(&self) -> Router {
        let state = AppState {
            processor: Arc::clone(&self.processor),
        };

        Router::new()
            .route("/displayImage", post(routes::display_image))
            .route("/displayImageUrl", post(routes::display_image_url))
            .route("/displayText", post(routes::display_text))
            .route("/clear", get(routes::clear_display))
            .route("/cross", get(routes::draw_cross))
            .route("/health", get(routes::health))
            .layer(DefaultBodyLimit::max(self.max_image_bytes))
            .with_state(state)
    }

    /// Run the web server with graceful shutdown
    pub async fn run_with_shutdown(
        &self,
        port: u16,
        shutdown: tokio::sync::broadcast::Receiver<()>,
    ) -> Result<(), WebError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("Web server listening on http://{}", addr);

        let mut shutdown = shutdown;
        axum::serve(listener, self.build_router())
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Web server shutting down gracefully");
            })
            .await
            .map_err(|e| WebError::ServerError(e.to_string()))
    }
}

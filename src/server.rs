//! HTTP server: router assembly, middleware stack and graceful shutdown

use std::sync::Arc;
use std::time::Duration;

use axum::{error_handling::HandleErrorLayer, http::StatusCode, BoxError, Router};
use tokio::net::TcpListener;
use tower::{timeout::TimeoutLayer, ServiceBuilder};
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::info;

use crate::auth::{create_auth_routes, AuthConfig, AuthService};

/// Largest request body accepted (16 KiB)
pub const MAX_BODY_SIZE: usize = 16 * 1024;

#[derive(Clone)]
pub struct OtpServer {
    pub bind_addr: String,
    pub request_timeout: Duration,
    service: Arc<AuthService>,
}

impl OtpServer {
    pub fn new(config: &AuthConfig, service: Arc<AuthService>) -> Self {
        Self {
            bind_addr: config.bind_addr.clone(),
            request_timeout: config.request_timeout,
            service,
        }
    }

    pub fn create_router(&self) -> Router {
        create_auth_routes(self.service.clone()).layer(
            ServiceBuilder::new()
                // timeout/overload errors become HTTP responses
                .layer(HandleErrorLayer::new(|err: BoxError| async move {
                    if err.is::<tower::timeout::error::Elapsed>() {
                        (StatusCode::REQUEST_TIMEOUT, "request timed out")
                    } else {
                        (StatusCode::SERVICE_UNAVAILABLE, "service overloaded")
                    }
                }))
                .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
                .layer(TimeoutLayer::new(self.request_timeout))
                .layer(TraceLayer::new_for_http()),
        )
    }

    /// Serve until Ctrl-C
    pub async fn start(self) -> Result<(), anyhow::Error> {
        let app = self.create_router();
        let listener = TcpListener::bind(&self.bind_addr).await?;
        info!("Server listening on {}", listener.local_addr()?);
        axum::serve(listener, app.into_make_service())
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        info!("Server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

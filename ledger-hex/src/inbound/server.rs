//! HTTP Server configuration and startup.

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, patch, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use ledger_types::LedgerRepository;

use super::handlers::{self, AppState};
use crate::LedgerService;

/// HTTP Server for the Ledger API.
pub struct HttpServer<R: LedgerRepository> {
    state: Arc<AppState<R>>,
}

impl<R: LedgerRepository> HttpServer<R> {
    /// Creates a new HTTP server with the given service.
    pub fn new(service: LedgerService<R>) -> Self {
        Self {
            state: Arc::new(AppState { service }),
        }
    }

    /// Builds the Axum router with all routes.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(handlers::health))
            .route("/api/users", post(handlers::create_user::<R>))
            .route("/api/users", get(handlers::list_users::<R>))
            .route("/api/users/{id}", get(handlers::get_user::<R>))
            .route("/api/users/{id}", patch(handlers::update_user::<R>))
            .route(
                "/api/users/{id}/transactions",
                post(handlers::create_transaction::<R>),
            )
            .route(
                "/api/users/{id}/transactions",
                get(handlers::list_user_transactions::<R>),
            )
            .route(
                "/api/users/{id}/transactions/{tx_id}/reverse",
                post(handlers::reverse_transaction::<R>),
            )
            .route("/api/transactions", get(handlers::list_transactions::<R>))
            .route(
                "/api/transactions/{id}",
                get(handlers::get_transaction::<R>),
            )
            .route("/api/reports/weekly", get(handlers::weekly_report::<R>))
            .route(
                "/api/reports/weekly",
                post(handlers::weekly_report_background::<R>),
            )
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Runs the server on the given address with graceful shutdown.
    pub async fn run(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Server listening on {}", listener.local_addr()?);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown...");
}

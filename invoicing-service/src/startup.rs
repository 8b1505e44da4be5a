//! Application startup and lifecycle management.

use crate::config::InvoicingConfig;
use crate::handlers::{self, invoices};
use crate::lifecycle::{OverridePolicy, TransitionOrchestrator};
use crate::services::{Database, InvoiceService};
use crate::store::InvoiceRepository;
use axum::{
    middleware::from_fn,
    routing::{get, patch},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{metrics::metrics_middleware, tracing::request_id_middleware};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: InvoicingConfig,
    pub invoices: InvoiceService,
    pub orchestrator: TransitionOrchestrator,
}

impl AppState {
    pub fn new(config: InvoicingConfig, repository: Arc<dyn InvoiceRepository>) -> Self {
        let overrides = OverridePolicy::from(&config.overrides);
        Self {
            invoices: InvoiceService::new(repository.clone()),
            orchestrator: TransitionOrchestrator::new(repository, overrides),
            config,
        }
    }
}

/// Full HTTP router with middleware.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics))
        .route(
            "/api/invoices",
            get(invoices::list_invoices).post(invoices::create_invoice),
        )
        .route(
            "/api/invoices/:id",
            get(invoices::get_invoice).put(invoices::update_invoice),
        )
        .route(
            "/api/invoices/:id/status",
            patch(invoices::update_invoice_status),
        )
        .route(
            "/api/invoices/:id/allowed-transitions",
            get(invoices::allowed_transitions),
        )
        .route("/api/invoices/:id/history", get(invoices::status_history))
        .route(
            "/api/invoices/:id/ledger-entries",
            get(invoices::ledger_entries),
        )
        .layer(from_fn(metrics_middleware))
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    user_id = tracing::field::Empty,
                )
            }),
        )
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Connect to Postgres, apply migrations and bind the listener.
    pub async fn build(config: InvoicingConfig) -> Result<Self, AppError> {
        let database = Database::new(
            &config.database.url,
            config.database.max_connections,
            config.database.min_connections,
        )
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to PostgreSQL: {}", e);
            AppError::from(e)
        })?;

        database.run_migrations().await.map_err(|e| {
            tracing::error!("Failed to run database migrations: {}", e);
            AppError::from(e)
        })?;

        Self::build_with_repository(config, Arc::new(database)).await
    }

    /// Bind the listener over an already constructed store.
    pub async fn build_with_repository(
        config: InvoicingConfig,
        repository: Arc<dyn InvoiceRepository>,
    ) -> Result<Self, AppError> {
        // Port 0 picks a free port, which the tests rely on.
        let addr = format!("{}:{}", config.common.host, config.common.port);
        let listener = TcpListener::bind(&addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(port = port, "Invoicing service listening");

        let router = router(AppState::new(config, repository));

        Ok(Self {
            port,
            listener,
            router,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.listener, self.router).await
    }
}

//! Common test utilities for invoicing-service integration tests.
#![allow(dead_code)]

use axum::Router;
use chrono::NaiveDate;
use invoicing_service::config::InvoicingConfig;
use invoicing_service::lifecycle::{TransitionOrchestrator, TransitionRequest};
use invoicing_service::middleware::CallerIdentity;
use invoicing_service::models::{CreateInvoice, Invoice, InvoiceStatus, LineItemInput};
use invoicing_service::startup::{router, AppState};
use invoicing_service::store::MemoryRepository;
use rust_decimal::Decimal;
use std::sync::{Arc, Once};

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,invoicing_service=debug,sqlx=warn")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub fn test_config() -> InvoicingConfig {
    let mut config = InvoicingConfig::for_memory_store();
    config.service_name = "invoicing-service-test".to_string();
    config.common.port = 0;
    config
}

pub fn member() -> CallerIdentity {
    CallerIdentity::new("clerk@example.com", "member")
}

pub fn admin() -> CallerIdentity {
    CallerIdentity::new("controller@example.com", "admin")
}

pub fn dec(s: &str) -> Decimal {
    s.parse().expect("valid decimal")
}

/// Legal moves that take a fresh draft to `status`.
pub fn path_to(status: InvoiceStatus) -> &'static [InvoiceStatus] {
    use InvoiceStatus::*;

    match status {
        Draft => &[],
        Sent => &[Sent],
        Paid => &[Sent, Paid],
        Overdue => &[Sent, Overdue],
        Cancelled => &[Cancelled],
        Refunded => &[Sent, Paid, Refunded],
    }
}

/// Service wired over an in-memory store.
pub struct TestApp {
    pub repository: MemoryRepository,
    pub state: AppState,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: InvoicingConfig) -> Self {
        init_tracing();
        let repository = MemoryRepository::new();
        let state = AppState::new(config, Arc::new(repository.clone()));
        Self { repository, state }
    }

    pub fn orchestrator(&self) -> &TransitionOrchestrator {
        &self.state.orchestrator
    }

    pub fn router(&self) -> Router {
        router(self.state.clone())
    }

    /// Create a draft with a single line worth `amount`.
    pub async fn draft(&self, client_name: &str, amount: &str) -> Invoice {
        let input = CreateInvoice::new(
            client_name.to_string(),
            NaiveDate::from_ymd_opt(2026, 11, 30).expect("valid date"),
            vec![LineItemInput {
                description: "Professional services".to_string(),
                quantity: Decimal::ONE,
                rate: dec(amount),
            }],
        )
        .expect("valid invoice");

        self.state
            .invoices
            .create(input)
            .await
            .expect("create draft")
    }

    /// Create an invoice and walk it to `status` through legal moves.
    pub async fn invoice_in(&self, status: InvoiceStatus) -> Invoice {
        let mut invoice = self.draft("Initech", "1500.00").await;
        for step in path_to(status) {
            invoice = self
                .orchestrator()
                .apply_transition(invoice.id, TransitionRequest::to(*step), &member())
                .await
                .expect("legal move");
        }
        assert_eq!(invoice.status, status);
        invoice
    }
}

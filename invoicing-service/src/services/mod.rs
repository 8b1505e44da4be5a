//! Services module for invoicing-service.

pub mod database;
pub mod invoices;
pub mod metrics;

pub use database::Database;
pub use invoices::InvoiceService;
pub use metrics::{get_metrics, init_metrics};

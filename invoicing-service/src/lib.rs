//! invoicing-service: invoice records whose status moves through a
//! policy-checked lifecycle, kept in step with the ledger and an audit trail.

pub mod config;
pub mod dtos;
pub mod error;
pub mod handlers;
pub mod lifecycle;
pub mod middleware;
pub mod models;
pub mod services;
pub mod startup;
pub mod store;

pub use startup::{AppState, Application};

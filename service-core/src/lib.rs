//! service-core: shared HTTP, error, configuration and telemetry plumbing
//! for the back-office services.
pub mod config;
pub mod error;
pub mod middleware;
pub mod observability;

pub use axum;
pub use tracing;
pub use validator;

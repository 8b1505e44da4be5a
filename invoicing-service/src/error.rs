//! Error types for invoicing-service.
//!
//! Stores raise [`StoreError`] untouched; the lifecycle and service layers
//! reclassify it into [`InvoiceError::Storage`], which is the only variant a
//! caller should retry.

use crate::models::InvoiceStatus;
use service_core::error::AppError;
use thiserror::Error;
use uuid::Uuid;

/// Raw persistence failure.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store returned inconsistent data: {0}")]
    Corrupt(String),
}

/// Domain error for invoice operations.
#[derive(Debug, Error)]
pub enum InvoiceError {
    #[error("Invoice {0} not found")]
    NotFound(Uuid),

    #[error("Cannot transition from {from} to {to}")]
    InvalidTransition {
        from: InvoiceStatus,
        to: InvoiceStatus,
    },

    #[error("Caller '{0}' is not allowed to override the status policy")]
    OverrideNotPermitted(String),

    #[error("An override reason is required when overriding the status policy")]
    OverrideReasonRequired,

    #[error("Invoice is {0}; only draft invoices can be edited")]
    NotEditable(InvoiceStatus),

    #[error("{0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

impl InvoiceError {
    /// Whether repeating the whole call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, InvoiceError::Storage(_))
    }

    /// Stable label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            InvoiceError::NotFound(_) => "not_found",
            InvoiceError::InvalidTransition { .. } => "invalid_transition",
            InvoiceError::OverrideNotPermitted(_) => "override_not_permitted",
            InvoiceError::OverrideReasonRequired => "override_reason_required",
            InvoiceError::NotEditable(_) => "not_editable",
            InvoiceError::Validation(_) => "validation",
            InvoiceError::Storage(_) => "storage",
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::DatabaseError(anyhow::Error::new(err))
    }
}

impl From<InvoiceError> for AppError {
    fn from(err: InvoiceError) -> Self {
        match err {
            InvoiceError::NotFound(_) => AppError::NotFound(anyhow::anyhow!(err.to_string())),
            InvoiceError::InvalidTransition { .. }
            | InvoiceError::OverrideReasonRequired
            | InvoiceError::Validation(_) => AppError::BadRequest(anyhow::anyhow!(err.to_string())),
            InvoiceError::OverrideNotPermitted(_) => {
                AppError::Forbidden(anyhow::anyhow!(err.to_string()))
            }
            InvoiceError::NotEditable(_) => AppError::Conflict(anyhow::anyhow!(err.to_string())),
            InvoiceError::Storage(e) => AppError::from(e),
        }
    }
}

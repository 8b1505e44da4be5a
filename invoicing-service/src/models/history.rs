//! Status history (audit trail) model.

use super::InvoiceStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One accepted status transition. Never updated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct StatusHistoryRecord {
    pub id: i64,
    pub invoice_id: Uuid,
    pub from_status: InvoiceStatus,
    pub to_status: InvoiceStatus,
    pub changed_by: String,
    pub override_reason: Option<String>,
    pub changed_at: DateTime<Utc>,
}

/// Input for appending a history record.
#[derive(Debug, Clone, PartialEq)]
pub struct NewStatusHistoryRecord {
    pub invoice_id: Uuid,
    pub from_status: InvoiceStatus,
    pub to_status: InvoiceStatus,
    pub changed_by: String,
    pub override_reason: Option<String>,
    pub changed_at: DateTime<Utc>,
}

//! Ledger entry model (rows of the shared `transactions` table).

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Entry type tagging rows written by the invoice lifecycle.
pub const INVOICE_ENTRY_TYPE: &str = "invoice";

/// Recognised financial movement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub date: NaiveDate,
    pub description: String,
    pub credit: Option<Decimal>,
    pub debit: Option<Decimal>,
    pub reference_id: Option<Uuid>,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub entry_type: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for inserting a ledger entry.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLedgerEntry {
    pub date: NaiveDate,
    pub description: String,
    pub credit: Option<Decimal>,
    pub reference_id: Uuid,
    pub entry_type: String,
}

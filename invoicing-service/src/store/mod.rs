//! Persistence seams for the invoice lifecycle.
//!
//! A [`UnitOfWork`] is one atomic transaction. It implements the three thin
//! stores the orchestrator needs (invoices, ledger, audit trail); none of
//! them hold business rules. Dropping a unit without calling
//! [`UnitOfWork::commit`] discards everything it wrote.

pub mod memory;

use crate::error::StoreError;
use crate::models::{
    CreateInvoice, Invoice, InvoiceStatus, LedgerEntry, NewLedgerEntry, NewStatusHistoryRecord,
    StatusHistoryRecord, UpdateInvoice,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub use memory::{FailPoint, MemoryRepository};

/// Invoice rows inside a unit of work.
#[async_trait]
pub trait InvoiceStore: Send {
    /// Read an invoice and hold it exclusively until the unit ends.
    async fn lock_invoice(&mut self, id: Uuid) -> Result<Option<Invoice>, StoreError>;

    /// Set `status` and `updated_at`, returning the new row.
    async fn update_status(
        &mut self,
        id: Uuid,
        status: InvoiceStatus,
        now: DateTime<Utc>,
    ) -> Result<Invoice, StoreError>;
}

/// Ledger rows (the `transactions` table) inside a unit of work.
#[async_trait]
pub trait LedgerStore: Send {
    async fn insert_entry(&mut self, entry: &NewLedgerEntry) -> Result<LedgerEntry, StoreError>;

    /// Remove every entry of `entry_type` referencing `reference_id`.
    async fn delete_by_reference(
        &mut self,
        reference_id: Uuid,
        entry_type: &str,
    ) -> Result<u64, StoreError>;
}

/// Append-only status history inside a unit of work.
#[async_trait]
pub trait AuditTrail: Send {
    async fn append(
        &mut self,
        record: &NewStatusHistoryRecord,
    ) -> Result<StatusHistoryRecord, StoreError>;
}

/// One atomic transaction over all three stores.
#[async_trait]
pub trait UnitOfWork: InvoiceStore + LedgerStore + AuditTrail {
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

/// Backing store for the service: opens units of work and serves the plain
/// reads and draft edits that need no transaction of their own.
#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError>;

    /// Insert a new invoice in `draft`.
    async fn create_invoice(&self, input: &CreateInvoice) -> Result<Invoice, StoreError>;

    async fn get_invoice(&self, id: Uuid) -> Result<Option<Invoice>, StoreError>;

    /// All invoices, newest first.
    async fn list_invoices(&self) -> Result<Vec<Invoice>, StoreError>;

    /// Apply field changes if, and only if, the invoice is still `draft`.
    /// Returns `None` when no draft invoice with this id exists.
    async fn update_draft(
        &self,
        id: Uuid,
        input: &UpdateInvoice,
    ) -> Result<Option<Invoice>, StoreError>;

    /// Status history for an invoice, newest first.
    async fn history(&self, invoice_id: Uuid) -> Result<Vec<StatusHistoryRecord>, StoreError>;

    /// Ledger entries referencing an invoice, oldest first.
    async fn ledger_entries_for(&self, invoice_id: Uuid) -> Result<Vec<LedgerEntry>, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}

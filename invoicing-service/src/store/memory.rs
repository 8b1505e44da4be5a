//! In-memory repository used by tests and local runs without Postgres.
//!
//! A unit of work takes the single state lock for its whole lifetime and
//! edits a private copy, so units are fully serialised and a dropped or
//! failed unit leaves no trace. Fail points let tests break any step of the
//! lifecycle on purpose.

use super::{AuditTrail, InvoiceRepository, InvoiceStore, LedgerStore, UnitOfWork};
use crate::error::StoreError;
use crate::models::{
    CreateInvoice, Invoice, InvoiceStatus, LedgerEntry, NewLedgerEntry, NewStatusHistoryRecord,
    StatusHistoryRecord, UpdateInvoice,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashSet;
use sqlx::types::Json;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// Step at which a unit of work can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    Begin,
    LockInvoice,
    LedgerInsert,
    LedgerDelete,
    StatusUpdate,
    HistoryAppend,
    Commit,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    invoices: HashMap<Uuid, Invoice>,
    ledger: Vec<LedgerEntry>,
    history: Vec<StatusHistoryRecord>,
    next_history_id: i64,
}

#[derive(Clone, Default)]
pub struct MemoryRepository {
    state: Arc<Mutex<MemoryState>>,
    fail_points: Arc<DashSet<FailPoint>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later unit of work fail at `point` until cleared.
    pub fn fail_at(&self, point: FailPoint) {
        self.fail_points.insert(point);
    }

    pub fn clear_failures(&self) {
        self.fail_points.clear();
    }

    /// Write a ledger row directly, the way the external transaction CRUD
    /// endpoints would.
    pub async fn seed_ledger_entry(&self, entry: LedgerEntry) {
        self.state.lock().await.ledger.push(entry);
    }
}

fn trip(fail_points: &DashSet<FailPoint>, point: FailPoint) -> Result<(), StoreError> {
    if fail_points.contains(&point) {
        Err(StoreError::Unavailable(format!("injected failure at {:?}", point)))
    } else {
        Ok(())
    }
}

pub struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
    fail_points: Arc<DashSet<FailPoint>>,
}

#[async_trait]
impl InvoiceStore for MemoryUnitOfWork {
    async fn lock_invoice(&mut self, id: Uuid) -> Result<Option<Invoice>, StoreError> {
        trip(&self.fail_points, FailPoint::LockInvoice)?;
        Ok(self.working.invoices.get(&id).cloned())
    }

    async fn update_status(
        &mut self,
        id: Uuid,
        status: InvoiceStatus,
        now: DateTime<Utc>,
    ) -> Result<Invoice, StoreError> {
        trip(&self.fail_points, FailPoint::StatusUpdate)?;
        let invoice = self
            .working
            .invoices
            .get_mut(&id)
            .ok_or_else(|| StoreError::Corrupt(format!("locked invoice {} is missing", id)))?;
        invoice.status = status;
        invoice.updated_at = now;
        Ok(invoice.clone())
    }
}

#[async_trait]
impl LedgerStore for MemoryUnitOfWork {
    async fn insert_entry(&mut self, entry: &NewLedgerEntry) -> Result<LedgerEntry, StoreError> {
        trip(&self.fail_points, FailPoint::LedgerInsert)?;
        let row = LedgerEntry {
            id: Uuid::new_v4(),
            date: entry.date,
            description: entry.description.clone(),
            credit: entry.credit,
            debit: None,
            reference_id: Some(entry.reference_id),
            entry_type: Some(entry.entry_type.clone()),
            created_at: Utc::now(),
        };
        self.working.ledger.push(row.clone());
        Ok(row)
    }

    async fn delete_by_reference(
        &mut self,
        reference_id: Uuid,
        entry_type: &str,
    ) -> Result<u64, StoreError> {
        trip(&self.fail_points, FailPoint::LedgerDelete)?;
        let before = self.working.ledger.len();
        self.working.ledger.retain(|e| {
            !(e.reference_id == Some(reference_id) && e.entry_type.as_deref() == Some(entry_type))
        });
        Ok((before - self.working.ledger.len()) as u64)
    }
}

#[async_trait]
impl AuditTrail for MemoryUnitOfWork {
    async fn append(
        &mut self,
        record: &NewStatusHistoryRecord,
    ) -> Result<StatusHistoryRecord, StoreError> {
        trip(&self.fail_points, FailPoint::HistoryAppend)?;
        self.working.next_history_id += 1;
        let row = StatusHistoryRecord {
            id: self.working.next_history_id,
            invoice_id: record.invoice_id,
            from_status: record.from_status,
            to_status: record.to_status,
            changed_by: record.changed_by.clone(),
            override_reason: record.override_reason.clone(),
            changed_at: record.changed_at,
        };
        self.working.history.push(row.clone());
        Ok(row)
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        trip(&self.fail_points, FailPoint::Commit)?;
        let MemoryUnitOfWork {
            mut guard, working, ..
        } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl InvoiceRepository for MemoryRepository {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        trip(&self.fail_points, FailPoint::Begin)?;
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryUnitOfWork {
            guard,
            working,
            fail_points: self.fail_points.clone(),
        }))
    }

    async fn create_invoice(&self, input: &CreateInvoice) -> Result<Invoice, StoreError> {
        let now = Utc::now();
        let invoice = Invoice {
            id: Uuid::new_v4(),
            client_name: input.client_name.clone(),
            amount: input.amount,
            due_date: input.due_date,
            status: InvoiceStatus::Draft,
            items: Json(input.items.clone()),
            created_at: now,
            updated_at: now,
        };
        self.state
            .lock()
            .await
            .invoices
            .insert(invoice.id, invoice.clone());
        Ok(invoice)
    }

    async fn get_invoice(&self, id: Uuid) -> Result<Option<Invoice>, StoreError> {
        Ok(self.state.lock().await.invoices.get(&id).cloned())
    }

    async fn list_invoices(&self) -> Result<Vec<Invoice>, StoreError> {
        let mut invoices: Vec<Invoice> =
            self.state.lock().await.invoices.values().cloned().collect();
        invoices.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(invoices)
    }

    async fn update_draft(
        &self,
        id: Uuid,
        input: &UpdateInvoice,
    ) -> Result<Option<Invoice>, StoreError> {
        let mut state = self.state.lock().await;
        let Some(invoice) = state
            .invoices
            .get_mut(&id)
            .filter(|inv| inv.status == InvoiceStatus::Draft)
        else {
            return Ok(None);
        };

        if let Some(name) = &input.client_name {
            invoice.client_name = name.clone();
        }
        if let Some(due_date) = input.due_date {
            invoice.due_date = due_date;
        }
        if let Some((items, amount)) = &input.items {
            invoice.items = Json(items.clone());
            invoice.amount = *amount;
        }
        invoice.updated_at = Utc::now();

        Ok(Some(invoice.clone()))
    }

    async fn history(&self, invoice_id: Uuid) -> Result<Vec<StatusHistoryRecord>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .history
            .iter()
            .rev()
            .filter(|r| r.invoice_id == invoice_id)
            .cloned()
            .collect())
    }

    async fn ledger_entries_for(&self, invoice_id: Uuid) -> Result<Vec<LedgerEntry>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .ledger
            .iter()
            .filter(|e| e.reference_id == Some(invoice_id))
            .cloned()
            .collect())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

//! Postgres backend for invoicing-service.

use crate::error::StoreError;
use crate::models::{
    CreateInvoice, Invoice, InvoiceStatus, LedgerEntry, NewLedgerEntry, NewStatusHistoryRecord,
    StatusHistoryRecord, UpdateInvoice,
};
use crate::services::metrics::DB_QUERY_DURATION;
use crate::store::{AuditTrail, InvoiceRepository, InvoiceStore, LedgerStore, UnitOfWork};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::{Postgres, Transaction};
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

const INVOICE_COLUMNS: &str =
    "id, client_name, amount, due_date, status, items, created_at, updated_at";

const LEDGER_COLUMNS: &str =
    "id, date, description, credit, debit, reference_id, type, created_at";

const HISTORY_COLUMNS: &str =
    "id, invoice_id, from_status, to_status, changed_by, override_reason, changed_at";

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "invoicing-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, StoreError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), StoreError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations completed");
        Ok(())
    }
}

#[async_trait]
impl InvoiceRepository for Database {
    #[instrument(skip(self))]
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgUnitOfWork { tx }))
    }

    #[instrument(skip(self, input), fields(client_name = %input.client_name))]
    async fn create_invoice(&self, input: &CreateInvoice) -> Result<Invoice, StoreError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_invoice"])
            .start_timer();

        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            INSERT INTO invoices (id, client_name, amount, due_date, status, items)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {INVOICE_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&input.client_name)
        .bind(input.amount)
        .bind(input.due_date)
        .bind(InvoiceStatus::Draft)
        .bind(Json(&input.items))
        .fetch_one(&self.pool)
        .await?;

        timer.observe_duration();

        info!(invoice_id = %invoice.id, amount = %invoice.amount, "Invoice created");

        Ok(invoice)
    }

    #[instrument(skip(self))]
    async fn get_invoice(&self, id: Uuid) -> Result<Option<Invoice>, StoreError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_invoice"])
            .start_timer();

        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        timer.observe_duration();

        Ok(invoice)
    }

    #[instrument(skip(self))]
    async fn list_invoices(&self) -> Result<Vec<Invoice>, StoreError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_invoices"])
            .start_timer();

        let invoices = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices ORDER BY created_at DESC, id"
        ))
        .fetch_all(&self.pool)
        .await?;

        timer.observe_duration();

        Ok(invoices)
    }

    #[instrument(skip(self, input))]
    async fn update_draft(
        &self,
        id: Uuid,
        input: &UpdateInvoice,
    ) -> Result<Option<Invoice>, StoreError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_draft"])
            .start_timer();

        let (items, amount) = match &input.items {
            Some((items, amount)) => (Some(Json(items)), Some(*amount)),
            None => (None, None),
        };

        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            UPDATE invoices
            SET client_name = COALESCE($2, client_name),
                due_date = COALESCE($3, due_date),
                items = COALESCE($4, items),
                amount = COALESCE($5, amount),
                updated_at = NOW()
            WHERE id = $1 AND status = 'draft'
            RETURNING {INVOICE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(input.client_name.as_deref())
        .bind(input.due_date)
        .bind(items)
        .bind(amount)
        .fetch_optional(&self.pool)
        .await?;

        timer.observe_duration();

        Ok(invoice)
    }

    #[instrument(skip(self))]
    async fn history(&self, invoice_id: Uuid) -> Result<Vec<StatusHistoryRecord>, StoreError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["history"])
            .start_timer();

        let records = sqlx::query_as::<_, StatusHistoryRecord>(&format!(
            r#"
            SELECT {HISTORY_COLUMNS}
            FROM invoice_status_history
            WHERE invoice_id = $1
            ORDER BY changed_at DESC, id DESC
            "#
        ))
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await?;

        timer.observe_duration();

        Ok(records)
    }

    #[instrument(skip(self))]
    async fn ledger_entries_for(&self, invoice_id: Uuid) -> Result<Vec<LedgerEntry>, StoreError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["ledger_entries_for"])
            .start_timer();

        let entries = sqlx::query_as::<_, LedgerEntry>(&format!(
            "SELECT {LEDGER_COLUMNS} FROM transactions WHERE reference_id = $1 ORDER BY created_at, id"
        ))
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await?;

        timer.observe_duration();

        Ok(entries)
    }

    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// One Postgres transaction. Rolled back by sqlx if dropped uncommitted.
pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl InvoiceStore for PgUnitOfWork {
    #[instrument(skip(self))]
    async fn lock_invoice(&mut self, id: Uuid) -> Result<Option<Invoice>, StoreError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["lock_invoice"])
            .start_timer();

        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        timer.observe_duration();

        Ok(invoice)
    }

    #[instrument(skip(self))]
    async fn update_status(
        &mut self,
        id: Uuid,
        status: InvoiceStatus,
        now: DateTime<Utc>,
    ) -> Result<Invoice, StoreError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_status"])
            .start_timer();

        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            UPDATE invoices SET status = $2, updated_at = $3
            WHERE id = $1
            RETURNING {INVOICE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(status)
        .bind(now)
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or_else(|| StoreError::Corrupt(format!("locked invoice {} is missing", id)))?;

        timer.observe_duration();

        Ok(invoice)
    }
}

#[async_trait]
impl LedgerStore for PgUnitOfWork {
    #[instrument(skip(self, entry), fields(reference_id = %entry.reference_id))]
    async fn insert_entry(&mut self, entry: &NewLedgerEntry) -> Result<LedgerEntry, StoreError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["insert_ledger_entry"])
            .start_timer();

        let row = sqlx::query_as::<_, LedgerEntry>(&format!(
            r#"
            INSERT INTO transactions (id, date, description, credit, reference_id, type)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {LEDGER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(entry.date)
        .bind(&entry.description)
        .bind(entry.credit)
        .bind(entry.reference_id)
        .bind(&entry.entry_type)
        .fetch_one(&mut *self.tx)
        .await?;

        timer.observe_duration();

        Ok(row)
    }

    #[instrument(skip(self))]
    async fn delete_by_reference(
        &mut self,
        reference_id: Uuid,
        entry_type: &str,
    ) -> Result<u64, StoreError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_ledger_entry"])
            .start_timer();

        let result = sqlx::query("DELETE FROM transactions WHERE reference_id = $1 AND type = $2")
            .bind(reference_id)
            .bind(entry_type)
            .execute(&mut *self.tx)
            .await?;

        timer.observe_duration();

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl AuditTrail for PgUnitOfWork {
    #[instrument(skip(self, record), fields(invoice_id = %record.invoice_id))]
    async fn append(
        &mut self,
        record: &NewStatusHistoryRecord,
    ) -> Result<StatusHistoryRecord, StoreError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["append_history"])
            .start_timer();

        let row = sqlx::query_as::<_, StatusHistoryRecord>(&format!(
            r#"
            INSERT INTO invoice_status_history
                (invoice_id, from_status, to_status, changed_by, override_reason, changed_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {HISTORY_COLUMNS}
            "#
        ))
        .bind(record.invoice_id)
        .bind(record.from_status)
        .bind(record.to_status)
        .bind(&record.changed_by)
        .bind(record.override_reason.as_deref())
        .bind(record.changed_at)
        .fetch_one(&mut *self.tx)
        .await?;

        timer.observe_duration();

        Ok(row)
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.rollback().await?;
        Ok(())
    }
}

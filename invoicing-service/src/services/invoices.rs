//! Invoice CRUD outside the status lifecycle.

use crate::error::InvoiceError;
use crate::models::{CreateInvoice, Invoice, LedgerEntry, UpdateInvoice};
use crate::services::metrics::INVOICES_TOTAL;
use crate::store::InvoiceRepository;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Clone)]
pub struct InvoiceService {
    repository: Arc<dyn InvoiceRepository>,
}

impl InvoiceService {
    pub fn new(repository: Arc<dyn InvoiceRepository>) -> Self {
        Self { repository }
    }

    /// Create a draft. Any status the caller had in mind is ignored.
    #[instrument(skip(self, input), fields(client_name = %input.client_name))]
    pub async fn create(&self, input: CreateInvoice) -> Result<Invoice, InvoiceError> {
        let invoice = self.repository.create_invoice(&input).await?;
        INVOICES_TOTAL
            .with_label_values(&[invoice.status.as_str()])
            .inc();
        info!(invoice_id = %invoice.id, "Draft invoice created");
        Ok(invoice)
    }

    pub async fn get(&self, id: Uuid) -> Result<Invoice, InvoiceError> {
        self.repository
            .get_invoice(id)
            .await?
            .ok_or(InvoiceError::NotFound(id))
    }

    pub async fn list(&self) -> Result<Vec<Invoice>, InvoiceError> {
        Ok(self.repository.list_invoices().await?)
    }

    /// Edit a draft's fields. Sent and later invoices are frozen.
    #[instrument(skip(self, input))]
    pub async fn update(&self, id: Uuid, input: UpdateInvoice) -> Result<Invoice, InvoiceError> {
        if let Some(invoice) = self.repository.update_draft(id, &input).await? {
            return Ok(invoice);
        }

        match self.repository.get_invoice(id).await? {
            Some(invoice) => Err(InvoiceError::NotEditable(invoice.status)),
            None => Err(InvoiceError::NotFound(id)),
        }
    }

    /// Ledger rows referencing the invoice.
    pub async fn ledger_entries(&self, id: Uuid) -> Result<Vec<LedgerEntry>, InvoiceError> {
        self.get(id).await?;
        Ok(self.repository.ledger_entries_for(id).await?)
    }

    pub async fn health_check(&self) -> Result<(), InvoiceError> {
        Ok(self.repository.health_check().await?)
    }
}

//! Domain models for invoicing-service.

mod history;
mod invoice;
mod ledger;

pub use history::{NewStatusHistoryRecord, StatusHistoryRecord};
pub use invoice::{
    price_items, CreateInvoice, Invoice, InvoiceStatus, LineItem, LineItemInput, UpdateInvoice,
};
pub use ledger::{LedgerEntry, NewLedgerEntry, INVOICE_ENTRY_TYPE};

//! Ledger synchronizer: decides the ledger side effect of a transition.
//!
//! Deciding is kept apart from executing so the rules can be checked without
//! a database; the orchestrator carries out whatever is returned here.

use crate::models::{Invoice, InvoiceStatus, NewLedgerEntry, INVOICE_ENTRY_TYPE};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Ledger side effect required by a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerAction {
    None,
    CreateEntry(NewLedgerEntry),
    DeleteEntry { reference_id: Uuid },
}

impl LedgerAction {
    /// Label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerAction::None => "none",
            LedgerAction::CreateEntry(_) => "create",
            LedgerAction::DeleteEntry { .. } => "delete",
        }
    }
}

/// Ledger action for moving `invoice` from `from` to `to` at `now`.
///
/// Entering `paid` recognises the invoice amount as a credit; cancelling a
/// paid invoice reverses it. A refund leaves the ledger alone.
pub fn synchronize(
    invoice: &Invoice,
    from: InvoiceStatus,
    to: InvoiceStatus,
    now: DateTime<Utc>,
) -> LedgerAction {
    match (from, to) {
        (from, InvoiceStatus::Paid) if from != InvoiceStatus::Paid => {
            LedgerAction::CreateEntry(NewLedgerEntry {
                date: now.date_naive(),
                description: format!("Payment received for Invoice #{}", invoice.short_id()),
                credit: Some(invoice.amount),
                reference_id: invoice.id,
                entry_type: INVOICE_ENTRY_TYPE.to_string(),
            })
        }
        (InvoiceStatus::Paid, InvoiceStatus::Cancelled) => LedgerAction::DeleteEntry {
            reference_id: invoice.id,
        },
        _ => LedgerAction::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LineItem;
    use chrono::{NaiveDate, TimeZone};
    use rust_decimal::Decimal;
    use sqlx::types::Json;
    use InvoiceStatus::*;

    fn invoice(amount: i64) -> Invoice {
        let created = Utc.with_ymd_and_hms(2026, 10, 1, 9, 0, 0).unwrap();
        Invoice {
            id: Uuid::parse_str("3f2b8c1e-9a4d-4e7b-8c2a-1d5e6f7a8b9c").unwrap(),
            client_name: "Northwind Traders".to_string(),
            amount: Decimal::new(amount, 2),
            due_date: NaiveDate::from_ymd_opt(2026, 11, 1).unwrap(),
            status: Sent,
            items: Json(Vec::<LineItem>::new()),
            created_at: created,
            updated_at: created,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 14, 30, 0).unwrap()
    }

    #[test]
    fn paying_creates_a_credit_for_the_full_amount() {
        let inv = invoice(125_050);
        let action = synchronize(&inv, Sent, Paid, now());

        let entry = match action {
            LedgerAction::CreateEntry(entry) => entry,
            other => panic!("expected CreateEntry, got {:?}", other),
        };
        assert_eq!(entry.credit, Some(Decimal::new(125_050, 2)));
        assert_eq!(entry.reference_id, inv.id);
        assert_eq!(entry.entry_type, "invoice");
        assert_eq!(entry.description, "Payment received for Invoice #3f2b8c1e");
        assert_eq!(entry.date, NaiveDate::from_ymd_opt(2026, 10, 18).unwrap());
    }

    #[test]
    fn paying_an_overdue_invoice_also_creates_an_entry() {
        let action = synchronize(&invoice(100), Overdue, Paid, now());
        assert_eq!(action.as_str(), "create");
    }

    #[test]
    fn cancelling_a_paid_invoice_deletes_its_entry() {
        let inv = invoice(100);
        assert_eq!(
            synchronize(&inv, Paid, Cancelled, now()),
            LedgerAction::DeleteEntry {
                reference_id: inv.id
            }
        );
    }

    #[test]
    fn refund_leaves_the_ledger_alone() {
        assert_eq!(
            synchronize(&invoice(100), Paid, Refunded, now()),
            LedgerAction::None
        );
    }

    #[test]
    fn other_moves_have_no_side_effect() {
        let inv = invoice(100);
        for (from, to) in [
            (Draft, Sent),
            (Draft, Cancelled),
            (Sent, Overdue),
            (Sent, Cancelled),
            (Overdue, Cancelled),
            (Paid, Paid),
        ] {
            assert_eq!(synchronize(&inv, from, to, now()), LedgerAction::None);
        }
    }
}

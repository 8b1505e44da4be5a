//! Invoice model for invoicing-service.

use crate::error::InvoiceError;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Invoice status. Closed set; stored as the Postgres enum `invoice_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "invoice_status", rename_all = "lowercase")]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Paid,
    Overdue,
    Cancelled,
    Refunded,
}

impl InvoiceStatus {
    pub const ALL: [InvoiceStatus; 6] = [
        InvoiceStatus::Draft,
        InvoiceStatus::Sent,
        InvoiceStatus::Paid,
        InvoiceStatus::Overdue,
        InvoiceStatus::Cancelled,
        InvoiceStatus::Refunded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
            InvoiceStatus::Cancelled => "cancelled",
            InvoiceStatus::Refunded => "refunded",
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvoiceStatus {
    type Err = InvoiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        InvoiceStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| InvoiceError::Validation(format!("Unknown invoice status '{}'", s)))
    }
}

/// Priced line on an invoice. `amount` is always `quantity * rate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub description: String,
    pub quantity: Decimal,
    pub rate: Decimal,
    pub amount: Decimal,
}

/// Caller-supplied line; carries no amount.
#[derive(Debug, Clone, PartialEq)]
pub struct LineItemInput {
    pub description: String,
    pub quantity: Decimal,
    pub rate: Decimal,
}

impl LineItem {
    /// Price a caller-supplied line, rejecting non-positive quantities and
    /// negative rates.
    pub fn price(input: LineItemInput) -> Result<Self, InvoiceError> {
        if input.quantity <= Decimal::ZERO {
            return Err(InvoiceError::Validation(format!(
                "Quantity for '{}' must be greater than zero",
                input.description
            )));
        }
        if input.rate < Decimal::ZERO {
            return Err(InvoiceError::Validation(format!(
                "Rate for '{}' must not be negative",
                input.description
            )));
        }

        let amount = input
            .quantity
            .checked_mul(input.rate)
            .ok_or_else(amount_too_large)?;

        Ok(Self {
            amount,
            description: input.description,
            quantity: input.quantity,
            rate: input.rate,
        })
    }
}

/// Price every line and total them.
pub fn price_items(inputs: Vec<LineItemInput>) -> Result<(Vec<LineItem>, Decimal), InvoiceError> {
    let items = inputs
        .into_iter()
        .map(LineItem::price)
        .collect::<Result<Vec<_>, _>>()?;
    let total = items
        .iter()
        .try_fold(Decimal::ZERO, |total, item| total.checked_add(item.amount))
        .ok_or_else(amount_too_large)?;
    Ok((items, total))
}

fn amount_too_large() -> InvoiceError {
    InvoiceError::Validation("Line amount is too large".to_string())
}

/// Invoice document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Invoice {
    pub id: Uuid,
    pub client_name: String,
    pub amount: Decimal,
    pub due_date: NaiveDate,
    pub status: InvoiceStatus,
    pub items: Json<Vec<LineItem>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    /// Short id used in human-facing ledger descriptions.
    pub fn short_id(&self) -> String {
        self.id.to_string().chars().take(8).collect()
    }
}

/// Validated input for creating a draft invoice.
#[derive(Debug, Clone)]
pub struct CreateInvoice {
    pub client_name: String,
    pub due_date: NaiveDate,
    pub items: Vec<LineItem>,
    pub amount: Decimal,
}

impl CreateInvoice {
    pub fn new(
        client_name: String,
        due_date: NaiveDate,
        items: Vec<LineItemInput>,
    ) -> Result<Self, InvoiceError> {
        let client_name = client_name.trim().to_string();
        if client_name.is_empty() {
            return Err(InvoiceError::Validation(
                "Client name is required".to_string(),
            ));
        }
        let (items, amount) = price_items(items)?;

        Ok(Self {
            client_name,
            due_date,
            items,
            amount,
        })
    }
}

/// Field changes for a draft invoice. `status` is deliberately absent.
#[derive(Debug, Clone, Default)]
pub struct UpdateInvoice {
    pub client_name: Option<String>,
    pub due_date: Option<NaiveDate>,
    /// Replacement lines and their recomputed total.
    pub items: Option<(Vec<LineItem>, Decimal)>,
}

impl UpdateInvoice {
    pub fn new(
        client_name: Option<String>,
        due_date: Option<NaiveDate>,
        items: Option<Vec<LineItemInput>>,
    ) -> Result<Self, InvoiceError> {
        let client_name = match client_name.map(|name| name.trim().to_string()) {
            Some(name) if name.is_empty() => {
                return Err(InvoiceError::Validation(
                    "Client name must not be empty".to_string(),
                ))
            }
            other => other,
        };
        let items = items.map(price_items).transpose()?;

        Ok(Self {
            client_name,
            due_date,
            items,
        })
    }
}

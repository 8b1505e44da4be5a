//! HTTP request and response bodies.
//!
//! Requests use camelCase. Responses serialise the models directly.

use crate::error::InvoiceError;
use crate::lifecycle::TransitionRequest;
use crate::models::{CreateInvoice, Invoice, LineItemInput, UpdateInvoice};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// One line as the client sends it. Any `amount` field is ignored and
/// recomputed server-side.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LineItemRequest {
    #[validate(length(min = 1, max = 500, message = "Description cannot be empty"))]
    pub description: String,
    pub quantity: Decimal,
    pub rate: Decimal,
}

impl From<LineItemRequest> for LineItemInput {
    fn from(item: LineItemRequest) -> Self {
        LineItemInput {
            description: item.description,
            quantity: item.quantity,
            rate: item.rate,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoiceRequest {
    #[validate(length(min = 1, max = 200, message = "Client name is required"))]
    pub client_name: String,
    pub due_date: NaiveDate,
    #[serde(default)]
    #[validate(nested)]
    pub items: Vec<LineItemRequest>,
}

impl TryFrom<CreateInvoiceRequest> for CreateInvoice {
    type Error = InvoiceError;

    fn try_from(req: CreateInvoiceRequest) -> Result<Self, Self::Error> {
        CreateInvoice::new(
            req.client_name,
            req.due_date,
            req.items.into_iter().map(Into::into).collect(),
        )
    }
}

/// Field edits for a draft. There is no status field; status only moves
/// through the status endpoint.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInvoiceRequest {
    #[validate(length(min = 1, max = 200, message = "Client name cannot be empty"))]
    pub client_name: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub items: Option<Vec<LineItemRequest>>,
}

impl TryFrom<UpdateInvoiceRequest> for UpdateInvoice {
    type Error = InvoiceError;

    fn try_from(req: UpdateInvoiceRequest) -> Result<Self, Self::Error> {
        UpdateInvoice::new(
            req.client_name,
            req.due_date,
            req.items
                .map(|items| items.into_iter().map(Into::into).collect()),
        )
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub status: String,
    #[serde(default, rename = "override")]
    pub override_requested: bool,
    #[validate(length(max = 1000, message = "Override reason is too long"))]
    pub override_reason: Option<String>,
}

impl TryFrom<UpdateStatusRequest> for TransitionRequest {
    type Error = InvoiceError;

    fn try_from(req: UpdateStatusRequest) -> Result<Self, Self::Error> {
        Ok(TransitionRequest {
            status: req.status.trim().parse()?,
            override_requested: req.override_requested,
            override_reason: req.override_reason,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct InvoiceListResponse {
    pub invoices: Vec<Invoice>,
}

//! Invoice HTTP handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

use crate::dtos::{
    CreateInvoiceRequest, InvoiceListResponse, UpdateInvoiceRequest, UpdateStatusRequest,
};
use crate::lifecycle::{AllowedTransitions, TransitionRequest};
use crate::middleware::CallerIdentity;
use crate::models::{CreateInvoice, Invoice, LedgerEntry, StatusHistoryRecord, UpdateInvoice};
use crate::startup::AppState;

pub async fn list_invoices(
    State(state): State<AppState>,
    _caller: CallerIdentity,
) -> Result<Json<InvoiceListResponse>, AppError> {
    let invoices = state.invoices.list().await?;
    Ok(Json(InvoiceListResponse { invoices }))
}

#[tracing::instrument(skip(state, request), fields(user_id = %caller.subject))]
pub async fn create_invoice(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Json(request): Json<CreateInvoiceRequest>,
) -> Result<(StatusCode, Json<Invoice>), AppError> {
    request.validate()?;

    let input = CreateInvoice::try_from(request)?;
    let invoice = state.invoices.create(input).await?;

    Ok((StatusCode::CREATED, Json(invoice)))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    _caller: CallerIdentity,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<Invoice>, AppError> {
    Ok(Json(state.invoices.get(invoice_id).await?))
}

#[tracing::instrument(skip(state, request), fields(user_id = %caller.subject))]
pub async fn update_invoice(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(invoice_id): Path<Uuid>,
    Json(request): Json<UpdateInvoiceRequest>,
) -> Result<Json<Invoice>, AppError> {
    request.validate()?;

    let input = UpdateInvoice::try_from(request)?;
    Ok(Json(state.invoices.update(invoice_id, input).await?))
}

#[tracing::instrument(skip(state, request), fields(user_id = %caller.subject))]
pub async fn update_invoice_status(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(invoice_id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Invoice>, AppError> {
    request.validate()?;

    let transition = TransitionRequest::try_from(request)?;
    let invoice = state
        .orchestrator
        .apply_transition(invoice_id, transition, &caller)
        .await?;

    Ok(Json(invoice))
}

pub async fn allowed_transitions(
    State(state): State<AppState>,
    _caller: CallerIdentity,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<AllowedTransitions>, AppError> {
    Ok(Json(state.orchestrator.allowed_transitions(invoice_id).await?))
}

pub async fn status_history(
    State(state): State<AppState>,
    _caller: CallerIdentity,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<Vec<StatusHistoryRecord>>, AppError> {
    Ok(Json(state.orchestrator.history(invoice_id).await?))
}

pub async fn ledger_entries(
    State(state): State<AppState>,
    _caller: CallerIdentity,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<Vec<LedgerEntry>>, AppError> {
    Ok(Json(state.invoices.ledger_entries(invoice_id).await?))
}

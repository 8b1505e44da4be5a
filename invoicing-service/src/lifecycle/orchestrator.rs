//! Transition orchestrator.
//!
//! Every status change goes through [`TransitionOrchestrator::apply_transition`]:
//! lock the invoice, check the policy, decide and execute the ledger side
//! effect, update the status and append the audit record, all inside one
//! unit of work. Nothing is visible unless the unit commits.

use super::ledger::{synchronize, LedgerAction};
use super::policy::{allowed_next_states, is_terminal, validate_transition};
use crate::error::InvoiceError;
use crate::middleware::CallerIdentity;
use crate::models::{
    Invoice, InvoiceStatus, NewStatusHistoryRecord, StatusHistoryRecord, INVOICE_ENTRY_TYPE,
};
use crate::services::metrics::{ERRORS_TOTAL, INVOICES_TOTAL, LEDGER_ACTIONS_TOTAL, TRANSITIONS_TOTAL};
use crate::store::{AuditTrail, InvoiceRepository, InvoiceStore, LedgerStore, UnitOfWork};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Who may bypass the transition table, and whether anyone may.
#[derive(Debug, Clone)]
pub struct OverridePolicy {
    pub enabled: bool,
    pub role: String,
}

impl Default for OverridePolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            role: "admin".to_string(),
        }
    }
}

/// A requested status change.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionRequest {
    pub status: InvoiceStatus,
    pub override_requested: bool,
    pub override_reason: Option<String>,
}

impl TransitionRequest {
    pub fn to(status: InvoiceStatus) -> Self {
        Self {
            status,
            override_requested: false,
            override_reason: None,
        }
    }

    /// Ask to bypass the transition table, giving a reason for the audit trail.
    pub fn with_override(mut self, reason: impl Into<String>) -> Self {
        self.override_requested = true;
        self.override_reason = Some(reason.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllowedTransitions {
    pub current_status: InvoiceStatus,
    pub allowed_transitions: Vec<InvoiceStatus>,
}

/// What a committed transition did.
struct Applied {
    invoice: Invoice,
    action: &'static str,
    overridden: bool,
}

#[derive(Clone)]
pub struct TransitionOrchestrator {
    repository: Arc<dyn InvoiceRepository>,
    overrides: OverridePolicy,
}

impl TransitionOrchestrator {
    pub fn new(repository: Arc<dyn InvoiceRepository>, overrides: OverridePolicy) -> Self {
        Self {
            repository,
            overrides,
        }
    }

    /// Move an invoice to `request.status` on behalf of `caller`.
    ///
    /// Returns the updated invoice. On any error nothing is persisted.
    #[instrument(
        skip(self, request, caller),
        fields(invoice_id = %invoice_id, to = %request.status, changed_by = %caller.subject)
    )]
    pub async fn apply_transition(
        &self,
        invoice_id: Uuid,
        request: TransitionRequest,
        caller: &CallerIdentity,
    ) -> Result<Invoice, InvoiceError> {
        let to = request.status;
        let may_bypass = match self.authorize_override(&request, caller) {
            Ok(may_bypass) => may_bypass,
            Err(err) => {
                warn!(error = %err, "Override refused");
                ERRORS_TOTAL.with_label_values(&[err.kind()]).inc();
                return Err(err);
            }
        };
        let reason = audit_reason(&request);

        let mut unit = match self.repository.begin().await {
            Ok(unit) => unit,
            Err(err) => {
                let err = InvoiceError::from(err);
                self.record_failure(&err, None, to);
                return Err(err);
            }
        };

        let locked = match unit.lock_invoice(invoice_id).await {
            Ok(Some(invoice)) => invoice,
            Ok(None) => {
                let err = InvoiceError::NotFound(invoice_id);
                return self.abandon(unit, err, None, to).await;
            }
            Err(err) => return self.abandon(unit, err.into(), None, to).await,
        };
        let from = locked.status;

        let applied = match self
            .run(unit.as_mut(), locked, to, may_bypass, reason, caller)
            .await
        {
            Ok(applied) => applied,
            Err(err) => return self.abandon(unit, err, Some(from), to).await,
        };

        if let Err(err) = unit.commit().await {
            let err = InvoiceError::from(err);
            self.record_failure(&err, Some(from), to);
            return Err(err);
        }

        let outcome = if applied.overridden {
            "overridden"
        } else {
            "applied"
        };
        TRANSITIONS_TOTAL
            .with_label_values(&[from.as_str(), to.as_str(), outcome])
            .inc();
        INVOICES_TOTAL.with_label_values(&[to.as_str()]).inc();
        if applied.action != LedgerAction::None.as_str() {
            LEDGER_ACTIONS_TOTAL
                .with_label_values(&[applied.action])
                .inc();
        }

        info!(
            from = %from,
            ledger_action = applied.action,
            overridden = applied.overridden,
            "Invoice status changed"
        );

        Ok(applied.invoice)
    }

    /// Statuses the invoice may move to next.
    #[instrument(skip(self))]
    pub async fn allowed_transitions(
        &self,
        invoice_id: Uuid,
    ) -> Result<AllowedTransitions, InvoiceError> {
        let invoice = self
            .repository
            .get_invoice(invoice_id)
            .await?
            .ok_or(InvoiceError::NotFound(invoice_id))?;

        Ok(AllowedTransitions {
            current_status: invoice.status,
            allowed_transitions: allowed_next_states(invoice.status).to_vec(),
        })
    }

    /// Status history, newest first.
    #[instrument(skip(self))]
    pub async fn history(&self, invoice_id: Uuid) -> Result<Vec<StatusHistoryRecord>, InvoiceError> {
        if self.repository.get_invoice(invoice_id).await?.is_none() {
            return Err(InvoiceError::NotFound(invoice_id));
        }
        Ok(self.repository.history(invoice_id).await?)
    }

    /// Whether the caller may bypass the transition table. Only checked
    /// when an override was asked for.
    fn authorize_override(
        &self,
        request: &TransitionRequest,
        caller: &CallerIdentity,
    ) -> Result<bool, InvoiceError> {
        if !request.override_requested {
            return Ok(false);
        }
        if !self.overrides.enabled || caller.role != self.overrides.role {
            return Err(InvoiceError::OverrideNotPermitted(caller.subject.clone()));
        }
        if audit_reason(request).is_none() {
            return Err(InvoiceError::OverrideReasonRequired);
        }
        Ok(true)
    }

    async fn run(
        &self,
        unit: &mut dyn UnitOfWork,
        invoice: Invoice,
        to: InvoiceStatus,
        may_bypass: bool,
        reason: Option<String>,
        caller: &CallerIdentity,
    ) -> Result<Applied, InvoiceError> {
        let from = invoice.status;

        // An override may bypass the table but never revive a closed invoice.
        let overridden = match validate_transition(from, to) {
            Ok(()) => false,
            Err(err) => {
                if !may_bypass || is_terminal(from) || from == to {
                    return Err(err);
                }
                true
            }
        };

        let now = Utc::now();
        let action = synchronize(&invoice, from, to, now);
        match &action {
            LedgerAction::None => {}
            LedgerAction::CreateEntry(entry) => {
                unit.delete_by_reference(entry.reference_id, &entry.entry_type)
                    .await?;
                unit.insert_entry(entry).await?;
            }
            LedgerAction::DeleteEntry { reference_id } => {
                unit.delete_by_reference(*reference_id, INVOICE_ENTRY_TYPE)
                    .await?;
            }
        }

        let updated = unit.update_status(invoice.id, to, now).await?;

        unit.append(&NewStatusHistoryRecord {
            invoice_id: invoice.id,
            from_status: from,
            to_status: to,
            changed_by: caller.subject.clone(),
            override_reason: reason,
            changed_at: now,
        })
        .await?;

        Ok(Applied {
            invoice: updated,
            action: action.as_str(),
            overridden,
        })
    }

    /// Roll back a failed unit and report the error.
    async fn abandon(
        &self,
        unit: Box<dyn UnitOfWork>,
        err: InvoiceError,
        from: Option<InvoiceStatus>,
        to: InvoiceStatus,
    ) -> Result<Invoice, InvoiceError> {
        if let Err(rollback_err) = unit.rollback().await {
            warn!(error = %rollback_err, "Rollback failed; transaction discarded on drop");
        }
        self.record_failure(&err, from, to);
        Err(err)
    }

    fn record_failure(
        &self,
        err: &InvoiceError,
        from: Option<InvoiceStatus>,
        to: InvoiceStatus,
    ) {
        match err {
            InvoiceError::InvalidTransition { from, to } => {
                warn!(from = %from, to = %to, "Transition rejected");
                TRANSITIONS_TOTAL
                    .with_label_values(&[from.as_str(), to.as_str(), "rejected"])
                    .inc();
            }
            InvoiceError::Storage(_) => {
                let from = from.map_or("unknown", |status| status.as_str());
                TRANSITIONS_TOTAL
                    .with_label_values(&[from, to.as_str(), "failed"])
                    .inc();
            }
            _ => {}
        }
        ERRORS_TOTAL.with_label_values(&[err.kind()]).inc();
    }
}

/// The caller's reason, trimmed; blank counts as absent.
fn audit_reason(request: &TransitionRequest) -> Option<String> {
    request
        .override_reason
        .as_deref()
        .map(str::trim)
        .filter(|reason| !reason.is_empty())
        .map(str::to_string)
}

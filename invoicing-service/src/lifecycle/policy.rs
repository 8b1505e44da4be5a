//! Status transition policy.
//!
//! The table below is the only place that decides which moves are legal. It
//! is evaluated server-side on every request, whatever the client offered.

use crate::error::InvoiceError;
use crate::models::InvoiceStatus;

/// Statuses reachable in one step from `status`.
pub fn allowed_next_states(status: InvoiceStatus) -> &'static [InvoiceStatus] {
    use InvoiceStatus::*;

    match status {
        Draft => &[Sent, Cancelled],
        Sent => &[Paid, Overdue, Cancelled],
        Paid => &[Refunded],
        Overdue => &[Paid, Cancelled],
        Cancelled => &[],
        Refunded => &[],
    }
}

/// Whether no transition leaves `status`.
pub fn is_terminal(status: InvoiceStatus) -> bool {
    allowed_next_states(status).is_empty()
}

/// Check a requested move against the table.
pub fn validate_transition(
    current: InvoiceStatus,
    requested: InvoiceStatus,
) -> Result<(), InvoiceError> {
    if allowed_next_states(current).contains(&requested) {
        Ok(())
    } else {
        Err(InvoiceError::InvalidTransition {
            from: current,
            to: requested,
        })
    }
}

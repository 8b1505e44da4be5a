//! Status lifecycle integration tests against the in-memory store.

mod common;

use common::{admin, dec, member, TestApp};
use invoicing_service::error::InvoiceError;
use invoicing_service::lifecycle::{allowed_next_states, is_terminal, TransitionRequest};
use invoicing_service::models::InvoiceStatus::{self, *};
use invoicing_service::models::INVOICE_ENTRY_TYPE;
use invoicing_service::store::InvoiceRepository;
use uuid::Uuid;

#[tokio::test]
async fn draft_to_paid_to_refunded_scenario() {
    let app = TestApp::new();
    let orch = app.orchestrator();
    let invoice = app.draft("Acme Corp", "1500.00").await;
    assert_eq!(invoice.status, Draft);

    let sent = orch
        .apply_transition(invoice.id, TransitionRequest::to(Sent), &member())
        .await
        .unwrap();
    assert_eq!(sent.status, Sent);
    assert!(app.repository.ledger_entries_for(invoice.id).await.unwrap().is_empty());

    let paid = orch
        .apply_transition(invoice.id, TransitionRequest::to(Paid), &member())
        .await
        .unwrap();
    assert_eq!(paid.status, Paid);
    let entries = app.repository.ledger_entries_for(invoice.id).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].credit, Some(dec("1500.00")));
    assert_eq!(entries[0].entry_type.as_deref(), Some(INVOICE_ENTRY_TYPE));
    assert_eq!(
        entries[0].description,
        format!("Payment received for Invoice #{}", &invoice.id.to_string()[..8])
    );

    let err = orch
        .apply_transition(invoice.id, TransitionRequest::to(Draft), &member())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        InvoiceError::InvalidTransition {
            from: Paid,
            to: Draft
        }
    ));

    let refunded = orch
        .apply_transition(invoice.id, TransitionRequest::to(Refunded), &member())
        .await
        .unwrap();
    assert_eq!(refunded.status, Refunded);
    assert_eq!(
        app.repository.ledger_entries_for(invoice.id).await.unwrap(),
        entries
    );
}

#[tokio::test]
async fn success_iff_move_is_in_the_table() {
    let app = TestApp::new();

    for from in InvoiceStatus::ALL {
        for to in InvoiceStatus::ALL {
            let invoice = app.invoice_in(from).await;
            let result = app
                .orchestrator()
                .apply_transition(invoice.id, TransitionRequest::to(to), &member())
                .await;

            let legal = allowed_next_states(from).contains(&to);
            assert_eq!(result.is_ok(), legal, "{} -> {}", from, to);
            if !legal {
                assert!(matches!(
                    result,
                    Err(InvoiceError::InvalidTransition { .. })
                ));
            }
        }
    }
}

#[tokio::test]
async fn terminal_states_reject_every_target() {
    let app = TestApp::new();

    for terminal in [Cancelled, Refunded] {
        assert!(is_terminal(terminal));
        let invoice = app.invoice_in(terminal).await;
        for to in InvoiceStatus::ALL {
            let err = app
                .orchestrator()
                .apply_transition(invoice.id, TransitionRequest::to(to), &member())
                .await
                .unwrap_err();
            assert!(matches!(err, InvoiceError::InvalidTransition { from, .. } if from == terminal));
        }
    }
}

#[tokio::test]
async fn paying_from_overdue_creates_one_entry() {
    let app = TestApp::new();
    let invoice = app.invoice_in(Overdue).await;

    app.orchestrator()
        .apply_transition(invoice.id, TransitionRequest::to(Paid), &member())
        .await
        .unwrap();

    let entries = app.repository.ledger_entries_for(invoice.id).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].credit, Some(invoice.amount));
}

#[tokio::test]
async fn cancelling_a_paid_invoice_removes_its_entry() {
    let app = TestApp::new();
    let invoice = app.invoice_in(Paid).await;
    assert_eq!(app.repository.ledger_entries_for(invoice.id).await.unwrap().len(), 1);

    // Paid -> Cancelled is outside the table, so it takes an override.
    app.orchestrator()
        .apply_transition(
            invoice.id,
            TransitionRequest::to(Cancelled).with_override("Payment bounced"),
            &admin(),
        )
        .await
        .unwrap();

    assert!(app.repository.ledger_entries_for(invoice.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn moves_without_ledger_rules_leave_entries_alone() {
    let app = TestApp::new();
    let other = app.invoice_in(Paid).await;
    let before = app.repository.ledger_entries_for(other.id).await.unwrap();

    for (from, to) in [(Draft, Sent), (Draft, Cancelled), (Sent, Overdue), (Overdue, Cancelled)] {
        let invoice = app.invoice_in(from).await;
        app.orchestrator()
            .apply_transition(invoice.id, TransitionRequest::to(to), &member())
            .await
            .unwrap();
        assert!(app.repository.ledger_entries_for(invoice.id).await.unwrap().is_empty());
    }

    assert_eq!(app.repository.ledger_entries_for(other.id).await.unwrap(), before);
}

#[tokio::test]
async fn history_forms_a_consistent_path() {
    let app = TestApp::new();
    let invoice = app.invoice_in(Refunded).await;

    let mut history = app.orchestrator().history(invoice.id).await.unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].to_status, Refunded);

    history.reverse();
    let mut current = Draft;
    for record in &history {
        assert_eq!(record.from_status, current);
        assert!(allowed_next_states(record.from_status).contains(&record.to_status));
        assert_eq!(record.changed_by, member().subject);
        assert_eq!(record.override_reason, None);
        current = record.to_status;
    }
    assert_eq!(current, Refunded);
}

#[tokio::test]
async fn rejected_attempts_write_no_history() {
    let app = TestApp::new();
    let invoice = app.invoice_in(Sent).await;

    let _ = app
        .orchestrator()
        .apply_transition(invoice.id, TransitionRequest::to(Draft), &member())
        .await
        .unwrap_err();

    assert_eq!(app.orchestrator().history(invoice.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_invoice_is_not_found() {
    let app = TestApp::new();
    let missing = Uuid::new_v4();

    let err = app
        .orchestrator()
        .apply_transition(missing, TransitionRequest::to(Sent), &member())
        .await
        .unwrap_err();
    assert!(matches!(err, InvoiceError::NotFound(id) if id == missing));

    assert!(matches!(
        app.orchestrator().history(missing).await,
        Err(InvoiceError::NotFound(_))
    ));
    assert!(matches!(
        app.orchestrator().allowed_transitions(missing).await,
        Err(InvoiceError::NotFound(_))
    ));
}

#[tokio::test]
async fn allowed_transitions_reflect_current_status() {
    let app = TestApp::new();
    let invoice = app.invoice_in(Sent).await;

    let allowed = app.orchestrator().allowed_transitions(invoice.id).await.unwrap();
    assert_eq!(allowed.current_status, Sent);
    assert_eq!(allowed.allowed_transitions, vec![Paid, Overdue, Cancelled]);
}

#[tokio::test]
async fn repeating_a_transition_is_rejected() {
    let app = TestApp::new();
    let invoice = app.invoice_in(Paid).await;

    let err = app
        .orchestrator()
        .apply_transition(invoice.id, TransitionRequest::to(Paid), &member())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        InvoiceError::InvalidTransition {
            from: Paid,
            to: Paid
        }
    ));
    assert_eq!(app.repository.ledger_entries_for(invoice.id).await.unwrap().len(), 1);
}

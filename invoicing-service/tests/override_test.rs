//! Policy override and draft editing tests.

mod common;

use common::{admin, dec, member, test_config, TestApp};
use invoicing_service::error::InvoiceError;
use invoicing_service::lifecycle::TransitionRequest;
use invoicing_service::models::{InvoiceStatus::*, LineItemInput, UpdateInvoice};
use invoicing_service::store::InvoiceRepository;
use rust_decimal::Decimal;

#[tokio::test]
async fn members_cannot_override() {
    let app = TestApp::new();
    let invoice = app.invoice_in(Paid).await;

    let err = app
        .orchestrator()
        .apply_transition(
            invoice.id,
            TransitionRequest::to(Sent).with_override("Client disputed payment"),
            &member(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, InvoiceError::OverrideNotPermitted(_)));
    assert_eq!(app.repository.get_invoice(invoice.id).await.unwrap().unwrap().status, Paid);
}

#[tokio::test]
async fn override_needs_a_reason() {
    let app = TestApp::new();
    let invoice = app.invoice_in(Sent).await;

    let mut request = TransitionRequest::to(Draft);
    request.override_requested = true;

    let err = app
        .orchestrator()
        .apply_transition(invoice.id, request, &admin())
        .await
        .unwrap_err();
    assert!(matches!(err, InvoiceError::OverrideReasonRequired));
}

#[tokio::test]
async fn override_is_recorded_in_history() {
    let app = TestApp::new();
    let invoice = app.invoice_in(Sent).await;

    let reopened = app
        .orchestrator()
        .apply_transition(
            invoice.id,
            TransitionRequest::to(Draft).with_override("  Wrong client on invoice  "),
            &admin(),
        )
        .await
        .unwrap();
    assert_eq!(reopened.status, Draft);

    let history = app.orchestrator().history(invoice.id).await.unwrap();
    assert_eq!(history[0].from_status, Sent);
    assert_eq!(history[0].to_status, Draft);
    assert_eq!(history[0].changed_by, admin().subject);
    assert_eq!(history[0].override_reason.as_deref(), Some("Wrong client on invoice"));
}

#[tokio::test]
async fn override_never_leaves_a_terminal_state() {
    let app = TestApp::new();

    for terminal in [Cancelled, Refunded] {
        let invoice = app.invoice_in(terminal).await;
        let err = app
            .orchestrator()
            .apply_transition(
                invoice.id,
                TransitionRequest::to(Sent).with_override("Reopen"),
                &admin(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, InvoiceError::InvalidTransition { .. }));
    }
}

#[tokio::test]
async fn override_cannot_target_the_current_status() {
    let app = TestApp::new();
    let invoice = app.invoice_in(Paid).await;

    let err = app
        .orchestrator()
        .apply_transition(
            invoice.id,
            TransitionRequest::to(Paid).with_override("Record payment again"),
            &admin(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, InvoiceError::InvalidTransition { .. }));
    assert_eq!(app.repository.ledger_entries_for(invoice.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn legal_moves_with_the_flag_keep_the_reason() {
    let app = TestApp::new();
    let invoice = app.invoice_in(Sent).await;

    app.orchestrator()
        .apply_transition(
            invoice.id,
            TransitionRequest::to(Paid).with_override("Paid early by the client"),
            &admin(),
        )
        .await
        .unwrap();

    let history = app.orchestrator().history(invoice.id).await.unwrap();
    assert_eq!(history[0].override_reason.as_deref(), Some("Paid early by the client"));
}

#[tokio::test]
async fn reason_without_the_flag_is_recorded_for_any_caller() {
    let app = TestApp::new();
    let invoice = app.invoice_in(Sent).await;

    let mut request = TransitionRequest::to(Paid);
    request.override_reason = Some(" paid by wire, ref 991 ".to_string());
    app.orchestrator()
        .apply_transition(invoice.id, request, &member())
        .await
        .unwrap();

    let history = app.orchestrator().history(invoice.id).await.unwrap();
    assert_eq!(history[0].override_reason.as_deref(), Some("paid by wire, ref 991"));
}

#[tokio::test]
async fn reason_without_the_flag_does_not_bypass_the_table() {
    let app = TestApp::new();
    let invoice = app.invoice_in(Sent).await;

    let mut request = TransitionRequest::to(Draft);
    request.override_reason = Some("Wrong client".to_string());
    let err = app
        .orchestrator()
        .apply_transition(invoice.id, request, &admin())
        .await
        .unwrap_err();
    assert!(matches!(err, InvoiceError::InvalidTransition { .. }));
}

#[tokio::test]
async fn disabled_override_refuses_admins() {
    let mut config = test_config();
    config.overrides.enabled = false;
    let app = TestApp::with_config(config);
    let invoice = app.invoice_in(Sent).await;

    let err = app
        .orchestrator()
        .apply_transition(
            invoice.id,
            TransitionRequest::to(Draft).with_override("Typo"),
            &admin(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, InvoiceError::OverrideNotPermitted(_)));
}

#[tokio::test]
async fn repaying_after_override_keeps_a_single_entry() {
    let app = TestApp::new();
    let invoice = app.invoice_in(Paid).await;

    app.orchestrator()
        .apply_transition(
            invoice.id,
            TransitionRequest::to(Sent).with_override("Cheque bounced"),
            &admin(),
        )
        .await
        .unwrap();
    app.orchestrator()
        .apply_transition(invoice.id, TransitionRequest::to(Paid), &member())
        .await
        .unwrap();

    assert_eq!(app.repository.ledger_entries_for(invoice.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn drafts_can_be_edited_and_totals_recomputed() {
    let app = TestApp::new();
    let invoice = app.draft("Umbrella", "10.00").await;

    let update = UpdateInvoice::new(
        Some("Umbrella Corp".to_string()),
        None,
        Some(vec![
            LineItemInput {
                description: "Research".to_string(),
                quantity: dec("2"),
                rate: dec("125.25"),
            },
            LineItemInput {
                description: "Travel".to_string(),
                quantity: Decimal::ONE,
                rate: dec("80"),
            },
        ]),
    )
    .unwrap();

    let updated = app.state.invoices.update(invoice.id, update).await.unwrap();
    assert_eq!(updated.client_name, "Umbrella Corp");
    assert_eq!(updated.amount, dec("330.50"));
    assert_eq!(updated.items.0.len(), 2);
    assert_eq!(updated.status, Draft);
    assert_eq!(updated.due_date, invoice.due_date);
}

#[tokio::test]
async fn sent_invoices_are_not_editable() {
    let app = TestApp::new();
    let invoice = app.invoice_in(Sent).await;

    let update = UpdateInvoice::new(Some("Someone else".to_string()), None, None).unwrap();
    let err = app
        .state
        .invoices
        .update(invoice.id, update)
        .await
        .unwrap_err();
    assert!(matches!(err, InvoiceError::NotEditable(Sent)));
}

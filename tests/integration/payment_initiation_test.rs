// Payment initiation preconditions and queueing

#[path = "../helpers/mod.rs"]
mod helpers;

use billing_loan::core::AppError;
use billing_loan::modules::loans::models::{BillStatus, LoanStatus};
use billing_loan::modules::loans::repositories::LoanRepository;
use billing_loan::modules::loans::services::BillWriteMode;
use billing_loan::modules::payments::models::{Payment, PaymentStatus, NOTE_QUEUE_FAILED};
use billing_loan::modules::payments::queue::PaymentEventConsumer;
use helpers::*;
use std::sync::Arc;

#[tokio::test]
async fn test_matching_payment_is_stored_pending() {
    let harness = Harness::with_terms(10, 1).await;
    let loan = harness.billed_loan(1_250_000).await;
    let bill = &loan.loan_bills[0];
    assert_eq!(bill.billing_total_amount, 1_375_000);

    let payment = harness.payments.initiate(&pay(&loan, bill)).await.unwrap();

    assert!(payment.id > 0);
    assert_eq!(payment.status, PaymentStatus::Pending);
    assert_eq!(payment.amount, 1_375_000);
    assert_eq!(payment.loan_bill_id, bill.id);
    assert_eq!(payment.note, None);
    assert_eq!(harness.payment_of(payment.id).await, payment);
}

#[tokio::test]
async fn test_initiation_leaves_ledger_untouched() {
    let harness = Harness::with_terms(10, 1).await;
    let loan = harness.billed_loan(1_250_000).await;
    let bill = &loan.loan_bills[0];

    harness.payments.initiate(&pay(&loan, bill)).await.unwrap();

    let stored = harness.loan_of(loan.loan.id).await;
    assert_eq!(stored.outstanding_amount, 1_375_000);
    assert_eq!(stored.status, LoanStatus::Active);
    assert_eq!(harness.bill_of(bill.id).await.status, BillStatus::Billed);
}

#[tokio::test]
async fn test_amount_mismatch_rejected_without_payment_row() {
    let harness = Harness::with_terms(10, 1).await;
    let loan = harness.billed_loan(1_250_000).await;
    let mut request = pay(&loan, &loan.loan_bills[0]);
    request.amount = 1_000_000;

    let err = harness.payments.initiate(&request).await.unwrap_err();

    match err {
        AppError::PaymentAmountMismatch {
            expected, actual, ..
        } => {
            assert_eq!(expected, 1_375_000);
            assert_eq!(actual, 1_000_000);
        }
        other => panic!("expected amount mismatch, got {:?}", other),
    }
    assert!(harness.store.payments().await.is_empty());
}

#[tokio::test]
async fn test_unbilled_bill_rejected_before_amount_check() {
    let harness = Harness::new().await;
    let loan = harness.loan(10000).await;
    let bill = &loan.loan_bills[0];
    assert_eq!(bill.status, BillStatus::Pending);

    let mut request = pay(&loan, bill);
    request.amount = 1;

    let err = harness.payments.initiate(&request).await.unwrap_err();
    assert!(matches!(err, AppError::LoanBillNotBilled { .. }));
    assert!(harness.store.payments().await.is_empty());
}

#[tokio::test]
async fn test_paid_and_overdue_bills_are_not_payable() {
    let harness = Harness::new().await;
    let loan = harness.billed_loan(10000).await;
    harness
        .set_bill_status(loan.loan_bills[0].id, BillStatus::Paid)
        .await;
    harness
        .set_bill_status(loan.loan_bills[1].id, BillStatus::Overdue)
        .await;

    for bill in &loan.loan_bills[..2] {
        let err = harness.payments.initiate(&pay(&loan, bill)).await.unwrap_err();
        assert!(matches!(err, AppError::LoanBillNotBilled { .. }));
    }
}

#[tokio::test]
async fn test_inactive_loan_rejected() {
    let harness = Harness::new().await;
    let loan = harness.billed_loan(10000).await;
    LoanRepository::update_status(&harness.store, loan.loan.id, LoanStatus::Closed)
        .await
        .unwrap();

    let err = harness
        .payments
        .initiate(&pay(&loan, &loan.loan_bills[0]))
        .await
        .unwrap_err();

    match err {
        AppError::LoanNotActive { loan_id, status } => {
            assert_eq!(loan_id, loan.loan.id);
            assert_eq!(status, "CLOSED");
        }
        other => panic!("expected inactive loan, got {:?}", other),
    }
}

#[tokio::test]
async fn test_missing_bill_and_loan_are_not_found() {
    let harness = Harness::new().await;
    let loan = harness.billed_loan(10000).await;

    let mut missing_bill = pay(&loan, &loan.loan_bills[0]);
    missing_bill.loan_bill_id = 999;
    let err = harness.payments.initiate(&missing_bill).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let mut missing_loan = pay(&loan, &loan.loan_bills[0]);
    missing_loan.loan_id = 999;
    let err = harness.payments.initiate(&missing_loan).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_bill_and_loan_ownership_checked() {
    let harness = Harness::new().await;
    let first = harness.billed_loan(10000).await;
    let second = harness.billed_loan(10000).await;

    // Bill of the first loan paid against the second
    let mut wrong_loan = pay(&first, &first.loan_bills[0]);
    wrong_loan.loan_id = second.loan.id;
    let err = harness.payments.initiate(&wrong_loan).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let mut wrong_user = pay(&first, &first.loan_bills[0]);
    wrong_user.user_id = second.loan.user_id;
    let err = harness.payments.initiate(&wrong_user).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    assert!(harness.store.payments().await.is_empty());
}

#[tokio::test]
async fn test_submit_publishes_payment() {
    let mut harness = Harness::new().await;
    let loan = harness.billed_loan(10000).await;

    let payment = harness
        .payments
        .submit(&pay(&loan, &loan.loan_bills[0]))
        .await
        .unwrap();

    let mut consumer = harness.consumer.take().unwrap();
    let body = consumer.next().await.unwrap();
    let queued: Payment = serde_json::from_slice(&body).unwrap();
    assert_eq!(queued, payment);
    assert_eq!(queued.status, PaymentStatus::Pending);
}

#[tokio::test]
async fn test_unavailable_queue_fails_payment() {
    let store = store_with_terms(10, 5).await;
    let repos = Repos::from_store(&store);
    let harness = Harness::build_with_publisher(
        store,
        repos,
        BillWriteMode::Concurrent,
        Arc::new(UnavailablePublisher),
        None,
    );
    let loan = harness.billed_loan(10000).await;

    let err = harness
        .payments
        .submit(&pay(&loan, &loan.loan_bills[0]))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Queue(_)));

    let payments = harness.store.payments().await;
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0].status, PaymentStatus::Failed);
    assert_eq!(payments[0].note.as_deref(), Some(NOTE_QUEUE_FAILED));
    assert_eq!(harness.loan_of(loan.loan.id).await.outstanding_amount, 11000);
}

#[tokio::test]
async fn test_get_payment_not_found() {
    let harness = Harness::new().await;
    let err = harness.payments.get_payment(42).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

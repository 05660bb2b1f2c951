use super::super::models::{NewPayment, Payment, PaymentRequest, PaymentStatus, NOTE_QUEUE_FAILED};
use super::super::queue::PaymentEventPublisher;
use super::super::repositories::PaymentRepository;
use crate::core::{AppError, Result};
use crate::modules::loans::models::LoanStatus;
use crate::modules::loans::repositories::{LoanBillRepository, LoanRepository};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Validates payment requests and records them for settlement
///
/// Initiation never touches the ledger; balances only change when the
/// settlement worker processes the queued payment.
pub struct PaymentService {
    payment_repo: Arc<dyn PaymentRepository>,
    loan_repo: Arc<dyn LoanRepository>,
    bill_repo: Arc<dyn LoanBillRepository>,
    publisher: Arc<dyn PaymentEventPublisher>,
}

impl PaymentService {
    pub fn new(
        payment_repo: Arc<dyn PaymentRepository>,
        loan_repo: Arc<dyn LoanRepository>,
        bill_repo: Arc<dyn LoanBillRepository>,
        publisher: Arc<dyn PaymentEventPublisher>,
    ) -> Self {
        Self {
            payment_repo,
            loan_repo,
            bill_repo,
            publisher,
        }
    }

    /// Validate a payment request and store it as PENDING
    ///
    /// Checks run in order and the first failure is returned:
    /// request shape, bill exists and is BILLED, amount equals the bill
    /// total, loan exists and is ACTIVE, bill belongs to the loan and the
    /// loan to the user. Nothing is written unless every check passes.
    ///
    /// # Returns
    /// * `Result<Payment>` - The stored payment, re-read by its generated id
    pub async fn initiate(&self, request: &PaymentRequest) -> Result<Payment> {
        request.validate()?;

        let bill = self
            .bill_repo
            .find_by_id(request.loan_bill_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("Loan bill {} not found", request.loan_bill_id))
            })?;

        if !bill.is_payable() {
            return Err(AppError::LoanBillNotBilled {
                loan_bill_id: bill.id,
                status: bill.status.to_string(),
            });
        }

        if request.amount != bill.billing_total_amount {
            return Err(AppError::PaymentAmountMismatch {
                loan_bill_id: bill.id,
                expected: bill.billing_total_amount,
                actual: request.amount,
            });
        }

        let loan = self
            .loan_repo
            .find_by_id(request.loan_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Loan {} not found", request.loan_id)))?;

        if loan.status != LoanStatus::Active {
            return Err(AppError::LoanNotActive {
                loan_id: loan.id,
                status: loan.status.to_string(),
            });
        }

        if bill.loan_id != loan.id {
            return Err(AppError::validation(format!(
                "Loan bill {} does not belong to loan {}",
                bill.id, loan.id
            )));
        }

        if loan.user_id != request.user_id {
            return Err(AppError::validation(format!(
                "Loan {} does not belong to user {}",
                loan.id, request.user_id
            )));
        }

        let id = self
            .payment_repo
            .create(&NewPayment::pending(request))
            .await?;

        let payment = self.get_payment(id).await?;
        info!(
            payment_id = payment.id,
            loan_id = payment.loan_id,
            loan_bill_id = payment.loan_bill_id,
            amount = payment.amount,
            "Payment initiated"
        );

        Ok(payment)
    }

    /// Initiate a payment and queue it for settlement
    ///
    /// When queueing fails the stored payment is marked FAILED and the queue
    /// error is returned.
    pub async fn submit(&self, request: &PaymentRequest) -> Result<Payment> {
        let payment = self.initiate(request).await?;

        if let Err(e) = self.publisher.publish(&payment).await {
            warn!(payment_id = payment.id, error = %e, "Failed to queue payment");
            if let Err(mark_err) = self
                .payment_repo
                .update_status(payment.id, PaymentStatus::Failed, Some(NOTE_QUEUE_FAILED))
                .await
            {
                error!(
                    payment_id = payment.id,
                    error = %mark_err,
                    "Failed to mark unqueued payment as failed"
                );
            }
            return Err(e);
        }

        Ok(payment)
    }

    pub async fn get_payment(&self, id: i64) -> Result<Payment> {
        self.payment_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Payment {} not found", id)))
    }
}

use super::super::models::{
    Payment, PaymentStatus, NOTE_ALREADY_SETTLED, NOTE_BILL_NOT_PAYABLE, NOTE_COMPLETED,
    NOTE_SETTLEMENT_FAILED,
};
use super::super::queue::PaymentEventConsumer;
use super::super::repositories::PaymentRepository;
use crate::core::{AppError, Result};
use crate::modules::loans::models::{BillStatus, LoanStatus};
use crate::modules::loans::repositories::{LoanRepository, SettlementOutcome};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{error, info, warn};

/// What settling one queued payment did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleOutcome {
    /// Bill PAID, outstanding decremented, payment COMPLETED
    Completed { loan_closed: bool },

    /// Payment was already COMPLETED or FAILED; nothing was written
    AlreadyFinal(PaymentStatus),

    /// Another payment settled the bill first; this one is FAILED
    Rejected,

    /// Bill was PENDING or OVERDUE when the ledger ran; payment is FAILED
    NotPayable(BillStatus),
}

/// Applies queued payments to the loan ledger
///
/// Delivery is at-least-once: a payment seen twice is skipped once final, and
/// the ledger refuses to pay a bill that is no longer BILLED.
/// `resume_unsettled` picks up payments a previous process never finished.
pub struct SettlementWorker {
    payment_repo: Arc<dyn PaymentRepository>,
    loan_repo: Arc<dyn LoanRepository>,
    compensation_attempts: u32,
    compensation_backoff: Duration,
}

impl SettlementWorker {
    /// Create a new SettlementWorker
    ///
    /// # Arguments
    /// * `compensation_attempts` - Tries for the FAILED write after a ledger error
    /// * `compensation_backoff` - Delay before the second try, doubled after each
    pub fn new(
        payment_repo: Arc<dyn PaymentRepository>,
        loan_repo: Arc<dyn LoanRepository>,
        compensation_attempts: u32,
        compensation_backoff: Duration,
    ) -> Self {
        Self {
            payment_repo,
            loan_repo,
            compensation_attempts: compensation_attempts.max(1),
            compensation_backoff,
        }
    }

    /// Decode one queue message and settle the payment it carries
    pub async fn handle_message(&self, body: &[u8]) -> Result<SettleOutcome> {
        let payment: Payment = serde_json::from_slice(body)?;
        self.settle(&payment).await
    }

    /// Settle a payment against its bill and loan
    ///
    /// # Returns
    /// * `Ok(SettleOutcome)` - Payment reached a final status, or already had one
    /// * `Err(e)` - Ledger update failed; the payment was marked FAILED
    /// * `Err(AppError::CompensationFailed)` - Ledger update failed and so did
    ///   every attempt to mark the payment FAILED
    ///
    /// When the COMPLETED write itself fails after the ledger committed, the
    /// payment stays PROCESS and the error is returned. Settling it again
    /// finds the bill PAID by this payment and completes it.
    pub async fn settle(&self, payment: &Payment) -> Result<SettleOutcome> {
        let current = self
            .payment_repo
            .find_by_id(payment.id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Payment {} not found", payment.id)))?;

        if current.status.is_final() {
            info!(
                payment_id = current.id,
                status = %current.status,
                "Payment already settled, skipping"
            );
            return Ok(SettleOutcome::AlreadyFinal(current.status));
        }

        self.payment_repo
            .update_status(current.id, PaymentStatus::Process, None)
            .await?;

        let settled = self
            .loan_repo
            .settle_bill(current.id, current.loan_id, current.loan_bill_id, current.amount)
            .await;

        match settled {
            Ok(SettlementOutcome::Settled { loan_closed }) => {
                self.complete(&current).await?;
                info!(
                    payment_id = current.id,
                    loan_id = current.loan_id,
                    loan_bill_id = current.loan_bill_id,
                    loan_closed = loan_closed,
                    "Payment settled"
                );
                Ok(SettleOutcome::Completed { loan_closed })
            }
            Ok(SettlementOutcome::AlreadyPaid { paid_by }) => {
                self.resolve_paid_bill(&current, paid_by).await
            }
            Ok(SettlementOutcome::NotPayable(status)) => {
                warn!(
                    payment_id = current.id,
                    loan_bill_id = current.loan_bill_id,
                    bill_status = %status,
                    "Loan bill no longer open for payment"
                );
                self.payment_repo
                    .update_status(current.id, PaymentStatus::Failed, Some(NOTE_BILL_NOT_PAYABLE))
                    .await?;
                Ok(SettleOutcome::NotPayable(status))
            }
            Err(e) => {
                error!(
                    payment_id = current.id,
                    loan_bill_id = current.loan_bill_id,
                    error = %e,
                    "Ledger update failed"
                );
                match self.mark_failed_with_retry(current.id).await {
                    Ok(()) => Err(e),
                    Err(compensation) => Err(AppError::CompensationFailed {
                        original: Box::new(e),
                        compensation: Box::new(compensation),
                    }),
                }
            }
        }
    }

    /// Consume the queue until it closes or shutdown is signalled
    ///
    /// Messages are handled one at a time. A shutdown signal stops pulling new
    /// messages; the message in flight is always finished first.
    pub async fn run<C: PaymentEventConsumer>(
        &self,
        mut consumer: C,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!("Settlement worker started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            let message = tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
                message = consumer.next() => message,
            };

            let Some(body) = message else {
                info!("Payment queue closed");
                break;
            };

            match self.handle_message(&body).await {
                Ok(outcome) => info!(outcome = ?outcome, "Payment message processed"),
                Err(e) => error!(error = %e, "Failed to process payment message"),
            }
        }

        info!("Settlement worker stopped");
    }

    /// Settle every payment an earlier run left PENDING or PROCESS
    ///
    /// Payments are settled oldest first. Failures are logged per payment and
    /// do not stop the rest.
    ///
    /// # Returns
    /// * `Result<usize>` - Number of payments picked up
    pub async fn resume_unsettled(&self) -> Result<usize> {
        let mut unsettled = self.payment_repo.find_by_status(PaymentStatus::Process).await?;
        unsettled.extend(self.payment_repo.find_by_status(PaymentStatus::Pending).await?);
        unsettled.sort_by_key(|payment| payment.id);

        for payment in &unsettled {
            match self.settle(payment).await {
                Ok(outcome) => info!(
                    payment_id = payment.id,
                    outcome = ?outcome,
                    "Resumed unsettled payment"
                ),
                Err(e) => error!(
                    payment_id = payment.id,
                    error = %e,
                    "Failed to resume unsettled payment"
                ),
            }
        }

        if !unsettled.is_empty() {
            info!(count = unsettled.len(), "Unsettled payments resumed");
        }
        Ok(unsettled.len())
    }

    /// The bill was already PAID when the ledger ran
    ///
    /// Completes the payment when the ledger recorded it as the payer, which
    /// happens when an earlier attempt committed and lost its COMPLETED write.
    async fn resolve_paid_bill(
        &self,
        payment: &Payment,
        paid_by: Option<i64>,
    ) -> Result<SettleOutcome> {
        if paid_by != Some(payment.id) {
            warn!(
                payment_id = payment.id,
                loan_bill_id = payment.loan_bill_id,
                paid_by = ?paid_by,
                "Loan bill already settled by another payment"
            );
            self.payment_repo
                .update_status(payment.id, PaymentStatus::Failed, Some(NOTE_ALREADY_SETTLED))
                .await?;
            return Ok(SettleOutcome::Rejected);
        }

        self.complete(payment).await?;
        let loan_closed = self
            .loan_repo
            .find_by_id(payment.loan_id)
            .await?
            .is_some_and(|loan| loan.status == LoanStatus::Closed);

        info!(
            payment_id = payment.id,
            loan_bill_id = payment.loan_bill_id,
            "Recovered settlement of previously applied payment"
        );
        Ok(SettleOutcome::Completed { loan_closed })
    }

    async fn complete(&self, payment: &Payment) -> Result<()> {
        self.payment_repo
            .update_status(payment.id, PaymentStatus::Completed, Some(NOTE_COMPLETED))
            .await
            .map_err(|e| {
                error!(
                    payment_id = payment.id,
                    error = %e,
                    "Ledger committed but payment could not be marked completed"
                );
                e
            })
    }

    /// Mark a payment FAILED, retrying with doubling backoff
    async fn mark_failed_with_retry(&self, payment_id: i64) -> Result<()> {
        let mut delay = self.compensation_backoff;
        let mut attempt = 1;

        loop {
            match self
                .payment_repo
                .update_status(payment_id, PaymentStatus::Failed, Some(NOTE_SETTLEMENT_FAILED))
                .await
            {
                Ok(()) => {
                    info!(payment_id = payment_id, attempt = attempt, "Payment marked as failed");
                    return Ok(());
                }
                Err(e) if attempt >= self.compensation_attempts => {
                    error!(
                        payment_id = payment_id,
                        attempts = attempt,
                        error = %e,
                        "Giving up marking payment as failed"
                    );
                    return Err(e);
                }
                Err(e) => {
                    warn!(
                        payment_id = payment_id,
                        attempt = attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Failed to mark payment as failed, retrying"
                    );
                    sleep(delay).await;
                    delay = delay.saturating_mul(2);
                    attempt += 1;
                }
            }
        }
    }
}

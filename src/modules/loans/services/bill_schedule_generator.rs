use super::super::models::{BillStatus, Loan, LoanBill, NewLoanBill};
use super::super::repositories::LoanBillRepository;
use crate::core::calendar::weekly_billing_dates;
use crate::core::{AppError, Result};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// How the bills of one schedule are written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BillWriteMode {
    /// One insert task per bill; bills written before a failure are kept
    #[default]
    Concurrent,

    /// One insert task per bill; every bill of the loan is deleted on failure
    ConcurrentCompensating,

    /// All bills in a single database transaction
    Transactional,
}

impl BillWriteMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillWriteMode::Concurrent => "concurrent",
            BillWriteMode::ConcurrentCompensating => "concurrent_compensating",
            BillWriteMode::Transactional => "transactional",
        }
    }
}

impl std::fmt::Display for BillWriteMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BillWriteMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "concurrent" => Ok(BillWriteMode::Concurrent),
            "concurrent_compensating" => Ok(BillWriteMode::ConcurrentCompensating),
            "transactional" => Ok(BillWriteMode::Transactional),
            other => Err(format!(
                "Invalid BILL_WRITE_MODE '{}', expected concurrent, concurrent_compensating or transactional",
                other
            )),
        }
    }
}

/// Builds and persists the weekly bill schedule of a loan
pub struct BillScheduleGenerator {
    bill_repo: Arc<dyn LoanBillRepository>,
    write_mode: BillWriteMode,
}

impl BillScheduleGenerator {
    pub fn new(bill_repo: Arc<dyn LoanBillRepository>, write_mode: BillWriteMode) -> Self {
        Self {
            bill_repo,
            write_mode,
        }
    }

    pub fn write_mode(&self) -> BillWriteMode {
        self.write_mode
    }

    /// Compute the bills of a loan without writing them
    ///
    /// Bill `i` falls on the Monday after bill `i - 1` (the first on the Monday
    /// after the start date). Amounts are the loan amounts divided by the term
    /// count; the truncated remainder is not redistributed.
    ///
    /// # Arguments
    /// * `loan` - Persisted loan with a positive `loan_terms_per_week`
    ///
    /// # Returns
    /// * `Result<Vec<NewLoanBill>>` - PENDING bills numbered from 1
    pub fn calculate_schedule(loan: &Loan) -> Result<Vec<NewLoanBill>> {
        let terms = loan.loan_terms_per_week;
        if terms <= 0 {
            return Err(AppError::validation(format!(
                "Loan {} has no billing terms ({})",
                loan.id, terms
            )));
        }

        let billing_amount = loan.loan_amount / i64::from(terms);
        let billing_total_amount = loan.loan_total_amount / i64::from(terms);

        let bills = weekly_billing_dates(loan.start_date, terms as u32)?
            .into_iter()
            .zip(1..=terms)
            .map(|(billing_date, billing_number)| NewLoanBill {
                loan_id: loan.id,
                billing_date,
                billing_amount,
                billing_total_amount,
                billing_number,
                status: BillStatus::Pending,
            })
            .collect();

        Ok(bills)
    }

    /// Compute and persist the schedule of a loan
    ///
    /// # Returns
    /// * `Result<Vec<LoanBill>>` - Stored bills ordered by billing number, or
    ///   the first write error. What remains stored after an error depends on
    ///   the [`BillWriteMode`].
    pub async fn generate(&self, loan: &Loan) -> Result<Vec<LoanBill>> {
        let bills = Self::calculate_schedule(loan)?;

        info!(
            loan_id = loan.id,
            terms = bills.len(),
            write_mode = %self.write_mode,
            "Generating loan bill schedule"
        );

        let result = match self.write_mode {
            BillWriteMode::Transactional => self.bill_repo.create_batch(&bills).await,
            BillWriteMode::Concurrent | BillWriteMode::ConcurrentCompensating => {
                self.write_concurrently(bills).await
            }
        };

        match result {
            Ok(mut stored) => {
                stored.sort_by_key(|bill| bill.billing_number);
                Ok(stored)
            }
            Err(e) => {
                error!(loan_id = loan.id, error = %e, "Failed to write loan bill schedule");
                if self.write_mode == BillWriteMode::ConcurrentCompensating {
                    self.discard_partial_schedule(loan.id).await;
                }
                Err(e)
            }
        }
    }

    /// Insert every bill in its own task and wait for all of them
    async fn write_concurrently(&self, bills: Vec<NewLoanBill>) -> Result<Vec<LoanBill>> {
        let mut tasks = JoinSet::new();
        for bill in bills {
            let repo = Arc::clone(&self.bill_repo);
            tasks.spawn(async move { repo.create(&bill).await });
        }

        let mut stored = Vec::with_capacity(tasks.len());
        let mut first_error = None;

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(bill)) => stored.push(bill),
                Ok(Err(e)) => {
                    first_error.get_or_insert(e);
                }
                Err(e) => {
                    first_error.get_or_insert(AppError::internal(format!(
                        "Loan bill insert task failed: {}",
                        e
                    )));
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(stored),
        }
    }

    async fn discard_partial_schedule(&self, loan_id: i64) {
        match self.bill_repo.delete_by_loan(loan_id).await {
            Ok(deleted) => {
                warn!(loan_id = loan_id, deleted = deleted, "Discarded partial loan bill schedule")
            }
            Err(e) => {
                error!(loan_id = loan_id, error = %e, "Failed to discard partial loan bill schedule")
            }
        }
    }
}

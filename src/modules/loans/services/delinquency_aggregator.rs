use super::super::repositories::{LoanBillRepository, LoanRepository};
use crate::core::Result;
use crate::modules::users::services::UserService;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{error, info, warn};

/// A loan with more overdue bills than this makes its borrower delinquent
pub const OVERDUE_BILL_THRESHOLD: i64 = 1;

/// Outcome of one delinquency reconciliation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DelinquencyReport {
    pub loans_checked: usize,
    pub loans_failed: usize,
    pub users_flagged: usize,
    pub users_cleared: usize,
}

/// Derives the borrower delinquent flag from overdue bills of active loans
pub struct DelinquencyAggregator {
    loan_repo: Arc<dyn LoanRepository>,
    bill_repo: Arc<dyn LoanBillRepository>,
    user_service: Arc<UserService>,
}

impl DelinquencyAggregator {
    pub fn new(
        loan_repo: Arc<dyn LoanRepository>,
        bill_repo: Arc<dyn LoanBillRepository>,
        user_service: Arc<UserService>,
    ) -> Self {
        Self {
            loan_repo,
            bill_repo,
            user_service,
        }
    }

    /// Number of OVERDUE bills of a loan; zero unless the loan is ACTIVE
    pub async fn count_overdue(&self, loan_id: i64) -> Result<i64> {
        self.bill_repo.count_overdue_by_loan(loan_id).await
    }

    pub async fn is_loan_delinquent(&self, loan_id: i64) -> Result<bool> {
        Ok(self.count_overdue(loan_id).await? > OVERDUE_BILL_THRESHOLD)
    }

    /// Flag or clear every borrower with an active loan
    ///
    /// A borrower is delinquent when any active loan has more than
    /// [`OVERDUE_BILL_THRESHOLD`] overdue bills. A failed overdue count or
    /// flag update is logged and the remaining loans and borrowers are still
    /// processed. A borrower with an uncounted loan is never cleared.
    pub async fn reconcile(&self) -> Result<DelinquencyReport> {
        let loans = self.loan_repo.find_active().await?;

        let mut report = DelinquencyReport::default();
        let mut delinquent_by_user: BTreeMap<i64, bool> = BTreeMap::new();
        let mut uncounted_users: BTreeSet<i64> = BTreeSet::new();
        for loan in &loans {
            match self.is_loan_delinquent(loan.id).await {
                Ok(delinquent) => {
                    report.loans_checked += 1;
                    *delinquent_by_user.entry(loan.user_id).or_default() |= delinquent;
                }
                Err(e) => {
                    report.loans_failed += 1;
                    uncounted_users.insert(loan.user_id);
                    error!(
                        loan_id = loan.id,
                        user_id = loan.user_id,
                        error = %e,
                        "Failed to count overdue bills"
                    );
                }
            }
        }

        for (user_id, delinquent) in delinquent_by_user {
            if !delinquent && uncounted_users.contains(&user_id) {
                warn!(user_id = user_id, "Skipping delinquency clear, a loan was not counted");
                continue;
            }

            let updated = if delinquent {
                self.user_service.mark_delinquent(user_id).await
            } else {
                self.user_service.mark_not_delinquent(user_id).await
            };

            match updated {
                Ok(()) if delinquent => report.users_flagged += 1,
                Ok(()) => report.users_cleared += 1,
                Err(e) => {
                    error!(user_id = user_id, error = %e, "Failed to update user delinquency")
                }
            }
        }

        info!(
            loans_checked = report.loans_checked,
            loans_failed = report.loans_failed,
            users_flagged = report.users_flagged,
            users_cleared = report.users_cleared,
            "Delinquency reconciled"
        );

        Ok(report)
    }
}

use super::super::models::{Loan, LoanRequest, LoanStatus, LoanWithBills, NewLoan};
use super::super::repositories::{LoanBillRepository, LoanRepository};
use super::bill_schedule_generator::{BillScheduleGenerator, BillWriteMode};
use crate::core::calendar::last_billing_date;
use crate::core::{AppError, Result};
use crate::modules::billing_configs::services::BillingConfigProvider;
use crate::modules::users::services::UserService;
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{info, warn};

/// Service for loan creation and loan queries
pub struct LoanService {
    loan_repo: Arc<dyn LoanRepository>,
    bill_repo: Arc<dyn LoanBillRepository>,
    user_service: Arc<UserService>,
    config_provider: Arc<BillingConfigProvider>,
    generator: BillScheduleGenerator,
    grace_days: u32,
}

impl LoanService {
    /// Create a new LoanService
    ///
    /// # Arguments
    /// * `write_mode` - How bill schedules are persisted
    /// * `grace_days` - Days a due bill stays BILLED before turning OVERDUE
    pub fn new(
        loan_repo: Arc<dyn LoanRepository>,
        bill_repo: Arc<dyn LoanBillRepository>,
        user_service: Arc<UserService>,
        config_provider: Arc<BillingConfigProvider>,
        write_mode: BillWriteMode,
        grace_days: u32,
    ) -> Self {
        let generator = BillScheduleGenerator::new(Arc::clone(&bill_repo), write_mode);
        Self {
            loan_repo,
            bill_repo,
            user_service,
            config_provider,
            generator,
            grace_days,
        }
    }

    /// Create a loan and its weekly bill schedule
    ///
    /// Interest and term count come from the billing config. The loan is stored
    /// PENDING and switched to ACTIVE only after every bill is written, so a
    /// failed schedule leaves a PENDING loan that is never billed.
    ///
    /// # Arguments
    /// * `request` - Borrower, loan name and principal
    /// * `start_date` - First bill falls on the Monday after this date
    pub async fn create_loan(
        &self,
        request: LoanRequest,
        start_date: NaiveDate,
    ) -> Result<LoanWithBills> {
        request.validate()?;
        self.user_service.get_user(request.user_id).await?;

        let terms = self.config_provider.loan_terms().await;
        let due_date = last_billing_date(start_date, terms.terms_per_week as u32)?;
        let new_loan = NewLoan::new(
            &request,
            terms.interest_percentage,
            terms.terms_per_week,
            start_date,
            due_date,
        )?;

        let loan = self.loan_repo.create(&new_loan).await?;
        info!(
            loan_id = loan.id,
            user_id = loan.user_id,
            loan_total_amount = loan.loan_total_amount,
            terms = loan.loan_terms_per_week,
            "Loan created"
        );

        let loan_bills = match self.generator.generate(&loan).await {
            Ok(bills) => bills,
            Err(e) => {
                warn!(loan_id = loan.id, error = %e, "Loan left PENDING after schedule failure");
                return Err(e);
            }
        };

        self.loan_repo
            .update_status(loan.id, LoanStatus::Active)
            .await?;
        let loan = self.get_loan_record(loan.id).await?;

        Ok(LoanWithBills { loan, loan_bills })
    }

    pub async fn get_loan(&self, loan_id: i64) -> Result<LoanWithBills> {
        let loan = self.get_loan_record(loan_id).await?;
        let loan_bills = self.bill_repo.find_by_loan(loan_id).await?;
        Ok(LoanWithBills { loan, loan_bills })
    }

    /// Every loan of a user with its bills
    pub async fn get_loans_with_bills(&self, user_id: i64) -> Result<Vec<LoanWithBills>> {
        self.user_service.get_user(user_id).await?;

        let loans = self.loan_repo.find_by_user(user_id).await?;
        let mut result = Vec::with_capacity(loans.len());
        for loan in loans {
            let loan_bills = self.bill_repo.find_by_loan(loan.id).await?;
            result.push(LoanWithBills { loan, loan_bills });
        }

        Ok(result)
    }

    pub async fn get_active_loans(&self) -> Result<Vec<Loan>> {
        self.loan_repo.find_active().await
    }

    /// Move due bills of active loans to BILLED, or OVERDUE past the grace period
    ///
    /// # Returns
    /// * `Result<u64>` - Number of bills whose status changed
    pub async fn advance_bill_statuses(&self, today: NaiveDate) -> Result<u64> {
        let advanced = self
            .bill_repo
            .advance_statuses(today, self.grace_days)
            .await?;

        if advanced > 0 {
            info!(today = %today, advanced = advanced, "Loan bill statuses advanced");
        }

        Ok(advanced)
    }

    async fn get_loan_record(&self, loan_id: i64) -> Result<Loan> {
        self.loan_repo
            .find_by_id(loan_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Loan {} not found", loan_id)))
    }
}

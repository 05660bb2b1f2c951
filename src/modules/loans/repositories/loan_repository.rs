use super::super::models::{BillStatus, Loan, LoanStatus, NewLoan};
use crate::core::{AppError, Result};
use async_trait::async_trait;
use sqlx::MySqlPool;

/// Result of applying one payment to the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementOutcome {
    /// Bill marked PAID and outstanding amount decremented
    Settled { loan_closed: bool },

    /// Bill was already PAID; nothing was written
    ///
    /// `paid_by` is the payment the ledger applied, when it was recorded.
    AlreadyPaid { paid_by: Option<i64> },

    /// Bill is PENDING or OVERDUE and takes no payment; nothing was written
    NotPayable(BillStatus),
}

/// Loan persistence and the settlement ledger
#[async_trait]
pub trait LoanRepository: Send + Sync {
    async fn create(&self, loan: &NewLoan) -> Result<Loan>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Loan>>;

    async fn find_by_user(&self, user_id: i64) -> Result<Vec<Loan>>;

    /// All loans currently ACTIVE
    async fn find_active(&self) -> Result<Vec<Loan>>;

    async fn update_status(&self, id: i64, status: LoanStatus) -> Result<()>;

    /// Atomically mark a bill PAID by `payment_id` and decrement its loan's outstanding amount
    ///
    /// # Arguments
    /// * `payment_id` - Payment being applied, stored on the bill
    /// * `loan_id` - Loan owning the bill
    /// * `loan_bill_id` - Bill being settled
    /// * `amount` - Amount to subtract from the outstanding balance
    ///
    /// # Returns
    /// * `SettlementOutcome::AlreadyPaid` when the bill is PAID
    /// * `SettlementOutcome::NotPayable` when the bill is PENDING or OVERDUE
    /// * `AppError::NotFound` when the loan has no such bill
    /// * `AppError::Conflict` when the decrement would make outstanding negative
    ///
    /// The loan turns CLOSED in the same write that brings outstanding to 0.
    async fn settle_bill(
        &self,
        payment_id: i64,
        loan_id: i64,
        loan_bill_id: i64,
        amount: i64,
    ) -> Result<SettlementOutcome>;
}

pub struct MySqlLoanRepository {
    pool: MySqlPool,
}

impl MySqlLoanRepository {
    /// Create a new MySqlLoanRepository
    ///
    /// # Arguments
    /// * `pool` - Database connection pool
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

const LOAN_COLUMNS: &str = r#"
    id, user_id, name, loan_amount, loan_total_amount, outstanding_amount,
    interest_percentage, status, start_date, due_date, loan_terms_per_week,
    created_at, updated_at
"#;

#[async_trait]
impl LoanRepository for MySqlLoanRepository {
    async fn create(&self, loan: &NewLoan) -> Result<Loan> {
        let result = sqlx::query(
            r#"
            INSERT INTO loans (
                user_id, name, loan_amount, loan_total_amount, outstanding_amount,
                interest_percentage, status, start_date, due_date, loan_terms_per_week
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(loan.user_id)
        .bind(&loan.name)
        .bind(loan.loan_amount)
        .bind(loan.loan_total_amount)
        .bind(loan.outstanding_amount)
        .bind(loan.interest_percentage)
        .bind(loan.status.as_str())
        .bind(loan.start_date)
        .bind(loan.due_date)
        .bind(loan.loan_terms_per_week)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_id() as i64;
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::internal(format!("Loan {} was created but not found", id)))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Loan>> {
        let loan = sqlx::query_as::<_, Loan>(&format!(
            "SELECT {} FROM loans WHERE id = ?",
            LOAN_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(loan)
    }

    async fn find_by_user(&self, user_id: i64) -> Result<Vec<Loan>> {
        let loans = sqlx::query_as::<_, Loan>(&format!(
            "SELECT {} FROM loans WHERE user_id = ? ORDER BY id",
            LOAN_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(loans)
    }

    async fn find_active(&self) -> Result<Vec<Loan>> {
        let loans = sqlx::query_as::<_, Loan>(&format!(
            "SELECT {} FROM loans WHERE status = ? ORDER BY id",
            LOAN_COLUMNS
        ))
        .bind(LoanStatus::Active.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(loans)
    }

    async fn update_status(&self, id: i64, status: LoanStatus) -> Result<()> {
        let result = sqlx::query("UPDATE loans SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 && self.find_by_id(id).await?.is_none() {
            return Err(AppError::not_found(format!("Loan {} not found", id)));
        }

        Ok(())
    }

    async fn settle_bill(
        &self,
        payment_id: i64,
        loan_id: i64,
        loan_bill_id: i64,
        amount: i64,
    ) -> Result<SettlementOutcome> {
        let mut tx = self.pool.begin().await?;

        let bill: Option<(String, Option<i64>)> = sqlx::query_as(
            r#"
            SELECT status, paid_by_payment_id
            FROM loan_bills
            WHERE id = ? AND loan_id = ?
            FOR UPDATE
            "#,
        )
        .bind(loan_bill_id)
        .bind(loan_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((status, paid_by)) = bill else {
            tx.rollback().await?;
            return Err(AppError::not_found(format!(
                "Loan bill {} of loan {} not found",
                loan_bill_id, loan_id
            )));
        };

        match status.parse::<BillStatus>().map_err(AppError::internal)? {
            BillStatus::Billed => {}
            BillStatus::Paid => {
                tx.rollback().await?;
                return Ok(SettlementOutcome::AlreadyPaid { paid_by });
            }
            other => {
                tx.rollback().await?;
                return Ok(SettlementOutcome::NotPayable(other));
            }
        }

        // Row is locked, so the status cannot have moved since the read
        sqlx::query(
            r#"
            UPDATE loan_bills
            SET status = 'PAID', paid_by_payment_id = ?
            WHERE id = ?
            "#,
        )
        .bind(payment_id)
        .bind(loan_bill_id)
        .execute(&mut *tx)
        .await?;

        // MySQL applies SET assignments left to right, so the CASE sees the
        // outstanding amount from before the decrement
        let decremented = sqlx::query(
            r#"
            UPDATE loans
            SET status = CASE WHEN outstanding_amount - ? = 0 THEN 'CLOSED' ELSE status END,
                outstanding_amount = outstanding_amount - ?
            WHERE id = ? AND outstanding_amount >= ?
            "#,
        )
        .bind(amount)
        .bind(amount)
        .bind(loan_id)
        .bind(amount)
        .execute(&mut *tx)
        .await?;

        if decremented.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(AppError::conflict(format!(
                "Loan {} outstanding amount is missing or lower than {}",
                loan_id, amount
            )));
        }

        let status: String = sqlx::query_scalar("SELECT status FROM loans WHERE id = ?")
            .bind(loan_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(SettlementOutcome::Settled {
            loan_closed: status == LoanStatus::Closed.as_str(),
        })
    }
}

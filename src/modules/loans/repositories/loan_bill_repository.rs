use super::super::models::{BillStatus, LoanBill, NewLoanBill};
use crate::core::{AppError, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::mysql::MySqlArguments;
use sqlx::query::Query;
use sqlx::{MySql, MySqlPool};

#[async_trait]
pub trait LoanBillRepository: Send + Sync {
    /// Insert one bill and return the stored row
    async fn create(&self, bill: &NewLoanBill) -> Result<LoanBill>;

    /// Insert every bill in one transaction; nothing is kept on failure
    async fn create_batch(&self, bills: &[NewLoanBill]) -> Result<Vec<LoanBill>>;

    /// Remove every bill of a loan, returning how many were deleted
    async fn delete_by_loan(&self, loan_id: i64) -> Result<u64>;

    async fn find_by_id(&self, id: i64) -> Result<Option<LoanBill>>;

    /// Bills of a loan ordered by billing number
    async fn find_by_loan(&self, loan_id: i64) -> Result<Vec<LoanBill>>;

    /// Move due bills of ACTIVE loans to BILLED or OVERDUE
    ///
    /// # Arguments
    /// * `today` - Reference date
    /// * `grace_days` - Days a due bill stays BILLED before turning OVERDUE
    ///
    /// # Returns
    /// * `Result<u64>` - Number of bills whose status changed
    async fn advance_statuses(&self, today: NaiveDate, grace_days: u32) -> Result<u64>;

    /// Number of OVERDUE bills on a loan, counted only while the loan is ACTIVE
    async fn count_overdue_by_loan(&self, loan_id: i64) -> Result<i64>;
}

pub struct MySqlLoanBillRepository {
    pool: MySqlPool,
}

impl MySqlLoanBillRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

fn insert_bill_query(bill: &NewLoanBill) -> Query<'_, MySql, MySqlArguments> {
    sqlx::query(
        r#"
        INSERT INTO loan_bills (
            loan_id, billing_date, billing_amount, billing_total_amount,
            billing_number, status
        ) VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(bill.loan_id)
    .bind(bill.billing_date)
    .bind(bill.billing_amount)
    .bind(bill.billing_total_amount)
    .bind(bill.billing_number)
    .bind(bill.status.as_str())
}

const BILL_COLUMNS: &str = r#"
    id, loan_id, billing_date, billing_amount, billing_total_amount,
    billing_number, status, paid_by_payment_id, created_at, updated_at
"#;

#[async_trait]
impl LoanBillRepository for MySqlLoanBillRepository {
    async fn create(&self, bill: &NewLoanBill) -> Result<LoanBill> {
        let result = insert_bill_query(bill).execute(&self.pool).await?;

        let id = result.last_insert_id() as i64;
        self.find_by_id(id).await?.ok_or_else(|| {
            AppError::internal(format!("Loan bill {} was created but not found", id))
        })
    }

    async fn create_batch(&self, bills: &[NewLoanBill]) -> Result<Vec<LoanBill>> {
        let Some(first) = bills.first() else {
            return Ok(Vec::new());
        };

        let mut tx = self.pool.begin().await?;

        for bill in bills {
            insert_bill_query(bill).execute(&mut *tx).await?;
        }

        tx.commit().await?;

        self.find_by_loan(first.loan_id).await
    }

    async fn delete_by_loan(&self, loan_id: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM loan_bills WHERE loan_id = ?")
            .bind(loan_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<LoanBill>> {
        let bill = sqlx::query_as::<_, LoanBill>(&format!(
            "SELECT {} FROM loan_bills WHERE id = ?",
            BILL_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(bill)
    }

    async fn find_by_loan(&self, loan_id: i64) -> Result<Vec<LoanBill>> {
        let bills = sqlx::query_as::<_, LoanBill>(&format!(
            "SELECT {} FROM loan_bills WHERE loan_id = ? ORDER BY billing_number",
            BILL_COLUMNS
        ))
        .bind(loan_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(bills)
    }

    async fn advance_statuses(&self, today: NaiveDate, grace_days: u32) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE loan_bills lb
            JOIN loans l ON l.id = lb.loan_id
            SET lb.status = CASE
                WHEN DATEDIFF(?, lb.billing_date) > ? THEN ?
                ELSE ?
            END
            WHERE l.status = 'ACTIVE'
              AND lb.status IN ('PENDING', 'BILLED')
              AND lb.billing_date <= ?
              AND NOT (lb.status = 'BILLED' AND DATEDIFF(?, lb.billing_date) <= ?)
            "#,
        )
        .bind(today)
        .bind(grace_days)
        .bind(BillStatus::Overdue.as_str())
        .bind(BillStatus::Billed.as_str())
        .bind(today)
        .bind(today)
        .bind(grace_days)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn count_overdue_by_loan(&self, loan_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(lb.id)
            FROM loan_bills lb
            JOIN loans l ON l.id = lb.loan_id
            WHERE lb.loan_id = ?
              AND l.status = 'ACTIVE'
              AND lb.status = 'OVERDUE'
            "#,
        )
        .bind(loan_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}

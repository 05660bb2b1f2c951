use super::super::models::{NewPayment, Payment, PaymentStatus};
use crate::core::{AppError, Result};
use async_trait::async_trait;
use sqlx::MySqlPool;

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Insert a payment and return its generated id
    async fn create(&self, payment: &NewPayment) -> Result<i64>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Payment>>;

    /// Write a new status, replacing the note when one is given
    ///
    /// # Returns
    /// * `AppError::NotFound` when no payment has this id
    async fn update_status(&self, id: i64, status: PaymentStatus, note: Option<&str>) -> Result<()>;

    /// Payments currently in `status`, oldest first
    async fn find_by_status(&self, status: PaymentStatus) -> Result<Vec<Payment>>;
}

pub struct MySqlPaymentRepository {
    pool: MySqlPool,
}

impl MySqlPaymentRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaymentRepository for MySqlPaymentRepository {
    async fn create(&self, payment: &NewPayment) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO payments (user_id, loan_id, loan_bill_id, amount, status)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(payment.user_id)
        .bind(payment.loan_id)
        .bind(payment.loan_bill_id)
        .bind(payment.amount)
        .bind(payment.status.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_id() as i64)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Payment>> {
        let payment = sqlx::query_as::<_, Payment>(
            r#"
            SELECT
                id, user_id, loan_id, loan_bill_id, amount,
                status, note, created_at, updated_at
            FROM payments
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(payment)
    }

    async fn update_status(&self, id: i64, status: PaymentStatus, note: Option<&str>) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE payments
            SET status = ?, note = COALESCE(?, note), updated_at = NOW()
            WHERE id = ?
            "#,
        )
        .bind(status.as_str())
        .bind(note)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 && self.find_by_id(id).await?.is_none() {
            return Err(AppError::not_found(format!("Payment {} not found", id)));
        }

        Ok(())
    }

    async fn find_by_status(&self, status: PaymentStatus) -> Result<Vec<Payment>> {
        let payments = sqlx::query_as::<_, Payment>(
            r#"
            SELECT
                id, user_id, loan_id, loan_bill_id, amount,
                status, note, created_at, updated_at
            FROM payments
            WHERE status = ?
            ORDER BY id
            "#,
        )
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }
}

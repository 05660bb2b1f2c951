use crate::core::{AppError, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Note written when settlement succeeds
pub const NOTE_COMPLETED: &str = "Payment Completed";

/// Note written when the ledger update fails
pub const NOTE_SETTLEMENT_FAILED: &str = "Failed process payment, please try again";

/// Note written when a different payment already settled the bill
pub const NOTE_ALREADY_SETTLED: &str = "Loan bill already settled by another payment";

/// Note written when the bill left BILLED before the payment settled
pub const NOTE_BILL_NOT_PAYABLE: &str = "Loan bill is no longer open for payment";

/// Note written when the payment never reached the settlement queue
pub const NOTE_QUEUE_FAILED: &str = "Failed to queue payment for settlement";

/// Payment status
///
/// PENDING -> PROCESS -> COMPLETED | FAILED
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Process,
    Completed,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Process => "PROCESS",
            PaymentStatus::Completed => "COMPLETED",
            PaymentStatus::Failed => "FAILED",
        }
    }

    pub fn is_final(&self) -> bool {
        matches!(self, PaymentStatus::Completed | PaymentStatus::Failed)
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(PaymentStatus::Pending),
            "PROCESS" => Ok(PaymentStatus::Process),
            "COMPLETED" => Ok(PaymentStatus::Completed),
            "FAILED" => Ok(PaymentStatus::Failed),
            _ => Err(format!("Invalid payment status: {}", s)),
        }
    }
}

impl TryFrom<String> for PaymentStatus {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

/// Payment record, also the settlement queue payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Payment {
    pub id: i64,
    pub user_id: i64,
    pub loan_id: i64,
    pub loan_bill_id: i64,
    pub amount: i64,

    #[sqlx(try_from = "String")]
    pub status: PaymentStatus,

    pub note: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: Option<NaiveDateTime>,
}

/// Payment about to be persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPayment {
    pub user_id: i64,
    pub loan_id: i64,
    pub loan_bill_id: i64,
    pub amount: i64,
    pub status: PaymentStatus,
}

impl NewPayment {
    pub fn pending(request: &PaymentRequest) -> Self {
        Self {
            user_id: request.user_id,
            loan_id: request.loan_id,
            loan_bill_id: request.loan_bill_id,
            amount: request.amount,
            status: PaymentStatus::Pending,
        }
    }

    pub fn into_payment(self, id: i64, created_at: NaiveDateTime) -> Payment {
        Payment {
            id,
            user_id: self.user_id,
            loan_id: self.loan_id,
            loan_bill_id: self.loan_bill_id,
            amount: self.amount,
            status: self.status,
            note: None,
            created_at,
            updated_at: None,
        }
    }
}

/// Request body for paying one loan bill
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub user_id: i64,
    pub loan_id: i64,
    pub loan_bill_id: i64,
    pub amount: i64,
}

impl PaymentRequest {
    /// Check the request shape before any lookup
    pub fn validate(&self) -> Result<()> {
        if self.user_id <= 0 {
            return Err(AppError::validation("User ID is required"));
        }

        if self.loan_id <= 0 {
            return Err(AppError::validation("Loan ID is required"));
        }

        if self.loan_bill_id <= 0 {
            return Err(AppError::validation("Loan bill ID is required"));
        }

        if self.amount <= 0 {
            return Err(AppError::validation("Payment amount must be greater than 0"));
        }

        Ok(())
    }
}

use super::LoanBill;
use crate::core::{AppError, Result};
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Loan lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanStatus {
    /// Created, bill schedule not yet written
    Pending,

    /// Schedule written, accepting payments
    Active,

    Delinquent,

    /// Outstanding amount fully repaid
    Closed,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Pending => "PENDING",
            LoanStatus::Active => "ACTIVE",
            LoanStatus::Delinquent => "DELINQUENT",
            LoanStatus::Closed => "CLOSED",
        }
    }
}

impl std::fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LoanStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(LoanStatus::Pending),
            "ACTIVE" => Ok(LoanStatus::Active),
            "DELINQUENT" => Ok(LoanStatus::Delinquent),
            "CLOSED" => Ok(LoanStatus::Closed),
            _ => Err(format!("Invalid loan status: {}", s)),
        }
    }
}

impl TryFrom<String> for LoanStatus {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

/// Loan record
///
/// `outstanding_amount` starts at `loan_total_amount` and only ever decreases,
/// one bill total per settled payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Loan {
    pub id: i64,
    pub user_id: i64,
    pub name: String,

    /// Principal
    pub loan_amount: i64,

    /// Principal plus interest
    pub loan_total_amount: i64,

    pub outstanding_amount: i64,
    pub interest_percentage: Decimal,

    #[sqlx(try_from = "String")]
    pub status: LoanStatus,

    pub start_date: NaiveDate,

    /// Billing date of the final bill
    pub due_date: NaiveDate,

    pub loan_terms_per_week: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: Option<NaiveDateTime>,
}

impl Loan {
    pub fn is_active(&self) -> bool {
        self.status == LoanStatus::Active
    }
}

/// Loan about to be persisted
#[derive(Debug, Clone, PartialEq)]
pub struct NewLoan {
    pub user_id: i64,
    pub name: String,
    pub loan_amount: i64,
    pub loan_total_amount: i64,
    pub outstanding_amount: i64,
    pub interest_percentage: Decimal,
    pub status: LoanStatus,
    pub start_date: NaiveDate,
    pub due_date: NaiveDate,
    pub loan_terms_per_week: i32,
}

impl NewLoan {
    /// Build a PENDING loan whose total and outstanding amounts include interest
    ///
    /// # Arguments
    /// * `request` - Validated loan request
    /// * `interest_percentage` - Flat interest rate, e.g. `10` for 10%
    /// * `terms` - Number of weekly bills
    /// * `start_date` - Loan start date
    /// * `due_date` - Billing date of the last bill
    pub fn new(
        request: &LoanRequest,
        interest_percentage: Decimal,
        terms: i32,
        start_date: NaiveDate,
        due_date: NaiveDate,
    ) -> Result<Self> {
        if terms <= 0 {
            return Err(AppError::validation(format!(
                "Loan terms per week must be positive, got {}",
                terms
            )));
        }

        let loan_total_amount = total_with_interest(request.loan_amount, interest_percentage)?;

        Ok(Self {
            user_id: request.user_id,
            name: request.name.trim().to_string(),
            loan_amount: request.loan_amount,
            loan_total_amount,
            outstanding_amount: loan_total_amount,
            interest_percentage,
            status: LoanStatus::Pending,
            start_date,
            due_date,
            loan_terms_per_week: terms,
        })
    }

    /// Materialize the stored row, used by stores that assign ids themselves
    pub fn into_loan(self, id: i64, created_at: NaiveDateTime) -> Loan {
        Loan {
            id,
            user_id: self.user_id,
            name: self.name,
            loan_amount: self.loan_amount,
            loan_total_amount: self.loan_total_amount,
            outstanding_amount: self.outstanding_amount,
            interest_percentage: self.interest_percentage,
            status: self.status,
            start_date: self.start_date,
            due_date: self.due_date,
            loan_terms_per_week: self.loan_terms_per_week,
            created_at,
            updated_at: None,
        }
    }
}

/// Principal plus flat interest, truncated toward zero
///
/// `10000` at `10%` yields `11000`.
pub fn total_with_interest(amount: i64, interest_percentage: Decimal) -> Result<i64> {
    if interest_percentage.is_sign_negative() {
        return Err(AppError::validation(format!(
            "Interest percentage cannot be negative, got {}",
            interest_percentage
        )));
    }

    let hundred = Decimal::ONE_HUNDRED;
    (Decimal::from(amount) * (hundred + interest_percentage) / hundred)
        .trunc()
        .to_i64()
        .ok_or_else(|| AppError::validation("Loan total amount is out of range"))
}

/// Request body for creating a loan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanRequest {
    pub user_id: i64,
    pub name: String,
    pub loan_amount: i64,
}

impl LoanRequest {
    pub fn validate(&self) -> Result<()> {
        if self.user_id <= 0 {
            return Err(AppError::validation("User ID is required"));
        }

        if self.name.trim().is_empty() {
            return Err(AppError::validation("Loan name cannot be empty"));
        }

        if self.name.len() > 255 {
            return Err(AppError::validation(
                "Loan name cannot exceed 255 characters",
            ));
        }

        if self.loan_amount <= 0 {
            return Err(AppError::validation("Loan amount must be greater than 0"));
        }

        Ok(())
    }
}

/// Loan together with its bill schedule, ordered by billing number
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanWithBills {
    #[serde(flatten)]
    pub loan: Loan,
    pub loan_bills: Vec<LoanBill>,
}

use crate::core::Result;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Config row holding the flat interest rate, in percent
pub const LOAN_INTEREST_PERCENTAGE: &str = "loan_interest_percentage";

/// Config row holding the number of weekly bills per loan
pub const LOAN_TERM_PER_WEEK: &str = "loan_term_per_week";

pub const DEFAULT_INTEREST_PERCENTAGE: i64 = 10;
pub const DEFAULT_LOAN_TERMS_PER_WEEK: i64 = 50;

/// Largest configured term count accepted, ten years of weekly bills
pub const MAX_LOAN_TERMS_PER_WEEK: i64 = 520;

/// Named billing parameter, stored as JSON text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct BillingConfig {
    pub id: i64,
    pub name: String,
    pub value: String,
    pub created_at: NaiveDateTime,
    pub updated_at: Option<NaiveDateTime>,
}

impl BillingConfig {
    /// Decode the `{"is_active": bool, "value": int}` payload
    pub fn parse_value(&self) -> Result<BillingValue> {
        Ok(serde_json::from_str(&self.value)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingValue {
    pub is_active: bool,
    pub value: i64,
}

/// Interest and term count applied to a new loan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoanTerms {
    pub interest_percentage: Decimal,
    pub terms_per_week: i32,
}

impl Default for LoanTerms {
    fn default() -> Self {
        Self {
            interest_percentage: Decimal::from(DEFAULT_INTEREST_PERCENTAGE),
            terms_per_week: DEFAULT_LOAN_TERMS_PER_WEEK as i32,
        }
    }
}

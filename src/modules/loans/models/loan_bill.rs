use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Loan bill status
///
/// A bill moves PENDING -> BILLED -> OVERDUE as its billing date passes and
/// becomes PAID once a payment for it settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillStatus {
    Pending,
    Billed,
    Overdue,
    Paid,
}

impl BillStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillStatus::Pending => "PENDING",
            BillStatus::Billed => "BILLED",
            BillStatus::Overdue => "OVERDUE",
            BillStatus::Paid => "PAID",
        }
    }
}

impl std::fmt::Display for BillStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BillStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(BillStatus::Pending),
            "BILLED" => Ok(BillStatus::Billed),
            "OVERDUE" => Ok(BillStatus::Overdue),
            "PAID" => Ok(BillStatus::Paid),
            _ => Err(format!("Invalid loan bill status: {}", s)),
        }
    }
}

impl TryFrom<String> for BillStatus {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

/// One weekly installment of a loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct LoanBill {
    pub id: i64,
    pub loan_id: i64,
    pub billing_date: NaiveDate,

    /// Principal share of this bill
    pub billing_amount: i64,

    /// Amount a payment must match exactly
    pub billing_total_amount: i64,

    /// 1-based position in the schedule
    pub billing_number: i32,

    #[sqlx(try_from = "String")]
    pub status: BillStatus,

    /// Payment the ledger applied when the bill turned PAID
    pub paid_by_payment_id: Option<i64>,

    pub created_at: NaiveDateTime,
    pub updated_at: Option<NaiveDateTime>,
}

impl LoanBill {
    /// Only BILLED bills accept payments
    pub fn is_payable(&self) -> bool {
        self.status == BillStatus::Billed
    }

    /// Status this bill should move to on `today`, if any
    ///
    /// PENDING and BILLED bills whose billing date has arrived become BILLED,
    /// or OVERDUE once more than `grace_days` days have passed. PAID and
    /// OVERDUE bills never move.
    pub fn advanced_status(&self, today: NaiveDate, grace_days: u32) -> Option<BillStatus> {
        if !matches!(self.status, BillStatus::Pending | BillStatus::Billed) {
            return None;
        }

        if self.billing_date > today {
            return None;
        }

        let next = if (today - self.billing_date).num_days() > i64::from(grace_days) {
            BillStatus::Overdue
        } else {
            BillStatus::Billed
        };

        (next != self.status).then_some(next)
    }
}

/// Bill about to be persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLoanBill {
    pub loan_id: i64,
    pub billing_date: NaiveDate,
    pub billing_amount: i64,
    pub billing_total_amount: i64,
    pub billing_number: i32,
    pub status: BillStatus,
}

impl NewLoanBill {
    pub fn into_bill(self, id: i64, created_at: NaiveDateTime) -> LoanBill {
        LoanBill {
            id,
            loan_id: self.loan_id,
            billing_date: self.billing_date,
            billing_amount: self.billing_amount,
            billing_total_amount: self.billing_total_amount,
            billing_number: self.billing_number,
            status: self.status,
            paid_by_payment_id: None,
            created_at,
            updated_at: None,
        }
    }
}

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Borrower
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,

    /// Set while any active loan has more than one overdue bill
    pub is_delinquent: bool,

    pub created_at: NaiveDateTime,
    pub updated_at: Option<NaiveDateTime>,
}

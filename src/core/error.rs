use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};

/// Application-wide Result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Main application error type
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    /// Malformed request (missing identifiers, non-positive amounts)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Payment attempted against a bill that is not currently billed
    #[error("Loan bill {loan_bill_id} is not billed (status: {status})")]
    LoanBillNotBilled { loan_bill_id: i64, status: String },

    /// Payment amount differs from the bill's total amount
    #[error("Payment amount {actual} does not match loan bill {loan_bill_id} total amount {expected}")]
    PaymentAmountMismatch {
        loan_bill_id: i64,
        expected: i64,
        actual: i64,
    },

    /// Payment attempted against a loan that is not active
    #[error("Loan {loan_id} is not active (status: {status})")]
    LoanNotActive { loan_id: i64, status: String },

    /// Database operation errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// State conflict detected by the ledger
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Settlement queue errors
    #[error("Queue error: {0}")]
    Queue(String),

    /// Settlement failed and the payment could not be marked as failed either
    #[error("Settlement failed: {original}; marking payment as failed also failed: {compensation}")]
    CompensationFailed {
        original: Box<AppError>,
        compensation: Box<AppError>,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let status_code = self.status_code();

        HttpResponse::build(status_code).json(serde_json::json!({
            "error": {
                "code": status_code.as_u16(),
                "kind": self.kind(),
                "message": self.to_string(),
            }
        }))
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::PaymentAmountMismatch { .. } => StatusCode::BAD_REQUEST,
            AppError::LoanBillNotBilled { .. } => StatusCode::CONFLICT,
            AppError::LoanNotActive { .. } => StatusCode::CONFLICT,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Queue(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::CompensationFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Json(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// Helper functions for common error scenarios
impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        AppError::NotFound(resource.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        AppError::Conflict(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }

    /// Stable identity of the error, exposed to API callers
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation",
            AppError::LoanBillNotBilled { .. } => "loan_bill_not_billed",
            AppError::PaymentAmountMismatch { .. } => "payment_amount_mismatch",
            AppError::LoanNotActive { .. } => "loan_not_active",
            AppError::Database(_) => "database",
            AppError::NotFound(_) => "not_found",
            AppError::Conflict(_) => "conflict",
            AppError::Queue(_) => "queue",
            AppError::CompensationFailed { .. } => "compensation_failed",
            AppError::Configuration(_) => "configuration",
            AppError::Json(_) => "json",
            AppError::Internal(_) => "internal",
        }
    }

    /// Precondition and request-shape failures, never worth retrying
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

use super::super::models::{
    BillingValue, LoanTerms, DEFAULT_INTEREST_PERCENTAGE, DEFAULT_LOAN_TERMS_PER_WEEK,
    LOAN_INTEREST_PERCENTAGE, LOAN_TERM_PER_WEEK, MAX_LOAN_TERMS_PER_WEEK,
};
use super::super::repositories::BillingConfigRepository;
use crate::core::{AppError, Result};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, warn};

/// Resolves named billing parameters, falling back to defaults
pub struct BillingConfigProvider {
    config_repo: Arc<dyn BillingConfigRepository>,
}

impl BillingConfigProvider {
    pub fn new(config_repo: Arc<dyn BillingConfigRepository>) -> Self {
        Self { config_repo }
    }

    /// Look up and decode a config value
    ///
    /// # Arguments
    /// * `name` - Config name, matched case-insensitively
    ///
    /// # Returns
    /// * `AppError::NotFound` when no row has this name
    /// * `AppError::Json` when the stored value is malformed
    pub async fn resolve(&self, name: &str) -> Result<BillingValue> {
        let name = name.to_lowercase();
        let config = self
            .config_repo
            .find_by_name(&name)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Billing config {} not found", name)))?;

        config.parse_value()
    }

    /// Resolve a config value, using `default` when it is missing, inactive or unreadable
    ///
    /// Never fails; lookup problems are logged.
    pub async fn resolve_or_default(&self, name: &str, default: i64) -> i64 {
        match self.resolve(name).await {
            Ok(value) if value.is_active => value.value,
            Ok(_) => {
                debug!(config = %name, default = default, "Billing config inactive, using default");
                default
            }
            Err(e) => {
                warn!(config = %name, default = default, error = %e, "Billing config unavailable, using default");
                default
            }
        }
    }

    /// Interest rate and number of weekly bills for new loans
    ///
    /// Term counts outside `1..=MAX_LOAN_TERMS_PER_WEEK` fall back to the default.
    pub async fn loan_terms(&self) -> LoanTerms {
        let interest = self
            .resolve_or_default(LOAN_INTEREST_PERCENTAGE, DEFAULT_INTEREST_PERCENTAGE)
            .await;
        let terms = self
            .resolve_or_default(LOAN_TERM_PER_WEEK, DEFAULT_LOAN_TERMS_PER_WEEK)
            .await;

        let terms_per_week = match i32::try_from(terms) {
            Ok(terms) if terms > 0 && i64::from(terms) <= MAX_LOAN_TERMS_PER_WEEK => terms,
            _ => {
                warn!(terms = terms, "Configured loan terms out of range, using default");
                LoanTerms::default().terms_per_week
            }
        };

        LoanTerms {
            interest_percentage: Decimal::from(interest),
            terms_per_week,
        }
    }
}

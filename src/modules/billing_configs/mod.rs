pub mod models;
pub mod repositories;
pub mod services;

pub use models::{BillingConfig, BillingValue, LoanTerms};
pub use repositories::{BillingConfigRepository, MySqlBillingConfigRepository};
pub use services::BillingConfigProvider;

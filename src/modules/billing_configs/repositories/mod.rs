mod billing_config_repository;

pub use billing_config_repository::{BillingConfigRepository, MySqlBillingConfigRepository};

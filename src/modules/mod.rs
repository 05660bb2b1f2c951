pub mod billing_configs;
pub mod health;
pub mod loans;
pub mod payments;
pub mod users;

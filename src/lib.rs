//! Loan billing and payment settlement service.
//!
//! Loans are repaid through fixed weekly bills. Payments are validated and
//! queued by the HTTP API, then applied to the loan ledger by the settlement
//! worker.

pub mod config;
pub mod core;
pub mod infrastructure;
pub mod modules;

// Re-export commonly used types
pub use modules::billing_configs;
pub use modules::loans;
pub use modules::payments;
pub use modules::users;

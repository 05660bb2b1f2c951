mod loan_bill_repository;
mod loan_repository;

pub use loan_bill_repository::{LoanBillRepository, MySqlLoanBillRepository};
pub use loan_repository::{LoanRepository, MySqlLoanRepository, SettlementOutcome};

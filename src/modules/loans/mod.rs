// Loans module: loans, bill schedules, billing and delinquency

pub mod controllers;
pub mod models;
pub mod repositories;
pub mod services;

pub use models::{BillStatus, Loan, LoanBill, LoanRequest, LoanStatus, LoanWithBills};
pub use repositories::{LoanBillRepository, LoanRepository, SettlementOutcome};
pub use services::{BillScheduleGenerator, BillWriteMode, DelinquencyAggregator, LoanService};

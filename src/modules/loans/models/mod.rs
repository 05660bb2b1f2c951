mod loan;
mod loan_bill;

pub use loan::{total_with_interest, Loan, LoanRequest, LoanStatus, LoanWithBills, NewLoan};
pub use loan_bill::{BillStatus, LoanBill, NewLoanBill};

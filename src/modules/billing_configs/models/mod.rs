mod billing_config;

pub use billing_config::{
    BillingConfig, BillingValue, LoanTerms, DEFAULT_INTEREST_PERCENTAGE,
    DEFAULT_LOAN_TERMS_PER_WEEK, LOAN_INTEREST_PERCENTAGE, LOAN_TERM_PER_WEEK,
    MAX_LOAN_TERMS_PER_WEEK,
};

pub mod bill_schedule_generator;
pub mod billing_scheduler;
pub mod delinquency_aggregator;
pub mod loan_service;

pub use bill_schedule_generator::{BillScheduleGenerator, BillWriteMode};
pub use billing_scheduler::{BillingScheduler, SchedulerRun};
pub use delinquency_aggregator::{DelinquencyAggregator, DelinquencyReport, OVERDUE_BILL_THRESHOLD};
pub use loan_service::LoanService;

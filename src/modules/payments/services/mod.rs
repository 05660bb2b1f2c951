pub mod payment_service;
pub mod settlement_worker;

pub use payment_service::PaymentService;
pub use settlement_worker::{SettleOutcome, SettlementWorker};

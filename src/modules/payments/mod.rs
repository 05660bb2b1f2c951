// Payments module: initiation, settlement queue and settlement worker

pub mod controllers;
pub mod models;
pub mod queue;
pub mod repositories;
pub mod services;

pub use models::{Payment, PaymentRequest, PaymentStatus};
pub use queue::{payment_channel, PaymentEventConsumer, PaymentEventPublisher};
pub use repositories::{MySqlPaymentRepository, PaymentRepository};
pub use services::{PaymentService, SettleOutcome, SettlementWorker};

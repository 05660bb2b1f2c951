mod payment;

pub use payment::{
    NewPayment, Payment, PaymentRequest, PaymentStatus, NOTE_ALREADY_SETTLED,
    NOTE_BILL_NOT_PAYABLE, NOTE_COMPLETED, NOTE_QUEUE_FAILED, NOTE_SETTLEMENT_FAILED,
};

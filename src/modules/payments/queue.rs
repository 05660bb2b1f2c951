//! Settlement queue between the payment API and the settlement worker.
//!
//! Messages are JSON-encoded [`Payment`] records. The bundled implementation is
//! a bounded in-process channel; a broker-backed transport only has to
//! implement the two traits below.

use super::models::Payment;
use crate::core::{AppError, Result};
use async_trait::async_trait;
use tokio::sync::mpsc::{self, error::TrySendError};

/// Publishes initiated payments for settlement
#[async_trait]
pub trait PaymentEventPublisher: Send + Sync {
    async fn publish(&self, payment: &Payment) -> Result<()>;
}

/// Delivers raw settlement messages, one at a time
#[async_trait]
pub trait PaymentEventConsumer: Send {
    /// Next message, or `None` once every publisher is gone
    ///
    /// Must be cancel-safe: the worker races it against the shutdown signal.
    async fn next(&mut self) -> Option<Vec<u8>>;
}

/// Create a bounded in-process settlement queue
pub fn payment_channel(capacity: usize) -> (ChannelPublisher, ChannelConsumer) {
    let (sender, receiver) = mpsc::channel(capacity);
    (ChannelPublisher { sender }, ChannelConsumer { receiver })
}

#[derive(Clone)]
pub struct ChannelPublisher {
    sender: mpsc::Sender<Vec<u8>>,
}

#[async_trait]
impl PaymentEventPublisher for ChannelPublisher {
    async fn publish(&self, payment: &Payment) -> Result<()> {
        let body = serde_json::to_vec(payment)?;

        self.sender.try_send(body).map_err(|e| match e {
            TrySendError::Full(_) => AppError::Queue("Payment queue is full".to_string()),
            TrySendError::Closed(_) => AppError::Queue("Payment queue is closed".to_string()),
        })
    }
}

pub struct ChannelConsumer {
    receiver: mpsc::Receiver<Vec<u8>>,
}

#[async_trait]
impl PaymentEventConsumer for ChannelConsumer {
    async fn next(&mut self) -> Option<Vec<u8>> {
        self.receiver.recv().await
    }
}

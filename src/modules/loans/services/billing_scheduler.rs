use super::delinquency_aggregator::{DelinquencyAggregator, DelinquencyReport};
use super::loan_service::LoanService;
use crate::core::Result;
use chrono::{Local, NaiveDate};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

/// What one scheduler pass changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerRun {
    pub bills_advanced: u64,
    pub delinquency: DelinquencyReport,
}

/// Background job that bills due installments and refreshes delinquency
///
/// Spawn [`BillingScheduler::start`] as a tokio task; it stops when the
/// shutdown channel flips to `true` or its sender is dropped.
pub struct BillingScheduler {
    loan_service: Arc<LoanService>,
    aggregator: Arc<DelinquencyAggregator>,
    period: Duration,
}

impl BillingScheduler {
    pub fn new(
        loan_service: Arc<LoanService>,
        aggregator: Arc<DelinquencyAggregator>,
        period: Duration,
    ) -> Self {
        Self {
            loan_service,
            aggregator,
            period,
        }
    }

    /// Advance bill statuses as of `today`, then reconcile delinquency
    pub async fn run_once(&self, today: NaiveDate) -> Result<SchedulerRun> {
        let bills_advanced = self.loan_service.advance_bill_statuses(today).await?;
        let delinquency = self.aggregator.reconcile().await?;

        Ok(SchedulerRun {
            bills_advanced,
            delinquency,
        })
    }

    pub async fn start(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        info!(
            period_secs = self.period.as_secs(),
            "Starting billing scheduler"
        );

        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.run_once(Local::now().date_naive()).await {
                        error!(error = %e, "Billing scheduler run failed");
                    }
                }
            }
        }

        info!("Billing scheduler stopped");
    }
}

use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use anyhow::Context;
use billing_loan::config::Config;
use billing_loan::modules::billing_configs::{BillingConfigProvider, MySqlBillingConfigRepository};
use billing_loan::modules::health::controllers::health_controller;
use billing_loan::modules::loans::controllers::loan_controller;
use billing_loan::modules::loans::repositories::{MySqlLoanBillRepository, MySqlLoanRepository};
use billing_loan::modules::loans::services::{BillingScheduler, DelinquencyAggregator, LoanService};
use billing_loan::modules::payments::controllers::payment_controller;
use billing_loan::modules::payments::{
    payment_channel, MySqlPaymentRepository, PaymentService, SettlementWorker,
};
use billing_loan::modules::users::{MySqlUserRepository, UserService};
use tokio::sync::watch;
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("billing_loan={},actix_web=info", config.app.log_level).into());

    let registry = tracing_subscriber::registry().with(filter);
    if config.app.log_format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;
    config
        .validate()
        .context("Configuration validation failed")?;

    init_tracing(&config);

    tracing::info!(env = %config.app.env, "Starting billing-loan service");

    let db_pool = config
        .database
        .create_pool()
        .await
        .context("Failed to create database pool")?;

    tracing::info!(
        max_connections = config.database.max_connections,
        "Database pool initialized"
    );

    if config.database.run_migrations {
        config
            .database
            .migrate(&db_pool)
            .await
            .context("Failed to run migrations")?;
        tracing::info!("Database migrations applied");
    }

    // Repositories
    let user_repo = Arc::new(MySqlUserRepository::new(db_pool.clone()));
    let loan_repo = Arc::new(MySqlLoanRepository::new(db_pool.clone()));
    let bill_repo = Arc::new(MySqlLoanBillRepository::new(db_pool.clone()));
    let payment_repo = Arc::new(MySqlPaymentRepository::new(db_pool.clone()));
    let config_repo = Arc::new(MySqlBillingConfigRepository::new(db_pool.clone()));

    // Services
    let user_service = Arc::new(UserService::new(user_repo));
    let config_provider = Arc::new(BillingConfigProvider::new(config_repo));
    let loan_service = Arc::new(LoanService::new(
        loan_repo.clone(),
        bill_repo.clone(),
        user_service.clone(),
        config_provider,
        config.billing.bill_write_mode,
        config.billing.grace_days,
    ));
    let aggregator = Arc::new(DelinquencyAggregator::new(
        loan_repo.clone(),
        bill_repo.clone(),
        user_service,
    ));

    let (publisher, consumer) = payment_channel(config.worker.queue_capacity);
    let payment_service = Arc::new(PaymentService::new(
        payment_repo.clone(),
        loan_repo.clone(),
        bill_repo,
        Arc::new(publisher),
    ));
    let worker = Arc::new(SettlementWorker::new(
        payment_repo,
        loan_repo,
        config.worker.compensation_attempts,
        config.worker.compensation_backoff,
    ));
    let scheduler = Arc::new(BillingScheduler::new(
        loan_service.clone(),
        aggregator,
        config.billing.scheduler_interval,
    ));

    // Payments a previous run queued or started but never finished
    let resumed = worker
        .resume_unsettled()
        .await
        .context("Failed to resume unsettled payments")?;
    tracing::info!(count = resumed, "Unsettled payments checked");

    // Background tasks
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker_task = {
        let worker = worker.clone();
        let shutdown = shutdown_rx.clone();
        tokio::spawn(async move { worker.run(consumer, shutdown).await })
    };
    let scheduler_task = tokio::spawn(scheduler.start(shutdown_rx));

    // HTTP server
    let bind_address = config.server.bind_address();
    tracing::info!(address = %bind_address, "HTTP server listening");

    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .app_data(web::Data::new(db_pool.clone()))
            .app_data(web::Data::new(loan_service.clone()))
            .app_data(web::Data::new(payment_service.clone()))
            .configure(health_controller::configure)
            .service(
                web::scope("/api/v1")
                    .configure(loan_controller::configure)
                    .configure(payment_controller::configure),
            )
    })
    .workers(config.server.workers)
    .bind(&bind_address)
    .with_context(|| format!("Failed to bind {}", bind_address))?
    .run();

    let served = server.await;

    tracing::info!("HTTP server stopped, draining background tasks");
    let _ = shutdown_tx.send(true);
    if let Err(e) = worker_task.await {
        tracing::error!(error = %e, "Settlement worker task failed");
    }
    if let Err(e) = scheduler_task.await {
        tracing::error!(error = %e, "Billing scheduler task failed");
    }

    served.context("HTTP server error")
}

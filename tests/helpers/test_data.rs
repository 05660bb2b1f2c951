// Test Data and Service Harness
//
// Wires every service over an `InMemoryStore` the same way `main.rs` wires
// them over MySQL. Individual repositories can be swapped for the wrappers in
// `fault_injection`.

use billing_loan::infrastructure::InMemoryStore;
use billing_loan::modules::billing_configs::models::{LOAN_INTEREST_PERCENTAGE, LOAN_TERM_PER_WEEK};
use billing_loan::modules::billing_configs::BillingConfigProvider;
use billing_loan::modules::loans::models::{BillStatus, Loan, LoanBill, LoanRequest, LoanWithBills};
use billing_loan::modules::loans::repositories::{LoanBillRepository, LoanRepository};
use billing_loan::modules::loans::services::{
    BillWriteMode, BillingScheduler, DelinquencyAggregator, LoanService,
};
use billing_loan::modules::payments::models::{Payment, PaymentRequest};
use billing_loan::modules::payments::queue::{payment_channel, ChannelConsumer, PaymentEventPublisher};
use billing_loan::modules::payments::repositories::PaymentRepository;
use billing_loan::modules::payments::services::{PaymentService, SettlementWorker};
use billing_loan::modules::users::models::User;
use billing_loan::modules::users::repositories::UserRepository;
use billing_loan::modules::users::services::UserService;
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;

pub const COMPENSATION_ATTEMPTS: u32 = 3;

/// Loan start date used by every fixture: Tuesday 1 October 2024
pub fn start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 10, 1).unwrap()
}

pub fn date(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, month, day).unwrap()
}

/// Store seeded with the given interest percentage and weekly term count
pub async fn store_with_terms(interest_percentage: i64, terms: i64) -> InMemoryStore {
    let store = InMemoryStore::new();
    store
        .put_config(
            LOAN_INTEREST_PERCENTAGE,
            &format!(r#"{{"is_active": true, "value": {}}}"#, interest_percentage),
        )
        .await;
    store
        .put_config(
            LOAN_TERM_PER_WEEK,
            &format!(r#"{{"is_active": true, "value": {}}}"#, terms),
        )
        .await;
    store
}

/// Repositories the services are built on
pub struct Repos {
    pub loans: Arc<dyn LoanRepository>,
    pub bills: Arc<dyn LoanBillRepository>,
    pub payments: Arc<dyn PaymentRepository>,
}

impl Repos {
    pub fn from_store(store: &InMemoryStore) -> Self {
        Self {
            loans: Arc::new(store.clone()),
            bills: Arc::new(store.clone()),
            payments: Arc::new(store.clone()),
        }
    }
}

pub struct Harness {
    pub store: InMemoryStore,
    pub users: Arc<UserService>,
    pub loans: Arc<LoanService>,
    pub payments: Arc<PaymentService>,
    pub worker: Arc<SettlementWorker>,
    pub aggregator: Arc<DelinquencyAggregator>,
    pub scheduler: Arc<BillingScheduler>,
    pub consumer: Option<ChannelConsumer>,
}

impl Harness {
    /// 10% interest, 5 weekly bills
    pub async fn new() -> Self {
        Self::with_terms(10, 5).await
    }

    pub async fn with_terms(interest_percentage: i64, terms: i64) -> Self {
        let store = store_with_terms(interest_percentage, terms).await;
        let repos = Repos::from_store(&store);
        Self::build(store, repos, BillWriteMode::Concurrent)
    }

    pub fn build(store: InMemoryStore, repos: Repos, write_mode: BillWriteMode) -> Self {
        let (publisher, consumer) = payment_channel(64);
        Self::build_with_publisher(store, repos, write_mode, Arc::new(publisher), Some(consumer))
    }

    pub fn build_with_publisher(
        store: InMemoryStore,
        repos: Repos,
        write_mode: BillWriteMode,
        publisher: Arc<dyn PaymentEventPublisher>,
        consumer: Option<ChannelConsumer>,
    ) -> Self {
        let user_repo: Arc<dyn UserRepository> = Arc::new(store.clone());
        let users = Arc::new(UserService::new(user_repo));
        let config_provider = Arc::new(BillingConfigProvider::new(Arc::new(store.clone())));

        let loans = Arc::new(LoanService::new(
            repos.loans.clone(),
            repos.bills.clone(),
            users.clone(),
            config_provider,
            write_mode,
            0,
        ));
        let aggregator = Arc::new(DelinquencyAggregator::new(
            repos.loans.clone(),
            repos.bills.clone(),
            users.clone(),
        ));
        let payments = Arc::new(PaymentService::new(
            repos.payments.clone(),
            repos.loans.clone(),
            repos.bills.clone(),
            publisher,
        ));
        let worker = Arc::new(SettlementWorker::new(
            repos.payments.clone(),
            repos.loans.clone(),
            COMPENSATION_ATTEMPTS,
            Duration::from_millis(1),
        ));
        let scheduler = Arc::new(BillingScheduler::new(
            loans.clone(),
            aggregator.clone(),
            Duration::from_millis(10),
        ));

        Self {
            store,
            users,
            loans,
            payments,
            worker,
            aggregator,
            scheduler,
            consumer,
        }
    }

    pub async fn user(&self, name: &str) -> User {
        self.store.insert_user(name).await
    }

    /// Create a loan for a fresh user, starting on `start_date()`
    pub async fn loan(&self, loan_amount: i64) -> LoanWithBills {
        let user = self.user("Andi").await;
        self.loan_for(user.id, loan_amount).await
    }

    pub async fn loan_for(&self, user_id: i64, loan_amount: i64) -> LoanWithBills {
        self.loans
            .create_loan(
                LoanRequest {
                    user_id,
                    name: "Motorbike".to_string(),
                    loan_amount,
                },
                start_date(),
            )
            .await
            .expect("loan creation failed")
    }

    /// Loan whose bills are all BILLED
    pub async fn billed_loan(&self, loan_amount: i64) -> LoanWithBills {
        let loan = self.loan(loan_amount).await;
        for bill in &loan.loan_bills {
            self.set_bill_status(bill.id, BillStatus::Billed).await;
        }
        self.loans.get_loan(loan.loan.id).await.unwrap()
    }

    pub async fn set_bill_status(&self, bill_id: i64, status: BillStatus) {
        self.store.set_bill_status(bill_id, status).await.unwrap();
    }

    pub async fn loan_of(&self, id: i64) -> Loan {
        LoanRepository::find_by_id(&self.store, id)
            .await
            .unwrap()
            .expect("loan not found")
    }

    pub async fn bill_of(&self, id: i64) -> LoanBill {
        LoanBillRepository::find_by_id(&self.store, id)
            .await
            .unwrap()
            .expect("loan bill not found")
    }

    pub async fn payment_of(&self, id: i64) -> Payment {
        PaymentRepository::find_by_id(&self.store, id)
            .await
            .unwrap()
            .expect("payment not found")
    }

    pub async fn user_of(&self, id: i64) -> User {
        self.users.get_user(id).await.unwrap()
    }
}

/// Request paying `bill` in full
pub fn pay(loan: &LoanWithBills, bill: &LoanBill) -> PaymentRequest {
    PaymentRequest {
        user_id: loan.loan.user_id,
        loan_id: loan.loan.id,
        loan_bill_id: bill.id,
        amount: bill.billing_total_amount,
    }
}

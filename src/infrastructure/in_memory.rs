use crate::core::{AppError, Result};
use crate::modules::billing_configs::models::{
    BillingConfig, DEFAULT_INTEREST_PERCENTAGE, DEFAULT_LOAN_TERMS_PER_WEEK,
    LOAN_INTEREST_PERCENTAGE, LOAN_TERM_PER_WEEK,
};
use crate::modules::billing_configs::repositories::BillingConfigRepository;
use crate::modules::loans::models::{
    BillStatus, Loan, LoanBill, LoanStatus, NewLoan, NewLoanBill,
};
use crate::modules::loans::repositories::{
    LoanBillRepository, LoanRepository, SettlementOutcome,
};
use crate::modules::payments::models::{NewPayment, Payment, PaymentStatus};
use crate::modules::payments::repositories::PaymentRepository;
use crate::modules::users::models::User;
use crate::modules::users::repositories::UserRepository;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct State {
    users: BTreeMap<i64, User>,
    loans: BTreeMap<i64, Loan>,
    bills: BTreeMap<i64, LoanBill>,
    payments: BTreeMap<i64, Payment>,
    configs: BTreeMap<String, BillingConfig>,
}

fn next_id<T>(rows: &BTreeMap<i64, T>) -> i64 {
    rows.keys().next_back().map_or(1, |id| id + 1)
}

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// Thread-safe in-memory implementation of every repository.
///
/// All tables share one `RwLock`, so a settlement holds the write lock for the
/// bill and the loan together, the way a database transaction would. Used by
/// the test suites and for running without MySQL.
#[derive(Default, Clone)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryStore {
    /// Creates a new, empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding the default billing config rows.
    pub async fn with_default_configs() -> Self {
        let store = Self::new();
        store
            .put_config(
                LOAN_INTEREST_PERCENTAGE,
                &format!(r#"{{"is_active": true, "value": {}}}"#, DEFAULT_INTEREST_PERCENTAGE),
            )
            .await;
        store
            .put_config(
                LOAN_TERM_PER_WEEK,
                &format!(r#"{{"is_active": true, "value": {}}}"#, DEFAULT_LOAN_TERMS_PER_WEEK),
            )
            .await;
        store
    }

    pub async fn insert_user(&self, name: &str) -> User {
        let mut state = self.state.write().await;
        let user = User {
            id: next_id(&state.users),
            name: name.to_string(),
            is_delinquent: false,
            created_at: now(),
            updated_at: None,
        };
        state.users.insert(user.id, user.clone());
        user
    }

    /// Insert or replace a config row; `value` is stored verbatim
    pub async fn put_config(&self, name: &str, value: &str) {
        let mut state = self.state.write().await;
        let name = name.to_lowercase();
        let id = state
            .configs
            .get(&name)
            .map_or(state.configs.len() as i64 + 1, |existing| existing.id);
        state.configs.insert(
            name.clone(),
            BillingConfig {
                id,
                name,
                value: value.to_string(),
                created_at: now(),
                updated_at: None,
            },
        );
    }

    /// Force a bill into a status, bypassing the billing calendar
    pub async fn set_bill_status(&self, bill_id: i64, status: BillStatus) -> Result<()> {
        let mut state = self.state.write().await;
        let bill = state
            .bills
            .get_mut(&bill_id)
            .ok_or_else(|| AppError::not_found(format!("Loan bill {} not found", bill_id)))?;
        bill.status = status;
        bill.updated_at = Some(now());
        Ok(())
    }

    pub async fn payments(&self) -> Vec<Payment> {
        self.state.read().await.payments.values().cloned().collect()
    }

    pub async fn bill_count(&self) -> usize {
        self.state.read().await.bills.len()
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn set_delinquent(&self, id: i64, is_delinquent: bool) -> Result<bool> {
        let mut state = self.state.write().await;
        match state.users.get_mut(&id) {
            Some(user) => {
                user.is_delinquent = is_delinquent;
                user.updated_at = Some(now());
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl BillingConfigRepository for InMemoryStore {
    async fn find_by_name(&self, name: &str) -> Result<Option<BillingConfig>> {
        Ok(self
            .state
            .read()
            .await
            .configs
            .get(&name.to_lowercase())
            .cloned())
    }
}

#[async_trait]
impl LoanRepository for InMemoryStore {
    async fn create(&self, loan: &NewLoan) -> Result<Loan> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&loan.user_id) {
            return Err(AppError::conflict(format!(
                "User {} does not exist",
                loan.user_id
            )));
        }

        let stored = loan.clone().into_loan(next_id(&state.loans), now());
        state.loans.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Loan>> {
        Ok(self.state.read().await.loans.get(&id).cloned())
    }

    async fn find_by_user(&self, user_id: i64) -> Result<Vec<Loan>> {
        Ok(self
            .state
            .read()
            .await
            .loans
            .values()
            .filter(|loan| loan.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn find_active(&self) -> Result<Vec<Loan>> {
        Ok(self
            .state
            .read()
            .await
            .loans
            .values()
            .filter(|loan| loan.is_active())
            .cloned()
            .collect())
    }

    async fn update_status(&self, id: i64, status: LoanStatus) -> Result<()> {
        let mut state = self.state.write().await;
        let loan = state
            .loans
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Loan {} not found", id)))?;
        loan.status = status;
        loan.updated_at = Some(now());
        Ok(())
    }

    async fn settle_bill(
        &self,
        payment_id: i64,
        loan_id: i64,
        loan_bill_id: i64,
        amount: i64,
    ) -> Result<SettlementOutcome> {
        let mut state = self.state.write().await;

        let bill = state
            .bills
            .get(&loan_bill_id)
            .filter(|bill| bill.loan_id == loan_id)
            .ok_or_else(|| {
                AppError::not_found(format!(
                    "Loan bill {} of loan {} not found",
                    loan_bill_id, loan_id
                ))
            })?;
        match bill.status {
            BillStatus::Billed => {}
            BillStatus::Paid => {
                return Ok(SettlementOutcome::AlreadyPaid {
                    paid_by: bill.paid_by_payment_id,
                })
            }
            other => return Ok(SettlementOutcome::NotPayable(other)),
        }

        let loan = state
            .loans
            .get_mut(&loan_id)
            .filter(|loan| loan.outstanding_amount >= amount)
            .ok_or_else(|| {
                AppError::conflict(format!(
                    "Loan {} outstanding amount is missing or lower than {}",
                    loan_id, amount
                ))
            })?;

        let timestamp = now();
        loan.outstanding_amount -= amount;
        if loan.outstanding_amount == 0 {
            loan.status = LoanStatus::Closed;
        }
        loan.updated_at = Some(timestamp);
        let loan_closed = loan.status == LoanStatus::Closed;

        if let Some(bill) = state.bills.get_mut(&loan_bill_id) {
            bill.status = BillStatus::Paid;
            bill.paid_by_payment_id = Some(payment_id);
            bill.updated_at = Some(timestamp);
        }

        Ok(SettlementOutcome::Settled { loan_closed })
    }
}

impl State {
    fn insert_bill(&mut self, bill: &NewLoanBill) -> Result<LoanBill> {
        if !self.loans.contains_key(&bill.loan_id) {
            return Err(AppError::conflict(format!(
                "Loan {} does not exist",
                bill.loan_id
            )));
        }

        let duplicate = self.bills.values().any(|existing| {
            existing.loan_id == bill.loan_id && existing.billing_number == bill.billing_number
        });
        if duplicate {
            return Err(AppError::conflict(format!(
                "Loan {} already has bill number {}",
                bill.loan_id, bill.billing_number
            )));
        }

        let stored = bill.clone().into_bill(next_id(&self.bills), now());
        self.bills.insert(stored.id, stored.clone());
        Ok(stored)
    }
}

#[async_trait]
impl LoanBillRepository for InMemoryStore {
    async fn create(&self, bill: &NewLoanBill) -> Result<LoanBill> {
        self.state.write().await.insert_bill(bill)
    }

    async fn create_batch(&self, bills: &[NewLoanBill]) -> Result<Vec<LoanBill>> {
        let mut state = self.state.write().await;
        let mut stored = Vec::with_capacity(bills.len());

        for bill in bills {
            match state.insert_bill(bill) {
                Ok(row) => stored.push(row),
                Err(e) => {
                    for row in &stored {
                        state.bills.remove(&row.id);
                    }
                    return Err(e);
                }
            }
        }

        Ok(stored)
    }

    async fn delete_by_loan(&self, loan_id: i64) -> Result<u64> {
        let mut state = self.state.write().await;
        let before = state.bills.len();
        state.bills.retain(|_, bill| bill.loan_id != loan_id);
        Ok((before - state.bills.len()) as u64)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<LoanBill>> {
        Ok(self.state.read().await.bills.get(&id).cloned())
    }

    async fn find_by_loan(&self, loan_id: i64) -> Result<Vec<LoanBill>> {
        let mut bills: Vec<LoanBill> = self
            .state
            .read()
            .await
            .bills
            .values()
            .filter(|bill| bill.loan_id == loan_id)
            .cloned()
            .collect();
        bills.sort_by_key(|bill| bill.billing_number);
        Ok(bills)
    }

    async fn advance_statuses(&self, today: NaiveDate, grace_days: u32) -> Result<u64> {
        let mut state = self.state.write().await;
        let active: HashSet<i64> = state
            .loans
            .values()
            .filter(|loan| loan.is_active())
            .map(|loan| loan.id)
            .collect();

        let timestamp = now();
        let mut advanced = 0;
        for bill in state.bills.values_mut() {
            if !active.contains(&bill.loan_id) {
                continue;
            }
            if let Some(status) = bill.advanced_status(today, grace_days) {
                bill.status = status;
                bill.updated_at = Some(timestamp);
                advanced += 1;
            }
        }

        Ok(advanced)
    }

    async fn count_overdue_by_loan(&self, loan_id: i64) -> Result<i64> {
        let state = self.state.read().await;
        if !state.loans.get(&loan_id).is_some_and(Loan::is_active) {
            return Ok(0);
        }

        Ok(state
            .bills
            .values()
            .filter(|bill| bill.loan_id == loan_id && bill.status == BillStatus::Overdue)
            .count() as i64)
    }
}

#[async_trait]
impl PaymentRepository for InMemoryStore {
    async fn create(&self, payment: &NewPayment) -> Result<i64> {
        let mut state = self.state.write().await;
        if !state.loans.contains_key(&payment.loan_id)
            || !state.bills.contains_key(&payment.loan_bill_id)
        {
            return Err(AppError::conflict(format!(
                "Payment references missing loan {} or loan bill {}",
                payment.loan_id, payment.loan_bill_id
            )));
        }

        let stored = payment.clone().into_payment(next_id(&state.payments), now());
        let id = stored.id;
        state.payments.insert(id, stored);
        Ok(id)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Payment>> {
        Ok(self.state.read().await.payments.get(&id).cloned())
    }

    async fn update_status(
        &self,
        id: i64,
        status: PaymentStatus,
        note: Option<&str>,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        let payment = state
            .payments
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Payment {} not found", id)))?;

        payment.status = status;
        if let Some(note) = note {
            payment.note = Some(note.to_string());
        }
        payment.updated_at = Some(now());
        Ok(())
    }

    async fn find_by_status(&self, status: PaymentStatus) -> Result<Vec<Payment>> {
        Ok(self
            .state
            .read()
            .await
            .payments
            .values()
            .filter(|payment| payment.status == status)
            .cloned()
            .collect())
    }
}

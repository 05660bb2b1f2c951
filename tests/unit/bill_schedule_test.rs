// Property-based tests for weekly bill schedules

use billing_loan::core::calendar::{last_billing_date, next_monday, weekly_billing_dates};
use billing_loan::core::AppError;
use billing_loan::modules::loans::models::{total_with_interest, BillStatus, Loan, LoanStatus};
use billing_loan::modules::loans::services::BillScheduleGenerator;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn loan(loan_amount: i64, interest: Decimal, terms: i32, start_date: NaiveDate) -> Loan {
    let loan_total_amount = total_with_interest(loan_amount, interest).unwrap();
    Loan {
        id: 42,
        user_id: 7,
        name: "Working capital".to_string(),
        loan_amount,
        loan_total_amount,
        outstanding_amount: loan_total_amount,
        interest_percentage: interest,
        status: LoanStatus::Pending,
        start_date,
        due_date: last_billing_date(start_date, terms.max(1) as u32).unwrap(),
        loan_terms_per_week: terms,
        created_at: start_date.and_hms_opt(8, 0, 0).unwrap(),
        updated_at: None,
    }
}

fn any_date() -> impl Strategy<Value = NaiveDate> {
    (0i64..3650).prop_map(|offset| NaiveDate::from_ymd_opt(2020, 1, 1).unwrap() + Duration::days(offset))
}

#[test]
fn test_ten_thousand_over_five_weeks_at_ten_percent() {
    let loan = loan(10000, dec!(10), 5, NaiveDate::from_ymd_opt(2024, 10, 1).unwrap());
    assert_eq!(loan.loan_total_amount, 11000);

    let bills = BillScheduleGenerator::calculate_schedule(&loan).unwrap();
    assert_eq!(bills.len(), 5);
    assert!(bills.iter().all(|bill| bill.billing_amount == 2000));
    assert!(bills.iter().all(|bill| bill.billing_total_amount == 2200));
    assert!(bills.iter().all(|bill| bill.loan_id == 42));
}

#[test]
fn test_monday_start_bills_the_following_monday() {
    let monday = NaiveDate::from_ymd_opt(2024, 10, 7).unwrap();
    assert_eq!(next_monday(monday).unwrap(), NaiveDate::from_ymd_opt(2024, 10, 14).unwrap());

    let sunday = NaiveDate::from_ymd_opt(2024, 10, 6).unwrap();
    assert_eq!(next_monday(sunday).unwrap(), monday);
}

#[test]
fn test_schedule_crosses_year_end() {
    let start = NaiveDate::from_ymd_opt(2024, 12, 25).unwrap();
    let dates = weekly_billing_dates(start, 3).unwrap();
    assert_eq!(
        dates,
        vec![
            NaiveDate::from_ymd_opt(2024, 12, 30).unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 6).unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 13).unwrap(),
        ]
    );
}

#[test]
fn test_non_positive_terms_rejected() {
    let start = NaiveDate::from_ymd_opt(2024, 10, 1).unwrap();
    assert!(BillScheduleGenerator::calculate_schedule(&loan(10000, dec!(10), 0, start)).is_err());
    assert!(BillScheduleGenerator::calculate_schedule(&loan(10000, dec!(10), -3, start)).is_err());
}

#[test]
fn test_schedule_past_calendar_end_rejected() {
    let start = NaiveDate::from_ymd_opt(2024, 10, 1).unwrap();
    let mut far = loan(10000, dec!(10), 1, start);
    far.loan_terms_per_week = i32::MAX;
    assert!(matches!(
        BillScheduleGenerator::calculate_schedule(&far),
        Err(AppError::Validation(_))
    ));
}

proptest! {
    #[test]
    fn prop_schedule_has_one_pending_bill_per_term(
        amount in 1i64..1_000_000_000,
        terms in 1i32..120,
        start in any_date(),
    ) {
        let loan = loan(amount, dec!(10), terms, start);
        let bills = BillScheduleGenerator::calculate_schedule(&loan).unwrap();

        prop_assert_eq!(bills.len(), terms as usize);
        for (index, bill) in bills.iter().enumerate() {
            prop_assert_eq!(bill.billing_number, index as i32 + 1);
            prop_assert_eq!(bill.status, BillStatus::Pending);
        }
    }

    #[test]
    fn prop_bills_fall_on_consecutive_mondays(
        terms in 1i32..120,
        start in any_date(),
    ) {
        let loan = loan(1_000_000, dec!(10), terms, start);
        let bills = BillScheduleGenerator::calculate_schedule(&loan).unwrap();

        let first = bills[0].billing_date;
        prop_assert!(first > start);
        prop_assert!(first - start <= Duration::days(7));

        for bill in &bills {
            prop_assert_eq!(bill.billing_date.weekday(), Weekday::Mon);
        }
        for pair in bills.windows(2) {
            prop_assert_eq!(pair[1].billing_date - pair[0].billing_date, Duration::days(7));
        }
        prop_assert_eq!(bills[bills.len() - 1].billing_date, last_billing_date(start, terms as u32).unwrap());
    }

    #[test]
    fn prop_amounts_truncate_and_sum_within_remainder(
        amount in 1i64..1_000_000_000,
        interest in 0u32..100,
        terms in 1i32..120,
    ) {
        let start = NaiveDate::from_ymd_opt(2024, 10, 1).unwrap();
        let loan = loan(amount, Decimal::from(interest), terms, start);
        let bills = BillScheduleGenerator::calculate_schedule(&loan).unwrap();

        let n = i64::from(terms);
        let principal: i64 = bills.iter().map(|bill| bill.billing_amount).sum();
        let total: i64 = bills.iter().map(|bill| bill.billing_total_amount).sum();

        prop_assert!(bills.iter().all(|bill| bill.billing_amount == amount / n));
        prop_assert!(bills.iter().all(|bill| bill.billing_total_amount == loan.loan_total_amount / n));
        prop_assert!(total <= loan.loan_total_amount);
        prop_assert!(loan.loan_total_amount - total <= n - 1);
        prop_assert!(amount - principal <= n - 1);
    }

    #[test]
    fn prop_interest_never_reduces_total(
        amount in 1i64..1_000_000_000,
        interest in 0u32..100,
    ) {
        let total = total_with_interest(amount, Decimal::from(interest)).unwrap();
        prop_assert!(total >= amount);
        prop_assert_eq!(total, amount + amount * i64::from(interest) / 100);
    }
}

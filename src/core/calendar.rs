//! Weekly billing calendar.
//!
//! Bills fall on Mondays; all dates are calendar dates without a timezone.

use super::{AppError, Result};
use chrono::{Datelike, Days, NaiveDate};

/// Returns the first Monday strictly after `date`.
///
/// A Monday never maps to itself: it advances a full week.
pub fn next_monday(date: NaiveDate) -> Result<NaiveDate> {
    let days_until_monday = 7 - u64::from(date.weekday().num_days_from_monday());
    date.checked_add_days(Days::new(days_until_monday))
        .ok_or_else(|| out_of_range(date, 1))
}

/// Billing dates for `terms` consecutive weeks starting after `start_date`.
///
/// The sequence is `next_monday(start)`, then one week apart. Fails when the
/// last date falls outside the supported calendar.
pub fn weekly_billing_dates(start_date: NaiveDate, terms: u32) -> Result<Vec<NaiveDate>> {
    if terms == 0 {
        return Ok(Vec::new());
    }

    let first = next_monday(start_date)?;
    add_weeks(first, terms - 1)?;
    (0..terms).map(|week| add_weeks(first, week)).collect()
}

/// Date of the last weekly bill, used as the loan due date.
pub fn last_billing_date(start_date: NaiveDate, terms: u32) -> Result<NaiveDate> {
    add_weeks(next_monday(start_date)?, terms.saturating_sub(1))
}

fn add_weeks(date: NaiveDate, weeks: u32) -> Result<NaiveDate> {
    date.checked_add_days(Days::new(u64::from(weeks) * 7))
        .ok_or_else(|| out_of_range(date, weeks))
}

fn out_of_range(date: NaiveDate, weeks: u32) -> AppError {
    AppError::validation(format!(
        "Billing date {} weeks after {} is out of range",
        weeks, date
    ))
}

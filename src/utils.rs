use crate::error::{PacingError, Result};
use chrono::{Datelike, Months, NaiveDate, Weekday};

/// Rounds half away from zero to the given number of decimal places.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Saturday and Sunday are the only non-selling days; holidays are not modelled.
pub fn is_selling_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Counts selling days in the inclusive range `[from, to]`. Returns 0 when `to < from`.
pub fn count_selling_days(from: NaiveDate, to: NaiveDate) -> u32 {
    if to < from {
        return 0;
    }

    let span = (to - from).num_days() + 1;
    let full_weeks = span / 7;
    let mut count = full_weeks * 5;

    let mut current = from + chrono::Days::new((full_weeks * 7) as u64);
    while current <= to {
        if is_selling_day(current) {
            count += 1;
        }
        current = match current.succ_opt() {
            Some(next) => next,
            None => break,
        };
    }

    count as u32
}

pub fn validate_fiscal_year_end_month(month: u32) -> Result<()> {
    if !(1..=12).contains(&month) {
        return Err(PacingError::InvalidFiscalYearEndMonth(month));
    }
    Ok(())
}

pub fn fiscal_year_start_month(fiscal_year_end_month: u32) -> u32 {
    if fiscal_year_end_month == 12 {
        1
    } else {
        fiscal_year_end_month + 1
    }
}

/// Returns the 0-based index of the month within the fiscal year.
///
/// # Examples
/// - If FY ends in Dec (12): Jan=0, Feb=1, ..., Dec=11
/// - If FY ends in June (6): July=0, Aug=1, ..., June=11
pub fn get_fiscal_month_index(calendar_month: u32, fiscal_year_end_month: u32) -> u32 {
    let fy_start_month = fiscal_year_start_month(fiscal_year_end_month);

    if calendar_month >= fy_start_month {
        calendar_month - fy_start_month
    } else {
        calendar_month + 12 - fy_start_month
    }
}

/// Fiscal years are labelled by the calendar year in which they end.
pub fn fiscal_year_for_date(date: NaiveDate, fiscal_year_end_month: u32) -> i32 {
    if date.month() <= fiscal_year_end_month {
        date.year()
    } else {
        date.year() + 1
    }
}

/// 1-based fiscal quarter of the date.
pub fn fiscal_quarter_for_date(date: NaiveDate, fiscal_year_end_month: u32) -> u32 {
    get_fiscal_month_index(date.month(), fiscal_year_end_month) / 3 + 1
}

/// First calendar day of the fiscal quarter containing `date`.
pub fn fiscal_quarter_start(date: NaiveDate, fiscal_year_end_month: u32) -> Result<NaiveDate> {
    let months_into_quarter = get_fiscal_month_index(date.month(), fiscal_year_end_month) % 3;

    date.with_day(1)
        .and_then(|first| first.checked_sub_months(Months::new(months_into_quarter)))
        .ok_or_else(|| {
            PacingError::DateError(format!("Cannot resolve fiscal quarter start for {}", date))
        })
}

pub fn previous_fiscal_quarter_start(quarter_start: NaiveDate) -> Result<NaiveDate> {
    quarter_start
        .checked_sub_months(Months::new(3))
        .ok_or_else(|| {
            PacingError::DateError(format!(
                "Cannot resolve previous fiscal quarter for {}",
                quarter_start
            ))
        })
}

/// Same month and day one year earlier; Feb 29 maps to Feb 28.
pub fn same_calendar_day_last_year(date: NaiveDate) -> Result<NaiveDate> {
    date.checked_sub_months(Months::new(12)).ok_or_else(|| {
        PacingError::DateError(format!("Cannot resolve prior-year date for {}", date))
    })
}

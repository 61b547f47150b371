use crate::error::{PacingError, Result};
use crate::schema::{DateRecord, EnrichedDateRecord};
use crate::utils::{
    count_selling_days, fiscal_quarter_for_date, fiscal_quarter_start, fiscal_year_for_date,
    is_selling_day, previous_fiscal_quarter_start, round_to, same_calendar_day_last_year,
    validate_fiscal_year_end_month,
};
use chrono::NaiveDate;
use log::{debug, warn};
use std::collections::{BTreeMap, HashSet};

pub struct CalendarEnricher;

impl CalendarEnricher {
    /// Recomputes every pacing attribute from the full date dimension.
    ///
    /// Quarters are grouped by `first_day_of_fiscal_quarter`. The prior-quarter
    /// comparable date is a left-outer lookup: dates without a match keep `None`.
    pub fn enrich(records: &[DateRecord]) -> Result<Vec<EnrichedDateRecord>> {
        let mut sorted = records.to_vec();
        sorted.sort_by_key(|r| r.date);

        for pair in sorted.windows(2) {
            if pair[0].date == pair[1].date {
                return Err(PacingError::DuplicateDate(pair[0].date));
            }
        }

        for warning in validate_date_dimension(&sorted) {
            warn!("Date dimension: {}", warning);
        }

        let selling_days = selling_days_by_quarter(&sorted);

        let mut enriched: Vec<EnrichedDateRecord> = sorted
            .iter()
            .map(|record| {
                let in_quarter = selling_days
                    .get(&record.first_day_of_fiscal_quarter)
                    .copied()
                    .unwrap_or(0);
                build_enriched(record, in_quarter)
            })
            .collect();

        let negative = enriched.iter().filter(|r| r.selling_days_left < 0).count();
        if negative > 0 {
            warn!(
                "{} dates have negative selling days left; the date dimension may be out of order",
                negative
            );
        }

        // (quarter start, selling days left) -> dates ascending; the first entry wins ties.
        let mut by_days_left: BTreeMap<(NaiveDate, i64), Vec<NaiveDate>> = BTreeMap::new();
        for record in &enriched {
            by_days_left
                .entry((record.first_day_of_fiscal_quarter, record.selling_days_left))
                .or_default()
                .push(record.date);
        }

        let mut unmatched = 0usize;
        for record in &mut enriched {
            let key = (
                record.first_day_of_previous_fiscal_quarter,
                record.selling_days_left,
            );
            record.prior_quarter_date_with_same_selling_days_left = by_days_left
                .get(&key)
                .and_then(|dates| dates.first().copied());

            if record.prior_quarter_date_with_same_selling_days_left.is_none() {
                unmatched += 1;
            }
        }

        debug!(
            "Enriched {} dates across {} fiscal quarters ({} without a prior-quarter match)",
            enriched.len(),
            selling_days.len(),
            unmatched
        );

        Ok(enriched)
    }
}

pub fn enrich_date_dimension(records: &[DateRecord]) -> Result<Vec<EnrichedDateRecord>> {
    CalendarEnricher::enrich(records)
}

/// Maximum work-day number observed per fiscal quarter.
pub fn selling_days_by_quarter(records: &[DateRecord]) -> BTreeMap<NaiveDate, u32> {
    let mut selling_days: BTreeMap<NaiveDate, u32> = BTreeMap::new();
    for record in records {
        let entry = selling_days
            .entry(record.first_day_of_fiscal_quarter)
            .or_insert(0);
        *entry = (*entry).max(record.fiscal_work_day_number_in_quarter);
    }
    selling_days
}

fn build_enriched(record: &DateRecord, selling_days_in_quarter: u32) -> EnrichedDateRecord {
    let selling_days_left =
        selling_days_in_quarter as i64 - record.fiscal_work_day_number_in_quarter as i64;

    let percent_complete_in_fiscal_quarter = if selling_days_in_quarter == 0 {
        None
    } else {
        Some(round_to(
            record.fiscal_work_day_number_in_quarter as f64 / selling_days_in_quarter as f64
                * 100.0,
            1,
        ))
    };

    EnrichedDateRecord {
        date: record.date,
        fiscal_year: record.fiscal_year,
        fiscal_quarter: record.fiscal_quarter,
        fiscal_week_in_quarter: record.fiscal_week_in_quarter,
        fiscal_work_day_number_in_quarter: record.fiscal_work_day_number_in_quarter,
        first_day_of_fiscal_quarter: record.first_day_of_fiscal_quarter,
        first_day_of_previous_fiscal_quarter: record.first_day_of_previous_fiscal_quarter,
        same_calendar_day_last_year: record.same_calendar_day_last_year,
        selling_days_in_quarter,
        selling_days_left,
        percent_complete_in_fiscal_quarter,
        is_selling_day: is_selling_day(record.date),
        prior_quarter_date_with_same_selling_days_left: None,
    }
}

/// Checks the base dimension invariants and returns a description of each violation.
///
/// Violations are data-quality signals, not errors: enrichment still runs and
/// carries whatever values are present.
pub fn validate_date_dimension(records: &[DateRecord]) -> Vec<String> {
    let mut warnings = Vec::new();
    let mut seen = HashSet::new();
    let mut last_in_quarter: BTreeMap<NaiveDate, (NaiveDate, u32)> = BTreeMap::new();

    let mut ordered: Vec<&DateRecord> = records.iter().collect();
    ordered.sort_by_key(|r| r.date);

    for record in ordered {
        if !seen.insert(record.date) {
            warnings.push(format!("{} appears more than once", record.date));
            continue;
        }

        if record.date == record.first_day_of_fiscal_quarter
            && record.fiscal_work_day_number_in_quarter != 1
        {
            warnings.push(format!(
                "{} starts a fiscal quarter but has work day number {}",
                record.date, record.fiscal_work_day_number_in_quarter
            ));
        }

        if record.date < record.first_day_of_fiscal_quarter {
            warnings.push(format!(
                "{} precedes its own quarter start {}",
                record.date, record.first_day_of_fiscal_quarter
            ));
        }

        if let Some((previous_date, previous_number)) =
            last_in_quarter.get(&record.first_day_of_fiscal_quarter)
        {
            if record.fiscal_work_day_number_in_quarter < *previous_number {
                warnings.push(format!(
                    "work day number drops from {} on {} to {} on {}",
                    previous_number,
                    previous_date,
                    record.fiscal_work_day_number_in_quarter,
                    record.date
                ));
            }
        }

        last_in_quarter.insert(
            record.first_day_of_fiscal_quarter,
            (record.date, record.fiscal_work_day_number_in_quarter),
        );
    }

    warnings
}

/// Generates a base date dimension covering `[start, end]` inclusive.
///
/// Fiscal quarters are three-month blocks starting the month after
/// `fiscal_year_end_month`. The first day of a quarter is always work day 1,
/// and weekend days carry the number of the preceding weekday.
pub fn build_date_dimension(
    start: NaiveDate,
    end: NaiveDate,
    fiscal_year_end_month: u32,
) -> Result<Vec<DateRecord>> {
    validate_fiscal_year_end_month(fiscal_year_end_month)?;

    if end < start {
        return Err(PacingError::DateError(format!(
            "End date {} is before start date {}",
            end, start
        )));
    }

    let mut records = Vec::with_capacity(((end - start).num_days() + 1) as usize);
    let mut current = start;

    loop {
        let quarter_start = fiscal_quarter_start(current, fiscal_year_end_month)?;
        let days_into_quarter = (current - quarter_start).num_days() as u32;

        records.push(DateRecord {
            date: current,
            fiscal_year: fiscal_year_for_date(current, fiscal_year_end_month),
            fiscal_quarter: fiscal_quarter_for_date(current, fiscal_year_end_month),
            fiscal_week_in_quarter: days_into_quarter / 7 + 1,
            fiscal_work_day_number_in_quarter: count_selling_days(quarter_start, current).max(1),
            first_day_of_fiscal_quarter: quarter_start,
            first_day_of_previous_fiscal_quarter: previous_fiscal_quarter_start(quarter_start)?,
            same_calendar_day_last_year: same_calendar_day_last_year(current)?,
        });

        if current == end {
            break;
        }
        current = current.succ_opt().ok_or_else(|| {
            PacingError::DateError(format!("Date overflow after {}", current))
        })?;
    }

    debug!(
        "Built date dimension with {} days from {} to {}",
        records.len(),
        start,
        end
    );

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Weekday};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn record(date: NaiveDate, quarter_start: NaiveDate, work_day: u32) -> DateRecord {
        DateRecord {
            date,
            fiscal_year: quarter_start.year(),
            fiscal_quarter: 1,
            fiscal_week_in_quarter: 1,
            fiscal_work_day_number_in_quarter: work_day,
            first_day_of_fiscal_quarter: quarter_start,
            first_day_of_previous_fiscal_quarter: previous_fiscal_quarter_start(quarter_start)
                .unwrap(),
            same_calendar_day_last_year: same_calendar_day_last_year(date).unwrap(),
        }
    }

    #[test]
    fn test_sixty_day_quarter_pacing() {
        let quarter_start = d(2024, 1, 1);
        let records: Vec<DateRecord> = (0..60u32)
            .map(|i| {
                record(
                    quarter_start + chrono::Days::new(i as u64),
                    quarter_start,
                    i + 1,
                )
            })
            .collect();

        let enriched = enrich_date_dimension(&records).unwrap();
        let day_15 = enriched
            .iter()
            .find(|r| r.fiscal_work_day_number_in_quarter == 15)
            .unwrap();

        assert_eq!(day_15.selling_days_in_quarter, 60);
        assert_eq!(day_15.selling_days_left, 45);
        assert_eq!(day_15.percent_complete_in_fiscal_quarter, Some(25.0));
    }

    #[test]
    fn test_prior_quarter_match_picks_earliest_date() {
        let previous_start = d(2023, 10, 1);
        let current_start = d(2024, 1, 1);

        // Previous quarter: three selling days, with day 2 spanning two dates.
        let records = vec![
            record(d(2023, 10, 2), previous_start, 1),
            record(d(2023, 10, 3), previous_start, 2),
            record(d(2023, 10, 4), previous_start, 2),
            record(d(2023, 10, 5), previous_start, 3),
            record(d(2024, 1, 2), current_start, 1),
            record(d(2024, 1, 3), current_start, 2),
            record(d(2024, 1, 4), current_start, 3),
        ];

        let enriched = enrich_date_dimension(&records).unwrap();
        let by_date: BTreeMap<NaiveDate, &EnrichedDateRecord> =
            enriched.iter().map(|r| (r.date, r)).collect();

        // Current day 2 has one day left; previous quarter has two dates with one left.
        assert_eq!(
            by_date[&d(2024, 1, 3)].prior_quarter_date_with_same_selling_days_left,
            Some(d(2023, 10, 3))
        );
        assert_eq!(
            by_date[&d(2024, 1, 2)].prior_quarter_date_with_same_selling_days_left,
            Some(d(2023, 10, 2))
        );
        assert_eq!(
            by_date[&d(2024, 1, 4)].prior_quarter_date_with_same_selling_days_left,
            Some(d(2023, 10, 5))
        );

        // Nothing loaded before the previous quarter: left-outer miss.
        assert_eq!(
            by_date[&d(2023, 10, 2)].prior_quarter_date_with_same_selling_days_left,
            None
        );
    }

    #[test]
    fn test_no_match_keeps_row() {
        let records = vec![
            record(d(2023, 10, 2), d(2023, 10, 1), 1),
            record(d(2024, 1, 2), d(2024, 1, 1), 1),
            record(d(2024, 1, 3), d(2024, 1, 1), 2),
            record(d(2024, 1, 4), d(2024, 1, 1), 3),
        ];

        let enriched = enrich_date_dimension(&records).unwrap();
        assert_eq!(enriched.len(), 4);

        // Two days left in the current quarter never occurs in the previous one.
        let first = enriched.iter().find(|r| r.date == d(2024, 1, 2)).unwrap();
        assert_eq!(first.selling_days_left, 2);
        assert_eq!(first.prior_quarter_date_with_same_selling_days_left, None);
    }

    #[test]
    fn test_zero_selling_days_yields_no_percentage() {
        let records = vec![record(d(2024, 1, 6), d(2024, 1, 1), 0)];
        let enriched = enrich_date_dimension(&records).unwrap();
        assert_eq!(enriched[0].selling_days_in_quarter, 0);
        assert_eq!(enriched[0].percent_complete_in_fiscal_quarter, None);
    }

    #[test]
    fn test_duplicate_dates_fail() {
        let records = vec![
            record(d(2024, 1, 2), d(2024, 1, 1), 1),
            record(d(2024, 1, 2), d(2024, 1, 1), 1),
        ];
        assert!(matches!(
            enrich_date_dimension(&records),
            Err(PacingError::DuplicateDate(_))
        ));
    }

    #[test]
    fn test_validate_reports_decreasing_work_days() {
        let records = vec![
            record(d(2024, 1, 1), d(2024, 1, 1), 1),
            record(d(2024, 1, 2), d(2024, 1, 1), 3),
            record(d(2024, 1, 3), d(2024, 1, 1), 2),
        ];
        let warnings = validate_date_dimension(&records);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("drops from 3"));
    }

    #[test]
    fn test_build_date_dimension_calendar_quarters() {
        let records = build_date_dimension(d(2024, 1, 1), d(2024, 6, 30), 12).unwrap();
        assert_eq!(records.len(), 182);

        let q1_end = records.iter().find(|r| r.date == d(2024, 3, 31)).unwrap();
        assert_eq!(q1_end.fiscal_quarter, 1);
        assert_eq!(q1_end.fiscal_work_day_number_in_quarter, 65);
        assert_eq!(q1_end.fiscal_week_in_quarter, 13);

        let q2_start = records.iter().find(|r| r.date == d(2024, 4, 1)).unwrap();
        assert_eq!(q2_start.fiscal_quarter, 2);
        assert_eq!(q2_start.fiscal_work_day_number_in_quarter, 1);
        assert_eq!(q2_start.first_day_of_previous_fiscal_quarter, d(2024, 1, 1));
        assert!(validate_date_dimension(&records).is_empty());
    }

    #[test]
    fn test_build_date_dimension_weekend_quarter_start() {
        // FY ending June: Q2 starts 2023-10-01, a Sunday.
        let records = build_date_dimension(d(2023, 10, 1), d(2023, 10, 3), 6).unwrap();
        assert_eq!(records[0].date.weekday(), Weekday::Sun);
        assert_eq!(records[0].fiscal_year, 2024);
        assert_eq!(records[0].fiscal_quarter, 2);
        assert_eq!(records[0].fiscal_work_day_number_in_quarter, 1);
        assert_eq!(records[1].fiscal_work_day_number_in_quarter, 1);
        assert_eq!(records[2].fiscal_work_day_number_in_quarter, 2);
    }

    #[test]
    fn test_build_date_dimension_rejects_bad_input() {
        assert!(build_date_dimension(d(2024, 1, 2), d(2024, 1, 1), 12).is_err());
        assert!(matches!(
            build_date_dimension(d(2024, 1, 1), d(2024, 1, 2), 0),
            Err(PacingError::InvalidFiscalYearEndMonth(0))
        ));
    }

    #[test]
    fn test_selling_day_flag() {
        let records = build_date_dimension(d(2024, 1, 1), d(2024, 1, 14), 12).unwrap();
        let enriched = enrich_date_dimension(&records).unwrap();
        let selling: Vec<bool> = enriched.iter().map(|r| r.is_selling_day).collect();
        assert_eq!(
            selling,
            vec![
                true, true, true, true, true, false, false, true, true, true, true, true, false,
                false
            ]
        );
    }
}

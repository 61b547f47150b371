use crate::error::{PacingError, Result};
use crate::schema::{
    CategoryBucket, CumulativeQtdSplit, DailyCategoryCount, OrderRecord, SplitConfig,
};
use crate::utils::round_to;
use chrono::NaiveDate;
use log::{debug, warn};
use std::collections::{BTreeMap, HashMap};

impl SplitConfig {
    pub fn validate(&self) -> Result<()> {
        if self.category_codes.is_empty() {
            return Err(PacingError::InvalidConfig(
                "At least one category code is required".to_string(),
            ));
        }

        if self.channel.trim().is_empty() {
            return Err(PacingError::InvalidConfig(
                "Channel must not be empty".to_string(),
            ));
        }

        let upgrade = self.upgrade_code.trim();
        if !self.category_codes.iter().any(|c| c.trim() == upgrade) {
            return Err(PacingError::InvalidConfig(format!(
                "Upgrade code '{}' is not one of the recognized category codes",
                self.upgrade_code
            )));
        }

        Ok(())
    }

    pub fn classify(&self, record: &OrderRecord) -> Option<CategoryBucket> {
        if record.channel.trim() != self.channel.trim() {
            return None;
        }

        let code = record.category_code.trim();
        if !self.category_codes.iter().any(|c| c.trim() == code) {
            return None;
        }

        if code == self.upgrade_code.trim() {
            Some(CategoryBucket::Prior)
        } else {
            Some(CategoryBucket::New)
        }
    }
}

pub fn classify(record: &OrderRecord, config: &SplitConfig) -> Option<CategoryBucket> {
    config.classify(record)
}

// Field order gives the date-first sort the running sums rely on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct DayKey {
    pipeline_date: NaiveDate,
    fiscal_week: u32,
    fiscal_month: u32,
    fiscal_quarter: u32,
    fiscal_year: i32,
}

/// Sums the two buckets per day and period labels. Rows outside the channel or
/// the recognized codes are dropped, so a day with no recognized rows produces
/// no output row.
pub fn daily_category_counts(
    records: &[OrderRecord],
    config: &SplitConfig,
) -> Result<Vec<DailyCategoryCount>> {
    config.validate()?;

    let mut grid: BTreeMap<DayKey, (u64, u64)> = BTreeMap::new();
    let mut excluded = 0usize;

    for record in records {
        let bucket = match config.classify(record) {
            Some(bucket) => bucket,
            None => {
                excluded += 1;
                continue;
            }
        };

        let key = DayKey {
            pipeline_date: record.pipeline_date,
            fiscal_week: record.fiscal_week,
            fiscal_month: record.fiscal_month,
            fiscal_quarter: record.fiscal_quarter,
            fiscal_year: record.fiscal_year,
        };

        let slot = grid.entry(key).or_insert((0, 0));
        let counter = match bucket {
            CategoryBucket::New => &mut slot.0,
            CategoryBucket::Prior => &mut slot.1,
        };
        *counter = add_counts(*counter, record.count, record.pipeline_date)?;
    }

    debug!(
        "Counted {} order rows into {} days ({} excluded by channel or category)",
        records.len() - excluded,
        grid.len(),
        excluded
    );

    grid.into_iter()
        .map(|(key, (new_count, prior_count))| {
            Ok(DailyCategoryCount {
                pipeline_date: key.pipeline_date,
                fiscal_week: key.fiscal_week,
                fiscal_month: key.fiscal_month,
                fiscal_quarter: key.fiscal_quarter,
                fiscal_year: key.fiscal_year,
                new_product_count: new_count,
                prior_product_count: prior_count,
                total_count: add_counts(new_count, prior_count, key.pipeline_date)?,
            })
        })
        .collect()
}

fn add_counts(left: u64, right: u64, date: NaiveDate) -> Result<u64> {
    left.checked_add(right).ok_or(PacingError::CountOverflow(date))
}

/// Collapses rows sharing a pipeline date into one. Period labels come from
/// the lowest-sorting row of that date.
fn collapse_by_date(daily: &[DailyCategoryCount]) -> Result<Vec<DailyCategoryCount>> {
    let mut ordered: Vec<&DailyCategoryCount> = daily.iter().collect();
    ordered.sort_by_key(|d| {
        (
            d.pipeline_date,
            d.fiscal_week,
            d.fiscal_month,
            d.fiscal_quarter,
            d.fiscal_year,
        )
    });

    let mut collapsed: Vec<DailyCategoryCount> = Vec::with_capacity(ordered.len());
    let mut merged = 0usize;

    for day in ordered {
        match collapsed.last_mut() {
            Some(last) if last.pipeline_date == day.pipeline_date => {
                let date = day.pipeline_date;
                last.new_product_count =
                    add_counts(last.new_product_count, day.new_product_count, date)?;
                last.prior_product_count =
                    add_counts(last.prior_product_count, day.prior_product_count, date)?;
                last.total_count = add_counts(last.total_count, day.total_count, date)?;
                merged += 1;
            }
            _ => collapsed.push(day.clone()),
        }
    }

    if merged > 0 {
        warn!(
            "{} daily rows carried conflicting period labels and were merged into their date",
            merged
        );
    }

    Ok(collapsed)
}

/// Running sums per (fiscal year, fiscal quarter), ordered by date, converted
/// into a percentage split rounded to two decimals. Produces one row per
/// distinct pipeline date.
pub fn cumulative_qtd_split(daily: &[DailyCategoryCount]) -> Result<Vec<CumulativeQtdSplit>> {
    let days = collapse_by_date(daily)?;

    let mut running: HashMap<(i32, u32), (u64, u64)> = HashMap::new();
    let mut result = Vec::with_capacity(days.len());

    for day in days {
        let date = day.pipeline_date;
        let totals = running
            .entry((day.fiscal_year, day.fiscal_quarter))
            .or_insert((0, 0));
        totals.0 = add_counts(totals.0, day.new_product_count, date)?;
        totals.1 = add_counts(totals.1, day.prior_product_count, date)?;
        let (new_running, prior_running) = *totals;

        let (percent_new, percent_prior) = percent_split(new_running, prior_running);

        result.push(CumulativeQtdSplit {
            pipeline_date: day.pipeline_date,
            fiscal_week: day.fiscal_week,
            fiscal_month: day.fiscal_month,
            fiscal_quarter: day.fiscal_quarter,
            fiscal_year: day.fiscal_year,
            new_product_count: day.new_product_count,
            prior_product_count: day.prior_product_count,
            total_count: day.total_count,
            qtd_new_product_cumulative: new_running,
            qtd_prior_product_cumulative: prior_running,
            percent_new_product_qtd: percent_new,
            percent_prior_product_qtd: percent_prior,
        });
    }

    Ok(result)
}

fn percent_split(new_count: u64, prior_count: u64) -> (Option<f64>, Option<f64>) {
    if new_count == 0 && prior_count == 0 {
        return (None, None);
    }

    let total = new_count as f64 + prior_count as f64;
    (
        Some(round_to(new_count as f64 / total * 100.0, 2)),
        Some(round_to(prior_count as f64 / total * 100.0, 2)),
    )
}

pub fn compute_qtd_split(
    records: &[OrderRecord],
    config: &SplitConfig,
) -> Result<Vec<CumulativeQtdSplit>> {
    let daily = daily_category_counts(records, config)?;
    cumulative_qtd_split(&daily)
}

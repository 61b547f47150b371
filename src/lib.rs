//! # QTD Pacing
//!
//! Batch computations behind a quarter-to-date sales pacing report.
//!
//! ## Core Concepts
//!
//! - **Selling Day**: A weekday counted toward quarter pacing (holidays are not excluded)
//! - **Fiscal Calendar Enrichment**: Selling days left, percent complete, and the date in the
//!   previous fiscal quarter with the same number of selling days left
//! - **QTD Split**: Running per-quarter counts of "new product" and "prior product" orders,
//!   expressed as a percentage split used to allocate blended revenue or backorder figures
//!
//! Both computations are full recomputes over a materialized snapshot; outputs are written by
//! whole-table replacement.
//!
//! ## Example
//!
//! ```rust,ignore
//! use qtd_pacing::*;
//! use chrono::NaiveDate;
//!
//! let dates = build_date_dimension(
//!     NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
//!     NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
//!     12,
//! )?;
//!
//! let inputs = PacingInputs {
//!     date_dimension: dates,
//!     orders: vec![],
//!     split_config: SplitConfig::default(),
//! };
//!
//! let outputs = process_pacing(&inputs)?;
//! ```

pub mod calendar;
pub mod error;
pub mod qtd_split;
pub mod schema;
pub mod table;
pub mod utils;

pub use calendar::{
    build_date_dimension, enrich_date_dimension, selling_days_by_quarter,
    validate_date_dimension, CalendarEnricher,
};
pub use error::{PacingError, Result};
pub use qtd_split::{classify, compute_qtd_split, cumulative_qtd_split, daily_category_counts};
pub use schema::*;
pub use table::{load_table, replace_table, TableFormat};
pub use utils::*;

use log::{debug, info};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Everything a pacing run reads.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PacingInputs {
    #[schemars(description = "Base fiscal date dimension, one row per calendar date")]
    pub date_dimension: Vec<DateRecord>,

    #[schemars(description = "Raw order-processing rows")]
    pub orders: Vec<OrderRecord>,

    #[serde(default)]
    #[schemars(description = "Category and channel filter for the QTD split")]
    pub split_config: SplitConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacingOutputs {
    pub enriched_dates: Vec<EnrichedDateRecord>,
    pub daily_counts: Vec<DailyCategoryCount>,
    pub qtd_split: Vec<CumulativeQtdSplit>,
}

impl PacingOutputs {
    pub const ENRICHED_DATES_TABLE: &'static str = "enriched_dates";
    pub const DAILY_COUNTS_TABLE: &'static str = "daily_category_counts";
    pub const QTD_SPLIT_TABLE: &'static str = "qtd_split";

    /// Replaces each output table under `dir`. A table is either fully
    /// replaced or left as it was.
    pub fn write_to_dir(&self, dir: &Path, format: TableFormat) -> Result<()> {
        let table_path = |name: &str| dir.join(format!("{}.{}", name, format.extension()));

        replace_table(
            &table_path(Self::ENRICHED_DATES_TABLE),
            &self.enriched_dates,
            format,
        )?;
        replace_table(
            &table_path(Self::DAILY_COUNTS_TABLE),
            &self.daily_counts,
            format,
        )?;
        replace_table(&table_path(Self::QTD_SPLIT_TABLE), &self.qtd_split, format)?;

        info!("Wrote pacing tables to {}", dir.display());
        Ok(())
    }
}

pub struct PacingProcessor;

impl PacingProcessor {
    pub fn run(inputs: &PacingInputs) -> Result<PacingOutputs> {
        inputs.split_config.validate()?;

        info!(
            "Running pacing batch over {} dates and {} order rows",
            inputs.date_dimension.len(),
            inputs.orders.len()
        );
        debug!(
            "Split config: channel {}, upgrade code {}, {} recognized codes",
            inputs.split_config.channel,
            inputs.split_config.upgrade_code,
            inputs.split_config.category_codes.len()
        );

        let enriched_dates = enrich_date_dimension(&inputs.date_dimension)?;
        let daily_counts = daily_category_counts(&inputs.orders, &inputs.split_config)?;
        let qtd_split = cumulative_qtd_split(&daily_counts)?;

        info!(
            "Produced {} enriched dates, {} daily counts, {} QTD split rows",
            enriched_dates.len(),
            daily_counts.len(),
            qtd_split.len()
        );

        Ok(PacingOutputs {
            enriched_dates,
            daily_counts,
            qtd_split,
        })
    }

    pub fn run_from_json(json: &str) -> Result<PacingOutputs> {
        let inputs: PacingInputs = serde_json::from_str(json)?;
        Self::run(&inputs)
    }
}

pub fn process_pacing(inputs: &PacingInputs) -> Result<PacingOutputs> {
    PacingProcessor::run(inputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_end_to_end_processing() {
        let date_dimension = build_date_dimension(
            NaiveDate::from_ymd_opt(2023, 10, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
            12,
        )
        .unwrap();

        let orders = vec![OrderRecord {
            pipeline_date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            fiscal_week: 1,
            fiscal_month: 1,
            fiscal_quarter: 1,
            fiscal_year: 2024,
            category_code: "NEW".to_string(),
            channel: "DTC".to_string(),
            count: 2,
            amount: Some(1500.0),
        }];

        let outputs = process_pacing(&PacingInputs {
            date_dimension,
            orders,
            split_config: SplitConfig::default(),
        })
        .unwrap();

        assert_eq!(outputs.enriched_dates.len(), 183);
        assert_eq!(outputs.daily_counts.len(), 1);
        assert_eq!(outputs.qtd_split[0].percent_new_product_qtd, Some(100.0));

        let jan_2 = outputs
            .enriched_dates
            .iter()
            .find(|r| r.date == NaiveDate::from_ymd_opt(2024, 1, 2).unwrap())
            .unwrap();
        assert_eq!(jan_2.selling_days_in_quarter, 65);
        assert_eq!(jan_2.selling_days_left, 63);
        assert!(jan_2.prior_quarter_date_with_same_selling_days_left.is_some());
    }

    #[test]
    fn test_invalid_config_fails_batch() {
        let inputs = PacingInputs {
            date_dimension: vec![],
            orders: vec![],
            split_config: SplitConfig {
                upgrade_code: "NOPE".to_string(),
                ..SplitConfig::default()
            },
        };
        assert!(matches!(
            PacingProcessor::run(&inputs),
            Err(PacingError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_run_from_json_uses_default_config() {
        let json = r#"{ "date_dimension": [], "orders": [] }"#;
        let outputs = PacingProcessor::run_from_json(json).unwrap();
        assert!(outputs.enriched_dates.is_empty());
        assert!(outputs.qtd_split.is_empty());
    }
}

use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One row of the base fiscal date dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DateRecord {
    #[schemars(description = "Calendar date (YYYY-MM-DD). Exactly one record per date.")]
    pub date: NaiveDate,

    #[schemars(description = "Fiscal year label, e.g. 2024 for the fiscal year ending in 2024")]
    pub fiscal_year: i32,

    #[schemars(description = "Fiscal quarter within the fiscal year (1-4)")]
    pub fiscal_quarter: u32,

    #[schemars(description = "1-based week number within the fiscal quarter")]
    pub fiscal_week_in_quarter: u32,

    #[schemars(
        description = "1-based count of selling days elapsed in the fiscal quarter. Non-decreasing within a quarter, resets at each quarter boundary."
    )]
    pub fiscal_work_day_number_in_quarter: u32,

    #[schemars(description = "First calendar day of the fiscal quarter containing this date")]
    pub first_day_of_fiscal_quarter: NaiveDate,

    #[schemars(description = "First calendar day of the immediately preceding fiscal quarter")]
    pub first_day_of_previous_fiscal_quarter: NaiveDate,

    #[schemars(description = "The same month and day one year earlier")]
    pub same_calendar_day_last_year: NaiveDate,
}

/// A date dimension row with selling-day pacing attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EnrichedDateRecord {
    pub date: NaiveDate,
    pub fiscal_year: i32,
    pub fiscal_quarter: u32,
    pub fiscal_week_in_quarter: u32,
    pub fiscal_work_day_number_in_quarter: u32,
    pub first_day_of_fiscal_quarter: NaiveDate,
    pub first_day_of_previous_fiscal_quarter: NaiveDate,
    pub same_calendar_day_last_year: NaiveDate,

    /// Highest work-day number loaded for the quarter. For an in-progress quarter
    /// this is the number of selling days loaded so far.
    pub selling_days_in_quarter: u32,
    /// Signed: a negative value flags out-of-order data and is not an error.
    pub selling_days_left: i64,
    /// `None` when the quarter has no selling days.
    pub percent_complete_in_fiscal_quarter: Option<f64>,
    pub is_selling_day: bool,
    /// Earliest date in the previous fiscal quarter with the same `selling_days_left`.
    pub prior_quarter_date_with_same_selling_days_left: Option<NaiveDate>,
}

impl EnrichedDateRecord {
    pub fn base(&self) -> DateRecord {
        DateRecord {
            date: self.date,
            fiscal_year: self.fiscal_year,
            fiscal_quarter: self.fiscal_quarter,
            fiscal_week_in_quarter: self.fiscal_week_in_quarter,
            fiscal_work_day_number_in_quarter: self.fiscal_work_day_number_in_quarter,
            first_day_of_fiscal_quarter: self.first_day_of_fiscal_quarter,
            first_day_of_previous_fiscal_quarter: self.first_day_of_previous_fiscal_quarter,
            same_calendar_day_last_year: self.same_calendar_day_last_year,
        }
    }
}

fn default_count() -> u64 {
    1
}

/// A raw order-processing fact row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct OrderRecord {
    #[schemars(description = "Snapshot date the record was processed in the order pipeline")]
    pub pipeline_date: NaiveDate,

    pub fiscal_week: u32,
    pub fiscal_month: u32,
    pub fiscal_quarter: u32,
    pub fiscal_year: i32,

    #[schemars(description = "Commission-class code used to bucket the order")]
    pub category_code: String,

    #[schemars(description = "Sales channel label, e.g. DTC")]
    pub channel: String,

    #[serde(default = "default_count")]
    #[schemars(description = "Number of orders this row represents. Defaults to 1.")]
    pub count: u64,

    #[serde(default)]
    #[schemars(description = "Optional monetary amount (revenue or backorder value)")]
    pub amount: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum CategoryBucket {
    #[schemars(description = "Any recognized category code other than the upgrade code")]
    New,

    #[schemars(description = "The upgrade code (prior / last-year product)")]
    Prior,
}

/// Per-day bucket totals for the recognized channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DailyCategoryCount {
    pub pipeline_date: NaiveDate,
    pub fiscal_week: u32,
    pub fiscal_month: u32,
    pub fiscal_quarter: u32,
    pub fiscal_year: i32,
    pub new_product_count: u64,
    pub prior_product_count: u64,
    pub total_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CumulativeQtdSplit {
    pub pipeline_date: NaiveDate,
    pub fiscal_week: u32,
    pub fiscal_month: u32,
    pub fiscal_quarter: u32,
    pub fiscal_year: i32,
    pub new_product_count: u64,
    pub prior_product_count: u64,
    pub total_count: u64,
    pub qtd_new_product_cumulative: u64,
    pub qtd_prior_product_cumulative: u64,
    /// `None` when both cumulative sums are zero.
    pub percent_new_product_qtd: Option<f64>,
    pub percent_prior_product_qtd: Option<f64>,
}

impl CumulativeQtdSplit {
    pub fn qtd_total(&self) -> u64 {
        self.qtd_new_product_cumulative.saturating_add(self.qtd_prior_product_cumulative)
    }

    /// Splits a blended amount into `(new, prior)` shares by the unrounded
    /// quarter-to-date ratio. `None` when no orders have been counted yet.
    pub fn allocate(&self, amount: f64) -> Option<(f64, f64)> {
        let total = self.qtd_total();
        if total == 0 {
            return None;
        }

        let new_share = amount * self.qtd_new_product_cumulative as f64 / total as f64;
        Some((new_share, amount - new_share))
    }
}

/// Which order rows are counted and how they are bucketed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SplitConfig {
    #[schemars(
        description = "The recognized category codes. Rows with any other code are excluded entirely."
    )]
    pub category_codes: Vec<String>,

    #[schemars(
        description = "The recognized code counted in the prior-product bucket. Must be listed in category_codes."
    )]
    pub upgrade_code: String,

    #[schemars(description = "Only rows for this channel are counted")]
    pub channel: String,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            category_codes: vec![
                "NEW".to_string(),
                "NEW_ACCOUNT".to_string(),
                "ADD_ON".to_string(),
                "REPLACEMENT".to_string(),
                "UPGRADE".to_string(),
            ],
            upgrade_code: "UPGRADE".to_string(),
            channel: "DTC".to_string(),
        }
    }
}

impl SplitConfig {
    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(SplitConfig)
    }

    pub fn schema_as_json() -> Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}

use chrono::NaiveDate;
use qtd_pacing::*;

fn order(date: NaiveDate, code: &str, count: u64) -> OrderRecord {
    OrderRecord {
        pipeline_date: date,
        fiscal_week: 1,
        fiscal_month: 1,
        fiscal_quarter: 1,
        fiscal_year: 2024,
        category_code: code.to_string(),
        channel: "DTC".to_string(),
        count,
        amount: None,
    }
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    println!("📅 Fiscal Calendar + QTD Split Demo\n");

    let date_dimension = build_date_dimension(
        NaiveDate::from_ymd_opt(2023, 10, 1).ok_or("bad start date")?,
        NaiveDate::from_ymd_opt(2024, 1, 12).ok_or("bad end date")?,
        12,
    )?;

    let day = |d: u32| NaiveDate::from_ymd_opt(2024, 1, d).ok_or("bad order date");
    let orders = vec![
        order(day(2)?, "NEW", 10),
        order(day(2)?, "UPGRADE", 5),
        order(day(3)?, "ADD_ON", 20),
        order(day(3)?, "UPGRADE", 5),
        order(day(4)?, "UPGRADE", 10),
    ];

    let outputs = process_pacing(&PacingInputs {
        date_dimension,
        orders,
        split_config: SplitConfig::default(),
    })?;

    println!("🗓  Selling-day pacing (current quarter loaded so far):\n");
    for record in outputs
        .enriched_dates
        .iter()
        .filter(|r| r.fiscal_year == 2024 && r.is_selling_day)
    {
        println!(
            "  {}  day {:>2}/{:<2}  left {:>2}  {:>5.1}%  prior-quarter match: {}",
            record.date,
            record.fiscal_work_day_number_in_quarter,
            record.selling_days_in_quarter,
            record.selling_days_left,
            record.percent_complete_in_fiscal_quarter.unwrap_or(0.0),
            record
                .prior_quarter_date_with_same_selling_days_left
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".to_string())
        );
    }

    println!("\n📊 QTD split:\n");
    for row in &outputs.qtd_split {
        println!(
            "  {}  cumulative ({:>3}, {:>3})  new {:>6}  prior {:>6}",
            row.pipeline_date,
            row.qtd_new_product_cumulative,
            row.qtd_prior_product_cumulative,
            row.percent_new_product_qtd
                .map(|p| format!("{:.2}%", p))
                .unwrap_or_else(|| "n/a".to_string()),
            row.percent_prior_product_qtd
                .map(|p| format!("{:.2}%", p))
                .unwrap_or_else(|| "n/a".to_string()),
        );
    }

    if let Some(latest) = outputs.qtd_split.last() {
        if let Some((new_share, prior_share)) = latest.allocate(100_000.0) {
            println!(
                "\n💰 $100,000 blended backorder allocates to ${:.2} new / ${:.2} prior",
                new_share, prior_share
            );
        }
    }

    Ok(())
}

//! Coverage command implementation

use anyhow::Result;
use chrono::{Duration, Local};
use tally_core::db::Database;
use tally_core::{CoverageTester, SettingsThreshold};

use super::{parse_date, truncate};

/// Default lookback when no start date is given
const DEFAULT_LOOKBACK_DAYS: i64 = 90;

pub fn cmd_coverage(
    db: &Database,
    user_id: i64,
    fallback_threshold: i32,
    from: Option<&str>,
    to: Option<&str>,
    json: bool,
) -> Result<()> {
    let to = match to {
        Some(value) => parse_date(value)?,
        None => Local::now().date_naive(),
    };
    let from = match from {
        Some(value) => parse_date(value)?,
        None => to - Duration::days(DEFAULT_LOOKBACK_DAYS),
    };
    if from > to {
        anyhow::bail!("Start date {} is after end date {}", from, to);
    }

    let threshold = SettingsThreshold::new(db, fallback_threshold);
    let report = CoverageTester::new(db, &threshold).test_coverage(user_id, from, to)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!();
    println!("🧪 Coverage {} → {}", from, to);
    println!("   ─────────────────────────────────────────────");

    if report.total == 0 {
        println!("   No uncategorized transactions in this range.");
        return Ok(());
    }

    println!(
        "   Would categorize {} of {} uncategorized transactions ({}%)",
        report.would_be_categorized, report.total, report.coverage_percentage
    );

    if !report.by_category.is_empty() {
        println!();
        println!("   By category:");
        for entry in &report.by_category {
            let name = entry
                .category_name
                .clone()
                .unwrap_or_else(|| format!("#{}", entry.category_id));
            println!(
                "      {:24} {:>5}  ({})",
                truncate(&name, 24),
                entry.count,
                entry.source.as_str()
            );
        }
    }

    if !report.uncovered_reasons.is_empty() {
        println!();
        println!("   Left uncategorized:");
        for (reason, count) in &report.uncovered_reasons {
            println!("      {:24} {:>5}", reason, count);
        }
    }

    Ok(())
}

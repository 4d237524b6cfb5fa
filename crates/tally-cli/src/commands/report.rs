//! Spending report command

use std::path::Path;

use anyhow::Result;
use chrono::Utc;

use tally_core::report::{resolve_period, spending_report};

use super::{open_db, truncate};

pub fn cmd_report(
    db_path: &Path,
    period: &str,
    from: Option<&str>,
    to: Option<&str>,
    unit: Option<i64>,
    limit: Option<usize>,
) -> Result<()> {
    let db = open_db(db_path)?;

    let range = resolve_period(period, from, to, Utc::now().date_naive())?;
    let transactions = db.transactions_in_range(range.from, range.to)?;
    let categories = db.get_categories_flat()?;
    let report = spending_report(&transactions, &categories, range, unit, limit);

    println!();
    println!("💸 Spending {} → {}", range.from, range.to);
    println!(
        "   {:<28} {:>10} {:>5} {:>10} {:>8}",
        "Category", "Spent", "Txns", "Budget", "Used"
    );
    println!("   ────────────────────────────────────────────────────────────────");

    for row in &report.categories {
        let name = match &row.parent_name {
            Some(parent) => format!("{} › {}", parent, row.category_name),
            None => row.category_name.clone(),
        };
        let budget = row
            .monthly_budget
            .map(|b| format!("{:.2}", b))
            .unwrap_or_else(|| "-".to_string());
        let used = row
            .budget_utilization
            .map(|u| format!("{:.0}%", u))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "   {:<28} {:>10.2} {:>5} {:>10} {:>8}",
            truncate(&name, 28),
            row.total_spent,
            row.transaction_count,
            budget,
            used
        );
    }

    println!();
    println!("   Total spent:  {:.2}", report.totals.total_spent);
    if report.totals.total_budget > 0.0 {
        println!("   Total budget: {:.2}", report.totals.total_budget);
        if let Some(utilization) = report.totals.overall_utilization {
            println!("   Utilization:  {:.0}%", utilization);
        }
        println!("   Savings:      {:.2}", report.totals.projected_savings);
        if report.totals.over_budget_count > 0 {
            println!("   ⚠️  {} categories over budget", report.totals.over_budget_count);
        }
    }

    Ok(())
}

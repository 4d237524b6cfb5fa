//! Spending aggregation against category budgets
//!
//! Reports are computed in memory over snapshots of transactions and
//! categories so the aggregation is replayable and testable without a
//! store. Spending is outflows only (negative amounts), grouped by
//! category, with child totals rolled bottom-up into parents and
//! utilization computed against each category's own monthly budget.

use std::collections::{HashMap, HashSet};

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::models::{Category, Transaction};

/// Inclusive calendar-day range for a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.from && date <= self.to
    }
}

/// One category row in a spending report
#[derive(Debug, Clone, Serialize)]
pub struct CategorySpending {
    pub category_id: i64,
    pub category_name: String,
    pub color: Option<String>,
    pub parent_id: Option<i64>,
    /// Display name of the immediate parent, if any
    pub parent_name: Option<String>,
    /// Absolute outflow, including rolled-up descendant spend
    pub total_spent: f64,
    pub transaction_count: i64,
    pub average_transaction: f64,
    /// Share of the period's total outflow, in percent
    pub percent_of_total: f64,
    pub monthly_budget: Option<f64>,
    /// total_spent / monthly_budget * 100; None when no budget is set
    pub budget_utilization: Option<f64>,
}

/// Totals across the whole report
#[derive(Debug, Clone, Default, Serialize)]
pub struct SpendingTotals {
    pub total_spent: f64,
    /// Sum of monthly budgets over reported categories that declare one
    pub total_budget: f64,
    pub overall_utilization: Option<f64>,
    /// Reported categories whose spend exceeds their own budget
    pub over_budget_count: i64,
    /// Budget remaining across the report, clamped at zero
    pub projected_savings: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpendingReport {
    pub range: DateRange,
    pub categories: Vec<CategorySpending>,
    pub totals: SpendingTotals,
}

/// Aggregate category spending for a period.
///
/// Transactions count when they are outflows inside the range with a
/// category assigned, not ignored, and matching the unit filter when one is
/// given. Each child category's rolled total and count sum into its direct
/// parent, cascading so descendant spend reaches the root; child rows stay
/// in the output. A parent with no direct spend but spending children is
/// reported with its rolled totals and its own budget. Zero-spend
/// categories are omitted. `limit` truncates the rows after sorting by
/// total spend descending; the totals always cover the full report.
pub fn spending_report(
    transactions: &[Transaction],
    categories: &[Category],
    range: DateRange,
    unit_filter: Option<i64>,
    limit: Option<usize>,
) -> SpendingReport {
    let by_id: HashMap<i64, &Category> = categories.iter().map(|c| (c.id, c)).collect();

    // Direct spend per category
    let mut direct: HashMap<i64, (f64, i64)> = HashMap::new();
    let mut total_outflow = 0.0;
    for tx in transactions {
        if tx.amount >= 0.0 || tx.ignored || !range.contains(tx.date) {
            continue;
        }
        if let Some(unit_id) = unit_filter {
            if tx.unit_id != Some(unit_id) {
                continue;
            }
        }
        let category_id = match tx.category_id {
            Some(id) if by_id.contains_key(&id) => id,
            _ => continue,
        };
        let entry = direct.entry(category_id).or_insert((0.0, 0));
        entry.0 += tx.amount.abs();
        entry.1 += 1;
        total_outflow += tx.amount.abs();
    }

    // Roll child totals into parents, bottom-up. Cycle-safe: the recursion
    // tracks the ids on the current path and stops if it sees one again.
    let mut children_of: HashMap<i64, Vec<i64>> = HashMap::new();
    for category in categories {
        if let Some(pid) = category.parent_id {
            if by_id.contains_key(&pid) && pid != category.id {
                children_of.entry(pid).or_default().push(category.id);
            }
        }
    }

    fn rolled(
        id: i64,
        direct: &HashMap<i64, (f64, i64)>,
        children_of: &HashMap<i64, Vec<i64>>,
        path: &mut HashSet<i64>,
        memo: &mut HashMap<i64, (f64, i64)>,
    ) -> (f64, i64) {
        if let Some(&cached) = memo.get(&id) {
            return cached;
        }
        if !path.insert(id) {
            return (0.0, 0);
        }
        let (mut spent, mut count) = direct.get(&id).copied().unwrap_or((0.0, 0));
        if let Some(kids) = children_of.get(&id) {
            for &kid in kids {
                let (child_spent, child_count) = rolled(kid, direct, children_of, path, memo);
                spent += child_spent;
                count += child_count;
            }
        }
        path.remove(&id);
        memo.insert(id, (spent, count));
        (spent, count)
    }

    let mut memo = HashMap::new();
    let mut rows: Vec<CategorySpending> = Vec::new();
    for category in categories {
        let (total_spent, transaction_count) = rolled(
            category.id,
            &direct,
            &children_of,
            &mut HashSet::new(),
            &mut memo,
        );
        if transaction_count == 0 {
            continue;
        }
        let parent_name = category
            .parent_id
            .and_then(|pid| by_id.get(&pid))
            .map(|p| p.name.clone());
        rows.push(CategorySpending {
            category_id: category.id,
            category_name: category.name.clone(),
            color: category.color.clone(),
            parent_id: category.parent_id,
            parent_name,
            total_spent,
            transaction_count,
            average_transaction: total_spent / transaction_count as f64,
            percent_of_total: if total_outflow > 0.0 {
                total_spent / total_outflow * 100.0
            } else {
                0.0
            },
            monthly_budget: category.monthly_budget,
            budget_utilization: category
                .monthly_budget
                .filter(|b| *b > 0.0)
                .map(|b| total_spent / b * 100.0),
        });
    }

    rows.sort_by(|a, b| {
        b.total_spent
            .partial_cmp(&a.total_spent)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let total_budget: f64 = rows.iter().filter_map(|r| r.monthly_budget).sum();
    let over_budget_count = rows
        .iter()
        .filter(|r| r.monthly_budget.map(|b| r.total_spent > b).unwrap_or(false))
        .count() as i64;
    let totals = SpendingTotals {
        total_spent: total_outflow,
        total_budget,
        overall_utilization: if total_budget > 0.0 {
            Some(total_outflow / total_budget * 100.0)
        } else {
            None
        },
        over_budget_count,
        projected_savings: (total_budget - total_outflow).max(0.0),
    };

    if let Some(limit) = limit {
        rows.truncate(limit);
    }

    SpendingReport {
        range,
        categories: rows,
        totals,
    }
}

/// Translate a named report period into a date range.
///
/// `custom` requires explicit from/to dates; every other name is resolved
/// against `today`.
pub fn resolve_period(
    period: &str,
    custom_from: Option<&str>,
    custom_to: Option<&str>,
    today: NaiveDate,
) -> Result<DateRange> {
    let first_of_month = |year: i32, month: u32| {
        NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| Error::Validation(format!("invalid month: {}-{}", year, month)))
    };
    // First day of the month `n` months before today's month
    let months_back = |n: u32| {
        let total = today.year() * 12 + today.month() as i32 - 1 - n as i32;
        first_of_month(total.div_euclid(12), (total.rem_euclid(12) + 1) as u32)
    };

    match period.to_lowercase().as_str() {
        "current_month" => Ok(DateRange {
            from: first_of_month(today.year(), today.month())?,
            to: today,
        }),
        "last_month" => {
            let from = months_back(1)?;
            let to = first_of_month(today.year(), today.month())?
                .pred_opt()
                .ok_or_else(|| Error::Validation("date out of range".into()))?;
            Ok(DateRange { from, to })
        }
        "last_3_months" => Ok(DateRange {
            from: months_back(2)?,
            to: today,
        }),
        "last_6_months" => Ok(DateRange {
            from: months_back(5)?,
            to: today,
        }),
        "year_to_date" => Ok(DateRange {
            from: first_of_month(today.year(), 1)?,
            to: today,
        }),
        "custom" => {
            let parse = |label: &str, value: Option<&str>| {
                value
                    .ok_or_else(|| {
                        Error::Validation(format!("custom period requires {}", label))
                    })
                    .and_then(|s| {
                        NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| {
                            Error::Validation(format!("invalid {} date (use YYYY-MM-DD)", label))
                        })
                    })
            };
            Ok(DateRange {
                from: parse("dateFrom", custom_from)?,
                to: parse("dateTo", custom_to)?,
            })
        }
        other => Err(Error::Validation(format!(
            "Unknown period: {}. Available: current_month, last_month, last_3_months, \
             last_6_months, year_to_date, custom",
            other
        ))),
    }
}

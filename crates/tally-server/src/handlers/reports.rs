//! Spending report handlers

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;

use crate::{AppError, AppState};
use tally_core::report::{resolve_period, spending_report, DateRange, SpendingReport};

/// Query parameters for the spending report
#[derive(Debug, Deserialize)]
pub struct SpendingQuery {
    /// Period preset; custom requires dateFrom/dateTo
    pub period: Option<String>,
    #[serde(alias = "dateFrom")]
    pub from: Option<String>,
    #[serde(alias = "dateTo")]
    pub to: Option<String>,
    pub unit_id: Option<i64>,
    /// Cap on returned categories, applied after sorting by spend
    pub limit: Option<usize>,
}

/// Resolve optional period/from/to query params into a date range.
/// Bare from/to without a period name are treated as a custom range.
pub fn parse_range_params(
    period: Option<&str>,
    from: Option<&str>,
    to: Option<&str>,
) -> Result<Option<DateRange>, AppError> {
    let period = match period {
        Some(p) => p,
        None if from.is_some() || to.is_some() => "custom",
        None => return Ok(None),
    };
    let today = Utc::now().date_naive();
    Ok(Some(resolve_period(period, from, to, today)?))
}

/// GET /api/reports/spending - Category spending with budget rollup
pub async fn report_spending(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SpendingQuery>,
) -> Result<Json<SpendingReport>, AppError> {
    let period = params.period.as_deref().unwrap_or("current_month");
    let range = resolve_period(
        period,
        params.from.as_deref(),
        params.to.as_deref(),
        Utc::now().date_naive(),
    )?;

    let transactions = state.db.transactions_in_range(range.from, range.to)?;
    let categories = state.db.get_categories_flat()?;

    let report = spending_report(
        &transactions,
        &categories,
        range,
        params.unit_id,
        params.limit,
    );

    Ok(Json(report))
}

//! Classification rule handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;

use crate::{AppError, AppState, SuccessResponse};
use tally_core::models::{ClassificationRule, MatchMode, NewRule, RuleField, RuleKind};

fn parse_kind(kind: &str) -> Result<RuleKind, AppError> {
    kind.parse()
        .map_err(|e: String| AppError::bad_request(&e))
}

/// GET /api/rules/:kind - List rules of one kind in evaluation order
pub async fn list_rules(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
) -> Result<Json<Vec<ClassificationRule>>, AppError> {
    let rules = state.db.list_rules(parse_kind(&kind)?)?;
    Ok(Json(rules))
}

/// POST /api/rules - Create a rule
pub async fn create_rule(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NewRule>,
) -> Result<Json<ClassificationRule>, AppError> {
    if req.pattern.trim().is_empty() {
        return Err(AppError::bad_request("Rule pattern cannot be empty"));
    }

    let id = state.db.create_rule(&req)?;
    let rule = state
        .db
        .get_rule(id)?
        .ok_or_else(|| AppError::internal("Rule vanished after create"))?;
    Ok(Json(rule))
}

#[derive(Debug, Deserialize)]
pub struct UpdateRuleRequest {
    pub field: Option<RuleField>,
    pub mode: Option<MatchMode>,
    pub pattern: Option<String>,
    pub target_id: Option<i64>,
    pub active: Option<bool>,
}

/// PUT /api/rules/:kind/:id - Update a rule
pub async fn update_rule(
    State(state): State<Arc<AppState>>,
    Path((kind, id)): Path<(String, i64)>,
    Json(req): Json<UpdateRuleRequest>,
) -> Result<Json<ClassificationRule>, AppError> {
    parse_kind(&kind)?;
    let rule = state.db.update_rule(
        id,
        req.field,
        req.mode,
        req.pattern.as_deref(),
        req.target_id,
        req.active,
    )?;
    Ok(Json(rule))
}

/// DELETE /api/rules/:kind/:id - Delete a rule
pub async fn delete_rule(
    State(state): State<Arc<AppState>>,
    Path((kind, id)): Path<(String, i64)>,
) -> Result<Json<SuccessResponse>, AppError> {
    parse_kind(&kind)?;
    state.db.delete_rule(id)?;
    Ok(Json(SuccessResponse { success: true }))
}

#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    /// Rule ids from highest to lowest priority
    pub ids: Vec<i64>,
}

/// PUT /api/rules/:kind/reorder - Reassign priorities as a contiguous
/// descending sequence
pub async fn reorder_rules(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
    Json(req): Json<ReorderRequest>,
) -> Result<Json<SuccessResponse>, AppError> {
    if req.ids.is_empty() {
        return Err(AppError::bad_request("No rule ids provided"));
    }

    state.db.reorder_rules(parse_kind(&kind)?, &req.ids)?;
    Ok(Json(SuccessResponse { success: true }))
}

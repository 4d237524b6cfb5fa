//! Unit handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::{AppError, AppState};
use tally_core::models::Unit;

#[derive(Debug, Deserialize)]
pub struct ListUnitsQuery {
    #[serde(default)]
    pub include_inactive: bool,
}

/// GET /api/units - List units
pub async fn list_units(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListUnitsQuery>,
) -> Result<Json<Vec<Unit>>, AppError> {
    let units = state.db.list_units(params.include_inactive)?;
    Ok(Json(units))
}

#[derive(Debug, Deserialize)]
pub struct CreateUnitRequest {
    pub name: String,
    pub color: Option<String>,
}

/// POST /api/units - Create a unit
pub async fn create_unit(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateUnitRequest>,
) -> Result<Json<Unit>, AppError> {
    if req.name.trim().is_empty() {
        return Err(AppError::bad_request("Unit name cannot be empty"));
    }

    let id = state.db.create_unit(req.name.trim(), req.color.as_deref())?;
    let unit = state
        .db
        .get_unit(id)?
        .ok_or_else(|| AppError::internal("Unit vanished after create"))?;
    Ok(Json(unit))
}

#[derive(Debug, Deserialize)]
pub struct UpdateUnitRequest {
    pub name: Option<String>,
    pub color: Option<String>,
    pub active: Option<bool>,
}

/// PUT /api/units/:id - Update a unit's name, color, or active flag
pub async fn update_unit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateUnitRequest>,
) -> Result<Json<Unit>, AppError> {
    let unit = state.db.update_unit(
        id,
        req.name.as_deref(),
        req.color.as_deref().map(Some),
        req.active,
    )?;
    Ok(Json(unit))
}

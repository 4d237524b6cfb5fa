//! Category handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{AppError, AppState, SuccessResponse};
use tally_core::db::CategoryPatch;
use tally_core::hierarchy::build_hierarchy;
use tally_core::models::Category;

#[derive(Debug, Deserialize)]
pub struct ListCategoriesQuery {
    /// Return the grouped forest instead of the flat list
    #[serde(default)]
    pub tree: bool,
}

/// GET /api/categories - List categories, flat or as a forest
pub async fn list_categories(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListCategoriesQuery>,
) -> Result<Json<Value>, AppError> {
    let categories = state.db.get_categories_flat()?;
    if params.tree {
        Ok(Json(json!(build_hierarchy(&categories))))
    } else {
        Ok(Json(json!(categories)))
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub parent_id: Option<i64>,
    pub monthly_budget: Option<f64>,
}

/// POST /api/categories - Create a category
pub async fn create_category(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateCategoryRequest>,
) -> Result<Json<Category>, AppError> {
    if req.name.trim().is_empty() {
        return Err(AppError::bad_request("Category name cannot be empty"));
    }

    let id = state.db.create_category(
        req.name.trim(),
        req.color.as_deref(),
        req.icon.as_deref(),
        req.parent_id,
        req.monthly_budget,
    )?;

    let category = state
        .db
        .get_category(id)?
        .ok_or_else(|| AppError::internal("Category vanished after create"))?;
    Ok(Json(category))
}

/// Deserialize a present-but-possibly-null field into Some(inner).
/// Combined with #[serde(default)], an omitted field stays None while an
/// explicit null becomes Some(None).
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: serde::Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Partial update body. An omitted field is untouched; an explicit null
/// clears a nullable field (budget, parent, color, icon).
#[derive(Debug, Deserialize)]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub color: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub icon: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub parent_id: Option<Option<i64>>,
    #[serde(default, deserialize_with = "double_option")]
    pub monthly_budget: Option<Option<f64>>,
}

/// PUT /api/categories/:id - Update a category
///
/// Parent changes are cycle-guarded: self-parenting and descendant cycles
/// are rejected with 409 and nothing is applied.
pub async fn update_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateCategoryRequest>,
) -> Result<Json<Category>, AppError> {
    let patch = CategoryPatch {
        name: req.name,
        color: req.color,
        icon: req.icon,
        parent_id: req.parent_id,
        monthly_budget: req.monthly_budget,
    };

    let category = state.db.update_category(id, &patch)?;
    Ok(Json(category))
}

/// DELETE /api/categories/:id - Delete a category (refused with children)
pub async fn delete_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.db.delete_category(id)?;
    Ok(Json(SuccessResponse { success: true }))
}

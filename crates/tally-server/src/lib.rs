//! Tally Web Server
//!
//! Axum-based REST API over the Tally core library. Exposes batch import,
//! transaction listing, category/unit/rule management, and spending
//! reports. Input validation clamps pagination and rejects malformed
//! import envelopes before any record is processed; error responses carry
//! sanitized messages while the full error is logged server-side.

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

use tally_core::db::Database;

mod handlers;

/// Maximum pagination limit
pub const MAX_PAGE_LIMIT: i64 = 1000;

/// Shared application state
pub struct AppState {
    pub db: Database,
}

/// Generic success response body
#[derive(serde::Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Application error type with proper HTTP status codes
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn not_found(msg: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn conflict(msg: &str) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn internal(msg: &str) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.to_string(),
            internal: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

impl From<tally_core::Error> for AppError {
    fn from(err: tally_core::Error) -> Self {
        use tally_core::Error;
        match err {
            Error::InvalidEnvelope(_) | Error::Validation(_) => Self {
                status: StatusCode::BAD_REQUEST,
                message: err.to_string(),
                internal: None,
            },
            Error::NotFound(_) => Self {
                status: StatusCode::NOT_FOUND,
                message: err.to_string(),
                internal: None,
            },
            Error::SelfParent | Error::CircularDependency | Error::HasChildren => Self {
                status: StatusCode::CONFLICT,
                message: err.to_string(),
                internal: None,
            },
            // Backend faults: keep the details in the log, not the response
            other => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: "An internal error occurred".to_string(),
                internal: Some(other.into()),
            },
        }
    }
}

/// Build the API router over shared state
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Transactions
        .route("/api/transactions", get(handlers::list_transactions))
        .route("/api/transactions/import", post(handlers::import_transactions))
        .route("/api/transactions/preview", post(handlers::preview_transactions))
        .route(
            "/api/transactions/:id/classify",
            post(handlers::classify_transaction),
        )
        .route("/api/transactions/:id/ignore", post(handlers::ignore_transaction))
        .route(
            "/api/transactions/:id/unignore",
            post(handlers::unignore_transaction),
        )
        .route("/api/classify/backfill", post(handlers::backfill_classifications))
        // Categories
        .route(
            "/api/categories",
            get(handlers::list_categories).post(handlers::create_category),
        )
        .route(
            "/api/categories/:id",
            put(handlers::update_category).delete(handlers::delete_category),
        )
        // Units
        .route(
            "/api/units",
            get(handlers::list_units).post(handlers::create_unit),
        )
        .route("/api/units/:id", put(handlers::update_unit))
        // Rules
        .route("/api/rules", post(handlers::create_rule))
        .route("/api/rules/:kind", get(handlers::list_rules))
        .route("/api/rules/:kind/reorder", put(handlers::reorder_rules))
        .route(
            "/api/rules/:kind/:id",
            put(handlers::update_rule).delete(handlers::delete_rule),
        )
        // Reports
        .route("/api/reports/spending", get(handlers::report_spending))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Run the server until shutdown
pub async fn serve(state: Arc<AppState>, host: &str, port: u16) -> anyhow::Result<()> {
    let router = build_router(state);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "Tally server listening");
    axum::serve(listener, router).await?;
    Ok(())
}

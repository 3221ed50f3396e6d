use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::handlers::AppState;
use crate::tenant::TenantContext;

#[derive(Debug, Deserialize, ToSchema, utoipa::IntoParams)]
pub struct StockQuery {
    /// Narrow to one store; omitted means every store of the tenant
    pub store_id: Option<Uuid>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(current_stock))
        .route("/alerts", get(alerts))
}

/// Current derived stock per (item, store) pair
#[utoipa::path(
    get,
    path = "/api/v1/stock",
    params(StockQuery),
    responses(
        (status = 200, description = "Derived stock levels returned"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "stock"
)]
pub async fn current_stock(
    State(state): State<AppState>,
    ctx: TenantContext,
    Query(query): Query<StockQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let levels = state
        .services
        .movements
        .stock_levels(&ctx, query.store_id)
        .await?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "success": true,
            "data": { "stock": levels, "total": levels.len() }
        })),
    ))
}

/// Threshold alerts, critical first then item name
#[utoipa::path(
    get,
    path = "/api/v1/stock/alerts",
    params(StockQuery),
    responses(
        (status = 200, description = "Stock alerts returned"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "stock"
)]
pub async fn alerts(
    State(state): State<AppState>,
    ctx: TenantContext,
    Query(query): Query<StockQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let alerts = state.services.alerts.alerts(&ctx, query.store_id).await?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "success": true,
            "data": { "alerts": alerts, "total": alerts.len() }
        })),
    ))
}

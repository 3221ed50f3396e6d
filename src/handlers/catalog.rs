use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::errors::ServiceError;
use crate::handlers::AppState;
use crate::services::catalog::{ItemUpdate, NewItem};
use crate::tenant::TenantContext;

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateItemRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1, max = 20))]
    pub unit: String,
    pub category: Option<String>,
    pub cost_price: Decimal,
    pub min_stock_level: Option<Decimal>,
    pub max_stock_level: Option<Decimal>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateItemRequest {
    pub name: Option<String>,
    pub category: Option<String>,
    pub cost_price: Option<Decimal>,
    pub min_stock_level: Option<Decimal>,
    pub max_stock_level: Option<Decimal>,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateStoreRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/items", get(list_items).post(create_item))
        .route("/items/:id", put(update_item))
        .route("/stores", get(list_stores).post(create_store))
}

#[utoipa::path(
    post,
    path = "/api/v1/items",
    request_body = CreateItemRequest,
    responses(
        (status = 201, description = "Item created"),
        (status = 400, description = "Invalid item payload", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "catalog"
)]
pub async fn create_item(
    State(state): State<AppState>,
    ctx: TenantContext,
    Json(payload): Json<CreateItemRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    payload.validate()?;

    let item = state
        .services
        .catalog
        .create_item(
            &ctx,
            NewItem {
                name: payload.name,
                unit: payload.unit,
                category: payload.category,
                cost_price: payload.cost_price,
                min_stock_level: payload.min_stock_level,
                max_stock_level: payload.max_stock_level,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(item)))
}

#[utoipa::path(
    put,
    path = "/api/v1/items/{id}",
    params(("id" = Uuid, Path, description = "Item ID")),
    request_body = UpdateItemRequest,
    responses(
        (status = 200, description = "Item updated"),
        (status = 400, description = "Invalid item payload", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown item", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "catalog"
)]
pub async fn update_item(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateItemRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let item = state
        .services
        .catalog
        .update_item(
            &ctx,
            id,
            ItemUpdate {
                name: payload.name,
                category: payload.category.map(Some),
                cost_price: payload.cost_price,
                min_stock_level: payload.min_stock_level.map(Some),
                max_stock_level: payload.max_stock_level.map(Some),
            },
        )
        .await?;

    Ok((StatusCode::OK, Json(item)))
}

#[utoipa::path(
    get,
    path = "/api/v1/items",
    responses(
        (status = 200, description = "Items returned"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "catalog"
)]
pub async fn list_items(
    State(state): State<AppState>,
    ctx: TenantContext,
) -> Result<impl IntoResponse, ServiceError> {
    let items = state.services.catalog.list_items(&ctx).await?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "success": true,
            "data": { "items": items, "total": items.len() }
        })),
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/stores",
    request_body = CreateStoreRequest,
    responses(
        (status = 201, description = "Store created"),
        (status = 400, description = "Invalid store payload", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "catalog"
)]
pub async fn create_store(
    State(state): State<AppState>,
    ctx: TenantContext,
    Json(payload): Json<CreateStoreRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    payload.validate()?;

    let store = state.services.catalog.create_store(&ctx, payload.name).await?;

    Ok((StatusCode::CREATED, Json(store)))
}

#[utoipa::path(
    get,
    path = "/api/v1/stores",
    responses(
        (status = 200, description = "Stores returned"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "catalog"
)]
pub async fn list_stores(
    State(state): State<AppState>,
    ctx: TenantContext,
) -> Result<impl IntoResponse, ServiceError> {
    let stores = state.services.catalog.list_stores(&ctx).await?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "success": true,
            "data": { "stores": stores, "total": stores.len() }
        })),
    ))
}

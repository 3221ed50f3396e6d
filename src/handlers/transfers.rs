use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::transfer::TransferStatus;
use crate::errors::ServiceError;
use crate::handlers::AppState;
use crate::services::transfers::{NewTransfer, TransferLineInput};
use crate::tenant::TenantContext;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTransferRequest {
    pub from_store_id: Uuid,
    pub to_store_id: Uuid,
    pub notes: Option<String>,
    pub items: Vec<TransferItemRequest>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TransferItemRequest {
    pub item_id: Uuid,
    pub quantity: Decimal,
}

#[derive(Debug, Deserialize, ToSchema, utoipa::IntoParams)]
pub struct TransferListQuery {
    pub status: Option<TransferStatus>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_transfers).post(create_transfer))
        .route("/:id", get(get_transfer).delete(delete_transfer))
        .route("/:id/in-transit", post(mark_in_transit))
        .route("/:id/complete", post(complete_transfer))
        .route("/:id/cancel", post(cancel_transfer))
}

fn details_body(details: crate::services::transfers::TransferDetails) -> serde_json::Value {
    json!({
        "success": true,
        "data": { "transfer": details.transfer, "lines": details.lines }
    })
}

/// Creates a pending transfer with frozen lines
#[utoipa::path(
    post,
    path = "/api/v1/transfers",
    request_body = CreateTransferRequest,
    responses(
        (status = 201, description = "Transfer created"),
        (status = 400, description = "Same-store transfer, empty or non-positive lines", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown store or item", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "transfers"
)]
pub async fn create_transfer(
    State(state): State<AppState>,
    ctx: TenantContext,
    Json(payload): Json<CreateTransferRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let details = state
        .services
        .transfers
        .create(
            &ctx,
            NewTransfer {
                from_store_id: payload.from_store_id,
                to_store_id: payload.to_store_id,
                notes: payload.notes,
                lines: payload
                    .items
                    .into_iter()
                    .map(|item| TransferLineInput {
                        item_id: item.item_id,
                        quantity: item.quantity,
                    })
                    .collect(),
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(details_body(details))))
}

#[utoipa::path(
    get,
    path = "/api/v1/transfers",
    params(TransferListQuery),
    responses(
        (status = 200, description = "Transfers returned"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "transfers"
)]
pub async fn list_transfers(
    State(state): State<AppState>,
    ctx: TenantContext,
    Query(query): Query<TransferListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let transfers = state.services.transfers.list(&ctx, query.status).await?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "success": true,
            "data": { "transfers": transfers, "total": transfers.len() }
        })),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/transfers/{id}",
    params(("id" = Uuid, Path, description = "Transfer ID")),
    responses(
        (status = 200, description = "Transfer returned"),
        (status = 404, description = "Unknown transfer", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "transfers"
)]
pub async fn get_transfer(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let details = state.services.transfers.get(&ctx, id).await?;
    Ok((StatusCode::OK, Json(details_body(details))))
}

/// pending -> in_transit
#[utoipa::path(
    post,
    path = "/api/v1/transfers/{id}/in-transit",
    params(("id" = Uuid, Path, description = "Transfer ID")),
    responses(
        (status = 200, description = "Transfer marked in transit"),
        (status = 400, description = "Transfer is not pending", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown transfer", body = crate::errors::ErrorResponse),
        (status = 409, description = "Concurrent transition lost", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "transfers"
)]
pub async fn mark_in_transit(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let transfer = state.services.transfers.mark_in_transit(&ctx, id).await?;
    Ok((StatusCode::OK, Json(transfer)))
}

/// Receives the stock: paired OUT/IN movements plus the completed status,
/// all-or-nothing
#[utoipa::path(
    post,
    path = "/api/v1/transfers/{id}/complete",
    params(("id" = Uuid, Path, description = "Transfer ID")),
    responses(
        (status = 200, description = "Transfer completed"),
        (status = 400, description = "Transfer is cancelled or already completed", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown transfer", body = crate::errors::ErrorResponse),
        (status = 409, description = "Concurrent transition lost", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "transfers"
)]
pub async fn complete_transfer(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let details = state.services.transfers.complete(&ctx, id).await?;
    Ok((StatusCode::OK, Json(details_body(details))))
}

/// pending -> cancelled
#[utoipa::path(
    post,
    path = "/api/v1/transfers/{id}/cancel",
    params(("id" = Uuid, Path, description = "Transfer ID")),
    responses(
        (status = 200, description = "Transfer cancelled"),
        (status = 400, description = "Transfer is not pending", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown transfer", body = crate::errors::ErrorResponse),
        (status = 409, description = "Concurrent transition lost", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "transfers"
)]
pub async fn cancel_transfer(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let transfer = state.services.transfers.cancel(&ctx, id).await?;
    Ok((StatusCode::OK, Json(transfer)))
}

/// Removes a transfer that never left pending
#[utoipa::path(
    delete,
    path = "/api/v1/transfers/{id}",
    params(("id" = Uuid, Path, description = "Transfer ID")),
    responses(
        (status = 204, description = "Transfer deleted"),
        (status = 400, description = "Transfer has left pending", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown transfer", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "transfers"
)]
pub async fn delete_transfer(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.transfers.delete(&ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

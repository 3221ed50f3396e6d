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

use crate::entities::stock_movement::{MovementType, ReferenceType};
use crate::errors::ServiceError;
use crate::handlers::AppState;
use crate::services::movements::{MovementFilters, MovementReference, NewMovement};
use crate::tenant::TenantContext;

#[derive(Debug, Deserialize, ToSchema)]
pub struct RecordMovementRequest {
    pub item_id: Uuid,
    pub store_id: Uuid,
    /// Signed quantity. Waste is normalized negative regardless of the
    /// caller's sign; every other type must carry the right sign already.
    pub quantity: Decimal,
    pub movement_type: MovementType,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub reference_id: Option<Uuid>,
    pub reference_type: Option<ReferenceType>,
    /// Cost per unit; defaults to the item's current cost price
    pub cost_price: Option<Decimal>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CorrectMovementRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema, utoipa::IntoParams)]
pub struct MovementHistoryQuery {
    pub item_id: Option<Uuid>,
    pub store_id: Option<Uuid>,
    pub movement_type: Option<MovementType>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_movements).post(record_movement))
        .route("/:id/correct", post(correct_movement))
}

/// Appends one movement to the ledger
#[utoipa::path(
    post,
    path = "/api/v1/movements",
    request_body = RecordMovementRequest,
    responses(
        (status = 201, description = "Movement recorded"),
        (status = 400, description = "Invalid quantity or sign", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown item or store", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "movements"
)]
pub async fn record_movement(
    State(state): State<AppState>,
    ctx: TenantContext,
    Json(payload): Json<RecordMovementRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let reference = match (payload.reference_id, payload.reference_type) {
        (Some(id), Some(kind)) => Some(MovementReference { id, kind }),
        (None, None) => None,
        _ => {
            return Err(ServiceError::ValidationError(
                "reference_id and reference_type must be provided together".to_string(),
            ));
        }
    };

    // Waste entry callers send magnitudes; the ledger wants outbound signs
    let quantity = if payload.movement_type == MovementType::Waste {
        -payload.quantity.abs()
    } else {
        payload.quantity
    };

    let movement = state
        .services
        .movements
        .record(
            &ctx,
            NewMovement {
                item_id: payload.item_id,
                store_id: payload.store_id,
                quantity,
                movement_type: payload.movement_type,
                reason: payload.reason,
                notes: payload.notes,
                reference,
                cost_price: payload.cost_price,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(movement)))
}

/// Paginated movement history
#[utoipa::path(
    get,
    path = "/api/v1/movements",
    params(MovementHistoryQuery),
    responses(
        (status = 200, description = "Movement history returned"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "movements"
)]
pub async fn list_movements(
    State(state): State<AppState>,
    ctx: TenantContext,
    Query(query): Query<MovementHistoryQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(50).clamp(1, 500);

    let (movements, total) = state
        .services
        .movements
        .list(
            &ctx,
            MovementFilters {
                item_id: query.item_id,
                store_id: query.store_id,
                movement_type: query.movement_type,
            },
            page,
            limit,
        )
        .await?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "success": true,
            "data": {
                "movements": movements,
                "total": total,
                "page": page,
                "per_page": limit
            }
        })),
    ))
}

/// Appends a compensating adjustment for a manual movement
#[utoipa::path(
    post,
    path = "/api/v1/movements/{id}/correct",
    params(("id" = Uuid, Path, description = "Movement ID")),
    request_body = CorrectMovementRequest,
    responses(
        (status = 201, description = "Correction recorded"),
        (status = 400, description = "Movement is not correctable", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown movement", body = crate::errors::ErrorResponse),
        (status = 409, description = "Movement already corrected", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "movements"
)]
pub async fn correct_movement(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<CorrectMovementRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let correction = state
        .services
        .movements
        .correct(&ctx, id, payload.reason)
        .await?;

    Ok((StatusCode::CREATED, Json(correction)))
}

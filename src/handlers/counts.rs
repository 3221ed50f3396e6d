use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::handlers::AppState;
use crate::services::counts::CountEntryCommand;
use crate::services::reconciliation::ApprovalOptions;
use crate::tenant::TenantContext;

#[derive(Debug, Deserialize, ToSchema)]
pub struct StartCountRequest {
    pub store_id: Uuid,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddEntryRequest {
    pub item_id: Uuid,
    pub quantity: Decimal,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateEntryRequest {
    pub quantity: Decimal,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CompleteCountRequest {
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ApproveCountRequest {
    pub adjustment_notes: Option<String>,
    /// Evaluate expected quantities at completion time instead of approval
    /// time, shielding the comparison from movements recorded in between
    #[serde(default)]
    pub pin_as_of_to_completion: bool,
}

#[derive(Debug, Deserialize, ToSchema, utoipa::IntoParams)]
pub struct CountListQuery {
    pub store_id: Option<Uuid>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_counts).post(start_count))
        .route("/:id", get(get_count))
        .route("/:id/entries", post(add_entry))
        .route("/:id/entries/:entry_id", put(update_entry).delete(delete_entry))
        .route("/:id/complete", post(complete_count))
        .route("/:id/approve", post(approve_count))
}

/// Opens a counting session
#[utoipa::path(
    post,
    path = "/api/v1/counts",
    request_body = StartCountRequest,
    responses(
        (status = 201, description = "Count started"),
        (status = 404, description = "Unknown store", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "counts"
)]
pub async fn start_count(
    State(state): State<AppState>,
    ctx: TenantContext,
    Json(payload): Json<StartCountRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let count = state
        .services
        .counts
        .start(&ctx, payload.store_id, payload.name)
        .await?;

    Ok((StatusCode::CREATED, Json(count)))
}

#[utoipa::path(
    get,
    path = "/api/v1/counts",
    params(CountListQuery),
    responses(
        (status = 200, description = "Counts returned"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "counts"
)]
pub async fn list_counts(
    State(state): State<AppState>,
    ctx: TenantContext,
    Query(query): Query<CountListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let counts = state.services.counts.list(&ctx, query.store_id).await?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "success": true,
            "data": { "counts": counts, "total": counts.len() }
        })),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/counts/{id}",
    params(("id" = Uuid, Path, description = "Count ID")),
    responses(
        (status = 200, description = "Count returned"),
        (status = 404, description = "Unknown count", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "counts"
)]
pub async fn get_count(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let details = state.services.counts.get(&ctx, id).await?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "success": true,
            "data": { "count": details.count, "entries": details.entries }
        })),
    ))
}

/// Adds a counted entry while the count is in progress
#[utoipa::path(
    post,
    path = "/api/v1/counts/{id}/entries",
    params(("id" = Uuid, Path, description = "Count ID")),
    request_body = AddEntryRequest,
    responses(
        (status = 201, description = "Entry added"),
        (status = 400, description = "Invalid quantity or closed count", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown count or item", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "counts"
)]
pub async fn add_entry(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddEntryRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let entry = state
        .services
        .counts
        .apply_entry(
            &ctx,
            id,
            CountEntryCommand::Add {
                item_id: payload.item_id,
                quantity: payload.quantity,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(entry)))
}

#[utoipa::path(
    put,
    path = "/api/v1/counts/{id}/entries/{entry_id}",
    params(
        ("id" = Uuid, Path, description = "Count ID"),
        ("entry_id" = Uuid, Path, description = "Entry ID")
    ),
    request_body = UpdateEntryRequest,
    responses(
        (status = 200, description = "Entry updated"),
        (status = 400, description = "Invalid quantity or closed count", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown count or entry", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "counts"
)]
pub async fn update_entry(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path((id, entry_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateEntryRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let entry = state
        .services
        .counts
        .apply_entry(
            &ctx,
            id,
            CountEntryCommand::Update {
                entry_id,
                quantity: payload.quantity,
            },
        )
        .await?;

    Ok((StatusCode::OK, Json(entry)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/counts/{id}/entries/{entry_id}",
    params(
        ("id" = Uuid, Path, description = "Count ID"),
        ("entry_id" = Uuid, Path, description = "Entry ID")
    ),
    responses(
        (status = 204, description = "Entry deleted"),
        (status = 400, description = "Closed count", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown count or entry", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "counts"
)]
pub async fn delete_entry(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path((id, entry_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ServiceError> {
    state
        .services
        .counts
        .apply_entry(&ctx, id, CountEntryCommand::Delete { entry_id })
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Freezes the count snapshot and values it
#[utoipa::path(
    post,
    path = "/api/v1/counts/{id}/complete",
    params(("id" = Uuid, Path, description = "Count ID")),
    request_body = CompleteCountRequest,
    responses(
        (status = 200, description = "Count completed"),
        (status = 400, description = "Count is not in progress", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown count", body = crate::errors::ErrorResponse),
        (status = 409, description = "Concurrent completion lost", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "counts"
)]
pub async fn complete_count(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<CompleteCountRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let count = state
        .services
        .counts
        .complete(&ctx, id, payload.notes)
        .await?;

    Ok((StatusCode::OK, Json(count)))
}

/// Reconciles the count against the ledger and emits adjustments
#[utoipa::path(
    post,
    path = "/api/v1/counts/{id}/approve",
    params(("id" = Uuid, Path, description = "Count ID")),
    request_body = ApproveCountRequest,
    responses(
        (status = 200, description = "Count approved and reconciled"),
        (status = 400, description = "Count is not completed or already approved", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown count", body = crate::errors::ErrorResponse),
        (status = 409, description = "Concurrent approval lost", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "counts"
)]
pub async fn approve_count(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<ApproveCountRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let summary = state
        .services
        .reconciliation
        .approve(
            &ctx,
            id,
            ApprovalOptions {
                adjustment_notes: payload.adjustment_notes,
                pin_as_of_to_completion: payload.pin_as_of_to_completion,
            },
        )
        .await?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "success": true,
            "data": {
                "count": summary.count,
                "shortages": summary.shortages,
                "surpluses": summary.surpluses,
                "adjustments_created": summary.adjustments_created,
                "total_expected_value": summary.total_expected_value,
                "total_counted_value": summary.total_counted_value,
                "total_discrepancy_value": summary.total_discrepancy_value
            }
        })),
    ))
}

use crate::{
    db::DbPool,
    entities::{
        stock_movement::{MovementType, ReferenceType},
        transfer::{self, Entity as Transfer, TransferStatus},
        transfer_line::{self, Entity as TransferLine},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        catalog, flatten_txn_err,
        movements::{MovementReference, MovementService, NewMovement},
    },
    tenant::TenantContext,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// State machine moving stock between two locations. Completion is the only
/// transition that touches the ledger: one paired OUT/IN movement per line,
/// atomically with the status change.
#[derive(Clone)]
pub struct TransferService {
    db: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

#[derive(Debug, Clone)]
pub struct NewTransfer {
    pub from_store_id: Uuid,
    pub to_store_id: Uuid,
    pub notes: Option<String>,
    pub lines: Vec<TransferLineInput>,
}

#[derive(Debug, Clone)]
pub struct TransferLineInput {
    pub item_id: Uuid,
    pub quantity: Decimal,
}

#[derive(Debug, Clone)]
pub struct TransferDetails {
    pub transfer: transfer::Model,
    pub lines: Vec<transfer_line::Model>,
}

impl TransferService {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self, ctx, new), fields(account_id = %ctx.account_id))]
    pub async fn create(
        &self,
        ctx: &TenantContext,
        new: NewTransfer,
    ) -> Result<TransferDetails, ServiceError> {
        if new.from_store_id == new.to_store_id {
            return Err(ServiceError::ValidationError(
                "transfer source and destination stores must differ".to_string(),
            ));
        }
        if new.lines.is_empty() {
            return Err(ServiceError::ValidationError(
                "transfer must contain at least one line".to_string(),
            ));
        }
        for line in &new.lines {
            if line.quantity <= Decimal::ZERO {
                return Err(ServiceError::ValidationError(format!(
                    "transfer quantity for item {} must be positive",
                    line.item_id
                )));
            }
        }

        let db = self.db.as_ref();
        catalog::load_store(db, ctx, new.from_store_id).await?;
        catalog::load_store(db, ctx, new.to_store_id).await?;
        for line in &new.lines {
            catalog::load_item(db, ctx, line.item_id).await?;
        }

        let ctx_owned = *ctx;
        let details = db
            .transaction::<_, TransferDetails, ServiceError>(move |txn| {
                Box::pin(async move {
                    let model = transfer::ActiveModel {
                        account_id: Set(ctx_owned.account_id),
                        from_store_id: Set(new.from_store_id),
                        to_store_id: Set(new.to_store_id),
                        status: Set(TransferStatus::Pending),
                        notes: Set(new.notes),
                        created_by: Set(ctx_owned.user_id),
                        ..Default::default()
                    };
                    let created = model.insert(txn).await.map_err(ServiceError::db_error)?;

                    let mut lines = Vec::with_capacity(new.lines.len());
                    for line in new.lines {
                        let line_model = transfer_line::ActiveModel {
                            transfer_id: Set(created.id),
                            item_id: Set(line.item_id),
                            quantity: Set(line.quantity),
                            ..Default::default()
                        };
                        lines.push(
                            line_model
                                .insert(txn)
                                .await
                                .map_err(ServiceError::db_error)?,
                        );
                    }

                    Ok(TransferDetails {
                        transfer: created,
                        lines,
                    })
                })
            })
            .await
            .map_err(flatten_txn_err)?;

        info!(transfer_id = %details.transfer.id, "Transfer created");
        self.event_sender
            .send(Event::TransferCreated(details.transfer.id))
            .await
            .map_err(ServiceError::EventError)?;

        Ok(details)
    }

    #[instrument(skip(self, ctx), fields(account_id = %ctx.account_id))]
    pub async fn get(
        &self,
        ctx: &TenantContext,
        transfer_id: Uuid,
    ) -> Result<TransferDetails, ServiceError> {
        let db = self.db.as_ref();
        let transfer = load(db, ctx, transfer_id).await?;
        let lines = load_lines(db, transfer_id).await?;
        Ok(TransferDetails { transfer, lines })
    }

    #[instrument(skip(self, ctx), fields(account_id = %ctx.account_id))]
    pub async fn list(
        &self,
        ctx: &TenantContext,
        status: Option<TransferStatus>,
    ) -> Result<Vec<transfer::Model>, ServiceError> {
        let mut query = Transfer::find()
            .filter(transfer::Column::AccountId.eq(ctx.account_id))
            .order_by_desc(transfer::Column::CreatedAt);
        if let Some(status) = status {
            query = query.filter(transfer::Column::Status.eq(status));
        }
        query
            .all(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    /// pending -> in_transit
    #[instrument(skip(self, ctx), fields(account_id = %ctx.account_id))]
    pub async fn mark_in_transit(
        &self,
        ctx: &TenantContext,
        transfer_id: Uuid,
    ) -> Result<transfer::Model, ServiceError> {
        let updated = self
            .transition(ctx, transfer_id, TransferStatus::Pending, TransferStatus::InTransit)
            .await?;
        self.event_sender
            .send(Event::TransferInTransit(transfer_id))
            .await
            .map_err(ServiceError::EventError)?;
        Ok(updated)
    }

    /// pending -> cancelled
    #[instrument(skip(self, ctx), fields(account_id = %ctx.account_id))]
    pub async fn cancel(
        &self,
        ctx: &TenantContext,
        transfer_id: Uuid,
    ) -> Result<transfer::Model, ServiceError> {
        let updated = self
            .transition(ctx, transfer_id, TransferStatus::Pending, TransferStatus::Cancelled)
            .await?;
        self.event_sender
            .send(Event::TransferCancelled(transfer_id))
            .await
            .map_err(ServiceError::EventError)?;
        Ok(updated)
    }

    /// pending | in_transit -> completed, appending the paired ledger
    /// movements. Movement inserts and the status update are one
    /// transaction; a partial failure leaves transfer and ledger untouched.
    #[instrument(skip(self, ctx), fields(account_id = %ctx.account_id))]
    pub async fn complete(
        &self,
        ctx: &TenantContext,
        transfer_id: Uuid,
    ) -> Result<TransferDetails, ServiceError> {
        let db = self.db.as_ref();
        let ctx_owned = *ctx;

        let details = db
            .transaction::<_, TransferDetails, ServiceError>(move |txn| {
                Box::pin(async move {
                    let existing = load(txn, &ctx_owned, transfer_id).await?;
                    match existing.status {
                        TransferStatus::Pending | TransferStatus::InTransit => {}
                        other => {
                            return Err(ServiceError::InvalidState(format!(
                                "cannot complete transfer {} in status {}",
                                transfer_id, other
                            )));
                        }
                    }

                    let guard = Transfer::update_many()
                        .col_expr(
                            transfer::Column::Status,
                            Expr::value(TransferStatus::Completed),
                        )
                        .col_expr(transfer::Column::CompletedAt, Expr::value(Utc::now()))
                        .col_expr(transfer::Column::CompletedBy, Expr::value(ctx_owned.user_id))
                        .filter(transfer::Column::Id.eq(transfer_id))
                        .filter(transfer::Column::Status.eq(existing.status))
                        .exec(txn)
                        .await
                        .map_err(ServiceError::db_error)?;
                    if guard.rows_affected == 0 {
                        return Err(ServiceError::Conflict(format!(
                            "transfer {} was modified concurrently",
                            transfer_id
                        )));
                    }

                    let lines = load_lines(txn, transfer_id).await?;
                    for line in &lines {
                        let item = catalog::load_item(txn, &ctx_owned, line.item_id).await?;
                        let reference = Some(MovementReference {
                            id: transfer_id,
                            kind: ReferenceType::Transfer,
                        });

                        MovementService::append(
                            txn,
                            &ctx_owned,
                            NewMovement {
                                item_id: line.item_id,
                                store_id: existing.from_store_id,
                                quantity: -line.quantity,
                                movement_type: MovementType::TransferOut,
                                reason: None,
                                notes: None,
                                reference,
                                cost_price: Some(item.cost_price),
                            },
                        )
                        .await?;

                        MovementService::append(
                            txn,
                            &ctx_owned,
                            NewMovement {
                                item_id: line.item_id,
                                store_id: existing.to_store_id,
                                quantity: line.quantity,
                                movement_type: MovementType::TransferIn,
                                reason: None,
                                notes: None,
                                reference,
                                cost_price: Some(item.cost_price),
                            },
                        )
                        .await?;
                    }

                    let transfer = load(txn, &ctx_owned, transfer_id).await?;
                    Ok(TransferDetails { transfer, lines })
                })
            })
            .await
            .map_err(flatten_txn_err)?;

        info!(
            transfer_id = %transfer_id,
            lines = details.lines.len(),
            "Transfer completed"
        );
        self.event_sender
            .send(Event::TransferCompleted {
                transfer_id,
                from_store_id: details.transfer.from_store_id,
                to_store_id: details.transfer.to_store_id,
                line_count: details.lines.len(),
            })
            .await
            .map_err(ServiceError::EventError)?;

        Ok(details)
    }

    /// Removes a transfer that never left pending
    #[instrument(skip(self, ctx), fields(account_id = %ctx.account_id))]
    pub async fn delete(
        &self,
        ctx: &TenantContext,
        transfer_id: Uuid,
    ) -> Result<(), ServiceError> {
        let db = self.db.as_ref();
        let ctx_owned = *ctx;

        db.transaction::<_, (), ServiceError>(move |txn| {
            Box::pin(async move {
                let existing = load(txn, &ctx_owned, transfer_id).await?;
                if existing.status != TransferStatus::Pending {
                    return Err(ServiceError::InvalidState(format!(
                        "cannot delete transfer {} in status {}",
                        transfer_id, existing.status
                    )));
                }

                TransferLine::delete_many()
                    .filter(transfer_line::Column::TransferId.eq(transfer_id))
                    .exec(txn)
                    .await
                    .map_err(ServiceError::db_error)?;

                let result = Transfer::delete_many()
                    .filter(transfer::Column::Id.eq(transfer_id))
                    .filter(transfer::Column::Status.eq(TransferStatus::Pending))
                    .exec(txn)
                    .await
                    .map_err(ServiceError::db_error)?;
                if result.rows_affected == 0 {
                    return Err(ServiceError::Conflict(format!(
                        "transfer {} was modified concurrently",
                        transfer_id
                    )));
                }

                Ok(())
            })
        })
        .await
        .map_err(flatten_txn_err)?;

        self.event_sender
            .send(Event::TransferDeleted(transfer_id))
            .await
            .map_err(ServiceError::EventError)?;

        Ok(())
    }

    /// Status-guarded transition with no side effects beyond the row itself
    async fn transition(
        &self,
        ctx: &TenantContext,
        transfer_id: Uuid,
        from: TransferStatus,
        to: TransferStatus,
    ) -> Result<transfer::Model, ServiceError> {
        let db = self.db.as_ref();

        let existing = load(db, ctx, transfer_id).await?;
        if existing.status != from {
            return Err(ServiceError::InvalidState(format!(
                "cannot move transfer {} from {} to {}",
                transfer_id, existing.status, to
            )));
        }

        let result = Transfer::update_many()
            .col_expr(transfer::Column::Status, Expr::value(to))
            .filter(transfer::Column::Id.eq(transfer_id))
            .filter(transfer::Column::Status.eq(from))
            .exec(db)
            .await
            .map_err(ServiceError::db_error)?;
        if result.rows_affected == 0 {
            return Err(ServiceError::Conflict(format!(
                "transfer {} was modified concurrently",
                transfer_id
            )));
        }

        load(db, ctx, transfer_id).await
    }
}

async fn load<C: ConnectionTrait>(
    db: &C,
    ctx: &TenantContext,
    transfer_id: Uuid,
) -> Result<transfer::Model, ServiceError> {
    Transfer::find_by_id(transfer_id)
        .filter(transfer::Column::AccountId.eq(ctx.account_id))
        .one(db)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("transfer {} not found", transfer_id)))
}

async fn load_lines<C: ConnectionTrait>(
    db: &C,
    transfer_id: Uuid,
) -> Result<Vec<transfer_line::Model>, ServiceError> {
    TransferLine::find()
        .filter(transfer_line::Column::TransferId.eq(transfer_id))
        .all(db)
        .await
        .map_err(ServiceError::db_error)
}

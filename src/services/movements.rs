use crate::{
    db::DbPool,
    entities::{
        item,
        stock_movement::{self, Entity as StockMovement, MovementType, ReferenceType},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{catalog, flatten_txn_err},
    tenant::TenantContext,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

/// Append-only ledger of signed stock movements. Current quantities are
/// derived by summation; nothing here is ever updated in place.
#[derive(Clone)]
pub struct MovementService {
    db: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

/// Link from a movement to the entity that produced it
#[derive(Debug, Clone, Copy)]
pub struct MovementReference {
    pub id: Uuid,
    pub kind: ReferenceType,
}

#[derive(Debug, Clone)]
pub struct NewMovement {
    pub item_id: Uuid,
    pub store_id: Uuid,
    pub quantity: Decimal,
    pub movement_type: MovementType,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub reference: Option<MovementReference>,
    /// Cost per unit; defaults to the item's current cost price
    pub cost_price: Option<Decimal>,
}

#[derive(Debug, Clone, Default)]
pub struct MovementFilters {
    pub item_id: Option<Uuid>,
    pub store_id: Option<Uuid>,
    pub movement_type: Option<MovementType>,
}

/// Derived stock position for one (item, store) pair
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StockLevel {
    pub item_id: Uuid,
    pub store_id: Uuid,
    pub item_name: String,
    pub unit: String,
    pub category: Option<String>,
    pub quantity: Decimal,
    /// quantity x the item's current cost price
    pub value: Decimal,
    pub cost_price: Decimal,
    pub min_stock_level: Option<Decimal>,
    pub max_stock_level: Option<Decimal>,
    pub is_low_stock: bool,
    pub is_over_stock: bool,
}

impl MovementService {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Records one movement. Producers (invoice import, waste entry, POS
    /// sync, manual adjustments) all come through here.
    #[instrument(skip(self, ctx), fields(account_id = %ctx.account_id))]
    pub async fn record(
        &self,
        ctx: &TenantContext,
        new: NewMovement,
    ) -> Result<stock_movement::Model, ServiceError> {
        let movement = Self::append(self.db.as_ref(), ctx, new).await?;

        self.event_sender
            .send(Event::MovementRecorded {
                movement_id: movement.id,
                item_id: movement.item_id,
                store_id: movement.store_id,
                movement_type: movement.movement_type,
                quantity: movement.quantity,
            })
            .await
            .map_err(ServiceError::EventError)?;

        Ok(movement)
    }

    /// Validates and inserts a movement on the given connection. Callers
    /// owning a transaction (transfer completion, count approval) use this
    /// so the append commits or rolls back with the rest of their work.
    pub(crate) async fn append<C: ConnectionTrait>(
        db: &C,
        ctx: &TenantContext,
        new: NewMovement,
    ) -> Result<stock_movement::Model, ServiceError> {
        if new.quantity.is_zero() {
            return Err(ServiceError::ValidationError(
                "movement quantity must not be zero".to_string(),
            ));
        }
        if !new.movement_type.accepts(new.quantity) {
            return Err(ServiceError::ValidationError(format!(
                "quantity {} has the wrong sign for movement type {}",
                new.quantity, new.movement_type
            )));
        }

        let item = catalog::load_item(db, ctx, new.item_id).await?;
        catalog::load_store(db, ctx, new.store_id).await?;

        let cost_price = new.cost_price.unwrap_or(item.cost_price);

        let model = stock_movement::ActiveModel {
            account_id: Set(ctx.account_id),
            item_id: Set(new.item_id),
            store_id: Set(new.store_id),
            quantity: Set(new.quantity),
            movement_type: Set(new.movement_type),
            reason: Set(new.reason),
            notes: Set(new.notes),
            reference_id: Set(new.reference.map(|r| r.id)),
            reference_type: Set(new.reference.map(|r| r.kind)),
            cost_price: Set(cost_price),
            created_by: Set(ctx.user_id),
            ..Default::default()
        };

        let movement = model.insert(db).await.map_err(ServiceError::db_error)?;

        info!(
            movement_id = %movement.id,
            item_id = %movement.item_id,
            store_id = %movement.store_id,
            movement_type = %movement.movement_type,
            quantity = %movement.quantity,
            "Movement recorded"
        );

        Ok(movement)
    }

    /// Appends a compensating adjustment for a manually-recorded movement.
    /// The ledger stays append-only: the original row is untouched and the
    /// correction references it. A movement can be corrected once.
    #[instrument(skip(self, ctx), fields(account_id = %ctx.account_id))]
    pub async fn correct(
        &self,
        ctx: &TenantContext,
        movement_id: Uuid,
        reason: Option<String>,
    ) -> Result<stock_movement::Model, ServiceError> {
        let db = self.db.as_ref();
        let ctx_owned = *ctx;

        let correction = db
            .transaction::<_, stock_movement::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let original = StockMovement::find_by_id(movement_id)
                        .filter(stock_movement::Column::AccountId.eq(ctx_owned.account_id))
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("movement {} not found", movement_id))
                        })?;

                    match original.reference_type {
                        None | Some(ReferenceType::Manual) => {}
                        Some(other) => {
                            return Err(ServiceError::InvalidState(format!(
                                "only manual movements can be corrected; movement {} was produced by {:?}",
                                movement_id, other
                            )));
                        }
                    }

                    let already_corrected = StockMovement::find()
                        .filter(stock_movement::Column::AccountId.eq(ctx_owned.account_id))
                        .filter(stock_movement::Column::ReferenceId.eq(movement_id))
                        .filter(
                            stock_movement::Column::ReferenceType
                                .eq(ReferenceType::ManualCorrection),
                        )
                        .count(txn)
                        .await
                        .map_err(ServiceError::db_error)?;
                    if already_corrected > 0 {
                        return Err(ServiceError::Conflict(format!(
                            "movement {} has already been corrected",
                            movement_id
                        )));
                    }

                    Self::append(
                        txn,
                        &ctx_owned,
                        NewMovement {
                            item_id: original.item_id,
                            store_id: original.store_id,
                            quantity: -original.quantity,
                            movement_type: MovementType::Adjustment,
                            reason: reason.or_else(|| Some("manual correction".to_string())),
                            notes: None,
                            reference: Some(MovementReference {
                                id: movement_id,
                                kind: ReferenceType::ManualCorrection,
                            }),
                            cost_price: Some(original.cost_price),
                        },
                    )
                    .await
                })
            })
            .await
            .map_err(flatten_txn_err)?;

        self.event_sender
            .send(Event::MovementCorrected {
                original_id: movement_id,
                correction_id: correction.id,
            })
            .await
            .map_err(ServiceError::EventError)?;

        Ok(correction)
    }

    /// Point-in-time quantity on hand for an item, at one store or across
    /// all of them. Movements at or after `as_of` are excluded; the default
    /// is everything committed so far.
    #[instrument(skip(self, ctx), fields(account_id = %ctx.account_id))]
    pub async fn on_hand(
        &self,
        ctx: &TenantContext,
        item_id: Uuid,
        store_id: Option<Uuid>,
        as_of: Option<DateTime<Utc>>,
    ) -> Result<Decimal, ServiceError> {
        let db = self.db.as_ref();
        catalog::load_item(db, ctx, item_id).await?;

        ledger_sum(db, ctx.account_id, item_id, store_id, as_of).await
    }

    /// Bulk stock position grouped by (item, store), joined with item
    /// metadata for valuation and threshold flags.
    #[instrument(skip(self, ctx), fields(account_id = %ctx.account_id))]
    pub async fn stock_levels(
        &self,
        ctx: &TenantContext,
        store_id: Option<Uuid>,
    ) -> Result<Vec<StockLevel>, ServiceError> {
        let db = self.db.as_ref();

        let mut query = StockMovement::find()
            .select_only()
            .column(stock_movement::Column::ItemId)
            .column(stock_movement::Column::StoreId)
            .column_as(stock_movement::Column::Quantity.sum(), "quantity")
            .filter(stock_movement::Column::AccountId.eq(ctx.account_id));
        if let Some(store_id) = store_id {
            query = query.filter(stock_movement::Column::StoreId.eq(store_id));
        }

        let rows: Vec<(Uuid, Uuid, Option<Decimal>)> = query
            .group_by(stock_movement::Column::ItemId)
            .group_by(stock_movement::Column::StoreId)
            .into_tuple()
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        let items = catalog::load_items_map(db, ctx).await?;

        let mut levels = Vec::with_capacity(rows.len());
        for (item_id, store_id, quantity) in rows {
            let Some(item) = items.get(&item_id) else {
                continue;
            };
            levels.push(build_level(item, store_id, quantity.unwrap_or(Decimal::ZERO)));
        }

        levels.sort_by(|a, b| {
            a.item_name
                .cmp(&b.item_name)
                .then_with(|| a.store_id.cmp(&b.store_id))
        });

        Ok(levels)
    }

    /// Paginated movement history for audit views
    #[instrument(skip(self, ctx), fields(account_id = %ctx.account_id))]
    pub async fn list(
        &self,
        ctx: &TenantContext,
        filters: MovementFilters,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<stock_movement::Model>, u64), ServiceError> {
        let db = self.db.as_ref();

        let mut query = StockMovement::find()
            .filter(stock_movement::Column::AccountId.eq(ctx.account_id))
            .order_by_desc(stock_movement::Column::CreatedAt);
        if let Some(item_id) = filters.item_id {
            query = query.filter(stock_movement::Column::ItemId.eq(item_id));
        }
        if let Some(store_id) = filters.store_id {
            query = query.filter(stock_movement::Column::StoreId.eq(store_id));
        }
        if let Some(movement_type) = filters.movement_type {
            query = query.filter(stock_movement::Column::MovementType.eq(movement_type));
        }

        let paginator = query.paginate(db, limit.max(1));
        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let movements = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;

        Ok((movements, total))
    }
}

fn build_level(item: &item::Model, store_id: Uuid, quantity: Decimal) -> StockLevel {
    StockLevel {
        item_id: item.id,
        store_id,
        item_name: item.name.clone(),
        unit: item.unit.clone(),
        category: item.category.clone(),
        quantity,
        value: quantity * item.cost_price,
        cost_price: item.cost_price,
        min_stock_level: item.min_stock_level,
        max_stock_level: item.max_stock_level,
        is_low_stock: item.min_stock_level.map_or(false, |min| quantity < min),
        is_over_stock: item.max_stock_level.map_or(false, |max| quantity > max),
    }
}

/// SUM of signed quantities for an item, optionally narrowed to one store
/// and a point in time. The summation is where "current stock" comes from;
/// there is no materialized balance to drift out of sync.
pub(crate) async fn ledger_sum<C: ConnectionTrait>(
    db: &C,
    account_id: Uuid,
    item_id: Uuid,
    store_id: Option<Uuid>,
    as_of: Option<DateTime<Utc>>,
) -> Result<Decimal, ServiceError> {
    let mut query = StockMovement::find()
        .select_only()
        .column_as(stock_movement::Column::Quantity.sum(), "total")
        .filter(stock_movement::Column::AccountId.eq(account_id))
        .filter(stock_movement::Column::ItemId.eq(item_id));
    if let Some(store_id) = store_id {
        query = query.filter(stock_movement::Column::StoreId.eq(store_id));
    }
    if let Some(as_of) = as_of {
        query = query.filter(stock_movement::Column::CreatedAt.lt(as_of));
    }

    let total: Option<Option<Decimal>> = query
        .into_tuple()
        .one(db)
        .await
        .map_err(ServiceError::db_error)?;

    Ok(total.flatten().unwrap_or(Decimal::ZERO))
}

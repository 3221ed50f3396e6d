use crate::{
    db::DbPool,
    entities::{
        stock_count::{self, CountStatus, Entity as StockCount},
        stock_entry::{self, Entity as StockEntry},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{catalog, flatten_txn_err},
    tenant::TenantContext,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

/// Captures a physical stocktake. Entries are editable only while the count
/// is in progress; completion freezes them as the snapshot reconciliation
/// compares against.
#[derive(Clone)]
pub struct CountService {
    db: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

/// Entry mutations, one variant per action. The match in `apply_entry` is
/// exhaustive, so an unknown action cannot exist.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum CountEntryCommand {
    Add { item_id: Uuid, quantity: Decimal },
    Update { entry_id: Uuid, quantity: Decimal },
    Delete { entry_id: Uuid },
}

#[derive(Debug, Clone)]
pub struct CountDetails {
    pub count: stock_count::Model,
    pub entries: Vec<stock_entry::Model>,
}

impl CountService {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Opens a counting session at a store, owned by the calling user
    #[instrument(skip(self, ctx), fields(account_id = %ctx.account_id))]
    pub async fn start(
        &self,
        ctx: &TenantContext,
        store_id: Uuid,
        name: Option<String>,
    ) -> Result<stock_count::Model, ServiceError> {
        let db = self.db.as_ref();
        catalog::load_store(db, ctx, store_id).await?;

        let model = stock_count::ActiveModel {
            account_id: Set(ctx.account_id),
            store_id: Set(store_id),
            user_id: Set(ctx.user_id),
            name: Set(name),
            status: Set(CountStatus::InProgress),
            items_counted: Set(0),
            ..Default::default()
        };

        let count = model.insert(db).await.map_err(ServiceError::db_error)?;

        info!(count_id = %count.id, store_id = %store_id, "Stock count started");
        self.event_sender
            .send(Event::CountStarted(count.id))
            .await
            .map_err(ServiceError::EventError)?;

        Ok(count)
    }

    /// Applies one entry mutation. Rejected with `InvalidState` unless the
    /// count is still in progress. Returns the touched entry for add and
    /// update, `None` for delete.
    #[instrument(skip(self, ctx, command), fields(account_id = %ctx.account_id))]
    pub async fn apply_entry(
        &self,
        ctx: &TenantContext,
        count_id: Uuid,
        command: CountEntryCommand,
    ) -> Result<Option<stock_entry::Model>, ServiceError> {
        let db = self.db.as_ref();
        let ctx_owned = *ctx;

        db.transaction::<_, Option<stock_entry::Model>, ServiceError>(move |txn| {
            Box::pin(async move {
                let count = load(txn, &ctx_owned, count_id).await?;
                if count.status != CountStatus::InProgress {
                    return Err(ServiceError::InvalidState(format!(
                        "entries of count {} cannot change in status {}",
                        count_id, count.status
                    )));
                }

                match command {
                    CountEntryCommand::Add { item_id, quantity } => {
                        if quantity < Decimal::ZERO {
                            return Err(ServiceError::ValidationError(
                                "counted quantity must be zero or positive".to_string(),
                            ));
                        }
                        let item = catalog::load_item(txn, &ctx_owned, item_id).await?;

                        let duplicates = StockEntry::find()
                            .filter(stock_entry::Column::CountId.eq(count_id))
                            .filter(stock_entry::Column::ItemId.eq(item_id))
                            .count(txn)
                            .await
                            .map_err(ServiceError::db_error)?;
                        if duplicates > 0 {
                            return Err(ServiceError::ValidationError(format!(
                                "item {} is already counted in count {}",
                                item_id, count_id
                            )));
                        }

                        let entry = stock_entry::ActiveModel {
                            count_id: Set(count_id),
                            item_id: Set(item_id),
                            quantity: Set(quantity),
                            unit_cost: Set(Some(item.cost_price)),
                            ..Default::default()
                        };
                        let entry = entry.insert(txn).await.map_err(ServiceError::db_error)?;

                        adjust_items_counted(txn, &count, 1).await?;
                        Ok(Some(entry))
                    }
                    CountEntryCommand::Update { entry_id, quantity } => {
                        if quantity < Decimal::ZERO {
                            return Err(ServiceError::ValidationError(
                                "counted quantity must be zero or positive".to_string(),
                            ));
                        }
                        let entry = load_entry(txn, count_id, entry_id).await?;

                        let mut model: stock_entry::ActiveModel = entry.into();
                        model.quantity = Set(quantity);
                        let entry = model.update(txn).await.map_err(ServiceError::db_error)?;
                        Ok(Some(entry))
                    }
                    CountEntryCommand::Delete { entry_id } => {
                        let entry = load_entry(txn, count_id, entry_id).await?;

                        StockEntry::delete_by_id(entry.id)
                            .exec(txn)
                            .await
                            .map_err(ServiceError::db_error)?;

                        adjust_items_counted(txn, &count, -1).await?;
                        Ok(None)
                    }
                }
            })
        })
        .await
        .map_err(flatten_txn_err)
    }

    /// in_progress -> completed. Values the counted entries and freezes the
    /// snapshot that approval will reconcile against.
    #[instrument(skip(self, ctx), fields(account_id = %ctx.account_id))]
    pub async fn complete(
        &self,
        ctx: &TenantContext,
        count_id: Uuid,
        notes: Option<String>,
    ) -> Result<stock_count::Model, ServiceError> {
        let db = self.db.as_ref();
        let ctx_owned = *ctx;

        let count = db
            .transaction::<_, stock_count::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let count = load(txn, &ctx_owned, count_id).await?;
                    if count.status != CountStatus::InProgress {
                        return Err(ServiceError::InvalidState(format!(
                            "cannot complete count {} in status {}",
                            count_id, count.status
                        )));
                    }

                    let entries = entries_for(txn, count_id).await?;
                    let items = catalog::load_items_map(txn, &ctx_owned).await?;

                    let mut total_value = Decimal::ZERO;
                    for entry in &entries {
                        let unit_cost = match entry.unit_cost {
                            Some(cost) => cost,
                            None => items
                                .get(&entry.item_id)
                                .map(|i| i.cost_price)
                                .unwrap_or(Decimal::ZERO),
                        };
                        total_value += entry.quantity * unit_cost;
                    }

                    let guard = StockCount::update_many()
                        .col_expr(
                            stock_count::Column::Status,
                            Expr::value(CountStatus::Completed),
                        )
                        .col_expr(stock_count::Column::CompletedAt, Expr::value(Utc::now()))
                        .col_expr(stock_count::Column::TotalValue, Expr::value(total_value))
                        .col_expr(stock_count::Column::Notes, Expr::value(notes))
                        .filter(stock_count::Column::Id.eq(count_id))
                        .filter(stock_count::Column::Status.eq(CountStatus::InProgress))
                        .exec(txn)
                        .await
                        .map_err(ServiceError::db_error)?;
                    if guard.rows_affected == 0 {
                        return Err(ServiceError::Conflict(format!(
                            "count {} was modified concurrently",
                            count_id
                        )));
                    }

                    load(txn, &ctx_owned, count_id).await
                })
            })
            .await
            .map_err(flatten_txn_err)?;

        info!(
            count_id = %count.id,
            items_counted = count.items_counted,
            "Stock count completed"
        );
        self.event_sender
            .send(Event::CountCompleted {
                count_id: count.id,
                items_counted: count.items_counted,
                total_value: count.total_value.unwrap_or(Decimal::ZERO),
            })
            .await
            .map_err(ServiceError::EventError)?;

        Ok(count)
    }

    #[instrument(skip(self, ctx), fields(account_id = %ctx.account_id))]
    pub async fn get(
        &self,
        ctx: &TenantContext,
        count_id: Uuid,
    ) -> Result<CountDetails, ServiceError> {
        let db = self.db.as_ref();
        let count = load(db, ctx, count_id).await?;
        let entries = entries_for(db, count_id).await?;
        Ok(CountDetails { count, entries })
    }

    #[instrument(skip(self, ctx), fields(account_id = %ctx.account_id))]
    pub async fn list(
        &self,
        ctx: &TenantContext,
        store_id: Option<Uuid>,
    ) -> Result<Vec<stock_count::Model>, ServiceError> {
        let mut query = StockCount::find()
            .filter(stock_count::Column::AccountId.eq(ctx.account_id))
            .order_by_desc(stock_count::Column::CreatedAt);
        if let Some(store_id) = store_id {
            query = query.filter(stock_count::Column::StoreId.eq(store_id));
        }
        query
            .all(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }
}

pub(crate) async fn load<C: ConnectionTrait>(
    db: &C,
    ctx: &TenantContext,
    count_id: Uuid,
) -> Result<stock_count::Model, ServiceError> {
    StockCount::find_by_id(count_id)
        .filter(stock_count::Column::AccountId.eq(ctx.account_id))
        .one(db)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("stock count {} not found", count_id)))
}

pub(crate) async fn entries_for<C: ConnectionTrait>(
    db: &C,
    count_id: Uuid,
) -> Result<Vec<stock_entry::Model>, ServiceError> {
    StockEntry::find()
        .filter(stock_entry::Column::CountId.eq(count_id))
        .order_by_asc(stock_entry::Column::CreatedAt)
        .all(db)
        .await
        .map_err(ServiceError::db_error)
}

async fn load_entry<C: ConnectionTrait>(
    db: &C,
    count_id: Uuid,
    entry_id: Uuid,
) -> Result<stock_entry::Model, ServiceError> {
    let entry = StockEntry::find_by_id(entry_id)
        .one(db)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("stock entry {} not found", entry_id)))?;

    if entry.count_id != count_id {
        return Err(ServiceError::NotFound(format!(
            "stock entry {} not found",
            entry_id
        )));
    }

    Ok(entry)
}

async fn adjust_items_counted<C: ConnectionTrait>(
    db: &C,
    count: &stock_count::Model,
    delta: i32,
) -> Result<(), ServiceError> {
    let mut model: stock_count::ActiveModel = count.clone().into();
    model.items_counted = Set(count.items_counted + delta);
    model.update(db).await.map_err(ServiceError::db_error)?;
    Ok(())
}

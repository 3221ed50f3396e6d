use crate::{
    db::DbPool,
    entities::{
        item::{self, Entity as Item},
        store::{self, Entity as Store},
    },
    errors::ServiceError,
    tenant::TenantContext,
};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Master data access: items and stores. The engine proper only reads
/// through the `load_*` helpers; the mutating surface exists so the system
/// is operable end-to-end. No deletes -- the ledger references both tables.
#[derive(Clone)]
pub struct CatalogService {
    db: Arc<DbPool>,
}

#[derive(Debug, Clone)]
pub struct NewItem {
    pub name: String,
    pub unit: String,
    pub category: Option<String>,
    pub cost_price: Decimal,
    pub min_stock_level: Option<Decimal>,
    pub max_stock_level: Option<Decimal>,
}

#[derive(Debug, Clone, Default)]
pub struct ItemUpdate {
    pub name: Option<String>,
    pub category: Option<Option<String>>,
    pub cost_price: Option<Decimal>,
    pub min_stock_level: Option<Option<Decimal>>,
    pub max_stock_level: Option<Option<Decimal>>,
}

impl CatalogService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn create_item(
        &self,
        ctx: &TenantContext,
        new: NewItem,
    ) -> Result<item::Model, ServiceError> {
        if new.name.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "item name must not be empty".to_string(),
            ));
        }
        if new.unit.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "item unit must not be empty".to_string(),
            ));
        }
        if new.cost_price < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "cost price must not be negative".to_string(),
            ));
        }
        for (label, level) in [
            ("min stock level", new.min_stock_level),
            ("max stock level", new.max_stock_level),
        ] {
            if let Some(level) = level {
                if level < Decimal::ZERO {
                    return Err(ServiceError::ValidationError(format!(
                        "{label} must not be negative"
                    )));
                }
            }
        }

        let model = item::ActiveModel {
            account_id: Set(ctx.account_id),
            name: Set(new.name),
            unit: Set(new.unit),
            category: Set(new.category),
            cost_price: Set(new.cost_price),
            min_stock_level: Set(new.min_stock_level),
            max_stock_level: Set(new.max_stock_level),
            ..Default::default()
        };

        let created = model
            .insert(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        info!(item_id = %created.id, name = %created.name, "Item created");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn update_item(
        &self,
        ctx: &TenantContext,
        item_id: Uuid,
        update: ItemUpdate,
    ) -> Result<item::Model, ServiceError> {
        let existing = load_item(self.db.as_ref(), ctx, item_id).await?;

        let mut model: item::ActiveModel = existing.into();
        if let Some(name) = update.name {
            if name.trim().is_empty() {
                return Err(ServiceError::ValidationError(
                    "item name must not be empty".to_string(),
                ));
            }
            model.name = Set(name);
        }
        if let Some(category) = update.category {
            model.category = Set(category);
        }
        if let Some(cost_price) = update.cost_price {
            if cost_price < Decimal::ZERO {
                return Err(ServiceError::ValidationError(
                    "cost price must not be negative".to_string(),
                ));
            }
            model.cost_price = Set(cost_price);
        }
        if let Some(min) = update.min_stock_level {
            model.min_stock_level = Set(min);
        }
        if let Some(max) = update.max_stock_level {
            model.max_stock_level = Set(max);
        }

        model
            .update(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    #[instrument(skip(self))]
    pub async fn list_items(&self, ctx: &TenantContext) -> Result<Vec<item::Model>, ServiceError> {
        Item::find()
            .filter(item::Column::AccountId.eq(ctx.account_id))
            .order_by_asc(item::Column::Name)
            .all(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    #[instrument(skip(self))]
    pub async fn create_store(
        &self,
        ctx: &TenantContext,
        name: String,
    ) -> Result<store::Model, ServiceError> {
        if name.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "store name must not be empty".to_string(),
            ));
        }

        let model = store::ActiveModel {
            account_id: Set(ctx.account_id),
            name: Set(name),
            ..Default::default()
        };

        let created = model
            .insert(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        info!(store_id = %created.id, name = %created.name, "Store created");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn list_stores(
        &self,
        ctx: &TenantContext,
    ) -> Result<Vec<store::Model>, ServiceError> {
        Store::find()
            .filter(store::Column::AccountId.eq(ctx.account_id))
            .order_by_asc(store::Column::Name)
            .all(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }
}

/// Loads an item scoped to the caller's tenant. Unknown and cross-tenant
/// ids are indistinguishable from the caller's perspective.
pub(crate) async fn load_item<C: ConnectionTrait>(
    db: &C,
    ctx: &TenantContext,
    item_id: Uuid,
) -> Result<item::Model, ServiceError> {
    Item::find_by_id(item_id)
        .filter(item::Column::AccountId.eq(ctx.account_id))
        .one(db)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("item {} not found", item_id)))
}

/// Loads a store scoped to the caller's tenant.
pub(crate) async fn load_store<C: ConnectionTrait>(
    db: &C,
    ctx: &TenantContext,
    store_id: Uuid,
) -> Result<store::Model, ServiceError> {
    Store::find_by_id(store_id)
        .filter(store::Column::AccountId.eq(ctx.account_id))
        .one(db)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("store {} not found", store_id)))
}

/// All items of the tenant, indexed by id. Used by bulk joins.
pub(crate) async fn load_items_map<C: ConnectionTrait>(
    db: &C,
    ctx: &TenantContext,
) -> Result<HashMap<Uuid, item::Model>, ServiceError> {
    let items = Item::find()
        .filter(item::Column::AccountId.eq(ctx.account_id))
        .all(db)
        .await
        .map_err(ServiceError::db_error)?;

    Ok(items.into_iter().map(|m| (m.id, m)).collect())
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

/// Kinds of ledger movements. The sign of the quantity must agree with the
/// kind: inbound kinds are positive, outbound kinds negative, adjustments
/// either way.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    #[sea_orm(string_value = "purchase")]
    Purchase,

    #[sea_orm(string_value = "waste")]
    Waste,

    #[sea_orm(string_value = "transfer_in")]
    TransferIn,

    #[sea_orm(string_value = "transfer_out")]
    TransferOut,

    #[sea_orm(string_value = "adjustment")]
    Adjustment,

    #[sea_orm(string_value = "sale")]
    Sale,
}

/// Sign constraint a movement type imposes on its quantity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantitySign {
    Positive,
    Negative,
    Any,
}

impl MovementType {
    pub fn expected_sign(&self) -> QuantitySign {
        match self {
            MovementType::Purchase | MovementType::TransferIn => QuantitySign::Positive,
            MovementType::Waste | MovementType::TransferOut | MovementType::Sale => {
                QuantitySign::Negative
            }
            MovementType::Adjustment => QuantitySign::Any,
        }
    }

    /// Whether `quantity` satisfies this type's sign constraint.
    /// Zero never does.
    pub fn accepts(&self, quantity: Decimal) -> bool {
        if quantity.is_zero() {
            return false;
        }
        match self.expected_sign() {
            QuantitySign::Positive => quantity > Decimal::ZERO,
            QuantitySign::Negative => quantity < Decimal::ZERO,
            QuantitySign::Any => true,
        }
    }
}

impl fmt::Display for MovementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MovementType::Purchase => write!(f, "purchase"),
            MovementType::Waste => write!(f, "waste"),
            MovementType::TransferIn => write!(f, "transfer_in"),
            MovementType::TransferOut => write!(f, "transfer_out"),
            MovementType::Adjustment => write!(f, "adjustment"),
            MovementType::Sale => write!(f, "sale"),
        }
    }
}

/// What a movement's reference id points at
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum ReferenceType {
    #[sea_orm(string_value = "invoice")]
    Invoice,

    #[sea_orm(string_value = "transfer")]
    Transfer,

    #[sea_orm(string_value = "count")]
    Count,

    #[sea_orm(string_value = "waste_reason")]
    WasteReason,

    #[sea_orm(string_value = "pos_order")]
    PosOrder,

    #[sea_orm(string_value = "manual")]
    Manual,

    #[sea_orm(string_value = "manual_correction")]
    ManualCorrection,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "stock_movements")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub account_id: Uuid,
    pub item_id: Uuid,
    pub store_id: Uuid,
    /// Signed quantity in the item's unit; positive = inbound
    pub quantity: Decimal,
    pub movement_type: MovementType,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub reference_id: Option<Uuid>,
    pub reference_type: Option<ReferenceType>,
    /// Cost per unit at the moment of recording
    pub cost_price: Decimal,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::item::Entity",
        from = "Column::ItemId",
        to = "super::item::Column::Id"
    )]
    Item,
    #[sea_orm(
        belongs_to = "super::store::Entity",
        from = "Column::StoreId",
        to = "super::store::Column::Id"
    )]
    Store,
}

impl Related<super::item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Item.def()
    }
}

impl Related<super::store::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Store.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(self, _db: &C, _insert: bool) -> Result<Self, DbErr> {
        let mut active_model = self;
        if active_model.id.is_not_set() {
            active_model.id = Set(Uuid::new_v4());
        }
        if let ActiveValue::NotSet = active_model.created_at {
            active_model.created_at = Set(Utc::now());
        }
        Ok(active_model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn sign_constraints_per_movement_type() {
        assert!(MovementType::Purchase.accepts(dec!(5)));
        assert!(!MovementType::Purchase.accepts(dec!(-5)));
        assert!(MovementType::Waste.accepts(dec!(-2.5)));
        assert!(!MovementType::Waste.accepts(dec!(2.5)));
        assert!(MovementType::Sale.accepts(dec!(-1)));
        assert!(!MovementType::Sale.accepts(dec!(1)));
        assert!(MovementType::Adjustment.accepts(dec!(-3)));
        assert!(MovementType::Adjustment.accepts(dec!(3)));
    }

    #[test]
    fn zero_quantity_is_never_accepted() {
        for ty in [
            MovementType::Purchase,
            MovementType::Waste,
            MovementType::TransferIn,
            MovementType::TransferOut,
            MovementType::Adjustment,
            MovementType::Sale,
        ] {
            assert!(!ty.accepts(Decimal::ZERO), "{ty} accepted zero");
        }
    }
}

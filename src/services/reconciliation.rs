use crate::{
    db::DbPool,
    entities::{
        stock_count::{self, CountStatus, Entity as StockCount},
        stock_entry,
        stock_movement::{MovementType, ReferenceType},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        catalog, counts, flatten_txn_err,
        movements::{self, MovementReference, MovementService, NewMovement},
    },
    tenant::TenantContext,
};
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Discrepancies at or below this magnitude are treated as measurement
/// noise and produce no adjustment.
pub const DISCREPANCY_EPSILON: Decimal = dec!(0.001);

/// Converts an approved physical count into compensating ledger entries.
#[derive(Clone)]
pub struct ReconciliationService {
    db: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

#[derive(Debug, Clone, Default)]
pub struct ApprovalOptions {
    /// Free-text carried onto every adjustment movement
    pub adjustment_notes: Option<String>,
    /// Evaluate expected quantities at the count's completion time instead
    /// of at approval time. Shields the comparison from movements recorded
    /// between completion and approval.
    pub pin_as_of_to_completion: bool,
}

#[derive(Debug, Clone)]
pub struct ApprovalSummary {
    pub count: stock_count::Model,
    pub shortages: u32,
    pub surpluses: u32,
    pub adjustments_created: u32,
    pub total_expected_value: Decimal,
    pub total_counted_value: Decimal,
    pub total_discrepancy_value: Decimal,
}

impl ReconciliationService {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// completed -> approved. Per entry: computes the ledger-expected
    /// quantity, persists expected/discrepancy (write-once), and appends
    /// one adjustment movement when the discrepancy exceeds the epsilon.
    /// Entry updates, adjustments, and the status change commit or roll
    /// back together; a failed approval leaves the count completed and
    /// retryable.
    #[instrument(skip(self, ctx, options), fields(account_id = %ctx.account_id))]
    pub async fn approve(
        &self,
        ctx: &TenantContext,
        count_id: Uuid,
        options: ApprovalOptions,
    ) -> Result<ApprovalSummary, ServiceError> {
        let db = self.db.as_ref();
        let ctx_owned = *ctx;

        let summary = db
            .transaction::<_, ApprovalSummary, ServiceError>(move |txn| {
                Box::pin(async move {
                    let count = counts::load(txn, &ctx_owned, count_id).await?;
                    match count.status {
                        CountStatus::InProgress => {
                            return Err(ServiceError::InvalidState(format!(
                                "count {} has not been completed",
                                count_id
                            )));
                        }
                        CountStatus::Approved => {
                            return Err(ServiceError::InvalidState(format!(
                                "count {} is already approved",
                                count_id
                            )));
                        }
                        CountStatus::Completed => {}
                    }

                    let now = Utc::now();
                    let guard = StockCount::update_many()
                        .col_expr(
                            stock_count::Column::Status,
                            Expr::value(CountStatus::Approved),
                        )
                        .col_expr(stock_count::Column::ApprovedBy, Expr::value(ctx_owned.user_id))
                        .col_expr(stock_count::Column::ApprovedAt, Expr::value(now))
                        .filter(stock_count::Column::Id.eq(count_id))
                        .filter(stock_count::Column::Status.eq(CountStatus::Completed))
                        .exec(txn)
                        .await
                        .map_err(ServiceError::db_error)?;
                    if guard.rows_affected == 0 {
                        return Err(ServiceError::Conflict(format!(
                            "count {} is being approved concurrently",
                            count_id
                        )));
                    }

                    let as_of = if options.pin_as_of_to_completion {
                        count.completed_at.unwrap_or(now)
                    } else {
                        now
                    };

                    let entries = counts::entries_for(txn, count_id).await?;
                    let items = catalog::load_items_map(txn, &ctx_owned).await?;

                    let mut shortages = 0u32;
                    let mut surpluses = 0u32;
                    let mut total_expected_value = Decimal::ZERO;
                    let mut total_counted_value = Decimal::ZERO;
                    let mut total_discrepancy_value = Decimal::ZERO;

                    for entry in entries {
                        let expected = movements::ledger_sum(
                            txn,
                            ctx_owned.account_id,
                            entry.item_id,
                            Some(count.store_id),
                            Some(as_of),
                        )
                        .await?;
                        let discrepancy = entry.quantity - expected;

                        let unit_cost = match entry.unit_cost {
                            Some(cost) => cost,
                            None => items
                                .get(&entry.item_id)
                                .map(|i| i.cost_price)
                                .unwrap_or(Decimal::ZERO),
                        };

                        total_expected_value += expected * unit_cost;
                        total_counted_value += entry.quantity * unit_cost;
                        total_discrepancy_value += discrepancy * unit_cost;

                        let item_id = entry.item_id;
                        let counted = entry.quantity;
                        let mut model: stock_entry::ActiveModel = entry.into();
                        model.expected_quantity = Set(Some(expected));
                        model.discrepancy = Set(Some(discrepancy));
                        model.update(txn).await.map_err(ServiceError::db_error)?;

                        if discrepancy.abs() > DISCREPANCY_EPSILON {
                            let reason = if discrepancy > Decimal::ZERO {
                                surpluses += 1;
                                "surplus"
                            } else {
                                shortages += 1;
                                "shortage"
                            };

                            MovementService::append(
                                txn,
                                &ctx_owned,
                                NewMovement {
                                    item_id,
                                    store_id: count.store_id,
                                    quantity: discrepancy,
                                    movement_type: MovementType::Adjustment,
                                    reason: Some(reason.to_string()),
                                    notes: options.adjustment_notes.clone(),
                                    reference: Some(MovementReference {
                                        id: count_id,
                                        kind: ReferenceType::Count,
                                    }),
                                    cost_price: Some(unit_cost),
                                },
                            )
                            .await?;

                            info!(
                                count_id = %count_id,
                                item_id = %item_id,
                                counted = %counted,
                                expected = %expected,
                                discrepancy = %discrepancy,
                                reason,
                                "Reconciliation adjustment recorded"
                            );
                        }
                    }

                    StockCount::update_many()
                        .col_expr(
                            stock_count::Column::ExpectedValue,
                            Expr::value(total_expected_value),
                        )
                        .col_expr(
                            stock_count::Column::DiscrepancyValue,
                            Expr::value(total_discrepancy_value),
                        )
                        .filter(stock_count::Column::Id.eq(count_id))
                        .exec(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                    let count = counts::load(txn, &ctx_owned, count_id).await?;

                    Ok(ApprovalSummary {
                        count,
                        shortages,
                        surpluses,
                        adjustments_created: shortages + surpluses,
                        total_expected_value,
                        total_counted_value,
                        total_discrepancy_value,
                    })
                })
            })
            .await
            .map_err(flatten_txn_err)?;

        info!(
            count_id = %count_id,
            shortages = summary.shortages,
            surpluses = summary.surpluses,
            total_discrepancy_value = %summary.total_discrepancy_value,
            "Stock count approved"
        );

        self.event_sender
            .send(Event::CountApproved {
                count_id,
                approved_by: ctx.user_id,
                approved_at: summary.count.approved_at.unwrap_or_else(Utc::now),
            })
            .await
            .map_err(ServiceError::EventError)?;

        if summary.adjustments_created > 0 {
            self.event_sender
                .send(Event::DiscrepancyDetected {
                    count_id,
                    shortages: summary.shortages,
                    surpluses: summary.surpluses,
                    total_discrepancy_value: summary.total_discrepancy_value,
                })
                .await
                .map_err(ServiceError::EventError)?;
        }

        Ok(summary)
    }
}

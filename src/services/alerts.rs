use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    db::DbPool,
    errors::ServiceError,
    events::EventSender,
    services::movements::{MovementService, StockLevel},
    tenant::TenantContext,
};

/// Below this fraction of the minimum level an alert escalates to critical.
/// Exactly at the fraction stays a warning.
const CRITICAL_RATIO: Decimal = dec!(0.25);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertType {
    LowStock,
    OverStock,
}

/// Critical orders before Warning so the derived alert list sorts by
/// declaration order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Critical,
    Warning,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StockAlert {
    pub item_id: Uuid,
    pub store_id: Uuid,
    pub item_name: String,
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub current_quantity: Decimal,
    pub min_stock_level: Option<Decimal>,
    pub max_stock_level: Option<Decimal>,
}

/// Derives threshold alerts from stock levels. Pure: no persisted alert
/// state, recomputed on every query.
pub fn evaluate(levels: &[StockLevel]) -> Vec<StockAlert> {
    let mut alerts = Vec::new();

    for level in levels {
        if let Some(min) = level.min_stock_level {
            if level.quantity < min {
                let severity = if level.quantity < min * CRITICAL_RATIO {
                    AlertSeverity::Critical
                } else {
                    AlertSeverity::Warning
                };
                alerts.push(StockAlert {
                    item_id: level.item_id,
                    store_id: level.store_id,
                    item_name: level.item_name.clone(),
                    alert_type: AlertType::LowStock,
                    severity,
                    current_quantity: level.quantity,
                    min_stock_level: Some(min),
                    max_stock_level: level.max_stock_level,
                });
            }
        }

        if let Some(max) = level.max_stock_level {
            if level.quantity > max {
                alerts.push(StockAlert {
                    item_id: level.item_id,
                    store_id: level.store_id,
                    item_name: level.item_name.clone(),
                    alert_type: AlertType::OverStock,
                    severity: AlertSeverity::Warning,
                    current_quantity: level.quantity,
                    min_stock_level: level.min_stock_level,
                    max_stock_level: Some(max),
                });
            }
        }
    }

    // Stable order for deterministic UI and tests
    alerts.sort_by(|a, b| {
        a.severity
            .cmp(&b.severity)
            .then_with(|| a.item_name.cmp(&b.item_name))
            .then_with(|| a.store_id.cmp(&b.store_id))
    });

    alerts
}

#[derive(Clone)]
pub struct AlertService {
    movements: MovementService,
}

impl AlertService {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            movements: MovementService::new(db, event_sender),
        }
    }

    /// Current alerts across the tenant, or one store of it
    #[instrument(skip(self, ctx), fields(account_id = %ctx.account_id))]
    pub async fn alerts(
        &self,
        ctx: &TenantContext,
        store_id: Option<Uuid>,
    ) -> Result<Vec<StockAlert>, ServiceError> {
        let levels = self.movements.stock_levels(ctx, store_id).await?;
        Ok(evaluate(&levels))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn level(name: &str, quantity: Decimal, min: Option<Decimal>, max: Option<Decimal>) -> StockLevel {
        StockLevel {
            item_id: Uuid::new_v4(),
            store_id: Uuid::new_v4(),
            item_name: name.to_string(),
            unit: "kg".to_string(),
            category: None,
            quantity,
            value: Decimal::ZERO,
            cost_price: Decimal::ZERO,
            min_stock_level: min,
            max_stock_level: max,
            is_low_stock: min.map_or(false, |m| quantity < m),
            is_over_stock: max.map_or(false, |m| quantity > m),
        }
    }

    #[test_case(dec!(5), AlertSeverity::Warning ; "exactly a quarter of min")]
    #[test_case(dec!(4.999), AlertSeverity::Critical ; "just below a quarter")]
    #[test_case(dec!(4), AlertSeverity::Critical ; "well below a quarter")]
    #[test_case(dec!(19.999), AlertSeverity::Warning ; "just below min")]
    fn low_stock_severity_boundaries(quantity: Decimal, expected: AlertSeverity) {
        let levels = vec![level("flour", quantity, Some(dec!(20)), None)];
        let alerts = evaluate(&levels);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, AlertType::LowStock);
        assert_eq!(alerts[0].severity, expected);
    }

    #[test]
    fn quantity_at_min_is_not_alerted() {
        let levels = vec![level("flour", dec!(20), Some(dec!(20)), None)];
        assert!(evaluate(&levels).is_empty());
    }

    #[test]
    fn over_stock_is_always_warning() {
        let levels = vec![level("oil", dec!(120), None, Some(dec!(100)))];
        let alerts = evaluate(&levels);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, AlertType::OverStock);
        assert_eq!(alerts[0].severity, AlertSeverity::Warning);
    }

    #[test]
    fn no_threshold_no_alert() {
        let levels = vec![level("salt", dec!(-3), None, None)];
        assert!(evaluate(&levels).is_empty());
    }

    #[test]
    fn critical_sorts_before_warning_then_by_name() {
        let levels = vec![
            level("zucchini", dec!(19), Some(dec!(20)), None), // warning
            level("butter", dec!(1), Some(dec!(20)), None),    // critical
            level("anise", dec!(19), Some(dec!(20)), None),    // warning
            level("yeast", dec!(2), Some(dec!(20)), None),     // critical
        ];
        let alerts = evaluate(&levels);
        let names: Vec<&str> = alerts.iter().map(|a| a.item_name.as_str()).collect();
        assert_eq!(names, vec!["butter", "yeast", "anise", "zucchini"]);
    }

    #[test]
    fn negative_quantity_with_min_is_critical() {
        let levels = vec![level("cream", dec!(-2), Some(dec!(10)), None)];
        let alerts = evaluate(&levels);
        assert_eq!(alerts[0].severity, AlertSeverity::Critical);
    }
}

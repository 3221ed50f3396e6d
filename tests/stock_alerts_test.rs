mod common;

use common::TestApp;
use larder_api::{
    entities::stock_movement::MovementType,
    services::alerts::{AlertSeverity, AlertType},
    services::movements::NewMovement,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

async fn stock_up(app: &TestApp, item_id: Uuid, store_id: Uuid, quantity: Decimal) {
    app.state
        .services
        .movements
        .record(
            &app.ctx,
            NewMovement {
                item_id,
                store_id,
                quantity,
                movement_type: MovementType::Purchase,
                reason: None,
                notes: None,
                reference: None,
                cost_price: None,
            },
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn low_stock_below_quarter_of_min_is_critical() {
    let app = TestApp::new().await;
    let store = app.seed_store("Store A").await;
    // Scenario: min 20, on hand 4 -> 20% of min -> critical
    let item = app
        .seed_item_with_thresholds("Chicken", dec!(7), Some(dec!(20)), None)
        .await;
    stock_up(&app, item.id, store.id, dec!(4)).await;

    let alerts = app
        .state
        .services
        .alerts
        .alerts(&app.ctx, None)
        .await
        .unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].alert_type, AlertType::LowStock);
    assert_eq!(alerts[0].severity, AlertSeverity::Critical);
    assert_eq!(alerts[0].current_quantity, dec!(4));
    assert_eq!(alerts[0].min_stock_level, Some(dec!(20)));
}

#[tokio::test]
async fn low_stock_exactly_at_quarter_of_min_is_warning() {
    let app = TestApp::new().await;
    let store = app.seed_store("Store A").await;
    let item = app
        .seed_item_with_thresholds("Chicken", dec!(7), Some(dec!(20)), None)
        .await;
    stock_up(&app, item.id, store.id, dec!(5)).await;

    let alerts = app
        .state
        .services
        .alerts
        .alerts(&app.ctx, None)
        .await
        .unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].severity, AlertSeverity::Warning);
}

#[tokio::test]
async fn over_stock_is_warning_and_ordering_is_stable() {
    let app = TestApp::new().await;
    let store = app.seed_store("Store A").await;

    let over = app
        .seed_item_with_thresholds("Zeppole mix", dec!(3), None, Some(dec!(50)))
        .await;
    let critical = app
        .seed_item_with_thresholds("Anchovies", dec!(12), Some(dec!(10)), None)
        .await;
    let warning = app
        .seed_item_with_thresholds("Basil", dec!(2), Some(dec!(10)), None)
        .await;

    stock_up(&app, over.id, store.id, dec!(60)).await;
    stock_up(&app, critical.id, store.id, dec!(1)).await;
    stock_up(&app, warning.id, store.id, dec!(8)).await;

    let alerts = app
        .state
        .services
        .alerts
        .alerts(&app.ctx, None)
        .await
        .unwrap();

    // Critical first, then warnings alphabetically by item name
    let summary: Vec<(&str, AlertSeverity)> = alerts
        .iter()
        .map(|a| (a.item_name.as_str(), a.severity))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("Anchovies", AlertSeverity::Critical),
            ("Basil", AlertSeverity::Warning),
            ("Zeppole mix", AlertSeverity::Warning),
        ]
    );
    assert_eq!(alerts[2].alert_type, AlertType::OverStock);
}

#[tokio::test]
async fn items_without_thresholds_never_alert() {
    let app = TestApp::new().await;
    let store = app.seed_store("Store A").await;
    let item = app.seed_item("Napkins", dec!(0.10)).await;
    stock_up(&app, item.id, store.id, dec!(1)).await;

    let alerts = app
        .state
        .services
        .alerts
        .alerts(&app.ctx, None)
        .await
        .unwrap();
    assert!(alerts.is_empty());
}

#[tokio::test]
async fn alerts_can_be_narrowed_to_one_store() {
    let app = TestApp::new().await;
    let store_a = app.seed_store("Store A").await;
    let store_b = app.seed_store("Store B").await;
    let item = app
        .seed_item_with_thresholds("Flour", dec!(1), Some(dec!(10)), None)
        .await;

    stock_up(&app, item.id, store_a.id, dec!(2)).await; // low at A
    stock_up(&app, item.id, store_b.id, dec!(50)).await; // fine at B

    let alerts = app
        .state
        .services
        .alerts
        .alerts(&app.ctx, Some(store_b.id))
        .await
        .unwrap();
    assert!(alerts.is_empty());

    let alerts = app
        .state
        .services
        .alerts
        .alerts(&app.ctx, Some(store_a.id))
        .await
        .unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].store_id, store_a.id);
}

#[tokio::test]
async fn stock_levels_carry_threshold_flags() {
    let app = TestApp::new().await;
    let store = app.seed_store("Store A").await;
    let item = app
        .seed_item_with_thresholds("Cream", dec!(5), Some(dec!(10)), Some(dec!(100)))
        .await;
    stock_up(&app, item.id, store.id, dec!(3)).await;

    let levels = app
        .state
        .services
        .movements
        .stock_levels(&app.ctx, None)
        .await
        .unwrap();
    assert_eq!(levels.len(), 1);
    assert!(levels[0].is_low_stock);
    assert!(!levels[0].is_over_stock);
    assert_eq!(levels[0].unit, "kg");
    assert_eq!(levels[0].value, dec!(15));
}

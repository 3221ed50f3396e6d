mod common;

use assert_matches::assert_matches;
use common::TestApp;
use larder_api::{
    entities::stock_movement::{MovementType, ReferenceType},
    errors::ServiceError,
    services::movements::{MovementFilters, MovementReference, NewMovement},
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

fn purchase(item_id: Uuid, store_id: Uuid, quantity: Decimal) -> NewMovement {
    NewMovement {
        item_id,
        store_id,
        quantity,
        movement_type: MovementType::Purchase,
        reason: None,
        notes: None,
        reference: None,
        cost_price: None,
    }
}

fn waste(item_id: Uuid, store_id: Uuid, quantity: Decimal) -> NewMovement {
    NewMovement {
        movement_type: MovementType::Waste,
        ..purchase(item_id, store_id, quantity)
    }
}

#[tokio::test]
async fn aggregate_sums_signed_quantities() {
    let app = TestApp::new().await;
    let store = app.seed_store("Store A").await;
    let chicken = app.seed_item("Chicken breast", dec!(7.50)).await;
    let movements = &app.state.services.movements;

    // Scenario: +50 purchase then -5 waste leaves 45 on hand
    movements
        .record(&app.ctx, purchase(chicken.id, store.id, dec!(50)))
        .await
        .unwrap();
    movements
        .record(&app.ctx, waste(chicken.id, store.id, dec!(-5)))
        .await
        .unwrap();

    let on_hand = movements
        .on_hand(&app.ctx, chicken.id, Some(store.id), None)
        .await
        .unwrap();
    assert_eq!(on_hand, dec!(45));

    // Value derives from the item's current cost price
    let levels = movements.stock_levels(&app.ctx, None).await.unwrap();
    assert_eq!(levels.len(), 1);
    assert_eq!(levels[0].quantity, dec!(45));
    assert_eq!(levels[0].value, dec!(45) * dec!(7.50));
}

#[tokio::test]
async fn aggregate_spans_stores_unless_narrowed() {
    let app = TestApp::new().await;
    let store_a = app.seed_store("Store A").await;
    let store_b = app.seed_store("Store B").await;
    let rice = app.seed_item("Rice", dec!(2)).await;
    let movements = &app.state.services.movements;

    movements
        .record(&app.ctx, purchase(rice.id, store_a.id, dec!(30)))
        .await
        .unwrap();
    movements
        .record(&app.ctx, purchase(rice.id, store_b.id, dec!(12)))
        .await
        .unwrap();

    let per_store = movements
        .on_hand(&app.ctx, rice.id, Some(store_a.id), None)
        .await
        .unwrap();
    assert_eq!(per_store, dec!(30));

    let across = movements
        .on_hand(&app.ctx, rice.id, None, None)
        .await
        .unwrap();
    assert_eq!(across, dec!(42));
}

#[tokio::test]
async fn zero_quantity_is_rejected() {
    let app = TestApp::new().await;
    let store = app.seed_store("Store A").await;
    let item = app.seed_item("Salt", dec!(1)).await;

    let err = app
        .state
        .services
        .movements
        .record(&app.ctx, purchase(item.id, store.id, Decimal::ZERO))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));
}

#[tokio::test]
async fn sign_mismatch_is_rejected() {
    let app = TestApp::new().await;
    let store = app.seed_store("Store A").await;
    let item = app.seed_item("Salt", dec!(1)).await;
    let movements = &app.state.services.movements;

    let err = movements
        .record(&app.ctx, purchase(item.id, store.id, dec!(-3)))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));

    let err = movements
        .record(&app.ctx, waste(item.id, store.id, dec!(3)))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));

    // Nothing landed in the ledger
    let on_hand = movements
        .on_hand(&app.ctx, item.id, Some(store.id), None)
        .await
        .unwrap();
    assert_eq!(on_hand, Decimal::ZERO);
}

#[tokio::test]
async fn cross_tenant_item_and_store_are_not_found() {
    let app = TestApp::new().await;
    let store = app.seed_store("Store A").await;
    let item = app.seed_item("Salt", dec!(1)).await;
    let movements = &app.state.services.movements;

    let stranger = app.other_tenant();
    let err = movements
        .record(&stranger, purchase(item.id, store.id, dec!(5)))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));

    let err = movements
        .on_hand(&stranger, item.id, Some(store.id), None)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
async fn point_in_time_aggregate_excludes_later_movements() {
    let app = TestApp::new().await;
    let store = app.seed_store("Store A").await;
    let item = app.seed_item("Flour", dec!(1.20)).await;
    let movements = &app.state.services.movements;

    movements
        .record(&app.ctx, purchase(item.id, store.id, dec!(10)))
        .await
        .unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let cutoff = chrono::Utc::now();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;

    movements
        .record(&app.ctx, purchase(item.id, store.id, dec!(7)))
        .await
        .unwrap();

    let at_cutoff = movements
        .on_hand(&app.ctx, item.id, Some(store.id), Some(cutoff))
        .await
        .unwrap();
    assert_eq!(at_cutoff, dec!(10));

    let now = movements
        .on_hand(&app.ctx, item.id, Some(store.id), None)
        .await
        .unwrap();
    assert_eq!(now, dec!(17));
}

#[tokio::test]
async fn manual_movement_correction_compensates_and_conflicts_on_retry() {
    let app = TestApp::new().await;
    let store = app.seed_store("Store A").await;
    let item = app.seed_item("Butter", dec!(9)).await;
    let movements = &app.state.services.movements;

    let original = movements
        .record(&app.ctx, purchase(item.id, store.id, dec!(20)))
        .await
        .unwrap();

    let correction = movements
        .correct(&app.ctx, original.id, Some("typo in receiving".to_string()))
        .await
        .unwrap();

    assert_eq!(correction.quantity, dec!(-20));
    assert_eq!(correction.movement_type, MovementType::Adjustment);
    assert_eq!(correction.reference_id, Some(original.id));
    assert_eq!(
        correction.reference_type,
        Some(ReferenceType::ManualCorrection)
    );

    // The pair nets to zero
    let on_hand = movements
        .on_hand(&app.ctx, item.id, Some(store.id), None)
        .await
        .unwrap();
    assert_eq!(on_hand, Decimal::ZERO);

    // A second correction of the same movement is refused
    let err = movements
        .correct(&app.ctx, original.id, None)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Conflict(_));
}

#[tokio::test]
async fn engine_produced_movements_are_not_correctable() {
    let app = TestApp::new().await;
    let store = app.seed_store("Store A").await;
    let item = app.seed_item("Oil", dec!(4)).await;
    let movements = &app.state.services.movements;

    let produced = movements
        .record(
            &app.ctx,
            NewMovement {
                reference: Some(MovementReference {
                    id: Uuid::new_v4(),
                    kind: ReferenceType::Invoice,
                }),
                ..purchase(item.id, store.id, dec!(5))
            },
        )
        .await
        .unwrap();

    let err = movements.correct(&app.ctx, produced.id, None).await.unwrap_err();
    assert_matches!(err, ServiceError::InvalidState(_));
}

#[tokio::test]
async fn movement_history_filters_and_paginates() {
    let app = TestApp::new().await;
    let store = app.seed_store("Store A").await;
    let item = app.seed_item("Beans", dec!(3)).await;
    let other = app.seed_item("Corn", dec!(2)).await;
    let movements = &app.state.services.movements;

    for _ in 0..3 {
        movements
            .record(&app.ctx, purchase(item.id, store.id, dec!(1)))
            .await
            .unwrap();
    }
    movements
        .record(&app.ctx, purchase(other.id, store.id, dec!(1)))
        .await
        .unwrap();

    let (page, total) = movements
        .list(
            &app.ctx,
            MovementFilters {
                item_id: Some(item.id),
                ..Default::default()
            },
            1,
            2,
        )
        .await
        .unwrap();
    assert_eq!(total, 3);
    assert_eq!(page.len(), 2);

    let (all, total) = movements
        .list(&app.ctx, MovementFilters::default(), 1, 50)
        .await
        .unwrap();
    assert_eq!(total, 4);
    assert_eq!(all.len(), 4);
}

mod common;

use assert_matches::assert_matches;
use common::TestApp;
use larder_api::{
    entities::{
        stock_movement::{MovementType, ReferenceType},
        transfer::TransferStatus,
    },
    errors::ServiceError,
    events::Event,
    services::movements::MovementFilters,
    services::transfers::{NewTransfer, TransferLineInput},
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

fn transfer_of(
    from: Uuid,
    to: Uuid,
    lines: Vec<(Uuid, Decimal)>,
) -> NewTransfer {
    NewTransfer {
        from_store_id: from,
        to_store_id: to,
        notes: None,
        lines: lines
            .into_iter()
            .map(|(item_id, quantity)| TransferLineInput { item_id, quantity })
            .collect(),
    }
}

#[tokio::test]
async fn completion_produces_paired_movements() {
    let mut app = TestApp::new().await;
    let store_a = app.seed_store("Store A").await;
    let store_b = app.seed_store("Store B").await;
    let item = app.seed_item("Tomatoes", dec!(2.40)).await;
    let services = app.state.services.clone();

    // Scenario: 10 units A -> B
    let details = services
        .transfers
        .create(
            &app.ctx,
            transfer_of(store_a.id, store_b.id, vec![(item.id, dec!(10))]),
        )
        .await
        .unwrap();
    assert_eq!(details.transfer.status, TransferStatus::Pending);

    let completed = services
        .transfers
        .complete(&app.ctx, details.transfer.id)
        .await
        .unwrap();
    assert_eq!(completed.transfer.status, TransferStatus::Completed);
    assert!(completed.transfer.completed_at.is_some());
    assert_eq!(completed.transfer.completed_by, Some(app.ctx.user_id));

    // Exactly two movements, exact negatives, both referencing the transfer
    let (movements, total) = services
        .movements
        .list(&app.ctx, MovementFilters::default(), 1, 50)
        .await
        .unwrap();
    assert_eq!(total, 2);

    let out = movements
        .iter()
        .find(|m| m.movement_type == MovementType::TransferOut)
        .expect("missing TRANSFER_OUT");
    let inbound = movements
        .iter()
        .find(|m| m.movement_type == MovementType::TransferIn)
        .expect("missing TRANSFER_IN");

    assert_eq!(out.store_id, store_a.id);
    assert_eq!(out.quantity, dec!(-10));
    assert_eq!(inbound.store_id, store_b.id);
    assert_eq!(inbound.quantity, dec!(10));
    assert_eq!(out.quantity, -inbound.quantity);
    assert_eq!(out.reference_id, Some(details.transfer.id));
    assert_eq!(inbound.reference_id, Some(details.transfer.id));
    assert_eq!(out.reference_type, Some(ReferenceType::Transfer));
    assert_eq!(out.cost_price, dec!(2.40));

    // Balances moved
    let at_a = services
        .movements
        .on_hand(&app.ctx, item.id, Some(store_a.id), None)
        .await
        .unwrap();
    let at_b = services
        .movements
        .on_hand(&app.ctx, item.id, Some(store_b.id), None)
        .await
        .unwrap();
    assert_eq!(at_a, dec!(-10));
    assert_eq!(at_b, dec!(10));

    let events = app.drain_events();
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::TransferCompleted { transfer_id, .. } if *transfer_id == details.transfer.id)));
}

#[tokio::test]
async fn create_validations() {
    let app = TestApp::new().await;
    let store_a = app.seed_store("Store A").await;
    let store_b = app.seed_store("Store B").await;
    let item = app.seed_item("Tomatoes", dec!(2)).await;
    let transfers = &app.state.services.transfers;

    // Same store
    let err = transfers
        .create(
            &app.ctx,
            transfer_of(store_a.id, store_a.id, vec![(item.id, dec!(1))]),
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));

    // Empty lines
    let err = transfers
        .create(&app.ctx, transfer_of(store_a.id, store_b.id, vec![]))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));

    // Non-positive quantity
    let err = transfers
        .create(
            &app.ctx,
            transfer_of(store_a.id, store_b.id, vec![(item.id, dec!(0))]),
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));

    // Unknown item
    let err = transfers
        .create(
            &app.ctx,
            transfer_of(store_a.id, store_b.id, vec![(Uuid::new_v4(), dec!(1))]),
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
async fn in_transit_then_complete() {
    let app = TestApp::new().await;
    let store_a = app.seed_store("Store A").await;
    let store_b = app.seed_store("Store B").await;
    let item = app.seed_item("Tomatoes", dec!(2)).await;
    let transfers = &app.state.services.transfers;

    let details = transfers
        .create(
            &app.ctx,
            transfer_of(store_a.id, store_b.id, vec![(item.id, dec!(4))]),
        )
        .await
        .unwrap();

    let in_transit = transfers
        .mark_in_transit(&app.ctx, details.transfer.id)
        .await
        .unwrap();
    assert_eq!(in_transit.status, TransferStatus::InTransit);

    let completed = transfers
        .complete(&app.ctx, details.transfer.id)
        .await
        .unwrap();
    assert_eq!(completed.transfer.status, TransferStatus::Completed);
}

#[tokio::test]
async fn invalid_transitions_mutate_nothing() {
    let app = TestApp::new().await;
    let store_a = app.seed_store("Store A").await;
    let store_b = app.seed_store("Store B").await;
    let item = app.seed_item("Tomatoes", dec!(2)).await;
    let services = app.state.services.clone();

    let details = services
        .transfers
        .create(
            &app.ctx,
            transfer_of(store_a.id, store_b.id, vec![(item.id, dec!(4))]),
        )
        .await
        .unwrap();
    let id = details.transfer.id;

    services.transfers.cancel(&app.ctx, id).await.unwrap();

    // Completing a cancelled transfer fails and appends nothing
    let err = services.transfers.complete(&app.ctx, id).await.unwrap_err();
    assert_matches!(err, ServiceError::InvalidState(_));

    let (_, total) = services
        .movements
        .list(&app.ctx, MovementFilters::default(), 1, 10)
        .await
        .unwrap();
    assert_eq!(total, 0);

    // Cancelling an in-transit transfer fails
    let second = services
        .transfers
        .create(
            &app.ctx,
            transfer_of(store_a.id, store_b.id, vec![(item.id, dec!(4))]),
        )
        .await
        .unwrap();
    services
        .transfers
        .mark_in_transit(&app.ctx, second.transfer.id)
        .await
        .unwrap();
    let err = services
        .transfers
        .cancel(&app.ctx, second.transfer.id)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidState(_));

    // Double in-transit fails
    let err = services
        .transfers
        .mark_in_transit(&app.ctx, second.transfer.id)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidState(_));
}

#[tokio::test]
async fn delete_only_while_pending() {
    let app = TestApp::new().await;
    let store_a = app.seed_store("Store A").await;
    let store_b = app.seed_store("Store B").await;
    let item = app.seed_item("Tomatoes", dec!(2)).await;
    let transfers = &app.state.services.transfers;

    let pending = transfers
        .create(
            &app.ctx,
            transfer_of(store_a.id, store_b.id, vec![(item.id, dec!(4))]),
        )
        .await
        .unwrap();
    transfers.delete(&app.ctx, pending.transfer.id).await.unwrap();

    let err = transfers
        .get(&app.ctx, pending.transfer.id)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));

    let completed = transfers
        .create(
            &app.ctx,
            transfer_of(store_a.id, store_b.id, vec![(item.id, dec!(4))]),
        )
        .await
        .unwrap();
    transfers
        .complete(&app.ctx, completed.transfer.id)
        .await
        .unwrap();

    let err = transfers
        .delete(&app.ctx, completed.transfer.id)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidState(_));
}

#[tokio::test]
async fn transfers_are_tenant_scoped() {
    let app = TestApp::new().await;
    let store_a = app.seed_store("Store A").await;
    let store_b = app.seed_store("Store B").await;
    let item = app.seed_item("Tomatoes", dec!(2)).await;
    let transfers = &app.state.services.transfers;

    let details = transfers
        .create(
            &app.ctx,
            transfer_of(store_a.id, store_b.id, vec![(item.id, dec!(4))]),
        )
        .await
        .unwrap();

    let stranger = app.other_tenant();
    let err = transfers
        .complete(&stranger, details.transfer.id)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}

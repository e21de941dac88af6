mod common;

use serde_json::json;

use common::{FABRIC, GIFT_CARD, RIBBON, SPOOL, Shop, UNMAPPED, cart_id, shop};
use cutstock_checkout::{
    CartReservationState, CheckoutConfig, CheckoutError, RESERVATION_ID_KEY, ReservationOrchestrator,
    ServiceError,
};
use cutstock_core::{DomainError, LineItemId, LocationId, ReservationId};
use cutstock_infra::{InMemoryCart, InMemoryCatalog, InMemoryLedger, LedgerCall};
use std::sync::Arc;

type Orchestrator =
    ReservationOrchestrator<Arc<InMemoryCatalog>, Arc<InMemoryLedger>, Arc<InMemoryCart>>;

fn orchestrator(shop: &Shop) -> Orchestrator {
    orchestrator_with(shop, CheckoutConfig::default())
}

fn orchestrator_with(shop: &Shop, config: CheckoutConfig) -> Orchestrator {
    ReservationOrchestrator::new(
        shop.catalog.clone(),
        shop.ledger.clone(),
        shop.cart.clone(),
        config,
    )
}

/// Linen (9 units), ribbon (3 units) and an unmanaged gift card.
fn seed_mixed_cart(shop: &Shop) {
    shop.seed("item_linen", FABRIC, 2.25, json!({ "note": "one piece please" }));
    shop.seed("item_ribbon", RIBBON, 1.5, json!({}));
    shop.seed("item_gift", GIFT_CARD, 1.0, json!({}));
}

#[tokio::test]
async fn reserves_managed_items_in_one_batch_and_records_ids() {
    let shop = shop();
    seed_mixed_cart(&shop);

    let reserved = orchestrator(&shop)
        .reserve_on_checkout_start(&cart_id(), None)
        .await
        .unwrap();

    assert_eq!(reserved.len(), 2);
    assert_eq!(shop.ledger.create_calls(), 1);

    let calls = shop.ledger.calls();
    let LedgerCall::CreateReservations(requests) = &calls[0] else {
        panic!("Expected a create call first, got {calls:?}");
    };
    let quantities: Vec<i64> = requests.iter().map(|r| r.quantity).collect();
    assert_eq!(quantities, vec![9, 3]);
    assert!(requests.iter().all(|r| r.cart_id.as_ref() == Some(&cart_id())));

    for entry in &reserved {
        let item = shop.item(&entry.line_item_id);
        assert_eq!(item.metadata.reservation_id(), Some(entry.reservation_id.clone()));
    }

    let linen = shop.item(&"item_linen".into());
    assert_eq!(linen.metadata.get("note"), Some(&json!("one piece please")));

    let gift = shop.item(&"item_gift".into());
    assert!(gift.metadata.get(RESERVATION_ID_KEY).is_none());
    assert_eq!(shop.ledger.reservations().len(), 2);
}

#[tokio::test]
async fn empty_cart_is_a_no_op() {
    let shop = shop();

    let reserved = orchestrator(&shop)
        .reserve_on_checkout_start(&cart_id(), None)
        .await
        .unwrap();

    assert!(reserved.is_empty());
    assert!(shop.ledger.calls().is_empty());
}

#[tokio::test]
async fn cart_of_unmanaged_items_never_reaches_the_ledger() {
    let shop = shop();
    shop.seed("item_gift", GIFT_CARD, 2.0, json!({}));

    let reserved = orchestrator(&shop)
        .reserve_on_checkout_start(&cart_id(), None)
        .await
        .unwrap();

    assert!(reserved.is_empty());
    assert_eq!(shop.ledger.create_calls(), 0);
    assert!(shop.cart.metadata_writes().is_empty());
}

#[tokio::test]
async fn missing_inventory_mapping_aborts_before_any_reservation() {
    let shop = shop();
    seed_mixed_cart(&shop);
    shop.seed("item_unmapped", UNMAPPED, 1.0, json!({}));

    let err = orchestrator(&shop)
        .reserve_on_checkout_start(&cart_id(), None)
        .await
        .unwrap_err();

    match err {
        CheckoutError::Domain(DomainError::MissingInventoryMapping { variant_id }) => {
            assert_eq!(variant_id, UNMAPPED);
        }
        other => panic!("Expected MissingInventoryMapping, got {other:?}"),
    }
    assert_eq!(shop.ledger.create_calls(), 0);
    assert!(shop.cart.metadata_writes().is_empty());
}

#[tokio::test]
async fn variant_lookup_failure_aborts_before_any_reservation() {
    let shop = shop();
    seed_mixed_cart(&shop);
    shop.catalog.fail_lookups_for(RIBBON.into()).unwrap();

    let err = orchestrator(&shop)
        .reserve_on_checkout_start(&cart_id(), None)
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::Catalog(ServiceError::Unavailable(_))));
    assert_eq!(shop.ledger.create_calls(), 0);
    assert!(shop.cart.metadata_writes().is_empty());
}

#[tokio::test]
async fn ledger_failure_surfaces_as_reservation_failed() {
    let shop = shop();
    seed_mixed_cart(&shop);
    shop.ledger.fail_next_create("ledger offline").unwrap();

    let err = orchestrator(&shop)
        .reserve_on_checkout_start(&cart_id(), None)
        .await
        .unwrap_err();

    match &err {
        CheckoutError::Domain(DomainError::ReservationFailed(msg)) => {
            assert!(msg.contains("ledger offline"));
        }
        other => panic!("Expected ReservationFailed, got {other:?}"),
    }
    assert_eq!(err.user_message(), "unable to reserve stock, please retry");
    assert!(shop.cart.metadata_writes().is_empty());
    assert!(shop.ledger.reservations().is_empty());
}

#[tokio::test]
async fn partial_batch_is_compensated_and_nothing_is_recorded() {
    let shop = shop();
    seed_mixed_cart(&shop);
    shop.ledger.truncate_next_create(1).unwrap();

    let err = orchestrator(&shop)
        .reserve_on_checkout_start(&cart_id(), None)
        .await
        .unwrap_err();

    match err {
        CheckoutError::Domain(DomainError::ReservationMismatch {
            requested,
            returned,
        }) => {
            assert_eq!((requested, returned), (2, 1));
        }
        other => panic!("Expected ReservationMismatch, got {other:?}"),
    }

    let calls = shop.ledger.calls();
    assert_eq!(calls.len(), 2);
    match &calls[1] {
        LedgerCall::DeleteReservations(ids) => assert_eq!(ids.len(), 1),
        other => panic!("Expected compensating delete, got {other:?}"),
    }
    assert!(shop.ledger.reservations().is_empty());
    assert!(shop.cart.metadata_writes().is_empty());
    assert_eq!(
        orchestrator(&shop).reservation_state(&cart_id()).await.unwrap(),
        CartReservationState::Unreserved
    );
}

#[tokio::test]
async fn failed_compensation_still_reports_mismatch() {
    let shop = shop();
    seed_mixed_cart(&shop);
    shop.ledger.truncate_next_create(1).unwrap();
    shop.ledger.fail_deletes(Some("ledger offline".to_string())).unwrap();

    let err = orchestrator(&shop)
        .reserve_on_checkout_start(&cart_id(), None)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CheckoutError::Domain(DomainError::ReservationMismatch { .. })
    ));
    assert!(shop.cart.metadata_writes().is_empty());
}

#[tokio::test]
async fn metadata_write_failure_rolls_back_the_batch() {
    let shop = shop();
    seed_mixed_cart(&shop);
    shop.cart.fail_metadata_writes_for("item_ribbon".into()).unwrap();

    let err = orchestrator(&shop)
        .reserve_on_checkout_start(&cart_id(), None)
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::Cart(_)));
    assert!(shop.ledger.reservations().is_empty());

    let linen = shop.item(&"item_linen".into());
    assert!(linen.metadata.reservation_id().is_none());
    assert_eq!(linen.metadata.get("note"), Some(&json!("one piece please")));
}

#[tokio::test]
async fn release_clears_only_items_that_hold_reservations() {
    let shop = shop();
    seed_mixed_cart(&shop);
    let orchestrator = orchestrator(&shop);

    let reserved = orchestrator
        .reserve_on_checkout_start(&cart_id(), None)
        .await
        .unwrap();
    let summary = orchestrator.release_reservations(&cart_id()).await.unwrap();

    assert_eq!(summary.released, reserved);
    assert_eq!(summary.skipped, 1);
    assert!(shop.ledger.reservations().is_empty());

    let deleted: Vec<ReservationId> = match shop.ledger.calls().last() {
        Some(LedgerCall::DeleteReservations(ids)) => ids.clone(),
        other => panic!("Expected a bulk delete, got {other:?}"),
    };
    assert_eq!(deleted.len(), 2);

    let linen = shop.item(&"item_linen".into());
    assert!(linen.metadata.get(RESERVATION_ID_KEY).is_none());
    assert_eq!(linen.metadata.get("note"), Some(&json!("one piece please")));
}

#[tokio::test]
async fn release_is_idempotent() {
    let shop = shop();
    seed_mixed_cart(&shop);
    let orchestrator = orchestrator(&shop);

    // Never reserved: nothing to do.
    let summary = orchestrator.release_reservations(&cart_id()).await.unwrap();
    assert!(summary.released.is_empty());
    assert_eq!(summary.skipped, 3);
    assert!(shop.ledger.calls().is_empty());

    orchestrator
        .reserve_on_checkout_start(&cart_id(), None)
        .await
        .unwrap();
    orchestrator.release_reservations(&cart_id()).await.unwrap();
    let calls_after_first_release = shop.ledger.calls().len();

    let again = orchestrator.release_reservations(&cart_id()).await.unwrap();
    assert!(again.released.is_empty());
    assert_eq!(shop.ledger.calls().len(), calls_after_first_release);
}

#[tokio::test]
async fn ledger_delete_failure_leaves_the_cart_reserved() {
    let shop = shop();
    seed_mixed_cart(&shop);
    let orchestrator = orchestrator(&shop);
    let reserved = orchestrator
        .reserve_on_checkout_start(&cart_id(), None)
        .await
        .unwrap();

    shop.ledger.fail_deletes(Some("ledger offline".to_string())).unwrap();
    let err = orchestrator.release_reservations(&cart_id()).await.unwrap_err();

    assert!(matches!(err, CheckoutError::Ledger(ServiceError::Unavailable(_))));
    assert_eq!(shop.ledger.reservations().len(), 2);
    for entry in &reserved {
        let item = shop.item(&entry.line_item_id);
        assert_eq!(item.metadata.reservation_id(), Some(entry.reservation_id.clone()));
    }

    shop.ledger.fail_deletes(None).unwrap();
    let summary = orchestrator.release_reservations(&cart_id()).await.unwrap();
    assert_eq!(summary.released, reserved);
    assert!(shop.ledger.reservations().is_empty());
}

#[tokio::test]
async fn failed_strip_is_reported_and_cleared_by_the_next_release() {
    let shop = shop();
    seed_mixed_cart(&shop);
    let orchestrator = orchestrator(&shop);
    orchestrator
        .reserve_on_checkout_start(&cart_id(), None)
        .await
        .unwrap();

    shop.cart.fail_metadata_writes_for("item_linen".into()).unwrap();
    let err = orchestrator.release_reservations(&cart_id()).await.unwrap_err();

    match &err {
        CheckoutError::ReleaseIncomplete { pending, .. } => {
            assert_eq!(pending, &vec![LineItemId::new("item_linen")]);
        }
        other => panic!("Expected an incomplete release, got {other:?}"),
    }
    assert!(shop.ledger.reservations().is_empty());
    // Items after the failing one are still cleared.
    assert!(shop.item(&"item_ribbon".into()).metadata.reservation_id().is_none());
    let stale = shop
        .item(&"item_linen".into())
        .metadata
        .reservation_id()
        .unwrap();

    shop.cart.allow_metadata_writes_for(&"item_linen".into()).unwrap();
    let summary = orchestrator.release_reservations(&cart_id()).await.unwrap();

    assert_eq!(summary.released.len(), 1);
    assert_eq!(summary.released[0].reservation_id, stale);
    assert_eq!(
        orchestrator.reservation_state(&cart_id()).await.unwrap(),
        CartReservationState::Unreserved
    );
}

#[tokio::test]
async fn fractional_quantity_without_policy_is_not_reserved() {
    let shop = shop();
    shop.seed("item_linen", FABRIC, 2.25, json!({}));
    shop.seed("item_spool", SPOOL, 0.4, json!({}));

    let err = orchestrator(&shop)
        .reserve_on_checkout_start(&cart_id(), None)
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::Domain(DomainError::Validation(_))));
    assert_eq!(shop.ledger.create_calls(), 0);
    assert!(shop.cart.metadata_writes().is_empty());
}

#[tokio::test]
async fn off_grid_quantity_is_not_rounded_at_reservation() {
    let shop = shop();
    shop.seed("item_spool", SPOOL, 3.7, json!({}));

    let err = orchestrator(&shop)
        .reserve_on_checkout_start(&cart_id(), None)
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::Domain(DomainError::Validation(_))));
    assert!(err.user_message().contains("3.7"));
    assert!(shop.ledger.calls().is_empty());
}

#[tokio::test]
async fn reserving_a_reserved_cart_is_a_conflict() {
    let shop = shop();
    seed_mixed_cart(&shop);
    let orchestrator = orchestrator(&shop);

    orchestrator
        .reserve_on_checkout_start(&cart_id(), None)
        .await
        .unwrap();
    let err = orchestrator
        .reserve_on_checkout_start(&cart_id(), None)
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::Domain(DomainError::Conflict(_))));
    assert_eq!(shop.ledger.create_calls(), 1);

    // A fresh checkout attempt works after release.
    orchestrator.release_reservations(&cart_id()).await.unwrap();
    let reserved = orchestrator
        .reserve_on_checkout_start(&cart_id(), None)
        .await
        .unwrap();
    assert_eq!(reserved.len(), 2);
}

#[tokio::test]
async fn state_follows_the_checkout_cycle() {
    let shop = shop();
    shop.seed("item_spool", SPOOL, 2.0, json!({}));
    let orchestrator = orchestrator(&shop);

    assert_eq!(
        orchestrator.reservation_state(&cart_id()).await.unwrap(),
        CartReservationState::Unreserved
    );
    orchestrator
        .reserve_on_checkout_start(&cart_id(), None)
        .await
        .unwrap();
    assert_eq!(
        orchestrator.reservation_state(&cart_id()).await.unwrap(),
        CartReservationState::Reserved
    );
    orchestrator.release_reservations(&cart_id()).await.unwrap();
    assert_eq!(
        orchestrator.reservation_state(&cart_id()).await.unwrap(),
        CartReservationState::Unreserved
    );
}

#[tokio::test]
async fn location_defaults_from_config_and_can_be_overridden() {
    let shop = shop();
    shop.seed("item_spool", SPOOL, 2.0, json!({}));
    let config = CheckoutConfig::default().with_default_location(LocationId::new("loc_main"));
    let orchestrator = orchestrator_with(&shop, config);

    orchestrator
        .reserve_on_checkout_start(&cart_id(), None)
        .await
        .unwrap();
    orchestrator.release_reservations(&cart_id()).await.unwrap();
    orchestrator
        .reserve_on_checkout_start(&cart_id(), Some(&LocationId::new("loc_annex")))
        .await
        .unwrap();

    let locations: Vec<Option<LocationId>> = shop
        .ledger
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            LedgerCall::CreateReservations(requests) => Some(requests[0].location_id.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(
        locations,
        vec![
            Some(LocationId::new("loc_main")),
            Some(LocationId::new("loc_annex"))
        ]
    );
}

mod common;

use cartwatch::application::events::{EventKind, StoreEvent};
use cartwatch::application::store::Store;
use cartwatch::config::StoreConfig;
use cartwatch::domain::cart::CartId;
use cartwatch::domain::checkout::{CheckoutOutcome, FailureReason, StatusQueryResult};
use cartwatch::error::StoreError;
use cartwatch::infrastructure::in_memory::{LocalCheckoutGateway, ScriptedStatusOracle};
use common::{GatedOracle, id, sample_catalog};
use rust_decimal_macros::dec;
use std::sync::{Arc, Mutex};

fn scripted_store() -> (Store, ScriptedStatusOracle) {
    let oracle = ScriptedStatusOracle::new();
    let store = Store::new(
        &StoreConfig::default(),
        sample_catalog(),
        Arc::new(oracle.clone()),
        Box::new(LocalCheckoutGateway::new("demo.myshopify.com")),
    )
    .unwrap();
    (store, oracle)
}

fn record_events(store: &Store) -> Arc<Mutex<Vec<StoreEvent>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    for kind in [
        EventKind::CartUpdated,
        EventKind::CartCleared,
        EventKind::PurchaseComplete,
    ] {
        let sink = Arc::clone(&events);
        store
            .events()
            .subscribe(kind, move |event| sink.lock().unwrap().push(event.clone()));
    }
    events
}

async fn focus(store: &Store) {
    for query in store.application_focus(true) {
        query.await.unwrap();
    }
}

#[tokio::test]
async fn test_completed_checkout_announces_purchase_and_clears_cart() {
    let (store, oracle) = scripted_store();
    let cart = CartId::default();
    store.add_to_cart("101", 2, &cart).unwrap();
    store.add_to_cart("201", 1, &cart).unwrap();
    assert_eq!(store.cart(&cart).subtotal(), dec!(47.98));

    let session = store.check_out(&cart).await.unwrap();
    assert_eq!(session.id, id("chk_1"));
    assert_eq!(session.web_url, "https://demo.myshopify.com/checkouts/chk_1");
    assert_eq!(store.cart(&cart).current_checkout(), Some(&id("chk_1")));
    assert_eq!(store.active_watchers(), 1);

    let events = record_events(&store);
    oracle
        .script(
            id("chk_1"),
            [StatusQueryResult::Pending, StatusQueryResult::Completed],
        )
        .await;

    focus(&store).await;
    assert!(events.lock().unwrap().is_empty());
    assert_eq!(store.cart_quantity(&cart), 3);

    focus(&store).await;
    assert_eq!(
        *events.lock().unwrap(),
        vec![
            StoreEvent::PurchaseComplete {
                checkout: id("chk_1")
            },
            StoreEvent::CartCleared { cart: cart.clone() },
            StoreEvent::CartUpdated {
                cart: cart.clone(),
                quantity: 0
            },
        ]
    );
    assert!(store.cart(&cart).is_empty());
    assert_eq!(store.outcomes(), vec![CheckoutOutcome::Completed(id("chk_1"))]);
    assert_eq!(store.active_watchers(), 0);

    // Finished watchers are discarded on the next focus and never polled again.
    assert!(store.application_focus(true).is_empty());
    assert_eq!(oracle.queries_for(&id("chk_1")).await, 2);
}

#[tokio::test]
async fn test_abandoned_checkout_keeps_cart() {
    let (store, oracle) = scripted_store();
    let cart = CartId::default();
    store.add_to_cart("102", 1, &cart).unwrap();
    store.check_out(&cart).await.unwrap();

    let events = record_events(&store);
    oracle
        .push(
            id("chk_1"),
            StatusQueryResult::QueryFailed(FailureReason::Unresolvable("Invalid global id".into())),
        )
        .await;
    focus(&store).await;

    assert!(events.lock().unwrap().is_empty());
    assert_eq!(store.cart_quantity(&cart), 1);
    assert_eq!(store.outcomes(), vec![CheckoutOutcome::Abandoned(id("chk_1"))]);
}

#[tokio::test]
async fn test_transient_failure_keeps_watching() {
    let (store, oracle) = scripted_store();
    store.add_to_cart("101", 1, &CartId::default()).unwrap();
    store.check_out(&CartId::default()).await.unwrap();

    oracle
        .push(
            id("chk_1"),
            StatusQueryResult::QueryFailed(FailureReason::Transient("timeout".into())),
        )
        .await;
    focus(&store).await;

    assert_eq!(store.active_watchers(), 1);
    assert!(store.outcomes().is_empty());
}

#[tokio::test]
async fn test_one_shot_checkout_uses_buy_now_cart() {
    let (store, oracle) = scripted_store();
    store.add_to_cart("101", 2, &CartId::default()).unwrap();

    let session = store.one_shot_checkout("201", 3).await.unwrap();
    assert_eq!(store.cart_quantity(&CartId::buy_now()), 3);
    assert_eq!(store.cart(&CartId::buy_now()).current_checkout(), Some(&session.id));

    oracle.push(session.id.clone(), StatusQueryResult::Completed).await;
    focus(&store).await;

    assert!(store.cart(&CartId::buy_now()).is_empty());
    assert_eq!(store.cart_quantity(&CartId::default()), 2);
}

#[tokio::test]
async fn test_each_checkout_gets_its_own_watcher() {
    let (store, oracle) = scripted_store();
    let gifts = CartId::new("gifts");
    store.add_to_cart("101", 1, &CartId::default()).unwrap();
    store.add_to_cart("201", 1, &gifts).unwrap();

    let first = store.check_out(&CartId::default()).await.unwrap();
    let second = store.check_out(&gifts).await.unwrap();
    assert_ne!(first.id, second.id);
    assert_eq!(store.active_watchers(), 2);

    oracle.push(second.id.clone(), StatusQueryResult::Completed).await;
    focus(&store).await;

    assert_eq!(store.active_watchers(), 1);
    assert!(store.cart(&gifts).is_empty());
    assert_eq!(store.cart_quantity(&CartId::default()), 1);
}

#[tokio::test]
async fn test_checkout_unknown_or_empty() {
    let (store, _) = scripted_store();
    assert!(matches!(
        store.one_shot_checkout("999", 1).await,
        Err(StoreError::UnknownVariant(_))
    ));
    assert!(matches!(
        store.check_out(&CartId::new("nothing")).await,
        Err(StoreError::EmptyCart(_))
    ));
}

#[tokio::test]
async fn test_shutdown_discards_in_flight_responses() {
    let oracle = GatedOracle::new(vec![StatusQueryResult::Completed]);
    let store = Store::new(
        &StoreConfig::default(),
        sample_catalog(),
        Arc::new(oracle.clone()),
        Box::new(LocalCheckoutGateway::default()),
    )
    .unwrap();
    let cart = CartId::default();
    store.add_to_cart("101", 1, &cart).unwrap();
    store.check_out(&cart).await.unwrap();
    let events = record_events(&store);

    let queries = store.application_focus(true);
    assert_eq!(queries.len(), 1);
    oracle.wait_started(1).await;

    store.shutdown();
    assert_eq!(store.active_watchers(), 0);
    oracle.release(1);
    for query in queries {
        query.await.unwrap();
    }

    assert!(events.lock().unwrap().is_empty());
    assert!(store.outcomes().is_empty());
    assert_eq!(store.cart_quantity(&cart), 1);
}

#[tokio::test]
async fn test_custom_quantity_limits() {
    let config = StoreConfig {
        min_quantity: 2,
        max_quantity: 3,
        ..StoreConfig::default()
    };
    let store = Store::new(
        &config,
        sample_catalog(),
        Arc::new(ScriptedStatusOracle::new()),
        Box::new(LocalCheckoutGateway::default()),
    )
    .unwrap();

    assert_eq!(store.add_to_cart("101", 1, &CartId::default()).unwrap(), 2);
    assert_eq!(store.add_to_cart("101", 5, &CartId::default()).unwrap(), 3);
}

#[test]
fn test_unsubscribed_listener_is_not_called() {
    let (store, _) = scripted_store();
    let hits = Arc::new(Mutex::new(0));
    let counter = Arc::clone(&hits);
    let subscription = store
        .events()
        .subscribe(EventKind::CartUpdated, move |_| *counter.lock().unwrap() += 1);

    store.add_to_cart("101", 1, &CartId::default()).unwrap();
    assert!(store.events().unsubscribe(subscription));
    store.add_to_cart("101", 1, &CartId::default()).unwrap();

    assert_eq!(*hits.lock().unwrap(), 1);
}

//! Identifier, handle and load resolution against stored state and
//! scriptable remote fetches.

mod support;

use crossfed_common::AppError;
use crossfed_core::LoadOpts;
use crossfed_db::entities::object;
use crossfed_db::store::ObjectStore;
use serde_json::json;
use support::{FakeProtocol, world, world_with};

#[tokio::test]
async fn for_id_static_ownership_wins() {
    let w = world();
    // Static tests resolve without touching the store or the network.
    let proto = w.loader.for_id("fake:post").await.unwrap().unwrap();
    assert_eq!(proto.label(), "fake");
    let proto = w.loader.for_id("other:post").await.unwrap().unwrap();
    assert_eq!(proto.label(), "other");
    assert!(w.fake.fetched().is_empty());
}

#[tokio::test]
async fn for_id_empty_is_unowned() {
    let w = world();
    assert!(w.loader.for_id("").await.unwrap().is_none());
}

#[tokio::test]
async fn for_id_greedy_claims_leftovers_last() {
    let greedy = FakeProtocol::new_greedy("catchall");
    let w = world_with(&[greedy]);

    let proto = w.loader.for_id("fake:post").await.unwrap().unwrap();
    assert_eq!(proto.label(), "fake");
    let proto = w.loader.for_id("http://nowhere/obj").await.unwrap().unwrap();
    assert_eq!(proto.label(), "catchall");
}

#[tokio::test]
async fn for_id_stored_record_attributes_owner() {
    let w = world();
    w.store_object("http://site/obj", json!({"id": "http://site/obj"}))
        .await;

    let proto = w.loader.for_id("http://site/obj").await.unwrap().unwrap();
    assert_eq!(proto.label(), "fake");
    // The stored record answered; no probe happened.
    assert!(w.fake.fetched().is_empty());
}

#[tokio::test]
async fn for_id_stored_without_source_is_undetermined() {
    let w = world();
    ObjectStore::put(&w.store, &object::Model::with_id("http://bad/obj"))
        .await
        .unwrap();
    // Even a fetchable id stays unresolved: stored-but-unattributed
    // means do not guess.
    w.fake.add_fetchable("http://bad/obj", json!({"x": "y"}));

    assert!(w.loader.for_id("http://bad/obj").await.unwrap().is_none());
    assert!(w.fake.fetched().is_empty());
}

#[tokio::test]
async fn for_id_probes_in_fixed_order() {
    let w = world();
    w.other.add_fetchable("http://remote/actor", json!({"id": "http://remote/actor"}));

    let proto = w.loader.for_id("http://remote/actor").await.unwrap().unwrap();
    assert_eq!(proto.label(), "other");
    // The first probe was tried and declined before the second won.
    assert_eq!(w.fake.fetched(), vec!["http://remote/actor"]);
}

#[tokio::test]
async fn for_id_all_probes_fail() {
    let w = world();
    assert!(w.loader.for_id("http://remote/gone").await.unwrap().is_none());
    assert_eq!(w.fake.fetched(), vec!["http://remote/gone"]);
    assert_eq!(w.other.fetched(), vec!["http://remote/gone"]);
}

#[tokio::test]
async fn for_handle_static_parse_first() {
    let w = world();
    let (proto, id) = w.loader.for_handle("fake:handle:foo").await.unwrap();
    assert_eq!(proto.unwrap().label(), "fake");
    assert!(id.is_none());

    let (proto, id) = w.loader.for_handle("").await.unwrap();
    assert!(proto.is_none());
    assert!(id.is_none());
}

#[tokio::test]
async fn for_handle_stored_user() {
    let w = world();
    let mut user = w.make_user("other", "other:carol").await;
    user.handle = Some("carol.example".to_string());
    crossfed_db::store::UserStore::put(&w.store, &user)
        .await
        .unwrap();

    let (proto, id) = w.loader.for_handle("carol.example").await.unwrap();
    assert_eq!(proto.unwrap().label(), "other");
    assert_eq!(id.as_deref(), Some("other:carol"));
}

#[tokio::test]
async fn for_handle_remote_resolution_once() {
    let resolving = FakeProtocol::new_resolving("dns");
    resolving.add_resolvable("han.dull", "dns:123abc");
    let w = world_with(&[resolving]);

    let (proto, id) = w.loader.for_handle("han.dull").await.unwrap();
    assert_eq!(proto.unwrap().label(), "dns");
    assert_eq!(id.as_deref(), Some("dns:123abc"));

    // A failed resolution yields nothing rather than an error.
    let (proto, id) = w.loader.for_handle("no.such").await.unwrap();
    assert!(proto.is_none());
    assert!(id.is_none());
}

#[tokio::test]
async fn load_fetches_and_stores_new_object() {
    let w = world();
    w.fake.add_fetchable("fake:post", json!({"id": "fake:post", "x": "y"}));

    let loaded = w
        .loader
        .load(w.fake.as_ref(), "fake:post", LoadOpts::default())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(loaded.payload, Some(json!({"id": "fake:post", "x": "y"})));
    assert!(!loaded.changed);
    assert!(loaded.new);
    assert!(w.get_object("fake:post").await.is_some());
    assert_eq!(w.fake.fetched(), vec!["fake:post"]);
}

#[tokio::test]
async fn load_existing_skips_network() {
    let w = world();
    w.store_object("fake:post", json!({"x": "y"})).await;
    w.fake.add_fetchable("fake:post", json!({"x": "z"}));

    let loaded = w
        .loader
        .load(w.fake.as_ref(), "fake:post", LoadOpts::default())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(loaded.payload, Some(json!({"x": "y"})));
    assert!(!loaded.changed);
    assert!(!loaded.new);
    assert!(w.fake.fetched().is_empty());
}

#[tokio::test]
async fn load_cached_copy_is_isolated() {
    let w = world();
    w.fake.add_fetchable("fake:post", json!({"x": "y"}));

    let mut loaded = w
        .loader
        .load(w.fake.as_ref(), "fake:post", LoadOpts::default())
        .await
        .unwrap()
        .unwrap();
    loaded.payload = Some(json!({"a": "b"}));

    let reloaded = w
        .loader
        .load(w.fake.as_ref(), "fake:post", LoadOpts::default())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.payload, Some(json!({"x": "y"})));
}

#[tokio::test]
async fn load_remote_refresh_sets_changed() {
    let w = world();
    w.store_object("fake:post", json!({"content": "stored"})).await;
    w.fake.add_fetchable("fake:post", json!({"content": "new"}));

    let loaded = w
        .loader
        .load(w.fake.as_ref(), "fake:post", LoadOpts::refresh())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(loaded.payload, Some(json!({"content": "new"})));
    assert!(loaded.changed);
    assert!(!loaded.new);
}

#[tokio::test]
async fn load_remote_refresh_unchanged() {
    let w = world();
    w.store_object("fake:post", json!({"content": "stored"})).await;
    w.fake.add_fetchable("fake:post", json!({"content": "stored"}));

    let loaded = w
        .loader
        .load(w.fake.as_ref(), "fake:post", LoadOpts::refresh())
        .await
        .unwrap()
        .unwrap();

    assert!(!loaded.changed);
    assert_eq!(w.fake.fetched(), vec!["fake:post"]);
}

#[tokio::test]
async fn load_remote_refresh_records_empty_fetch() {
    let w = world();
    w.store_object("fake:post", json!({"content": "stored"})).await;

    let loaded = w
        .loader
        .load(w.fake.as_ref(), "fake:post", LoadOpts::refresh())
        .await
        .unwrap()
        .unwrap();

    // Fetched-but-empty is recorded, flagged as a change.
    assert!(loaded.payload.is_none());
    assert!(loaded.changed);
}

#[tokio::test]
async fn load_stored_only_never_fetches() {
    let w = world();
    assert!(w
        .loader
        .load(w.fake.as_ref(), "fake:nope", LoadOpts::stored_only())
        .await
        .unwrap()
        .is_none());
    assert!(w.fake.fetched().is_empty());

    w.store_object("fake:post", json!({"content": "stored"})).await;
    let loaded = w
        .loader
        .load(w.fake.as_ref(), "fake:post", LoadOpts::stored_only())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded.payload, Some(json!({"content": "stored"})));
    assert!(w.fake.fetched().is_empty());
}

#[tokio::test]
async fn load_remote_only_missing() {
    let w = world();
    assert!(w
        .loader
        .load(w.fake.as_ref(), "fake:nope", LoadOpts::remote_only())
        .await
        .unwrap()
        .is_none());
    assert_eq!(w.fake.fetched(), vec!["fake:nope"]);
}

#[tokio::test]
async fn load_remote_only_overwrites_stored() {
    let w = world();
    w.store_object("fake:post", json!({"content": "stored"})).await;
    w.fake.add_fetchable("fake:post", json!({"content": "fresh"}));

    let loaded = w
        .loader
        .load(w.fake.as_ref(), "fake:post", LoadOpts::remote_only())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(loaded.payload, Some(json!({"content": "fresh"})));
    assert!(!loaded.changed);
    assert!(!loaded.new);
    assert_eq!(w.fake.fetched(), vec!["fake:post"]);
}

#[tokio::test]
async fn load_local_false_remote_false_is_a_usage_fault() {
    let w = world();
    let result = w
        .loader
        .load(
            w.fake.as_ref(),
            "fake:nope",
            LoadOpts {
                local: false,
                remote: Some(false),
            },
        )
        .await;
    assert!(matches!(result, Err(AppError::Internal(_))));
}

#[tokio::test]
async fn load_round_trip_is_stable() {
    let w = world();
    w.fake.add_fetchable("fake:post", json!({"id": "fake:post", "content": "hi"}));

    let stored = w
        .loader
        .load(w.fake.as_ref(), "fake:post", LoadOpts::refresh())
        .await
        .unwrap()
        .unwrap();

    let reloaded = w
        .loader
        .load(w.fake.as_ref(), "fake:post", LoadOpts::stored_only())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(reloaded.payload, stored.payload);
    assert!(!reloaded.changed);
    // Exactly one fetch happened across the round trip.
    assert_eq!(w.fake.fetched(), vec!["fake:post"]);
}

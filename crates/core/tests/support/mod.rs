//! Shared test harness: in-memory world with scriptable fake protocols.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use crossfed_common::{AppError, AppResult, BridgeConfig};
use crossfed_core::{ObjectCache, ObjectLoader, Protocol, ProtocolRegistry, ReceivePipeline, TargetResolver};
use crossfed_db::MemoryStore;
use crossfed_db::entities::{follower::FollowStatus, object, user};
use crossfed_db::store::{FollowerStore, ObjectStore, UserStore};
use serde_json::Value;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A scriptable protocol: fetches come from a map, sends are recorded,
/// and individual targets can be made to fail.
pub struct FakeProtocol {
    label: &'static str,
    greedy: bool,
    resolves: bool,
    fetchable: Mutex<HashMap<String, Value>>,
    resolvable: Mutex<HashMap<String, String>>,
    fetched: Mutex<Vec<String>>,
    sent: Mutex<Vec<(String, String)>>,
    failing: Mutex<Vec<String>>,
}

impl FakeProtocol {
    fn build(label: &'static str, greedy: bool, resolves: bool) -> Arc<Self> {
        Arc::new(Self {
            label,
            greedy,
            resolves,
            fetchable: Mutex::new(HashMap::new()),
            resolvable: Mutex::new(HashMap::new()),
            fetched: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
            failing: Mutex::new(Vec::new()),
        })
    }

    pub fn new(label: &'static str) -> Arc<Self> {
        Self::build(label, false, false)
    }

    pub fn new_greedy(label: &'static str) -> Arc<Self> {
        Self::build(label, true, false)
    }

    pub fn new_resolving(label: &'static str) -> Arc<Self> {
        Self::build(label, false, true)
    }

    pub fn add_fetchable(&self, id: &str, payload: Value) {
        lock(&self.fetchable).insert(id.to_string(), payload);
    }

    pub fn add_resolvable(&self, handle: &str, id: &str) {
        lock(&self.resolvable).insert(handle.to_string(), id.to_string());
    }

    pub fn fail_target(&self, target: &str) {
        lock(&self.failing).push(target.to_string());
    }

    pub fn fetched(&self) -> Vec<String> {
        lock(&self.fetched).clone()
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        lock(&self.sent).clone()
    }

    pub fn sent_targets(&self) -> Vec<String> {
        lock(&self.sent).iter().map(|(_, t)| t.clone()).collect()
    }
}

#[async_trait]
impl Protocol for FakeProtocol {
    fn label(&self) -> &'static str {
        self.label
    }

    fn greedy(&self) -> bool {
        self.greedy
    }

    fn owns_id(&self, id: &str) -> bool {
        self.greedy || id.starts_with(&format!("{}:", self.label))
    }

    fn owns_handle(&self, handle: &str) -> bool {
        handle.starts_with(&format!("{}:handle:", self.label))
    }

    fn resolves_handles(&self) -> bool {
        self.resolves
    }

    async fn resolve_handle(&self, handle: &str) -> Option<String> {
        lock(&self.resolvable).get(handle).cloned()
    }

    async fn fetch(&self, id: &str) -> Option<Value> {
        lock(&self.fetched).push(id.to_string());
        lock(&self.fetchable).get(id).cloned()
    }

    async fn target_for(&self, obj: &object::Model, shared: bool) -> Option<String> {
        if shared {
            Some("shared:target".to_string())
        } else {
            Some(format!("{}:target", obj.id))
        }
    }

    async fn send(&self, obj: &object::Model, target: &str) -> AppResult<bool> {
        if lock(&self.failing).iter().any(|t| t == target) {
            return Err(AppError::Delivery {
                status: Some(502),
                message: format!("scripted failure for {target}"),
            });
        }
        lock(&self.sent).push((obj.id.clone(), target.to_string()));
        Ok(true)
    }

    fn is_blocklisted(&self, address: &str) -> bool {
        address.contains("blocklisted")
    }
}

/// Everything a pipeline test needs, wired over one shared store.
pub struct World {
    pub store: MemoryStore,
    pub registry: Arc<ProtocolRegistry>,
    pub loader: ObjectLoader,
    pub resolver: TargetResolver,
    pub pipeline: ReceivePipeline,
    pub fake: Arc<FakeProtocol>,
    pub other: Arc<FakeProtocol>,
}

pub fn bridge_config() -> BridgeConfig {
    BridgeConfig {
        domain: "bridge.example".to_string(),
        fed_hosts: vec!["localhost".to_string()],
        probe_order: vec!["fake".to_string(), "other".to_string()],
    }
}

/// Build a world with the standard two fake protocols, plus any extras.
pub fn world_with(extra: &[Arc<FakeProtocol>]) -> World {
    let fake = FakeProtocol::new("fake");
    let other = FakeProtocol::new("other");

    let mut registry = ProtocolRegistry::new(&bridge_config());
    registry.register(fake.clone()).unwrap();
    registry.register(other.clone()).unwrap();
    for proto in extra {
        registry.register(proto.clone()).unwrap();
    }
    let registry = Arc::new(registry);

    let store = MemoryStore::new();
    let objects: Arc<dyn ObjectStore> = Arc::new(store.clone());
    let users: Arc<dyn UserStore> = Arc::new(store.clone());
    let followers: Arc<dyn FollowerStore> = Arc::new(store.clone());

    let loader = ObjectLoader::new(
        registry.clone(),
        objects.clone(),
        users.clone(),
        ObjectCache::new(),
    );
    let resolver = TargetResolver::new(
        registry.clone(),
        loader.clone(),
        objects.clone(),
        users.clone(),
        followers.clone(),
    );
    let pipeline = ReceivePipeline::new(
        loader.clone(),
        resolver.clone(),
        objects,
        users,
        followers,
    );

    World {
        store,
        registry,
        loader,
        resolver,
        pipeline,
        fake,
        other,
    }
}

pub fn world() -> World {
    world_with(&[])
}

impl World {
    /// Store an object with a payload, attributed to the fake protocol.
    pub async fn store_object(&self, id: &str, payload: Value) -> object::Model {
        let mut obj = object::Model::with_id(id);
        obj.payload = Some(payload);
        obj.source_protocol = Some("fake".to_string());
        ObjectStore::put(&self.store, &obj).await.unwrap()
    }

    pub async fn get_object(&self, id: &str) -> Option<object::Model> {
        ObjectStore::get(&self.store, id).await.unwrap()
    }

    pub async fn make_user(&self, protocol: &str, id: &str) -> user::Model {
        UserStore::get_or_create(&self.store, protocol, id)
            .await
            .unwrap()
    }

    pub async fn make_follower(&self, follower_id: &str, followee_id: &str) {
        self.make_user("fake", follower_id).await;
        FollowerStore::get_or_create(&self.store, follower_id, followee_id, None)
            .await
            .unwrap();
    }

    pub async fn make_inactive_follower(&self, follower_id: &str, followee_id: &str) {
        self.make_follower(follower_id, followee_id).await;
        FollowerStore::deactivate(&self.store, follower_id, followee_id)
            .await
            .unwrap();
    }

    pub async fn edge_status(&self, follower_id: &str, followee_id: &str) -> Option<FollowStatus> {
        self.store
            .find_pair(follower_id, followee_id)
            .await
            .unwrap()
            .map(|e| e.status)
    }

    pub async fn receive_from_fake(
        &self,
        payload: Value,
    ) -> crossfed_common::AppResult<crossfed_core::ReceiveOutcome> {
        self.pipeline
            .receive(payload, Some(self.fake.clone()))
            .await
    }
}

//! Object loading and identifier resolution.
//!
//! [`ObjectLoader`] is the single path through which the core reads
//! canonical objects: cache first, then the entity store, then the
//! owning protocol's remote fetch. It also answers the two resolution
//! questions that need storage access: which protocol owns an id, and
//! which protocol (and canonical id) a human handle maps to.

use std::sync::Arc;

use crossfed_common::{AppError, AppResult};
use crossfed_db::entities::object;
use crossfed_db::store::{ObjectStore, UserStore};
use tracing::{debug, info};

use crate::activity;
use crate::cache::ObjectCache;
use crate::protocol::Protocol;
use crate::registry::ProtocolRegistry;

/// How a load may use the cache, the store, and the network.
#[derive(Clone, Copy, Debug)]
pub struct LoadOpts {
    /// Whether the cache and stored record may satisfy the load.
    pub local: bool,
    /// `Some(true)` forces a remote re-fetch; `Some(false)` forbids any
    /// network contact; `None` fetches only when nothing is stored.
    pub remote: Option<bool>,
}

impl Default for LoadOpts {
    fn default() -> Self {
        Self {
            local: true,
            remote: None,
        }
    }
}

impl LoadOpts {
    /// Re-fetch from the owning protocol regardless of stored state.
    #[must_use]
    pub const fn refresh() -> Self {
        Self {
            local: true,
            remote: Some(true),
        }
    }

    /// Never contact the network.
    #[must_use]
    pub const fn stored_only() -> Self {
        Self {
            local: true,
            remote: Some(false),
        }
    }

    /// Bypass the cache and stored record; force the fresh-fetch path.
    #[must_use]
    pub const fn remote_only() -> Self {
        Self {
            local: false,
            remote: None,
        }
    }
}

/// Loads canonical objects and resolves ids and handles.
#[derive(Clone)]
pub struct ObjectLoader {
    registry: Arc<ProtocolRegistry>,
    objects: Arc<dyn ObjectStore>,
    users: Arc<dyn UserStore>,
    cache: ObjectCache,
}

impl ObjectLoader {
    /// Create a loader over the given registry, stores and cache.
    #[must_use]
    pub fn new(
        registry: Arc<ProtocolRegistry>,
        objects: Arc<dyn ObjectStore>,
        users: Arc<dyn UserStore>,
        cache: ObjectCache,
    ) -> Self {
        Self {
            registry,
            objects,
            users,
            cache,
        }
    }

    /// The loader's cache handle.
    #[must_use]
    pub const fn cache(&self) -> &ObjectCache {
        &self.cache
    }

    /// Load one canonical object per the given options. Returned values
    /// are independent copies; the `changed` and `new` flags describe
    /// what the load did when it touched the network.
    pub async fn load(
        &self,
        proto: &dyn Protocol,
        id: &str,
        opts: LoadOpts,
    ) -> AppResult<Option<object::Model>> {
        if !opts.local && opts.remote == Some(false) {
            return Err(AppError::Internal(
                "load() requires either local or remote access".to_string(),
            ));
        }

        let mut stored = None;
        if opts.local {
            stored = match self.cache.get(id) {
                Some(cached) => Some(cached),
                None => {
                    let from_store = self.objects.get(id).await?;
                    if let Some(obj) = &from_store {
                        self.cache.insert(obj);
                    }
                    from_store
                }
            };

            if opts.remote != Some(true) {
                if stored.is_some() {
                    return Ok(stored);
                }
                if opts.remote == Some(false) {
                    return Ok(None);
                }
            }
        }

        let fetched = proto.fetch(id).await;
        if fetched.is_none() && stored.is_none() {
            debug!(id = %id, protocol = proto.label(), "remote fetch yielded nothing");
            return Ok(None);
        }

        let changed = opts.local
            && stored
                .as_ref()
                .is_some_and(|s| s.payload.as_ref() != fetched.as_ref());
        let new = opts.local && stored.is_none();

        let mut obj = stored.unwrap_or_else(|| object::Model::with_id(id));
        obj.object_type = fetched.as_ref().and_then(activity::type_of);
        obj.payload = fetched;
        obj.source_protocol = Some(proto.label().to_string());

        let mut saved = self.objects.put(&obj).await?;
        saved.changed = changed;
        saved.new = new;
        self.cache.insert(&saved);
        Ok(Some(saved))
    }

    /// Resolve which protocol owns an id: static ownership first, then
    /// the stored record's source protocol, then remote probing in the
    /// configured fixed order. An unresolvable id has no owner.
    pub async fn for_id(&self, id: &str) -> AppResult<Option<Arc<dyn Protocol>>> {
        if id.is_empty() {
            return Ok(None);
        }

        if let Some(proto) = self.registry.static_for_id(id) {
            return Ok(Some(proto));
        }

        if let Some(stored) = self.objects.get(id).await? {
            // A stored record with no source attribution leaves
            // ownership undetermined; guessing here would mis-route.
            return Ok(stored
                .source_protocol
                .as_deref()
                .and_then(|label| self.registry.by_label(label)));
        }

        for label in self.registry.probe_order() {
            let Some(proto) = self.registry.by_label(label) else {
                continue;
            };
            if proto.fetch(id).await.is_some() {
                info!(id = %id, protocol = proto.label(), "remote probe resolved owner");
                return Ok(Some(proto));
            }
        }

        Ok(None)
    }

    /// Resolve a human handle to its protocol and canonical id: static
    /// parsing per protocol, then the stored user table, then at most
    /// one remote resolution call.
    pub async fn for_handle(
        &self,
        handle: &str,
    ) -> AppResult<(Option<Arc<dyn Protocol>>, Option<String>)> {
        if handle.is_empty() {
            return Ok((None, None));
        }

        for proto in self.registry.ordered() {
            if proto.owns_handle(handle) {
                return Ok((Some(proto.clone()), proto.handle_as_id(handle)));
            }
        }

        if let Some(user) = self.users.find_by_handle(handle).await? {
            return Ok((self.registry.by_label(&user.protocol), Some(user.id)));
        }

        if let Some(proto) = self.registry.ordered().find(|p| p.resolves_handles()) {
            return Ok(match proto.resolve_handle(handle).await {
                Some(id) => (Some(proto.clone()), Some(id)),
                None => (None, None),
            });
        }

        Ok((None, None))
    }
}

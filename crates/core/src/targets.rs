//! Delivery target resolution.
//!
//! Computes the full set of destinations for an activity: reply and
//! object references, mentions, follower fan-out with the protocol
//! shared target, cross-protocol copy substitution, blocklist
//! filtering, and self-loop exclusion. Output order is deterministic so
//! delivery bookkeeping stays reproducible across retries.

use std::collections::BTreeMap;
use std::sync::Arc;

use crossfed_common::{AppResult, util};
use crossfed_db::entities::object;
use crossfed_db::store::{FollowerStore, ObjectStore, UserStore};
use serde_json::Value;
use tracing::debug;

use crate::activity;
use crate::loader::{LoadOpts, ObjectLoader};
use crate::registry::ProtocolRegistry;

/// One delivery destination.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Target {
    /// Label of the protocol that owns the address.
    pub protocol: String,
    /// Protocol-native delivery address.
    pub uri: String,
}

/// Resolved targets, each mapped to the actor key a delivery should
/// notify (when one is known). Ordered for deterministic delivery.
pub type TargetMap = BTreeMap<Target, Option<String>>;

/// Computes delivery targets for activities.
#[derive(Clone)]
pub struct TargetResolver {
    registry: Arc<ProtocolRegistry>,
    loader: ObjectLoader,
    objects: Arc<dyn ObjectStore>,
    users: Arc<dyn UserStore>,
    followers: Arc<dyn FollowerStore>,
}

impl TargetResolver {
    /// Create a resolver over the given registry, loader and stores.
    #[must_use]
    pub fn new(
        registry: Arc<ProtocolRegistry>,
        loader: ObjectLoader,
        objects: Arc<dyn ObjectStore>,
        users: Arc<dyn UserStore>,
        followers: Arc<dyn FollowerStore>,
    ) -> Self {
        Self {
            registry,
            loader,
            objects,
            users,
            followers,
        }
    }

    /// The registry this resolver dispatches through.
    #[must_use]
    pub fn registry(&self) -> &Arc<ProtocolRegistry> {
        &self.registry
    }

    /// Resolve the target set for an activity. Deterministic given the
    /// same stored state; unresolvable references are dropped silently.
    pub async fn targets(&self, act: &object::Model) -> AppResult<TargetMap> {
        let mut out = TargetMap::new();
        let Some(payload) = &act.payload else {
            return Ok(out);
        };

        let verb = activity::verb(payload).unwrap_or_default();
        let actor = activity::owner(payload);
        // Synthetic internal activities are exempt from self-loop
        // exclusion: an accept must reach the party the primary
        // activity excluded.
        let exclude_self = act.source_protocol.is_some();

        for orig in candidate_ids(payload, verb) {
            if exclude_self && actor.as_deref().is_some_and(|a| util::same_origin(a, &orig)) {
                debug!(id = %orig, "skipping self-loop target");
                continue;
            }

            let orig = self.to_original(orig).await?;
            let Some(proto) = self.loader.for_id(&orig).await? else {
                debug!(id = %orig, "no protocol owns reference, dropping");
                continue;
            };
            if proto.is_blocklisted(&orig) {
                debug!(id = %orig, "reference is blocklisted");
                continue;
            }

            let resolved = self
                .loader
                .load(proto.as_ref(), &orig, LoadOpts::default())
                .await?
                .unwrap_or_else(|| object::Model::with_id(&orig));

            let Some(address) = proto.target_for(&resolved, false).await else {
                debug!(id = %orig, "no delivery address for reference");
                continue;
            };
            if proto.is_blocklisted(&address) {
                debug!(address = %address, "target address is blocklisted");
                continue;
            }

            let notify = match resolved.payload.as_ref().and_then(activity::notify_key) {
                Some(key) => {
                    self.users.get_or_create(proto.label(), &key).await?;
                    Some(key)
                }
                None => None,
            };

            out.entry(Target {
                protocol: proto.label().to_string(),
                uri: address,
            })
            .or_insert(notify);
        }

        if is_top_level(payload) && activity::FANOUT_VERBS.contains(&verb) {
            if let Some(actor_id) = &actor {
                self.fan_out(actor_id, &mut out).await?;
            }
        }

        Ok(out)
    }

    /// Append the shared targets of the actor's active followers.
    async fn fan_out(&self, actor_id: &str, out: &mut TargetMap) -> AppResult<()> {
        for edge in self.followers.active_followers_of(actor_id).await? {
            let Some(user) = self.users.get(&edge.follower_id).await? else {
                continue;
            };
            let Some(proto) = self.registry.by_label(&user.protocol) else {
                continue;
            };

            let profile_id = user.obj_id.as_deref().unwrap_or(&user.id);
            let profile = self
                .objects
                .get(profile_id)
                .await?
                .unwrap_or_else(|| object::Model::with_id(&user.id));

            let Some(address) = proto.target_for(&profile, true).await else {
                continue;
            };
            if proto.is_blocklisted(&address) {
                continue;
            }

            out.entry(Target {
                protocol: proto.label().to_string(),
                uri: address,
            })
            .or_insert(None);
        }
        Ok(())
    }

    /// Cross-protocol copy substitution: a reference to a mirror
    /// resolves to the logical original it mirrors, so one canonical
    /// recipient is addressed once rather than per copy.
    async fn to_original(&self, id: String) -> AppResult<String> {
        if let Some(user) = self.users.find_by_copy(&id).await? {
            debug!(copy = %id, original = %user.id, "substituting user copy");
            return Ok(user.id);
        }
        if let Some(obj) = self.objects.find_by_copy(&id).await? {
            debug!(copy = %id, original = %obj.id, "substituting object copy");
            return Ok(obj.id);
        }
        Ok(id)
    }
}

/// The reference ids an activity addresses, before resolution.
fn candidate_ids(payload: &Value, verb: &str) -> Vec<String> {
    // Accepts address the inner follow's actor and never expand
    // further.
    if verb == "accept" {
        return activity::inner_object(payload)
            .and_then(activity::owner)
            .into_iter()
            .collect();
    }

    let mut ids = Vec::new();
    let subject = activity::inner_object(payload).unwrap_or(payload);
    ids.extend(activity::in_reply_to(subject));
    if matches!(verb, "like" | "share" | "follow" | "stop-following") {
        ids.extend(activity::object_ids(payload));
    }
    ids.extend(activity::mentions(subject));

    let mut unique = Vec::new();
    for id in ids {
        if !unique.contains(&id) {
            unique.push(id);
        }
    }
    unique
}

/// Whether the activity's subject starts a thread rather than
/// continuing one.
fn is_top_level(payload: &Value) -> bool {
    let subject = activity::inner_object(payload).unwrap_or(payload);
    activity::in_reply_to(subject).is_empty()
}

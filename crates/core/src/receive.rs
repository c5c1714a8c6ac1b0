//! The receive pipeline: normalization, validation, verb dispatch, and
//! delivery with partial-failure isolation.
//!
//! Every inbound activity — whether delivered inline by a protocol's
//! wire boundary or re-dispatched by the task queue — passes through
//! [`ReceivePipeline::receive`]. The pipeline is safe to re-run on the
//! same input: unchanged updates are detected and ignored, follows
//! reactivate instead of duplicating, deletes tolerate an existing
//! tombstone.

use std::sync::Arc;

use crossfed_common::{AppError, AppResult};
use crossfed_db::entities::object::{self, Status};
use crossfed_db::store::{FollowerStore, ObjectStore, UserStore};
use futures::future::BoxFuture;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::activity;
use crate::loader::{LoadOpts, ObjectLoader};
use crate::protocol::Protocol;
use crate::targets::TargetResolver;

/// How the pipeline disposed of an activity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReceiveOutcome {
    /// Delivery was attempted; partial failures are recorded on the
    /// activity, not raised.
    Complete,
    /// Processed, but nothing warranted delivery.
    NoContent,
}

enum Normalized {
    Wrapped(Value),
    Unchanged,
}

/// Drives inbound activities through normalization, resolution and
/// delivery.
pub struct ReceivePipeline {
    loader: ObjectLoader,
    resolver: TargetResolver,
    objects: Arc<dyn ObjectStore>,
    users: Arc<dyn UserStore>,
    followers: Arc<dyn FollowerStore>,
}

impl ReceivePipeline {
    /// Create a pipeline over the given loader, resolver and stores.
    #[must_use]
    pub fn new(
        loader: ObjectLoader,
        resolver: TargetResolver,
        objects: Arc<dyn ObjectStore>,
        users: Arc<dyn UserStore>,
        followers: Arc<dyn FollowerStore>,
    ) -> Self {
        Self {
            loader,
            resolver,
            objects,
            users,
            followers,
        }
    }

    /// Process one inbound activity. `source` is the protocol the
    /// activity arrived from; `None` marks an internally generated
    /// activity with no source attribution.
    pub async fn receive(
        &self,
        payload: Value,
        source: Option<Arc<dyn Protocol>>,
    ) -> AppResult<ReceiveOutcome> {
        self.receive_boxed(payload, source, 0).await
    }

    fn receive_boxed(
        &self,
        payload: Value,
        source: Option<Arc<dyn Protocol>>,
        depth: u8,
    ) -> BoxFuture<'_, AppResult<ReceiveOutcome>> {
        Box::pin(self.receive_inner(payload, source, depth))
    }

    async fn receive_inner(
        &self,
        payload: Value,
        source: Option<Arc<dyn Protocol>>,
        depth: u8,
    ) -> AppResult<ReceiveOutcome> {
        let raw_id = activity::id(&payload)
            .ok_or_else(|| AppError::BadRequest("activity is missing an id".to_string()))?
            .to_string();

        let mut payload = payload;
        if !activity::is_activity(&payload) {
            match self.normalize(&raw_id, &payload).await? {
                Normalized::Wrapped(wrapped) => payload = wrapped,
                Normalized::Unchanged => return Ok(ReceiveOutcome::NoContent),
            }
        }

        let act_id = activity::id(&payload)
            .ok_or_else(|| AppError::Internal("synthesized activity lost its id".to_string()))?
            .to_string();
        let verb = activity::verb(&payload)
            .ok_or_else(|| AppError::BadRequest(format!("unsupported activity: {raw_id}")))?
            .to_string();
        let actor_id = activity::owner(&payload);
        let source_label = source.as_ref().map(|s| s.label().to_string());

        info!(
            id = %act_id,
            verb = %verb,
            source = source_label.as_deref().unwrap_or("internal"),
            "processing activity"
        );

        self.validate(&act_id, &verb, actor_id.as_deref(), &payload)
            .await?;

        let mut act = self
            .objects
            .get(&act_id)
            .await?
            .unwrap_or_else(|| object::Model::with_id(&act_id));
        act.payload = Some(payload.clone());
        act.object_type = Some(verb.clone());
        act.source_protocol = source_label.clone();

        if let (Some(label), Some(actor)) = (&source_label, &actor_id) {
            self.users.get_or_create(label, actor).await?;
            act.users.insert(actor.clone());
        }

        let short_circuit = match verb.as_str() {
            "post" | "update" => {
                self.handle_post_update(&verb, &mut act, &payload, source_label.as_deref())
                    .await?
            }
            "delete" => self.handle_delete(&payload).await?,
            "follow" => self.handle_follow(&act_id, &mut act, &payload, depth).await?,
            "stop-following" => self.handle_stop_following(&payload).await?,
            "share" => self.handle_share(&mut act, &payload).await?,
            // Accepts are terminal: they never expand into further
            // synthetic activities.
            "like" | "accept" | "reject" | "undo" => None,
            _ => None,
        };
        if let Some(outcome) = short_circuit {
            return Ok(outcome);
        }

        self.deliver(act).await
    }

    /// Wrap a bare object in a synthesized activity, or detect that the
    /// stored state already matches and nothing needs delivering.
    async fn normalize(&self, id: &str, payload: &Value) -> AppResult<Normalized> {
        let stored = self.objects.get(id).await?;

        let Some(stored) = stored else {
            debug!(id = %id, "bare object is new, synthesizing post");
            return Ok(Normalized::Wrapped(activity::wrap_create(payload)));
        };

        if stored.payload.as_ref() == Some(payload) {
            info!(id = %id, "bare object unchanged, nothing to deliver");
            let create = activity::wrap_create(payload);
            if let Some(create_id) = activity::id(&create) {
                let mut marker = self
                    .objects
                    .get(create_id)
                    .await?
                    .unwrap_or_else(|| object::Model::with_id(create_id));
                marker.payload = Some(create.clone());
                marker.object_type = Some("post".to_string());
                marker.status = Status::Ignored;
                self.objects.put(&marker).await?;
            }
            return Ok(Normalized::Unchanged);
        }

        debug!(id = %id, "bare object changed, synthesizing update");
        Ok(Normalized::Wrapped(activity::wrap_update(payload)))
    }

    /// Client-input validation. Missing required pieces are rejected
    /// without mutating anything beyond an already-persisted record's
    /// status.
    async fn validate(
        &self,
        act_id: &str,
        verb: &str,
        actor_id: Option<&str>,
        payload: &Value,
    ) -> AppResult<()> {
        let object_refs = activity::object_ids(payload);
        match verb {
            "follow" | "stop-following" => {
                if actor_id.is_none() {
                    return Err(self.reject(act_id, format!("{verb} requires an actor")).await);
                }
                if object_refs.is_empty() {
                    return Err(self.reject(act_id, format!("{verb} requires an object")).await);
                }
            }
            "like" | "share" | "delete" => {
                if object_refs.is_empty() {
                    return Err(self.reject(act_id, format!("{verb} requires an object")).await);
                }
            }
            "post" | "update" => {
                let inner_id = activity::inner_object(payload).and_then(activity::id);
                if inner_id.is_none() {
                    return Err(self
                        .reject(act_id, format!("{verb} requires an object with an id"))
                        .await);
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Record a client fault. An already-persisted record gets its
    /// status set to error; nothing else is mutated.
    async fn reject(&self, act_id: &str, message: String) -> AppError {
        if let Ok(Some(mut existing)) = self.objects.get(act_id).await {
            existing.status = Status::Error;
            if let Err(e) = self.objects.put(&existing).await {
                warn!(id = %act_id, error = %e, "failed to record error status");
            }
        }
        AppError::BadRequest(message)
    }

    async fn handle_post_update(
        &self,
        verb: &str,
        act: &mut object::Model,
        payload: &Value,
        source_label: Option<&str>,
    ) -> AppResult<Option<ReceiveOutcome>> {
        let inner = activity::inner_object(payload)
            .cloned()
            .unwrap_or_default();
        let inner_id = activity::id(&inner).unwrap_or_default().to_string();

        let stored = self.objects.get(&inner_id).await?;
        if verb == "update" && stored.as_ref().is_some_and(|s| s.payload.as_ref() == Some(&inner))
        {
            info!(id = %inner_id, "update carries an unchanged payload, ignoring");
            act.status = Status::Ignored;
            self.objects.put(act).await?;
            return Ok(Some(ReceiveOutcome::NoContent));
        }

        let mut rec = stored.unwrap_or_else(|| object::Model::with_id(&inner_id));
        rec.payload = Some(inner.clone());
        rec.object_type = activity::type_of(&inner);
        if let Some(label) = source_label {
            rec.source_protocol = Some(label.to_string());
        }

        if let Some(author) = activity::owner(&inner) {
            act.users.insert(author);
        }

        // Top-level content fans out into active followers' feeds;
        // replies and profile updates do not.
        let is_profile = matches!(activity::object_type(&inner), Some("person" | "actor"));
        if activity::in_reply_to(&inner).is_empty() && !is_profile {
            let feed_owner = activity::owner(&inner).or_else(|| activity::owner(payload));
            if let Some(owner) = feed_owner {
                for edge in self.followers.active_followers_of(&owner).await? {
                    rec.feed.insert(edge.follower_id);
                }
            }
        }

        let saved = self.objects.put(&rec).await?;
        self.loader.cache().insert(&saved);
        Ok(None)
    }

    async fn handle_delete(&self, payload: &Value) -> AppResult<Option<ReceiveOutcome>> {
        let target_id = activity::object_ids(payload)
            .into_iter()
            .next()
            .unwrap_or_default();

        let stored = self.objects.get(&target_id).await?;
        let mut rec = stored.unwrap_or_else(|| object::Model::with_id(&target_id));
        rec.deleted = true;
        rec.source_protocol = None;

        if let Some(actor) = activity::owner(payload) {
            for edge in self.followers.active_followers_of(&actor).await? {
                rec.feed.insert(edge.follower_id);
            }
        }

        let saved = self.objects.put(&rec).await?;
        self.loader.cache().insert(&saved);

        // If the deleted entity was an actor, every edge touching it
        // goes inactive, in both directions. Harmless for plain posts.
        let deactivated = self.followers.deactivate_all_for(&target_id).await?;
        if deactivated > 0 {
            info!(id = %target_id, count = deactivated, "deactivated follower edges");
        }

        Ok(None)
    }

    async fn handle_follow(
        &self,
        act_id: &str,
        act: &mut object::Model,
        payload: &Value,
        depth: u8,
    ) -> AppResult<Option<ReceiveOutcome>> {
        let follower_id = activity::owner(payload).unwrap_or_default();

        for followee in activity::object_ids(payload) {
            let Some(proto) = self.loader.for_id(&followee).await? else {
                return Err(self
                    .reject(act_id, format!("no registered protocol owns {followee}"))
                    .await);
            };

            self.users.get_or_create(proto.label(), &followee).await?;
            self.followers
                .get_or_create(&follower_id, &followee, Some(act_id))
                .await?;
            act.notify.insert(followee.clone());

            // One level of synthetic recursion: the accept itself never
            // generates further activities.
            if depth > 0 {
                continue;
            }

            let followee_obj = self
                .loader
                .load(proto.as_ref(), &followee, LoadOpts::default())
                .await?
                .unwrap_or_else(|| object::Model::with_id(&followee));
            let Some(followee_target) = proto.target_for(&followee_obj, false).await else {
                debug!(id = %followee, "no target for followee, skipping accept");
                continue;
            };

            // The accept id is derived from the followee's inbox address
            // and the follow's id, so retries produce the same id.
            let accept = json!({
                "objectType": "activity",
                "verb": "accept",
                "id": format!("{followee_target}#accept-{act_id}"),
                "actor": followee,
                "object": payload,
            });
            if let Err(e) = self.receive_boxed(accept, None, depth + 1).await {
                warn!(follow = %act_id, error = %e, "synthetic accept failed");
            }
        }

        Ok(None)
    }

    async fn handle_stop_following(&self, payload: &Value) -> AppResult<Option<ReceiveOutcome>> {
        let follower_id = activity::owner(payload).unwrap_or_default();
        let followee_id = activity::object_ids(payload)
            .into_iter()
            .next()
            .unwrap_or_default();

        // A missing or already-inactive edge is a no-op; the followee
        // is still notified through normal target resolution.
        if self.followers.deactivate(&follower_id, &followee_id).await? {
            info!(follower = %follower_id, followee = %followee_id, "deactivated follow");
        } else {
            debug!(follower = %follower_id, followee = %followee_id, "no active follow");
        }
        Ok(None)
    }

    async fn handle_share(
        &self,
        act: &mut object::Model,
        payload: &Value,
    ) -> AppResult<Option<ReceiveOutcome>> {
        let ref_id = activity::object_ids(payload)
            .into_iter()
            .next()
            .unwrap_or_default();

        // Resolve the shared object, fetching remotely when it is not
        // stored, and inline it into the share for delivery.
        if let Some(proto) = self.loader.for_id(&ref_id).await? {
            if let Some(resolved) = self
                .loader
                .load(proto.as_ref(), &ref_id, LoadOpts::default())
                .await?
            {
                if let (Some(act_payload), Some(inner)) = (act.payload.as_mut(), resolved.payload)
                {
                    act_payload["object"] = inner;
                }
            }
        }

        if let Some(actor) = activity::owner(payload) {
            for edge in self.followers.active_followers_of(&actor).await? {
                act.feed.insert(edge.follower_id);
            }
        }
        Ok(None)
    }

    /// Resolve targets and deliver to each one independently. A
    /// delivery fault is recorded against its target and never aborts
    /// the remaining deliveries.
    async fn deliver(&self, mut act: object::Model) -> AppResult<ReceiveOutcome> {
        let targets = self.resolver.targets(&act).await?;

        for notify in targets.values().flatten() {
            act.notify.insert(notify.clone());
        }

        if targets.is_empty() {
            act.status = Status::Ignored;
            let saved = self.objects.put(&act).await?;
            self.loader.cache().insert(&saved);
            info!(id = %act.id, "no targets, nothing to deliver");
            return Ok(ReceiveOutcome::NoContent);
        }

        act = self.objects.put(&act).await?;

        for target in targets.keys() {
            if act.delivered.contains(&target.uri) {
                debug!(target = %target.uri, "already delivered, skipping");
                continue;
            }
            let Some(proto) = self.resolver.registry().by_label(&target.protocol) else {
                warn!(protocol = %target.protocol, "target protocol not registered");
                act.failed.insert(target.uri.clone());
                continue;
            };

            match proto.send(&act, &target.uri).await {
                Ok(true) => {
                    debug!(target = %target.uri, "delivered");
                    act.delivered.insert(target.uri.clone());
                    act.failed.remove(&target.uri);
                    act.delivered_protocol = Some(target.protocol.clone());
                }
                Ok(false) => {
                    debug!(target = %target.uri, "delivery skipped");
                }
                Err(e) => {
                    warn!(target = %target.uri, error = %e, "delivery failed");
                    act.failed.insert(target.uri.clone());
                }
            }
        }

        act.status = if act.delivered.is_empty() && !act.failed.is_empty() {
            Status::Failed
        } else if act.delivered.is_empty() {
            Status::Ignored
        } else {
            Status::Complete
        };
        let outcome = if act.status == Status::Ignored {
            ReceiveOutcome::NoContent
        } else {
            ReceiveOutcome::Complete
        };

        let saved = self.objects.put(&act).await?;
        self.loader.cache().insert(&saved);
        Ok(outcome)
    }
}

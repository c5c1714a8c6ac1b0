//! ActivityPub protocol implementation.

use std::sync::Arc;

use async_trait::async_trait;
use crossfed_common::AppResult;
use crossfed_core::{Protocol, activity};
use crossfed_db::entities::object;
use crossfed_db::store::ObjectStore;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::blocklist;
use crate::client::{CONTENT_TYPE_AS, FederationClient, as2_accept_header};
use crate::convert;

/// `@user@inst.example` fediverse address.
static HANDLE_RE: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::unwrap_used)] // static pattern
    Regex::new(r"^@[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap()
});

/// The ActivityPub network, seen from the relay core.
#[derive(Clone)]
pub struct ActivityPubProtocol {
    client: FederationClient,
    objects: Arc<dyn ObjectStore>,
    bridge_domain: String,
    hosts: Vec<String>,
}

impl ActivityPubProtocol {
    /// Create the protocol over the given client and object store.
    #[must_use]
    pub fn new(
        client: FederationClient,
        objects: Arc<dyn ObjectStore>,
        bridge_domain: &str,
    ) -> Self {
        Self {
            client,
            objects,
            bridge_domain: bridge_domain.to_string(),
            hosts: vec![
                format!("ap.{bridge_domain}"),
                format!("activitypub.{bridge_domain}"),
            ],
        }
    }

    /// An actor payload's inbox, preferring the shared inbox for
    /// fan-out deliveries.
    fn inbox_from(payload: &Value, shared: bool) -> Option<String> {
        if shared {
            let shared_inbox = payload
                .get("endpoints")
                .and_then(|e| e.get("sharedInbox"))
                .and_then(Value::as_str)
                .or_else(|| payload.get("sharedInbox").and_then(Value::as_str));
            if let Some(inbox) = shared_inbox {
                return Some(inbox.to_string());
            }
        }
        payload
            .get("inbox")
            .and_then(Value::as_str)
            .map(str::to_string)
    }
}

#[async_trait]
impl Protocol for ActivityPubProtocol {
    fn label(&self) -> &'static str {
        "activitypub"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["ap"]
    }

    fn owns_id(&self, id: &str) -> bool {
        // Only ids minted on our own ActivityPub subdomains are
        // statically ours; other https ids go through probing.
        crossfed_common::util::host_of(id)
            .is_some_and(|host| id.contains("://") && self.hosts.contains(&host))
    }

    fn owns_handle(&self, handle: &str) -> bool {
        HANDLE_RE.is_match(handle)
    }

    async fn fetch(&self, id: &str) -> Option<Value> {
        if !id.starts_with("http://") && !id.starts_with("https://") {
            return None;
        }
        let doc = self.client.get_json(id, &as2_accept_header()).await?;
        let canonical = convert::to_canonical(doc);
        if activity::id(&canonical).is_none() || canonical.get("type").is_none() {
            debug!(id = %id, "fetched document is not a recognizable AS2 object");
            return None;
        }
        Some(canonical)
    }

    async fn target_for(&self, obj: &object::Model, shared: bool) -> Option<String> {
        let payload = obj.payload.as_ref()?;

        // Actor profiles carry their inbox directly.
        if let Some(inbox) = Self::inbox_from(payload, shared) {
            return Some(inbox);
        }

        // Anything else is addressed to its owner's inbox.
        let owner_id = activity::owner(payload)?;
        let profile = self.objects.get(&owner_id).await.ok()??;
        Self::inbox_from(profile.payload.as_ref()?, shared)
    }

    async fn send(&self, obj: &object::Model, target: &str) -> AppResult<bool> {
        let Some(payload) = &obj.payload else {
            return Ok(false);
        };
        let doc = convert::from_canonical(payload);
        self.client.post_json(target, &doc, CONTENT_TYPE_AS).await
    }

    fn is_blocklisted(&self, address: &str) -> bool {
        blocklist::is_non_federating(address)
            || blocklist::is_bridge_domain(address, &self.bridge_domain)
    }
}

//! Web (webmention + microformats2) protocol implementation.

use async_trait::async_trait;
use crossfed_common::AppResult;
use crossfed_core::Protocol;
use crossfed_db::entities::object;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Value, json};
use tracing::debug;

use crate::blocklist;
use crate::client::FederationClient;

/// Bare registrable domain, e.g. `user.com`.
static DOMAIN_RE: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::unwrap_used)] // static pattern
    Regex::new(r"^[a-z0-9][a-z0-9-]*(\.[a-z0-9][a-z0-9-]*)+$").unwrap()
});

/// The indieweb, seen from the relay core: sites are actors, pages are
/// objects, webmentions are deliveries.
#[derive(Clone)]
pub struct WebProtocol {
    client: FederationClient,
    bridge_domain: String,
    hosts: Vec<String>,
}

impl WebProtocol {
    /// Create the protocol over the given client.
    #[must_use]
    pub fn new(client: FederationClient, bridge_domain: &str) -> Self {
        Self {
            client,
            bridge_domain: bridge_domain.to_string(),
            hosts: vec![
                format!("web.{bridge_domain}"),
                format!("webmention.{bridge_domain}"),
            ],
        }
    }

    fn fetch_url(id: &str) -> Option<String> {
        if id.starts_with("http://") || id.starts_with("https://") {
            return Some(id.to_string());
        }
        if DOMAIN_RE.is_match(id) {
            return Some(format!("https://{id}/"));
        }
        None
    }
}

#[async_trait]
impl Protocol for WebProtocol {
    fn label(&self) -> &'static str {
        "web"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["webmention"]
    }

    fn owns_id(&self, id: &str) -> bool {
        if DOMAIN_RE.is_match(id) {
            return true;
        }
        crossfed_common::util::host_of(id)
            .is_some_and(|host| id.contains("://") && self.hosts.contains(&host))
    }

    async fn fetch(&self, id: &str) -> Option<Value> {
        let url = Self::fetch_url(id)?;
        let (content_type, body) = self.client.get_text(&url, "text/html").await?;
        if !content_type.contains("html") {
            debug!(id = %id, content_type = %content_type, "document is not HTML");
            return None;
        }

        // Recognizability gate only: a page without embedded
        // microformats does not own anything here. The full mf2-to-
        // canonical conversion happens in the wire codec behind this
        // boundary.
        if body.contains("h-card") {
            Some(json!({"id": id, "objectType": "person", "url": url}))
        } else if body.contains("h-entry") {
            Some(json!({"id": id, "objectType": "note", "url": url}))
        } else {
            debug!(id = %id, "no microformats found in document");
            None
        }
    }

    async fn target_for(&self, obj: &object::Model, _shared: bool) -> Option<String> {
        // Webmentions target the page itself; there is no shared inbox
        // on the open web.
        let url = obj
            .payload
            .as_ref()
            .and_then(|p| p.get("url").and_then(Value::as_str))
            .map(str::to_string);
        url.or_else(|| Self::fetch_url(&obj.id))
    }

    async fn send(&self, obj: &object::Model, target: &str) -> AppResult<bool> {
        let source = obj
            .payload
            .as_ref()
            .and_then(|p| p.get("url").and_then(Value::as_str))
            .unwrap_or(&obj.id);

        // Endpoint discovery happens in the wire layer; the target we
        // are handed is already the page's webmention endpoint.
        self.client
            .post_form(target, &[("source", source), ("target", target)])
            .await
    }

    fn is_blocklisted(&self, address: &str) -> bool {
        blocklist::is_non_federating(address)
            || blocklist::is_bridge_domain(address, &self.bridge_domain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn protocol() -> WebProtocol {
        WebProtocol::new(FederationClient::new("crossfed-test"), "bridge.example")
    }

    #[test]
    fn test_owns_domains_and_bridge_urls() {
        let web = protocol();
        assert!(web.owns_id("user.com"));
        assert!(web.owns_id("sub.user.com"));
        assert!(web.owns_id("https://web.bridge.example/user.com"));
        assert!(!web.owns_id("https://site.example/post/1"));
        assert!(!web.owns_id("at://did:plc:abc"));
        assert!(!web.owns_id("not a domain"));
    }

    #[test]
    fn test_fetch_url_shapes() {
        assert_eq!(
            WebProtocol::fetch_url("user.com").as_deref(),
            Some("https://user.com/")
        );
        assert_eq!(
            WebProtocol::fetch_url("https://user.com/post").as_deref(),
            Some("https://user.com/post")
        );
        assert!(WebProtocol::fetch_url("did:plc:abc").is_none());
    }

    #[tokio::test]
    async fn test_target_is_the_page_itself() {
        let web = protocol();
        let mut obj = object::Model::with_id("https://user.com/post/1");
        obj.payload = Some(json!({"id": "https://user.com/post/1", "url": "https://user.com/post/1"}));
        assert_eq!(
            web.target_for(&obj, false).await.as_deref(),
            Some("https://user.com/post/1")
        );
        assert_eq!(
            web.target_for(&obj, true).await.as_deref(),
            Some("https://user.com/post/1")
        );
    }

    #[test]
    fn test_blocklist() {
        let web = protocol();
        assert!(web.is_blocklisted("https://facebook.com/foo"));
        assert!(web.is_blocklisted("https://web.bridge.example/user.com"));
        assert!(!web.is_blocklisted("https://user.com/"));
    }
}

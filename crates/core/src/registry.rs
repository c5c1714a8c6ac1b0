//! Protocol registry: ordered registration and static resolution.

use std::sync::Arc;

use crossfed_common::{AppError, AppResult, BridgeConfig, util};
use tracing::debug;

use crate::protocol::Protocol;

/// Ordered collection of the registered protocols.
///
/// Registration order is the priority order for static ownership tests.
/// A greedy protocol, when one is registered, is always consulted last.
pub struct ProtocolRegistry {
    protocols: Vec<Arc<dyn Protocol>>,
    greedy: Option<Arc<dyn Protocol>>,
    domain: String,
    fed_hosts: Vec<String>,
    probe_order: Vec<String>,
}

impl ProtocolRegistry {
    /// Create an empty registry for the configured bridge.
    #[must_use]
    pub fn new(bridge: &BridgeConfig) -> Self {
        let mut fed_hosts = bridge.fed_hosts.clone();
        fed_hosts.push(format!("fed.{}", bridge.domain));
        Self {
            protocols: Vec::new(),
            greedy: None,
            domain: bridge.domain.clone(),
            fed_hosts,
            probe_order: bridge.probe_order.clone(),
        }
    }

    /// Register a protocol. Fails on a duplicate label or a second
    /// greedy protocol.
    pub fn register(&mut self, proto: Arc<dyn Protocol>) -> AppResult<()> {
        if self.by_label(proto.label()).is_some() {
            return Err(AppError::Config(format!(
                "protocol label already registered: {}",
                proto.label()
            )));
        }
        if proto.greedy() {
            if self.greedy.is_some() {
                return Err(AppError::Config(
                    "at most one greedy protocol may be registered".to_string(),
                ));
            }
            self.greedy = Some(proto);
        } else {
            self.protocols.push(proto);
        }
        Ok(())
    }

    /// All registered protocols, non-greedy first in registration
    /// order, then the greedy one.
    pub fn ordered(&self) -> impl Iterator<Item = &Arc<dyn Protocol>> {
        self.protocols.iter().chain(self.greedy.iter())
    }

    /// Look up a protocol by label or alias.
    #[must_use]
    pub fn by_label(&self, label: &str) -> Option<Arc<dyn Protocol>> {
        self.ordered()
            .find(|p| p.label() == label || p.aliases().contains(&label))
            .cloned()
    }

    /// Static ownership pass: the first protocol whose no-I/O test
    /// claims the id, greedy last.
    #[must_use]
    pub fn static_for_id(&self, id: &str) -> Option<Arc<dyn Protocol>> {
        if id.is_empty() {
            return None;
        }
        self.ordered().find(|p| p.owns_id(id)).cloned()
    }

    /// Fixed priority order for remote ownership probing.
    #[must_use]
    pub fn probe_order(&self) -> &[String] {
        &self.probe_order
    }

    /// The bridge's root domain.
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Resolve a reserved bridge subdomain (or a URL on one) to its
    /// protocol. The federation alias hosts resolve to `fed`, when
    /// given; the bare root, `www.`, and unrecognized hosts resolve to
    /// nothing.
    #[must_use]
    pub fn for_bridge_host(
        &self,
        host_or_url: &str,
        fed: Option<&Arc<dyn Protocol>>,
    ) -> Option<Arc<dyn Protocol>> {
        let host = util::host_of(host_or_url)?;
        if self.fed_hosts.contains(&host) {
            return fed.cloned();
        }
        if host == self.domain || host == format!("www.{}", self.domain) {
            return None;
        }
        let label = host.strip_suffix(&format!(".{}", self.domain))?;
        if label.is_empty() || label.contains('.') {
            return None;
        }
        let resolved = self.by_label(label);
        if resolved.is_some() {
            debug!(host = %host, label = %label, "resolved bridge subdomain");
        }
        resolved
    }

    /// Resolve the protocol addressed by a request's host header.
    #[must_use]
    pub fn for_request(
        &self,
        host: Option<&str>,
        fed: Option<&Arc<dyn Protocol>>,
    ) -> Option<Arc<dyn Protocol>> {
        host.and_then(|h| self.for_bridge_host(h, fed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crossfed_db::entities::object;
    use serde_json::Value;

    struct StubProtocol {
        label: &'static str,
        aliases: &'static [&'static str],
        prefix: &'static str,
        greedy: bool,
    }

    #[async_trait]
    impl Protocol for StubProtocol {
        fn label(&self) -> &'static str {
            self.label
        }

        fn aliases(&self) -> &'static [&'static str] {
            self.aliases
        }

        fn greedy(&self) -> bool {
            self.greedy
        }

        fn owns_id(&self, id: &str) -> bool {
            self.greedy || id.starts_with(self.prefix)
        }

        async fn fetch(&self, _id: &str) -> Option<Value> {
            None
        }

        async fn target_for(&self, _obj: &object::Model, _shared: bool) -> Option<String> {
            None
        }

        async fn send(&self, _obj: &object::Model, _target: &str) -> crossfed_common::AppResult<bool> {
            Ok(false)
        }
    }

    fn bridge() -> BridgeConfig {
        BridgeConfig {
            domain: "bridge.example".to_string(),
            fed_hosts: vec!["localhost".to_string()],
            probe_order: vec!["ap".to_string(), "web".to_string()],
        }
    }

    fn registry() -> ProtocolRegistry {
        let mut reg = ProtocolRegistry::new(&bridge());
        reg.register(Arc::new(StubProtocol {
            label: "ap",
            aliases: &["activitypub"],
            prefix: "ap:",
            greedy: false,
        }))
        .unwrap();
        reg.register(Arc::new(StubProtocol {
            label: "web",
            aliases: &[],
            prefix: "https://",
            greedy: false,
        }))
        .unwrap();
        reg
    }

    #[test]
    fn test_static_for_id_registration_order() {
        let reg = registry();
        assert_eq!(reg.static_for_id("ap:alice").map(|p| p.label()), Some("ap"));
        assert_eq!(
            reg.static_for_id("https://site.example/").map(|p| p.label()),
            Some("web")
        );
        assert!(reg.static_for_id("unknown:thing").is_none());
        assert!(reg.static_for_id("").is_none());
    }

    #[test]
    fn test_greedy_checked_last_and_unique() {
        let mut reg = registry();
        reg.register(Arc::new(StubProtocol {
            label: "catchall",
            aliases: &[],
            prefix: "",
            greedy: true,
        }))
        .unwrap();

        // Non-greedy protocols still win for ids they claim.
        assert_eq!(reg.static_for_id("ap:alice").map(|p| p.label()), Some("ap"));
        // The greedy protocol picks up everything else.
        assert_eq!(
            reg.static_for_id("unknown:thing").map(|p| p.label()),
            Some("catchall")
        );

        let second = reg.register(Arc::new(StubProtocol {
            label: "catchall2",
            aliases: &[],
            prefix: "",
            greedy: true,
        }));
        assert!(matches!(second, Err(AppError::Config(_))));
    }

    #[test]
    fn test_duplicate_label_rejected() {
        let mut reg = registry();
        let dup = reg.register(Arc::new(StubProtocol {
            label: "activitypub",
            aliases: &[],
            prefix: "x:",
            greedy: false,
        }));
        assert!(matches!(dup, Err(AppError::Config(_))));
    }

    #[test]
    fn test_for_bridge_host_table() {
        let reg = registry();
        let fed = reg.by_label("ap");

        for (host, expected) in [
            ("ap.bridge.example", Some("ap")),
            ("activitypub.bridge.example", Some("ap")),
            ("web.bridge.example", Some("web")),
            ("bridge.example", None),
            ("www.bridge.example", None),
            ("ap.fed.bridge.example", None),
            ("other.example", None),
            ("", None),
        ] {
            assert_eq!(
                reg.for_bridge_host(host, None).map(|p| p.label()),
                expected,
                "host {host}"
            );
        }

        // Federation alias hosts resolve to the passed default.
        assert!(reg.for_bridge_host("fed.bridge.example", None).is_none());
        assert_eq!(
            reg.for_bridge_host("fed.bridge.example", fed.as_ref())
                .map(|p| p.label()),
            Some("ap")
        );
        assert_eq!(
            reg.for_bridge_host("http://localhost/foo", fed.as_ref())
                .map(|p| p.label()),
            Some("ap")
        );

        assert!(reg.for_request(None, fed.as_ref()).is_none());
        assert_eq!(
            reg.for_request(Some("web.bridge.example"), None)
                .map(|p| p.label()),
            Some("web")
        );
    }
}

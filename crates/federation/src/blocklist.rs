//! Shared target blocklist.

use crossfed_common::util;

/// Domains that do not federate. Delivering to them is pointless and,
/// for link shorteners, actively harmful as a loop risk.
pub const NON_FEDERATING_DOMAINS: &[&str] = &[
    "amp.twimg.com",
    "facebook.com",
    "fb.com",
    "instagram.com",
    "medium.com",
    "t.co",
    "twitter.com",
    "x.com",
    "youtube.com",
];

/// Whether an address sits on a non-federating domain.
#[must_use]
pub fn is_non_federating(address: &str) -> bool {
    let Some(domain) = util::domain(address) else {
        return false;
    };
    NON_FEDERATING_DOMAINS
        .iter()
        .any(|blocked| domain == *blocked || domain.ends_with(&format!(".{blocked}")))
}

/// Whether an address points back at the bridge itself.
#[must_use]
pub fn is_bridge_domain(address: &str, bridge_domain: &str) -> bool {
    let Some(domain) = util::domain(address) else {
        return false;
    };
    domain == bridge_domain || domain.ends_with(&format!(".{bridge_domain}"))
}

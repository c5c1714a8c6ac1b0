//! URL and identifier helpers.

use url::Url;

/// Extract the registrable host of an identifier, when it is an
/// `http(s)` URL with one. Non-URL identifiers (`at://`, `did:`,
/// `tag:` and friends) have no domain in this sense.
///
/// A leading `www.` is dropped so that `www.example.com` and
/// `example.com` compare equal.
#[must_use]
pub fn domain(id: &str) -> Option<String> {
    if !id.starts_with("http://") && !id.starts_with("https://") {
        return None;
    }
    let url = Url::parse(id).ok()?;
    let host = url.host_str()?.to_ascii_lowercase();
    Some(host.strip_prefix("www.").unwrap_or(&host).to_string())
}

/// Whether two identifiers name the same party: identical ids, or
/// `http(s)` URLs on the same domain.
#[must_use]
pub fn same_origin(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    match (domain(a), domain(b)) {
        (Some(da), Some(db)) => da == db,
        _ => false,
    }
}

/// The host portion of a host name or URL. Accepts either a bare host
/// (`sub.example.com`) or a full URL and returns the lowercased host.
#[must_use]
pub fn host_of(host_or_url: &str) -> Option<String> {
    if host_or_url.is_empty() {
        return None;
    }
    if host_or_url.contains("://") {
        let url = Url::parse(host_or_url).ok()?;
        return url.host_str().map(str::to_ascii_lowercase);
    }
    Some(host_or_url.to_ascii_lowercase())
}

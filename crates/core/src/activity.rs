//! Canonical activity payload helpers.
//!
//! Activities and objects cross the bridge as canonical JSON payloads.
//! These helpers read the handful of fields the relay core dispatches
//! on, and synthesize wrapper activities for bare objects.

use chrono::{SecondsFormat, Utc};
use serde_json::{Value, json};

/// Verbs the receive pipeline dispatches on.
pub const ACTIVITY_VERBS: &[&str] = &[
    "post",
    "update",
    "delete",
    "follow",
    "stop-following",
    "like",
    "share",
    "accept",
    "reject",
    "undo",
];

/// Verbs that fan out to the actor's followers when top-level.
pub const FANOUT_VERBS: &[&str] = &["post", "update", "delete", "share"];

/// The payload's `id`.
#[must_use]
pub fn id(payload: &Value) -> Option<&str> {
    payload.get("id").and_then(Value::as_str)
}

/// The payload's verb, when it is one the pipeline knows.
#[must_use]
pub fn verb(payload: &Value) -> Option<&str> {
    payload
        .get("verb")
        .and_then(Value::as_str)
        .filter(|v| ACTIVITY_VERBS.contains(v))
}

/// The payload's `objectType`.
#[must_use]
pub fn object_type(payload: &Value) -> Option<&str> {
    payload.get("objectType").and_then(Value::as_str)
}

/// Whether the payload is an activity, as opposed to a bare object that
/// still needs a synthesized wrapper.
#[must_use]
pub fn is_activity(payload: &Value) -> bool {
    object_type(payload) == Some("activity") || verb(payload).is_some()
}

/// Derived type: the verb for activities, the object type otherwise.
#[must_use]
pub fn type_of(payload: &Value) -> Option<String> {
    if let Some(v) = verb(payload) {
        return Some(v.to_string());
    }
    object_type(payload).map(str::to_string)
}

/// An id out of a reference value, which may be a bare string or a
/// composite object carrying its own `id`.
#[must_use]
pub fn as_id(value: &Value) -> Option<String> {
    if let Some(s) = value.as_str() {
        return (!s.is_empty()).then(|| s.to_string());
    }
    value
        .get("id")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// The actor or author attributed to the payload.
#[must_use]
pub fn owner(payload: &Value) -> Option<String> {
    payload
        .get("actor")
        .and_then(as_id)
        .or_else(|| payload.get("author").and_then(as_id))
}

/// The ids referenced by the payload's `object` field, in order.
#[must_use]
pub fn object_ids(payload: &Value) -> Vec<String> {
    match payload.get("object") {
        Some(Value::Array(items)) => items.iter().filter_map(as_id).collect(),
        Some(value) => as_id(value).into_iter().collect(),
        None => Vec::new(),
    }
}

/// The activity's inner object, when it is composite.
#[must_use]
pub fn inner_object(payload: &Value) -> Option<&Value> {
    payload.get("object").filter(|o| o.is_object())
}

/// The ids referenced by `inReplyTo`, in order.
#[must_use]
pub fn in_reply_to(payload: &Value) -> Vec<String> {
    match payload.get("inReplyTo") {
        Some(Value::Array(items)) => items.iter().filter_map(as_id).collect(),
        Some(value) => as_id(value).into_iter().collect(),
        None => Vec::new(),
    }
}

/// The ids of actors mentioned via `mention` tags.
#[must_use]
pub fn mentions(payload: &Value) -> Vec<String> {
    let Some(tags) = payload.get("tags").and_then(Value::as_array) else {
        return Vec::new();
    };
    tags.iter()
        .filter(|tag| tag.get("objectType").and_then(Value::as_str) == Some("mention"))
        .filter_map(|tag| tag.get("url").and_then(as_id))
        .collect()
}

/// The payload's `updated` timestamp, verbatim.
#[must_use]
pub fn updated(payload: &Value) -> Option<&str> {
    payload.get("updated").and_then(Value::as_str)
}

/// Current time in the ISO 8601 form used for synthesized ids.
#[must_use]
pub fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// Synthesize a `post` activity wrapping a bare object seen for the
/// first time.
#[must_use]
pub fn wrap_create(inner: &Value) -> Value {
    let inner_id = id(inner).unwrap_or_default();
    let mut wrapper = json!({
        "objectType": "activity",
        "verb": "post",
        "id": format!("{inner_id}#bridgy-fed-create"),
        "object": inner,
        "published": now_iso8601(),
    });
    if let Some(actor) = owner(inner) {
        wrapper["actor"] = Value::String(actor);
    }
    wrapper
}

/// Synthesize an `update` activity wrapping a changed bare object. The
/// timestamp comes from the object's own `updated` field when present,
/// else from the processing time, so retried deliveries of the same
/// revision produce the same id.
#[must_use]
pub fn wrap_update(inner: &Value) -> Value {
    let inner_id = id(inner).unwrap_or_default();
    let ts = updated(inner).map_or_else(now_iso8601, str::to_string);
    let mut wrapper = json!({
        "objectType": "activity",
        "verb": "update",
        "id": format!("{inner_id}#bridgy-fed-update-{ts}"),
        "object": inner,
    });
    if let Some(actor) = owner(inner) {
        wrapper["actor"] = Value::String(actor);
    }
    wrapper
}

/// The actor key a delivery to this payload should notify: its author,
/// or the actor itself when the payload is a profile.
#[must_use]
pub fn notify_key(payload: &Value) -> Option<String> {
    if let Some(author) = payload.get("author").and_then(as_id) {
        return Some(author);
    }
    if let Some(actor) = payload.get("actor").and_then(as_id) {
        return Some(actor);
    }
    if matches!(object_type(payload), Some("person" | "actor")) {
        return id(payload).map(str::to_string);
    }
    None
}

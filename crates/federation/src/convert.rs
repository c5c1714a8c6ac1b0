//! AS2 verb/type tables and shallow canonical normalization.
//!
//! The relay core dispatches on canonical verbs; remote ActivityPub
//! documents carry AS2 type names. Full codecs for each wire format
//! live outside the core; only the mapping normalization depends on is
//! here.

use serde_json::Value;

/// AS2 activity type to canonical verb.
const TYPE_TO_VERB: &[(&str, &str)] = &[
    ("Accept", "accept"),
    ("Announce", "share"),
    ("Create", "post"),
    ("Delete", "delete"),
    ("Follow", "follow"),
    ("Like", "like"),
    ("Reject", "reject"),
    ("Undo", "stop-following"),
    ("Update", "update"),
];

/// AS2 object type to canonical object type.
const TYPE_TO_OBJECT: &[(&str, &str)] = &[
    ("Article", "article"),
    ("Note", "note"),
    ("Person", "person"),
    ("Service", "person"),
    ("Tombstone", "note"),
];

/// Canonical verb for an AS2 activity type.
#[must_use]
pub fn verb_for_type(as2_type: &str) -> Option<&'static str> {
    TYPE_TO_VERB
        .iter()
        .find(|(t, _)| *t == as2_type)
        .map(|(_, v)| *v)
}

/// AS2 activity type for a canonical verb.
#[must_use]
pub fn type_for_verb(verb: &str) -> Option<&'static str> {
    TYPE_TO_VERB
        .iter()
        .find(|(_, v)| *v == verb)
        .map(|(t, _)| *t)
}

/// Shallow normalization of a fetched AS2 document into the canonical
/// shape the core dispatches on: `type` becomes `verb`/`objectType`,
/// `attributedTo` becomes `author`. Unrecognized documents pass through
/// untouched for the wire codec to deal with.
#[must_use]
pub fn to_canonical(mut doc: Value) -> Value {
    let Some(as2_type) = doc.get("type").and_then(Value::as_str).map(str::to_string) else {
        return doc;
    };

    if let Some(verb) = verb_for_type(&as2_type) {
        doc["verb"] = Value::String(verb.to_string());
        doc["objectType"] = Value::String("activity".to_string());
    } else if let Some(obj_type) = TYPE_TO_OBJECT
        .iter()
        .find(|(t, _)| *t == as2_type)
        .map(|(_, o)| *o)
    {
        doc["objectType"] = Value::String(obj_type.to_string());
    }

    if let Some(author) = doc.get("attributedTo").cloned() {
        if doc.get("author").is_none() {
            doc["author"] = author;
        }
    }

    doc
}

/// Shallow denormalization for outbound AS2 delivery: the canonical
/// verb becomes the AS2 `type` and the activitystreams context is
/// attached. The destination protocol's full codec finishes the job.
#[must_use]
pub fn from_canonical(payload: &Value) -> Value {
    let mut doc = payload.clone();
    if let Some(as2_type) = doc
        .get("verb")
        .and_then(Value::as_str)
        .and_then(type_for_verb)
    {
        doc["type"] = Value::String(as2_type.to_string());
    }
    if doc.get("@context").is_none() {
        doc["@context"] = Value::String("https://www.w3.org/ns/activitystreams".to_string());
    }
    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_verb_table_round_trips() {
        for verb in ["post", "update", "delete", "follow", "like", "share", "accept"] {
            let as2 = type_for_verb(verb).unwrap();
            assert_eq!(verb_for_type(as2), Some(verb));
        }
        assert!(verb_for_type("Question").is_none());
    }

    #[test]
    fn test_to_canonical_activity() {
        let doc = json!({
            "id": "https://inst.example/create/1",
            "type": "Create",
            "actor": "https://inst.example/users/a",
            "object": {"id": "https://inst.example/notes/1", "type": "Note"},
        });
        let canonical = to_canonical(doc);
        assert_eq!(canonical["verb"].as_str(), Some("post"));
        assert_eq!(canonical["objectType"].as_str(), Some("activity"));
    }

    #[test]
    fn test_to_canonical_object() {
        let doc = json!({
            "id": "https://inst.example/notes/1",
            "type": "Note",
            "attributedTo": "https://inst.example/users/a",
        });
        let canonical = to_canonical(doc);
        assert_eq!(canonical["objectType"].as_str(), Some("note"));
        assert_eq!(
            canonical["author"].as_str(),
            Some("https://inst.example/users/a")
        );
    }

    #[test]
    fn test_to_canonical_passthrough() {
        let doc = json!({"id": "x", "verb": "like"});
        assert_eq!(to_canonical(doc.clone()), doc);
    }

    #[test]
    fn test_from_canonical_sets_type_and_context() {
        let payload = json!({"id": "x", "objectType": "activity", "verb": "share"});
        let doc = from_canonical(&payload);
        assert_eq!(doc["type"].as_str(), Some("Announce"));
        assert_eq!(
            doc["@context"].as_str(),
            Some("https://www.w3.org/ns/activitystreams")
        );
    }
}

//! JSON-encoded column types shared across entities.

use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};

/// Ordered, duplicate-free list of actor keys or target addresses,
/// stored as a JSON array.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct KeyList(pub Vec<String>);

impl KeyList {
    /// Append a key, keeping the list duplicate-free. Returns whether the
    /// key was newly added.
    pub fn insert(&mut self, key: impl Into<String>) -> bool {
        let key = key.into();
        if self.0.contains(&key) {
            false
        } else {
            self.0.push(key);
            true
        }
    }

    /// Remove a key if present.
    pub fn remove(&mut self, key: &str) {
        self.0.retain(|k| k != key);
    }

    /// Whether the key is present.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.0.iter().any(|k| k == key)
    }

    /// Iterate over the keys in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    /// Number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<String>> for KeyList {
    fn from(keys: Vec<String>) -> Self {
        let mut list = Self::default();
        for key in keys {
            list.insert(key);
        }
        list
    }
}

impl<'a> IntoIterator for &'a KeyList {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// One cross-protocol mirror of a logical actor or object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct CopyTarget {
    /// Label of the protocol the mirror lives on.
    pub protocol: String,
    /// Protocol-native identifier of the mirror.
    pub uri: String,
}

/// List of cross-protocol mirrors, stored as a JSON array.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct CopyList(pub Vec<CopyTarget>);

impl CopyList {
    /// Whether any mirror uses the given URI.
    #[must_use]
    pub fn contains_uri(&self, uri: &str) -> bool {
        self.0.iter().any(|c| c.uri == uri)
    }

    /// Append a mirror, replacing any existing entry for the same protocol.
    pub fn upsert(&mut self, copy: CopyTarget) {
        self.0.retain(|c| c.protocol != copy.protocol);
        self.0.push(copy);
    }

    /// Iterate over the mirrors.
    pub fn iter(&self) -> std::slice::Iter<'_, CopyTarget> {
        self.0.iter()
    }

    /// Whether there are no mirrors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

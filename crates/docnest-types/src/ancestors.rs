use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Ids of the ancestor documents that select one specific nested path.
///
/// Keys are ancestor collection names and values are the document ids
/// chosen at each of those levels. A sub-collection at depth `k` needs
/// exactly `k` entries, one per ancestor collection up to the root.
/// Entries are not validated on insert; the collection that consumes the
/// map checks completeness and segment validity before resolving a path.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AncestorMap {
    ids: BTreeMap<String, String>,
}

impl AncestorMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    ///
    /// ```
    /// use docnest_types::AncestorMap;
    ///
    /// let ancestors = AncestorMap::new().with("items", "p1").with("notes", "q1");
    /// assert_eq!(ancestors.get("notes"), Some("q1"));
    /// ```
    pub fn with(mut self, collection: impl Into<String>, id: impl Into<String>) -> Self {
        self.insert(collection, id);
        self
    }

    /// Bind `collection` to `id`, returning the previous id if any.
    pub fn insert(&mut self, collection: impl Into<String>, id: impl Into<String>) -> Option<String> {
        self.ids.insert(collection.into(), id.into())
    }

    pub fn get(&self, collection: &str) -> Option<&str> {
        self.ids.get(collection).map(String::as_str)
    }

    pub fn contains(&self, collection: &str) -> bool {
        self.ids.contains_key(collection)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Iterate entries in collection-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.ids.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for AncestorMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

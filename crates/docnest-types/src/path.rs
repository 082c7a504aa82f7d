//! Resolved physical locations in the collection tree.
//!
//! A [`CollectionPath`] alternates collection and document segments and
//! always ends on a collection: `items/p1/notes/q1/tags`. A
//! [`DocumentPath`] is a collection path plus one document id:
//! `items/p1/notes/q1/tags/t1`. Both are built bottom-up from validated
//! segments, so every constructed path is well-formed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::names::{CollectionName, DocumentId};

/// Physical location of a collection.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CollectionPath {
    /// `(collection, document)` pairs from the root down to the owning document.
    levels: Vec<(CollectionName, DocumentId)>,
    name: CollectionName,
}

impl CollectionPath {
    /// A top-level collection.
    pub fn root(name: CollectionName) -> Self {
        Self {
            levels: Vec::new(),
            name,
        }
    }

    /// The collection's own name (the last segment).
    pub fn name(&self) -> &CollectionName {
        &self.name
    }

    /// Number of ancestor documents above this collection. Root collections
    /// have depth 0.
    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    pub fn is_root(&self) -> bool {
        self.levels.is_empty()
    }

    /// The document that owns this collection, if it is nested.
    pub fn parent_document(&self) -> Option<DocumentPath> {
        let ((name, id), rest) = self.levels.split_last()?;
        Some(DocumentPath {
            collection: CollectionPath {
                levels: rest.to_vec(),
                name: name.clone(),
            },
            id: id.clone(),
        })
    }

    /// Address a document inside this collection.
    pub fn doc(&self, id: DocumentId) -> DocumentPath {
        DocumentPath {
            collection: self.clone(),
            id,
        }
    }

    /// Ancestor `(collection, document)` pairs, root first.
    pub fn ancestors(&self) -> impl Iterator<Item = (&CollectionName, &DocumentId)> {
        self.levels.iter().map(|(c, d)| (c, d))
    }

    /// Slash-separated segments, starting at the root collection.
    pub fn segments(&self) -> Vec<&str> {
        let mut out = Vec::with_capacity(self.levels.len() * 2 + 1);
        for (c, d) in &self.levels {
            out.push(c.as_str());
            out.push(d.as_str());
        }
        out.push(self.name.as_str());
        out
    }

    /// Returns `true` if `doc` lives directly in this collection.
    pub fn contains(&self, doc: &DocumentPath) -> bool {
        &doc.collection == self
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments().join("/"))
    }
}

impl FromStr for CollectionPath {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let segments: Vec<&str> = s.split('/').collect();
        if segments.len() % 2 == 0 {
            return Err(TypeError::InvalidCollectionName {
                name: s.to_string(),
                reason: "a collection path has an odd number of segments".into(),
            });
        }
        let mut pairs = segments.chunks_exact(2);
        let mut levels = Vec::with_capacity(segments.len() / 2);
        for pair in pairs.by_ref() {
            levels.push((CollectionName::new(pair[0])?, DocumentId::new(pair[1])?));
        }
        let name = CollectionName::new(pairs.remainder()[0])?;
        Ok(Self { levels, name })
    }
}

/// Physical location of a single document.
///
/// This is the opaque handle handed to a database driver.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentPath {
    collection: CollectionPath,
    id: DocumentId,
}

impl DocumentPath {
    pub fn new(collection: CollectionPath, id: DocumentId) -> Self {
        Self { collection, id }
    }

    pub fn id(&self) -> &DocumentId {
        &self.id
    }

    /// The collection holding this document.
    pub fn collection(&self) -> &CollectionPath {
        &self.collection
    }

    /// Address a sub-collection owned by this document.
    pub fn sub_collection(&self, name: CollectionName) -> CollectionPath {
        let mut levels = self.collection.levels.clone();
        levels.push((self.collection.name.clone(), self.id.clone()));
        CollectionPath { levels, name }
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

impl FromStr for DocumentPath {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (collection, id) = s.rsplit_once('/').ok_or_else(|| TypeError::InvalidDocumentId {
            id: s.to_string(),
            reason: "a document path has an even number of segments".into(),
        })?;
        Ok(Self {
            collection: collection.parse()?,
            id: DocumentId::new(id)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn col(name: &str) -> CollectionName {
        CollectionName::new(name).unwrap()
    }

    fn id(value: &str) -> DocumentId {
        DocumentId::new(value).unwrap()
    }

    #[test]
    fn nested_path_display() {
        let items = CollectionPath::root(col("items"));
        let notes = items.doc(id("p1")).sub_collection(col("notes"));
        let tags = notes.doc(id("q1")).sub_collection(col("tags"));

        assert_eq!(tags.to_string(), "items/p1/notes/q1/tags");
        assert_eq!(tags.depth(), 2);
        assert_eq!(tags.doc(id("t1")).to_string(), "items/p1/notes/q1/tags/t1");
    }

    #[test]
    fn parent_document_walks_one_level_up() {
        let tags: CollectionPath = "items/p1/notes/q1/tags".parse().unwrap();
        let parent = tags.parent_document().unwrap();
        assert_eq!(parent.to_string(), "items/p1/notes/q1");
        assert_eq!(parent.collection().name().as_str(), "notes");

        let items = CollectionPath::root(col("items"));
        assert!(items.parent_document().is_none());
        assert!(items.is_root());
    }

    #[test]
    fn ancestors_are_root_first() {
        let tags: CollectionPath = "items/p1/notes/q1/tags".parse().unwrap();
        let pairs: Vec<(&str, &str)> = tags
            .ancestors()
            .map(|(c, d)| (c.as_str(), d.as_str()))
            .collect();
        assert_eq!(pairs, vec![("items", "p1"), ("notes", "q1")]);
    }

    #[test]
    fn parse_rejects_wrong_parity() {
        assert!("items/p1".parse::<CollectionPath>().is_err());
        assert!("items".parse::<DocumentPath>().is_err());
        assert!("items//notes".parse::<CollectionPath>().is_err());
    }

    #[test]
    fn contains_only_direct_children() {
        let notes: CollectionPath = "items/p1/notes".parse().unwrap();
        let direct: DocumentPath = "items/p1/notes/q1".parse().unwrap();
        let other: DocumentPath = "items/p2/notes/q1".parse().unwrap();
        assert!(notes.contains(&direct));
        assert!(!notes.contains(&other));
    }

    fn segment() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9_-]{1,12}".prop_filter("reserved form", |s| {
            !(s.len() >= 4 && s.starts_with("__") && s.ends_with("__"))
        })
    }

    proptest! {
        #[test]
        fn built_paths_parse_back(
            root in segment(),
            levels in proptest::collection::vec((segment(), segment()), 0..5),
            doc in segment(),
        ) {
            let mut path = CollectionPath::root(col(&root));
            for (doc_id, child) in &levels {
                path = path.doc(id(doc_id)).sub_collection(col(child));
            }
            let document = path.doc(id(&doc));
            prop_assert_eq!(document.collection().depth(), levels.len());

            let parsed: DocumentPath = document.to_string().parse().unwrap();
            prop_assert_eq!(parsed, document);
        }
    }
}

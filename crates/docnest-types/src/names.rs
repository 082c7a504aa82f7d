//! Path segment validation for collection names and document ids.
//!
//! Both collection names and document ids become single segments of a
//! slash-separated path, so they share the same rules:
//! - Must be non-empty
//! - Must not contain `/`
//! - Must not be `.` or `..`
//! - Must not use the reserved `__name__` form

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Characters that are forbidden anywhere in a segment.
const FORBIDDEN_CHARS: &[char] = &['/'];

/// Returns the reason `segment` is not a valid path segment, if any.
fn segment_violation(segment: &str) -> Option<String> {
    if segment.is_empty() {
        return Some("must not be empty".into());
    }

    for ch in FORBIDDEN_CHARS {
        if segment.contains(*ch) {
            return Some(format!("contains forbidden character: {ch:?}"));
        }
    }

    if segment == "." || segment == ".." {
        return Some("must not be '.' or '..'".into());
    }

    if segment.len() >= 4 && segment.starts_with("__") && segment.ends_with("__") {
        return Some("the '__name__' form is reserved".into());
    }

    None
}

/// Validate a collection name, returning `Ok(())` if valid.
///
/// # Examples
///
/// ```
/// use docnest_types::names::validate_collection_name;
///
/// assert!(validate_collection_name("items").is_ok());
/// assert!(validate_collection_name("").is_err());
/// assert!(validate_collection_name("items/notes").is_err());
/// ```
pub fn validate_collection_name(name: &str) -> Result<(), TypeError> {
    match segment_violation(name) {
        None => Ok(()),
        Some(reason) => Err(TypeError::InvalidCollectionName {
            name: name.to_string(),
            reason,
        }),
    }
}

/// Validate a document id. Same rules as collection names.
pub fn validate_document_id(id: &str) -> Result<(), TypeError> {
    match segment_violation(id) {
        None => Ok(()),
        Some(reason) => Err(TypeError::InvalidDocumentId {
            id: id.to_string(),
            reason,
        }),
    }
}

/// A validated collection name.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CollectionName(String);

impl CollectionName {
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        validate_collection_name(&name)?;
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CollectionName {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CollectionName> for String {
    fn from(name: CollectionName) -> Self {
        name.0
    }
}

impl AsRef<str> for CollectionName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for CollectionName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for CollectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CollectionName({})", self.0)
    }
}

impl fmt::Display for CollectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated document id.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Result<Self, TypeError> {
        let id = id.into();
        validate_document_id(&id)?;
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for DocumentId {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DocumentId> for String {
    fn from(id: DocumentId) -> Self {
        id.0
    }
}

impl AsRef<str> for DocumentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DocumentId({})", self.0)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_segments() {
        assert!(validate_collection_name("items").is_ok());
        assert!(validate_collection_name("MyCollection").is_ok());
        assert!(validate_document_id("p1").is_ok());
        assert!(validate_document_id("a.b").is_ok());
        assert!(validate_document_id("_x_").is_ok());
    }

    #[test]
    fn reject_empty() {
        assert!(validate_collection_name("").is_err());
        assert!(validate_document_id("").is_err());
    }

    #[test]
    fn reject_slash() {
        let err = validate_document_id("a/b").unwrap_err();
        assert!(matches!(err, TypeError::InvalidDocumentId { .. }));
        assert!(validate_collection_name("/items").is_err());
    }

    #[test]
    fn reject_dot_segments() {
        assert!(validate_document_id(".").is_err());
        assert!(validate_document_id("..").is_err());
    }

    #[test]
    fn reject_reserved_form() {
        assert!(validate_collection_name("__meta__").is_err());
        assert!(validate_document_id("____").is_err());
        assert!(validate_document_id("__").is_ok());
    }

    #[test]
    fn newtype_roundtrip_through_serde() {
        let name = CollectionName::new("notes").unwrap();
        let json = serde_json::to_string(&name).unwrap();
        assert_eq!(json, "\"notes\"");
        let back: CollectionName = serde_json::from_str(&json).unwrap();
        assert_eq!(back, name);
    }

    #[test]
    fn collection_names_key_maps_by_str() {
        let mut map = std::collections::BTreeMap::new();
        map.insert(CollectionName::new("notes").unwrap(), 1);
        map.insert(CollectionName::new("items").unwrap(), 2);
        assert_eq!(map.get("notes"), Some(&1));
        assert!(map.contains_key("items"));
        assert!(!map.contains_key("tags"));
    }

    #[test]
    fn serde_rejects_invalid_segment() {
        let result: Result<DocumentId, _> = serde_json::from_str("\"a/b\"");
        assert!(result.is_err());
    }
}

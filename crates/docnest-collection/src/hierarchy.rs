//! Declarative wiring of a fixed collection tree.
//!
//! Applications usually build their collection nodes once at startup. A
//! [`HierarchyConfig`] lists every collection and its parent, in TOML:
//!
//! ```toml
//! [[collections]]
//! name = "items"
//!
//! [[collections]]
//! name = "notes"
//! parent = "items"
//! ```
//!
//! [`Hierarchy`] validates the declarations once and then hands out typed
//! [`Collection`] and [`SubCollection`] nodes by name.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use docnest_store::Driver;
use docnest_types::CollectionName;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::collection::Collection;
use crate::error::HierarchyError;
use crate::sub::SubCollection;

/// One declared collection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

impl CollectionEntry {
    pub fn root(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
        }
    }

    pub fn nested(name: impl Into<String>, parent: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: Some(parent.into()),
        }
    }
}

/// Ordered collection declarations. Parents must be declared before their
/// children.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyConfig {
    #[serde(default)]
    pub collections: Vec<CollectionEntry>,
}

impl HierarchyConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, HierarchyError> {
        toml::from_str(s).map_err(|e| HierarchyError::Config(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, HierarchyError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}

/// A validated collection tree bound to one driver.
pub struct Hierarchy {
    driver: Arc<dyn Driver>,
    /// Collection name -> ancestor names, root first.
    nodes: BTreeMap<CollectionName, Vec<CollectionName>>,
}

impl Hierarchy {
    pub fn new(config: &HierarchyConfig, driver: Arc<dyn Driver>) -> Result<Self, HierarchyError> {
        let mut nodes: BTreeMap<CollectionName, Vec<CollectionName>> = BTreeMap::new();

        for entry in &config.collections {
            let name = CollectionName::new(entry.name.as_str())?;
            if nodes.contains_key(&name) {
                return Err(HierarchyError::Duplicate(entry.name.clone()));
            }

            let ancestors = match &entry.parent {
                None => Vec::new(),
                Some(parent) => {
                    let unknown = || HierarchyError::UnknownParent {
                        name: entry.name.clone(),
                        parent: parent.clone(),
                    };
                    let parent = CollectionName::new(parent.as_str()).map_err(|_| unknown())?;
                    let mut chain = nodes.get(&parent).cloned().ok_or_else(unknown)?;
                    chain.push(parent);
                    chain
                }
            };
            nodes.insert(name, ancestors);
        }

        info!(collections = nodes.len(), "collection hierarchy ready");
        Ok(Self { driver, nodes })
    }

    /// Declared collection names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(CollectionName::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// The node for collection `name`, holding documents of type `T`.
    pub fn collection<T>(&self, name: &str) -> Result<Collection<T>, HierarchyError> {
        let (key, ancestors) = self
            .nodes
            .get_key_value(name)
            .ok_or_else(|| HierarchyError::UnknownCollection(name.to_string()))?;
        Ok(Collection::from_parts(
            key.clone(),
            ancestors.clone(),
            Arc::clone(&self.driver),
        ))
    }

    /// The node for nested collection `name`.
    pub fn sub_collection<T>(&self, name: &str) -> Result<SubCollection<T>, HierarchyError> {
        SubCollection::try_from(self.collection::<T>(name)?)
            .map_err(|_| HierarchyError::NotNested(name.to_string()))
    }
}

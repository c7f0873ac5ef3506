//! Concurrent cache of loaded schemas

use crate::model::Schema;
use dashmap::DashMap;

/// Thread-safe registry of schemas keyed by name.
///
/// Loaders share one registry through an `Arc`, so a schema read from disk
/// once is served from memory afterwards.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: DashMap<String, Schema>,
}

impl SchemaRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            schemas: DashMap::new(),
        }
    }

    /// Register a schema, replacing any earlier entry with the same name
    pub fn register(&self, name: impl Into<String>, schema: Schema) {
        self.schemas.insert(name.into(), schema);
    }

    /// Clone of the schema registered under `name`
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Schema> {
        self.schemas.get(name).map(|entry| entry.value().clone())
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    pub fn remove(&self, name: &str) -> Option<Schema> {
        self.schemas.remove(name).map(|(_, schema)| schema)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Registered names, sorted
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.schemas.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}

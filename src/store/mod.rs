//! In-memory document store backing the [`crate::model::Model`] capability.
//!
//! Collections live behind `parking_lot` locks that are never held across an
//! await point. Nothing is persisted.

pub mod collection;
pub mod eval;
pub mod model;
pub mod query;

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

pub use collection::Collection;
pub use eval::{CmpOp, Filter, compare_bson, compare_docs, eval_filter, project};
pub use model::CollectionModel;
pub use query::{StoreQuery, StoreSingleQuery};

use crate::schema::Schema;

/// Shared handle to a set of named collections. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct Store {
    collections: Arc<RwLock<HashMap<String, Arc<Collection>>>>,
}

impl Store {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `name` with `schema`, or return the existing collection unchanged.
    pub fn register(&self, name: &str, schema: Option<Schema>) -> Arc<Collection> {
        let mut map = self.collections.write();
        Arc::clone(map.entry(name.to_string()).or_insert_with(|| {
            log::debug!("registering collection {name}");
            Arc::new(Collection::new(name, schema))
        }))
    }

    /// Existing collection, or a new one without a schema.
    pub fn collection(&self, name: &str) -> Arc<Collection> {
        if let Some(c) = self.get(name) {
            return c;
        }
        self.register(name, None)
    }

    pub fn get(&self, name: &str) -> Option<Arc<Collection>> {
        self.collections.read().get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.collections.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Model named `model_name` over `collection` (created schemaless when missing).
    pub fn model(&self, model_name: &str, collection: &str) -> CollectionModel {
        CollectionModel::new(self.clone(), self.collection(collection), model_name)
    }
}

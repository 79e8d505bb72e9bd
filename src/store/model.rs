use bson::Document;
use std::sync::Arc;

use super::Store;
use super::collection::Collection;
use super::eval::project;
use super::query::{StoreQuery, StoreSingleQuery};
use crate::errors::ModelError;
use crate::model::{Model, Query, UpdateOptions};

/// A named model bound to one store collection.
#[derive(Debug, Clone)]
pub struct CollectionModel {
    store: Store,
    collection: Arc<Collection>,
    model_name: String,
}

impl CollectionModel {
    pub(crate) fn new(store: Store, collection: Arc<Collection>, model_name: &str) -> Self {
        Self { store, collection, model_name: model_name.to_string() }
    }

    pub fn collection(&self) -> &Arc<Collection> {
        &self.collection
    }

    fn visible(&self, doc: Option<Document>) -> Result<Option<Document>, ModelError> {
        let hidden = self.collection.hidden_fields();
        doc.map(|d| project(&d, None, &hidden)).transpose()
    }
}

impl Model for CollectionModel {
    type Document = Document;
    type Query = StoreQuery;
    type SingleQuery = StoreSingleQuery;

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn find(&self, base_filter: Document) -> StoreQuery {
        StoreQuery::new(Arc::clone(&self.collection)).apply_filter(base_filter)
    }

    fn find_by_id(&self, id: &str) -> StoreSingleQuery {
        StoreSingleQuery::new(self.store.clone(), Arc::clone(&self.collection), id)
    }

    async fn create(&self, body: Document) -> Result<Document, ModelError> {
        self.collection.insert(body)
    }

    async fn find_by_id_and_update(
        &self,
        id: &str,
        body: Document,
        options: UpdateOptions,
    ) -> Result<Option<Document>, ModelError> {
        let updated = self.collection.update_by_id(id, body, options)?;
        self.visible(updated)
    }

    async fn find_by_id_and_delete(&self, id: &str) -> Result<Option<Document>, ModelError> {
        let removed = self.collection.delete_by_id(id)?;
        self.visible(removed)
    }
}

use bson::{Bson, Document};
use std::sync::Arc;

use super::Store;
use super::collection::{Collection, ID_FIELD};
use super::eval::{CmpOp, Filter, compare_docs, get_path, project};
use crate::errors::ModelError;
use crate::features::{FieldSelection, SortFields};
use crate::model::{Populate, Query, SingleQuery};

/// List query over one collection. Conditions accumulate and must all hold.
#[derive(Debug, Clone)]
pub struct StoreQuery {
    collection: Arc<Collection>,
    conditions: Vec<Document>,
    sort: SortFields,
    selection: Option<FieldSelection>,
    skip: u64,
    limit: Option<u64>,
}

impl StoreQuery {
    pub(crate) fn new(collection: Arc<Collection>) -> Self {
        Self {
            collection,
            conditions: Vec::new(),
            sort: SortFields::default(),
            selection: None,
            skip: 0,
            limit: None,
        }
    }

    fn filter(&self) -> Result<Filter, ModelError> {
        let schema = self.collection.schema();
        let parts = self
            .conditions
            .iter()
            .map(|c| Filter::parse(c, schema))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(match parts.len() {
            0 => Filter::True,
            1 => parts.into_iter().next().unwrap_or(Filter::True),
            _ => Filter::And(parts),
        })
    }
}

impl Query for StoreQuery {
    type Document = Document;

    fn apply_filter(mut self, criteria: Document) -> Self {
        if !criteria.is_empty() {
            self.conditions.push(criteria);
        }
        self
    }

    fn apply_sort(mut self, sort: &SortFields) -> Self {
        self.sort = sort.clone();
        self
    }

    fn apply_select(mut self, selection: &FieldSelection) -> Self {
        self.selection = Some(selection.clone());
        self
    }

    fn apply_skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    fn apply_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    async fn execute(self) -> Result<Vec<Document>, ModelError> {
        let filter = self.filter()?;
        let mut docs = self.collection.scan(&filter);
        if !self.sort.is_empty() {
            docs.sort_by(|a, b| compare_docs(a, b, self.sort.specs()));
        }
        let skip = usize::try_from(self.skip).unwrap_or(usize::MAX);
        let limit = self.limit.map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));
        let hidden = self.collection.hidden_fields();
        docs.iter()
            .skip(skip)
            .take(limit)
            .map(|d| project(d, self.selection.as_ref(), &hidden))
            .collect()
    }

    async fn count_matching(&self) -> Result<u64, ModelError> {
        let filter = self.filter()?;
        Ok(self.collection.count(&filter) as u64)
    }
}

/// Lookup of one document by id, with optional relation expansion.
#[derive(Debug, Clone)]
pub struct StoreSingleQuery {
    store: Store,
    collection: Arc<Collection>,
    id: String,
    populate: Vec<Populate>,
}

impl StoreSingleQuery {
    pub(crate) fn new(store: Store, collection: Arc<Collection>, id: &str) -> Self {
        Self { store, collection, id: id.to_string(), populate: Vec::new() }
    }

    fn expand(&self, doc: &mut Document, populate: &Populate) -> Result<(), ModelError> {
        let Some(target) = self.store.get(&populate.from) else {
            return Err(ModelError::Storage(format!(
                "no collection registered under {:?}",
                populate.from
            )));
        };
        let local = if populate.local_field == ID_FIELD {
            doc.get(ID_FIELD)
        } else {
            get_path(doc, &populate.local_field)
        };
        let matched = match local {
            Some(value) => {
                let filter = Filter::Cmp {
                    path: populate.foreign_field.clone(),
                    op: CmpOp::Eq,
                    value: value.clone(),
                };
                let hidden = target.hidden_fields();
                target
                    .scan(&filter)
                    .iter()
                    .map(|d| project(d, populate.select.as_ref(), &hidden).map(Bson::Document))
                    .collect::<Result<Vec<_>, _>>()?
            }
            None => Vec::new(),
        };
        let value = if populate.many {
            Bson::Array(matched)
        } else {
            matched.into_iter().next().unwrap_or(Bson::Null)
        };
        doc.insert(populate.path.clone(), value);
        Ok(())
    }
}

impl SingleQuery for StoreSingleQuery {
    type Document = Document;

    fn populate(mut self, populate: &Populate) -> Self {
        self.populate.push(populate.clone());
        self
    }

    async fn execute(self) -> Result<Option<Document>, ModelError> {
        let Some(found) = self.collection.find_by_id(&self.id)? else {
            return Ok(None);
        };
        let mut doc = project(&found, None, &self.collection.hidden_fields())?;
        for p in &self.populate {
            self.expand(&mut doc, p)?;
        }
        Ok(Some(doc))
    }
}

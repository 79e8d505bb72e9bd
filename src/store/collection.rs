use bson::{Bson, Document};
use chrono::Utc;
use parking_lot::RwLock;

use super::eval::{Filter, eval_filter};
use crate::config::VERSION_FIELD;
use crate::errors::ModelError;
use crate::model::UpdateOptions;
use crate::schema::{MANAGED_FIELDS, Schema, format_date, is_valid_id, plain_string};

pub const ID_FIELD: &str = "_id";
pub const CREATED_FIELD: &str = "createdAt";

/// Documents of one kind, held in insertion order.
#[derive(Debug)]
pub struct Collection {
    name: String,
    docs: RwLock<Vec<Document>>,
    schema: Option<Schema>,
}

pub(crate) fn id_of(doc: &Document) -> Option<&str> {
    doc.get(ID_FIELD).and_then(Bson::as_str)
}

fn check_id(id: &str) -> Result<(), ModelError> {
    if is_valid_id(id) {
        Ok(())
    } else {
        Err(ModelError::Cast { path: ID_FIELD.into(), value: id.into() })
    }
}

fn normalize_id(value: &Bson) -> Result<String, ModelError> {
    match value {
        Bson::String(s) if is_valid_id(s) => Ok(s.clone()),
        Bson::ObjectId(oid) => Ok(oid.to_hex()),
        other => Err(ModelError::Cast { path: ID_FIELD.into(), value: plain_string(other) }),
    }
}

impl Collection {
    pub fn new(name: impl Into<String>, schema: Option<Schema>) -> Self {
        Self { name: name.into(), docs: RwLock::new(Vec::new()), schema }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> Option<&Schema> {
        self.schema.as_ref()
    }

    pub fn len(&self) -> usize {
        self.docs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.read().is_empty()
    }

    /// Fields left out of results unless a projection asks for them.
    pub fn hidden_fields(&self) -> Vec<String> {
        self.schema
            .as_ref()
            .map(|s| s.hidden_fields().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Insert a new document, keeping a valid `_id` from the body or assigning one.
    ///
    /// # Errors
    /// Schema violations, a malformed `_id`, or a unique field collision.
    pub fn insert(&self, body: Document) -> Result<Document, ModelError> {
        let prepared = match &self.schema {
            Some(schema) => schema.prepare_create(body)?,
            None => body,
        };
        let id = match prepared.get(ID_FIELD) {
            Some(v) => normalize_id(v)?,
            None => uuid::Uuid::new_v4().to_string(),
        };
        let mut doc = Document::new();
        doc.insert(ID_FIELD, id.clone());
        for (k, v) in prepared {
            if k != ID_FIELD {
                doc.insert(k, v);
            }
        }
        if !doc.contains_key(CREATED_FIELD) {
            doc.insert(CREATED_FIELD, format_date(Utc::now()));
        }
        if !doc.contains_key(VERSION_FIELD) {
            doc.insert(VERSION_FIELD, 0_i32);
        }

        let mut docs = self.docs.write();
        if docs.iter().any(|d| id_of(d) == Some(id.as_str())) {
            return Err(ModelError::Duplicate { field: ID_FIELD.into(), value: id });
        }
        self.check_unique(&docs, &doc, None)?;
        docs.push(doc.clone());
        log::debug!("{}: inserted {id}", self.name);
        Ok(doc)
    }

    /// Insert every document, stopping at the first failure.
    ///
    /// # Errors
    /// The first insert error; earlier documents stay inserted.
    pub fn import(&self, docs: impl IntoIterator<Item = Document>) -> Result<usize, ModelError> {
        let mut n = 0;
        for doc in docs {
            self.insert(doc)?;
            n += 1;
        }
        log::info!("{}: imported {n} documents", self.name);
        Ok(n)
    }

    fn check_unique(
        &self,
        docs: &[Document],
        candidate: &Document,
        skip_id: Option<&str>,
    ) -> Result<(), ModelError> {
        let Some(schema) = &self.schema else {
            return Ok(());
        };
        for field in schema.unique_fields() {
            let Some(value) = candidate.get(field) else {
                continue;
            };
            let taken = docs
                .iter()
                .filter(|d| skip_id.is_none() || id_of(d) != skip_id)
                .any(|d| d.get(field) == Some(value));
            if taken {
                return Err(ModelError::Duplicate {
                    field: field.to_string(),
                    value: plain_string(value),
                });
            }
        }
        Ok(())
    }

    /// # Errors
    /// [`ModelError::Cast`] for a malformed id.
    pub fn find_by_id(&self, id: &str) -> Result<Option<Document>, ModelError> {
        check_id(id)?;
        Ok(self.docs.read().iter().find(|d| id_of(d) == Some(id)).cloned())
    }

    /// Merge `body` into the document's top-level fields. `_id` and the version
    /// field never change.
    ///
    /// # Errors
    /// A malformed id, a cast or rule failure, or a unique field collision.
    pub fn update_by_id(
        &self,
        id: &str,
        body: Document,
        options: UpdateOptions,
    ) -> Result<Option<Document>, ModelError> {
        check_id(id)?;
        let changes = match &self.schema {
            Some(schema) => schema.prepare_update(body, options.run_validators)?,
            None => body.into_iter().filter(|(k, _)| !MANAGED_FIELDS.contains(&k.as_str())).collect(),
        };
        let mut docs = self.docs.write();
        let Some(pos) = docs.iter().position(|d| id_of(d) == Some(id)) else {
            return Ok(None);
        };
        let before = docs[pos].clone();
        let mut after = before.clone();
        for (k, v) in changes {
            after.insert(k, v);
        }
        self.check_unique(&docs, &after, Some(id))?;
        docs[pos] = after.clone();
        Ok(Some(if options.return_updated { after } else { before }))
    }

    /// # Errors
    /// [`ModelError::Cast`] for a malformed id.
    pub fn delete_by_id(&self, id: &str) -> Result<Option<Document>, ModelError> {
        check_id(id)?;
        let mut docs = self.docs.write();
        Ok(docs.iter().position(|d| id_of(d) == Some(id)).map(|pos| docs.remove(pos)))
    }

    /// Clones of every document matching `filter`, in insertion order.
    pub fn scan(&self, filter: &Filter) -> Vec<Document> {
        self.docs.read().iter().filter(|d| eval_filter(d, filter)).cloned().collect()
    }

    pub fn count(&self, filter: &Filter) -> usize {
        self.docs.read().iter().filter(|d| eval_filter(d, filter)).count()
    }
}

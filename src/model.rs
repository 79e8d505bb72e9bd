//! Capabilities a persistence layer provides to the handlers.
//!
//! Implementations decide how criteria, sort keys and projections are executed;
//! the handlers never look inside a document.

use bson::Document as BsonDocument;
use serde::Serialize;
use std::future::Future;

use crate::errors::ModelError;
use crate::features::{FieldSelection, SortFields};

/// A pending multi-document read. Builder methods consume and return the query.
pub trait Query: Sized + Send {
    type Document: Serialize + Send;

    /// Merge `criteria` into the current conditions.
    fn apply_filter(self, criteria: BsonDocument) -> Self;

    /// Replace the sort keys.
    fn apply_sort(self, sort: &SortFields) -> Self;

    /// Replace the projection; applying the same selection twice equals applying it once.
    fn apply_select(self, selection: &FieldSelection) -> Self;

    fn apply_skip(self, skip: u64) -> Self;

    fn apply_limit(self, limit: u64) -> Self;

    fn execute(self) -> impl Future<Output = Result<Vec<Self::Document>, ModelError>> + Send;

    /// Number of documents matching the conditions, ignoring skip and limit.
    fn count_matching(&self) -> impl Future<Output = Result<u64, ModelError>> + Send;
}

/// A pending lookup of one document by id.
pub trait SingleQuery: Sized + Send {
    type Document: Serialize + Send;

    fn populate(self, populate: &Populate) -> Self;

    fn execute(self) -> impl Future<Output = Result<Option<Self::Document>, ModelError>> + Send;
}

/// Relation expansion applied to a single-document read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Populate {
    /// Field on the result that receives the related document(s).
    pub path: String,
    /// Collection holding the related documents.
    pub from: String,
    pub local_field: String,
    pub foreign_field: String,
    /// `true` expands to an array of every match, `false` to the first match or null.
    pub many: bool,
    pub select: Option<FieldSelection>,
}

impl Populate {
    /// `path` holds the id of a document in `from`.
    pub fn reference(path: impl Into<String>, from: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            local_field: path.clone(),
            path,
            from: from.into(),
            foreign_field: "_id".into(),
            many: false,
            select: None,
        }
    }

    /// Every document in `from` whose `foreign_field` equals this document's `_id`.
    pub fn virtual_many(
        path: impl Into<String>,
        from: impl Into<String>,
        foreign_field: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            from: from.into(),
            local_field: "_id".into(),
            foreign_field: foreign_field.into(),
            many: true,
            select: None,
        }
    }

    #[must_use]
    pub fn select(mut self, fields: &str) -> Self {
        self.select = Some(FieldSelection::parse(fields));
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Return the document after the update instead of before.
    pub return_updated: bool,
    /// Check the updated fields against the schema.
    pub run_validators: bool,
}

/// A document collection the resource handlers can work against.
pub trait Model: Send + Sync {
    type Document: Serialize + Send;
    type Query: Query<Document = Self::Document>;
    type SingleQuery: SingleQuery<Document = Self::Document>;

    /// Human-readable model name, e.g. `Tour`.
    fn model_name(&self) -> &str;

    /// Key used in response envelopes.
    fn envelope_key(&self) -> String {
        self.model_name().to_lowercase()
    }

    /// Start a list query constrained by `base_filter` (empty for no constraint).
    fn find(&self, base_filter: BsonDocument) -> Self::Query;

    fn find_by_id(&self, id: &str) -> Self::SingleQuery;

    fn create(
        &self,
        body: BsonDocument,
    ) -> impl Future<Output = Result<Self::Document, ModelError>> + Send;

    fn find_by_id_and_update(
        &self,
        id: &str,
        body: BsonDocument,
        options: UpdateOptions,
    ) -> impl Future<Output = Result<Option<Self::Document>, ModelError>> + Send;

    fn find_by_id_and_delete(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Option<Self::Document>, ModelError>> + Send;
}

//! Generic CRUD handlers over any [`Model`].
//!
//! Handlers return `Result<Reply, AppError>` and never render failures
//! themselves; callers hand errors to [`crate::response::ErrorTranslator`].

use bson::{Bson, Document};
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;

use crate::config::FeatureConfig;
use crate::errors::AppError;
use crate::features::QueryFeatures;
use crate::logger::AUDIT_TARGET;
use crate::model::{Model, Populate, Query, SingleQuery, UpdateOptions};
use crate::params::{QueryPreset, RawParameters};
use crate::response::{Envelope, Reply};

pub const PAGE_NOT_FOUND: &str = "This page does not exist";

/// Convert a parsed JSON body into a document.
///
/// # Errors
/// [`AppError::BadRequest`] unless the value is a JSON object.
pub fn json_to_document(value: Value) -> Result<Document, AppError> {
    match Bson::try_from(value) {
        Ok(Bson::Document(doc)) => Ok(doc),
        Ok(_) => Err(AppError::BadRequest("request body must be a JSON object".into())),
        Err(e) => Err(AppError::BadRequest(e.to_string())),
    }
}

/// Everything a handler reads from an incoming request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Request {
    pub params: RawParameters,
    pub id: Option<String>,
    pub body: Option<Document>,
    /// Criteria every list result must satisfy, e.g. `{tour: <id>}` on a nested route.
    pub base_filter: Document,
}

impl Request {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_params(mut self, params: RawParameters) -> Self {
        self.params = params;
        self
    }

    /// Parameters decoded from a raw query string.
    #[must_use]
    pub fn with_query(self, query: &str) -> Self {
        self.with_params(RawParameters::from_query_str(query))
    }

    #[must_use]
    pub fn with_preset(mut self, preset: &QueryPreset) -> Self {
        preset.apply_to(&mut self.params);
        self
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: Document) -> Self {
        self.body = Some(body);
        self
    }

    /// # Errors
    /// [`AppError::BadRequest`] unless `body` is a JSON object.
    pub fn with_json_body(self, body: Value) -> Result<Self, AppError> {
        Ok(self.with_body(json_to_document(body)?))
    }

    #[must_use]
    pub fn with_base_filter(mut self, filter: Document) -> Self {
        self.base_filter = filter;
        self
    }

    /// Fill `field` in the body from a route parameter unless the client sent one.
    #[must_use]
    pub fn default_body_field(mut self, field: &str, value: impl Into<Bson>) -> Self {
        let body = self.body.get_or_insert_with(Document::new);
        if !body.contains_key(field) {
            body.insert(field, value.into());
        }
        self
    }

    fn require_id(&self) -> Result<&str, AppError> {
        self.id.as_deref().ok_or_else(|| AppError::BadRequest("missing document id".into()))
    }

    fn require_body(&self) -> Result<Document, AppError> {
        self.body.clone().ok_or_else(|| AppError::BadRequest("missing request body".into()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandlerOptions {
    /// Relations expanded by `get_one`, in order.
    pub populate: Vec<Populate>,
}

impl HandlerOptions {
    #[must_use]
    pub fn populate(mut self, populate: Populate) -> Self {
        self.populate.push(populate);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    GetAll,
    GetOne,
    CreateOne,
    UpdateOne,
    DeleteOne,
}

impl FromStr for HandlerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "getAll" | "get_all" | "list" => Ok(Self::GetAll),
            "getOne" | "get_one" | "get" => Ok(Self::GetOne),
            "createOne" | "create_one" | "create" => Ok(Self::CreateOne),
            "updateOne" | "update_one" | "update" => Ok(Self::UpdateOne),
            "deleteOne" | "delete_one" | "delete" => Ok(Self::DeleteOne),
            other => Err(format!("unknown handler: {other}")),
        }
    }
}

/// The five handlers for one model. Cheap to clone; the model is shared.
#[derive(Debug)]
pub struct ResourceHandlers<M> {
    model: Arc<M>,
    options: HandlerOptions,
    config: FeatureConfig,
}

impl<M> Clone for ResourceHandlers<M> {
    fn clone(&self) -> Self {
        Self {
            model: Arc::clone(&self.model),
            options: self.options.clone(),
            config: self.config.clone(),
        }
    }
}

impl<M: Model> ResourceHandlers<M> {
    pub fn new(model: Arc<M>, config: FeatureConfig) -> Self {
        Self { model, options: HandlerOptions::default(), config }
    }

    #[must_use]
    pub fn with_options(mut self, options: HandlerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// # Errors
    /// Whatever the selected handler returns.
    pub async fn handle(&self, kind: HandlerKind, req: &Request) -> Result<Reply, AppError> {
        match kind {
            HandlerKind::GetAll => self.get_all(req).await,
            HandlerKind::GetOne => self.get_one(req).await,
            HandlerKind::CreateOne => self.create_one(req).await,
            HandlerKind::UpdateOne => self.update_one(req).await,
            HandlerKind::DeleteOne => self.delete_one(req).await,
        }
    }

    /// List documents through the full filter, sort, select, paginate pipeline.
    ///
    /// # Errors
    /// [`AppError::ExecutionFailed`] when the query fails; [`AppError::NotFound`]
    /// for a page past the end when `strict_pages` is enabled.
    pub async fn get_all(&self, req: &Request) -> Result<Reply, AppError> {
        let base = self.model.find(req.base_filter.clone());
        let features = QueryFeatures::new(base, &req.params, &self.config).apply_all();
        let pagination = features.pagination();
        let query = features.into_query();

        if self.config.strict_pages && req.params.contains("page") && pagination.page > 1 {
            let total = query.count_matching().await?;
            if total <= pagination.skip {
                return Err(AppError::NotFound(PAGE_NOT_FOUND.into()));
            }
        }

        let docs = query.execute().await?;
        let n = docs.len();
        log::info!("{}: listed {n} documents (page {})", self.model.model_name(), pagination.page);
        let data = serde_json::to_value(&docs)?;
        Ok(Reply::new(200, Envelope::success(&self.model.envelope_key(), data).with_results(n)))
    }

    /// # Errors
    /// [`AppError::NotFound`] when nothing has the id.
    pub async fn get_one(&self, req: &Request) -> Result<Reply, AppError> {
        let id = req.require_id()?;
        let query = self
            .options
            .populate
            .iter()
            .fold(self.model.find_by_id(id), |q, p| q.populate(p));
        let doc = query.execute().await?.ok_or_else(AppError::no_document)?;
        let data = serde_json::to_value(&doc)?;
        Ok(Reply::new(200, Envelope::success(&self.model.envelope_key(), data)))
    }

    /// # Errors
    /// [`AppError::ValidationFailed`] when the model rejects the body.
    pub async fn create_one(&self, req: &Request) -> Result<Reply, AppError> {
        let body = req.require_body()?;
        let doc = self.model.create(body).await?;
        let data = serde_json::to_value(&doc)?;
        log::info!(target: AUDIT_TARGET, "create {} {}", self.model.model_name(), audit_id(&data));
        Ok(Reply::new(
            201,
            Envelope::success(&self.model.envelope_key(), data).with_message("Document created"),
        ))
    }

    /// Apply the body to the document, validating and returning the new version.
    ///
    /// # Errors
    /// [`AppError::NotFound`] when nothing has the id, [`AppError::ValidationFailed`]
    /// when the changes break a rule.
    pub async fn update_one(&self, req: &Request) -> Result<Reply, AppError> {
        let id = req.require_id()?;
        let body = req.require_body()?;
        let options = UpdateOptions { return_updated: true, run_validators: true };
        let doc = self
            .model
            .find_by_id_and_update(id, body, options)
            .await?
            .ok_or_else(AppError::no_document)?;
        log::info!(target: AUDIT_TARGET, "update {} {id}", self.model.model_name());
        let data = serde_json::to_value(&doc)?;
        Ok(Reply::new(
            200,
            Envelope::success(&self.model.envelope_key(), data).with_message("Document updated"),
        ))
    }

    /// # Errors
    /// [`AppError::NotFound`] when nothing has the id, including a second delete.
    pub async fn delete_one(&self, req: &Request) -> Result<Reply, AppError> {
        let id = req.require_id()?;
        self.model.find_by_id_and_delete(id).await?.ok_or_else(AppError::no_document)?;
        log::info!(target: AUDIT_TARGET, "delete {} {id}", self.model.model_name());
        Ok(Reply::new(204, Envelope::deleted()))
    }
}

/// The `_id` of a serialized document, for audit lines.
fn audit_id(data: &Value) -> &str {
    data.get("_id").and_then(Value::as_str).unwrap_or("-")
}

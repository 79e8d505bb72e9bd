use bson::Document;
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::command::Command;
use crate::config::AppConfig;
use crate::errors::{AppError, ModelError};
use crate::handlers::{Request, json_to_document};
use crate::response::{ErrorTranslator, Reply};
use crate::store::{Collection, Store};

#[derive(Debug, Error)]
pub enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{path}: {message}")]
    Data { path: PathBuf, message: String },

    #[error("{path}: import failed: {source}")]
    Import {
        path: PathBuf,
        #[source]
        source: ModelError,
    },
}

/// Parse a JSON array of objects, or one object per line.
///
/// # Errors
/// A message naming the first malformed entry.
pub fn parse_documents(text: &str) -> Result<Vec<Document>, String> {
    let trimmed = text.trim_start();
    let values: Vec<Value> = if trimmed.starts_with('[') {
        serde_json::from_str(trimmed).map_err(|e| e.to_string())?
    } else {
        trimmed
            .lines()
            .enumerate()
            .filter(|(_, l)| !l.trim().is_empty())
            .map(|(i, l)| serde_json::from_str(l).map_err(|e| format!("line {}: {e}", i + 1)))
            .collect::<Result<_, _>>()?
    };
    values
        .into_iter()
        .enumerate()
        .map(|(i, v)| json_to_document(v).map_err(|e| format!("entry {i}: {e}")))
        .collect()
}

/// Load a data file into `collection`, returning the number of documents.
///
/// # Errors
/// Unreadable or malformed files, or a document the collection rejects.
pub fn load_data(collection: &Collection, path: &Path) -> Result<usize, CliError> {
    let text = std::fs::read_to_string(path)?;
    let docs = parse_documents(&text)
        .map_err(|message| CliError::Data { path: path.to_path_buf(), message })?;
    collection
        .import(docs)
        .map_err(|source| CliError::Import { path: path.to_path_buf(), source })
}

fn build_request(cmd: Command) -> Result<Request, AppError> {
    let parse_body = |body: &str| -> Result<Value, AppError> {
        serde_json::from_str(body).map_err(|e| AppError::BadRequest(format!("invalid JSON body: {e}")))
    };
    Ok(match cmd {
        Command::List { query, preset, .. } => {
            let req = Request::new().with_query(query.as_deref().unwrap_or_default());
            match preset {
                Some(p) => req.with_preset(&p),
                None => req,
            }
        }
        Command::Get { id, .. } | Command::Delete { id, .. } => Request::new().with_id(id),
        Command::Create { body, .. } => Request::new().with_json_body(parse_body(&body)?)?,
        Command::Update { id, body, .. } => {
            Request::new().with_id(id).with_json_body(parse_body(&body)?)?
        }
    })
}

/// Run one command against a fresh in-memory store. Handler failures come back
/// as translated error replies; only loading problems are `Err`.
///
/// # Errors
/// See [`load_data`].
pub async fn run(cmd: Command, config: &AppConfig) -> Result<Reply, CliError> {
    let store = Store::new();
    let resource = cmd.resource();
    let handlers = resource.handlers(&store, config.features.clone());
    if let Some(path) = cmd.data_file() {
        let n = load_data(handlers.model().collection(), path)?;
        log::info!("loaded {n} {resource} from {}", path.display());
    }
    let kind = cmd.kind();
    let translator = ErrorTranslator::new(config.environment);
    let outcome = match build_request(cmd) {
        Ok(req) => handlers.handle(kind, &req).await,
        Err(e) => Err(e),
    };
    Ok(outcome.unwrap_or_else(|err| translator.translate(&err)))
}

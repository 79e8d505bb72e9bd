use std::path::{Path, PathBuf};

use crate::handlers::HandlerKind;
use crate::params::QueryPreset;
use crate::resources::Resource;

/// One CLI invocation. `data` is a JSON array (or NDJSON) file loaded into the
/// resource's collection before the handler runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List {
        resource: Resource,
        data: Option<PathBuf>,
        query: Option<String>,
        preset: Option<QueryPreset>,
    },
    Get {
        resource: Resource,
        id: String,
        data: Option<PathBuf>,
    },
    Create {
        resource: Resource,
        body: String,
        data: Option<PathBuf>,
    },
    Update {
        resource: Resource,
        id: String,
        body: String,
        data: Option<PathBuf>,
    },
    Delete {
        resource: Resource,
        id: String,
        data: Option<PathBuf>,
    },
}

impl Command {
    #[must_use]
    pub fn resource(&self) -> Resource {
        match self {
            Self::List { resource, .. }
            | Self::Get { resource, .. }
            | Self::Create { resource, .. }
            | Self::Update { resource, .. }
            | Self::Delete { resource, .. } => *resource,
        }
    }

    #[must_use]
    pub fn data_file(&self) -> Option<&Path> {
        match self {
            Self::List { data, .. }
            | Self::Get { data, .. }
            | Self::Create { data, .. }
            | Self::Update { data, .. }
            | Self::Delete { data, .. } => data.as_deref(),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> HandlerKind {
        match self {
            Self::List { .. } => HandlerKind::GetAll,
            Self::Get { .. } => HandlerKind::GetOne,
            Self::Create { .. } => HandlerKind::CreateOne,
            Self::Update { .. } => HandlerKind::UpdateOne,
            Self::Delete { .. } => HandlerKind::DeleteOne,
        }
    }
}

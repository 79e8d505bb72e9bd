//! Generic resource handlers for the Natours API.
//!
//! A list request flows through the [`features`] pipeline (filter, sort,
//! select, paginate) into any [`model::Model`]; [`handlers::ResourceHandlers`]
//! wires the five CRUD operations on top, and [`response::ErrorTranslator`]
//! turns failures into replies. [`store`] provides an in-memory model.

pub mod cli;
pub mod config;
pub mod errors;
pub mod features;
pub mod handlers;
pub mod logger;
pub mod model;
pub mod params;
pub mod resources;
pub mod response;
pub mod schema;
pub mod store;

pub use config::{AppConfig, FeatureConfig};
pub use errors::{AppError, ModelError};
pub use features::QueryFeatures;
pub use handlers::{HandlerKind, Request, ResourceHandlers};
pub use params::RawParameters;
pub use resources::Resource;
pub use response::{ErrorTranslator, Reply};
pub use store::Store;

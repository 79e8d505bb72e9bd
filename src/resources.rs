//! The tour and review resources: schema rules, relations and handler wiring.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::config::FeatureConfig;
use crate::handlers::{HandlerOptions, ResourceHandlers};
use crate::model::Populate;
use crate::schema::{FieldKind, FieldRule, Schema};
use crate::store::{CollectionModel, Store};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Tour,
    Review,
}

impl Resource {
    pub const ALL: [Self; 2] = [Self::Tour, Self::Review];

    #[must_use]
    pub const fn model_name(self) -> &'static str {
        match self {
            Self::Tour => "Tour",
            Self::Review => "Review",
        }
    }

    #[must_use]
    pub const fn collection_name(self) -> &'static str {
        match self {
            Self::Tour => "tours",
            Self::Review => "reviews",
        }
    }

    #[must_use]
    pub fn schema(self) -> Schema {
        match self {
            Self::Tour => tour_schema(),
            Self::Review => review_schema(),
        }
    }

    /// Relations expanded when a single document is read.
    #[must_use]
    pub fn handler_options(self) -> HandlerOptions {
        match self {
            Self::Tour => HandlerOptions::default()
                .populate(Populate::virtual_many("reviews", "reviews", "tour").select("-__v")),
            Self::Review => {
                HandlerOptions::default().populate(Populate::reference("tour", "tours").select("name"))
            }
        }
    }

    fn related(self) -> &'static [Self] {
        match self {
            Self::Tour => &[Self::Review],
            Self::Review => &[Self::Tour],
        }
    }

    /// Register this resource's collection (and those it populates from) in `store`.
    pub fn register(self, store: &Store) -> CollectionModel {
        for other in self.related() {
            store.register(other.collection_name(), Some(other.schema()));
        }
        store.register(self.collection_name(), Some(self.schema()));
        store.model(self.model_name(), self.collection_name())
    }

    pub fn handlers(self, store: &Store, config: FeatureConfig) -> ResourceHandlers<CollectionModel> {
        ResourceHandlers::new(Arc::new(self.register(store)), config)
            .with_options(self.handler_options())
    }
}

impl FromStr for Resource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tour" | "tours" => Ok(Self::Tour),
            "review" | "reviews" => Ok(Self::Review),
            other => Err(format!("unknown resource: {other} (expected tour or review)")),
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.collection_name())
    }
}

fn tour_schema() -> Schema {
    use FieldKind as K;
    Schema::new()
        .field(
            "name",
            FieldRule::new(K::String).required("A tour must have a name").unique().trim(),
        )
        .field("duration", FieldRule::new(K::Number).required("A tour must have a duration"))
        .field(
            "maxGroupSize",
            FieldRule::new(K::Number).required("A tour must have a group size"),
        )
        .field("difficulty", FieldRule::new(K::String).required("A tour must have a difficulty"))
        .field("ratingsAverage", FieldRule::new(K::Number).default_value(4.5))
        .field("ratingsQuantity", FieldRule::new(K::Number).default_value(0))
        .field("price", FieldRule::new(K::Number).required("A tour must have a price"))
        .field("priceDiscount", FieldRule::new(K::Number))
        .field(
            "summary",
            FieldRule::new(K::String).trim().required("A tour must have a description"),
        )
        .field("description", FieldRule::new(K::String).trim())
        .field("imageCover", FieldRule::new(K::String).required("A tour must have a image cover"))
        .field("images", FieldRule::new(K::StringList))
        .field("createdAt", FieldRule::new(K::Date).default_now().hidden())
        .field("startDates", FieldRule::new(K::DateList))
}

fn review_schema() -> Schema {
    use FieldKind as K;
    Schema::new()
        .field("review", FieldRule::new(K::String).required("A review can not be empty"))
        .field(
            "rating",
            FieldRule::new(K::Number)
                .default_value(5)
                .min(0.0, "rating cannot be lower than 0")
                .max(5.0, "rating cannot be greater than 5"),
        )
        .field("createdAt", FieldRule::new(K::Date).default_now().hidden())
        .field("tour", FieldRule::new(K::Id).required("A review must belong to a Tour"))
        .field("user", FieldRule::new(K::Id).required("A review must belong to a User"))
}

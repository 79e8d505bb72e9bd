use bson::{Document, doc};
use natours::config::FeatureConfig;
use natours::handlers::ResourceHandlers;
use natours::resources::Resource;
use natours::store::{CollectionModel, Store};
use std::sync::Arc;

pub const FOREST_HIKER: &str = "5c88fa8cf4afda39709c2955";
pub const SEA_EXPLORER: &str = "5c88fa8cf4afda39709c295a";
pub const SNOW_ADVENTURER: &str = "5c88fa8cf4afda39709c295d";
pub const USER: &str = "5c8a1d5b0190b214360dc057";

pub type Handlers = ResourceHandlers<CollectionModel>;

/// Schemaless `tours` handlers seeded with `docs`.
pub fn plain_handlers(docs: Vec<Document>) -> Handlers {
    plain_handlers_with(docs, FeatureConfig::default())
}

pub fn plain_handlers_with(docs: Vec<Document>, config: FeatureConfig) -> Handlers {
    let store = Store::new();
    let model = store.model("Tour", "tours");
    model.collection().import(docs).unwrap();
    ResourceHandlers::new(Arc::new(model), config)
}

pub fn tour(id: &str, name: &str, duration: i32, difficulty: &str, price: i32, rating: f64) -> Document {
    doc! {
        "_id": id,
        "name": name,
        "duration": duration,
        "maxGroupSize": 10,
        "difficulty": difficulty,
        "ratingsAverage": rating,
        "price": price,
        "summary": format!("{name} summary"),
        "imageCover": "tour-cover.jpg",
    }
}

pub fn sample_tours() -> Vec<Document> {
    vec![
        tour(FOREST_HIKER, "The Forest Hiker", 5, "easy", 397, 4.7),
        tour(SEA_EXPLORER, "The Sea Explorer", 7, "medium", 497, 4.8),
        tour(SNOW_ADVENTURER, "The Snow Adventurer", 4, "difficult", 997, 4.5),
    ]
}

/// Tour and review handlers over one store holding the sample tours.
pub fn seeded() -> (Handlers, Handlers) {
    let store = Store::new();
    let tours = Resource::Tour.handlers(&store, FeatureConfig::default());
    tours.model().collection().import(sample_tours()).unwrap();
    let reviews = Resource::Review.handlers(&store, FeatureConfig::default());
    (tours, reviews)
}

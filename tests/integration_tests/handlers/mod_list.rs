use crate::integration_tests::_support::{
    FOREST_HIKER, SNOW_ADVENTURER, plain_handlers, plain_handlers_with, seeded,
};
use bson::doc;
use natours::config::FeatureConfig;
use natours::errors::{AppError, ModelError};
use natours::handlers::Request;
use natours::params::QueryPreset;
use serde_json::json;

#[tokio::test]
async fn cheapest_name_only_end_to_end() {
    let h = plain_handlers(vec![
        doc! { "name": "A", "price": 100 },
        doc! { "name": "B", "price": 50 },
    ]);
    let req = Request::new().with_query("sort=price&fields=name&limit=1&page=1");
    let reply = h.get_all(&req).await.unwrap();
    assert_eq!(reply.status_code, 200);
    assert_eq!(reply.envelope.results, Some(1));
    assert_eq!(reply.envelope.payload("tour"), Some(&json!([{ "name": "B" }])));
}

#[tokio::test]
async fn default_listing_hides_version_field() {
    let h = plain_handlers(vec![doc! { "name": "A", "price": 100 }]);
    let reply = h.get_all(&Request::new()).await.unwrap();
    let docs = reply.envelope.payload("tour").unwrap().as_array().unwrap().clone();
    assert_eq!(docs.len(), 1);
    assert!(docs[0].get("__v").is_none());
    assert!(docs[0].get("_id").is_some());
    assert!(docs[0].get("createdAt").is_some());
}

#[tokio::test]
async fn comparison_filters_on_schema_fields() {
    let (tours, _) = seeded();
    let req = Request::new().with_query("duration[gte]=5&sort=price&fields=name");
    let reply = tours.get_all(&req).await.unwrap();
    assert_eq!(
        reply.envelope.payload("tour"),
        Some(&json!([{ "name": "The Forest Hiker" }, { "name": "The Sea Explorer" }]))
    );

    let req = Request::new().with_query("price[lt]=500&difficulty=easy&fields=name");
    let reply = tours.get_all(&req).await.unwrap();
    assert_eq!(reply.envelope.results, Some(1));
}

#[tokio::test]
async fn repeated_values_match_any() {
    let (tours, _) = seeded();
    let req = Request::new().with_query("difficulty=easy&difficulty=difficult&sort=-price&fields=_id");
    let reply = tours.get_all(&req).await.unwrap();
    assert_eq!(
        reply.envelope.payload("tour"),
        Some(&json!([{ "_id": SNOW_ADVENTURER }, { "_id": FOREST_HIKER }]))
    );
}

#[tokio::test]
async fn sort_descending_then_ascending() {
    let h = plain_handlers(vec![
        doc! { "name": "b", "price": 10 },
        doc! { "name": "a", "price": 10 },
        doc! { "name": "c", "price": 30 },
    ]);
    let reply = h.get_all(&Request::new().with_query("sort=-price,name&fields=name")).await.unwrap();
    assert_eq!(
        reply.envelope.payload("tour"),
        Some(&json!([{ "name": "c" }, { "name": "a" }, { "name": "b" }]))
    );
}

#[tokio::test]
async fn pages_past_the_end_are_empty_by_default() {
    let h = plain_handlers(vec![doc! { "name": "A" }, doc! { "name": "B" }]);
    let reply = h.get_all(&Request::new().with_query("page=3&limit=1")).await.unwrap();
    assert_eq!(reply.status_code, 200);
    assert_eq!(reply.envelope.results, Some(0));
}

#[tokio::test]
async fn strict_pages_report_not_found() {
    let config = FeatureConfig { strict_pages: true, ..FeatureConfig::default() };
    let h = plain_handlers_with(vec![doc! { "name": "A" }, doc! { "name": "B" }], config);

    let err = h.get_all(&Request::new().with_query("page=3&limit=1")).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(ref m) if m == "This page does not exist"));

    let reply = h.get_all(&Request::new().with_query("page=2&limit=1")).await.unwrap();
    assert_eq!(reply.envelope.results, Some(1));
}

#[tokio::test]
async fn invalid_paging_values_fall_back() {
    let docs = (0..12).map(|i| doc! { "n": i }).collect();
    let h = plain_handlers(docs);
    let reply = h.get_all(&Request::new().with_query("page=zero&limit=-5")).await.unwrap();
    assert_eq!(reply.envelope.results, Some(10));
}

#[tokio::test]
async fn mixed_projection_is_an_execution_failure() {
    let h = plain_handlers(vec![doc! { "name": "A", "price": 1 }]);
    let err = h.get_all(&Request::new().with_query("fields=name,-price")).await.unwrap_err();
    assert!(matches!(err, AppError::ExecutionFailed(ModelError::Projection(_))));
    assert_eq!(err.status_code(), 400);
}

#[tokio::test]
async fn unknown_operator_is_an_execution_failure() {
    let h = plain_handlers(vec![doc! { "name": "A" }]);
    let req = Request::new().with_query("name[$where]=1");
    let err = h.get_all(&req).await.unwrap_err();
    assert!(matches!(err, AppError::ExecutionFailed(ModelError::InvalidOperator(_))));
}

#[tokio::test]
async fn top_five_cheap_preset() {
    let (tours, _) = seeded();
    let req = Request::new().with_query("limit=100").with_preset(&QueryPreset::top_five_cheap());
    let reply = tours.get_all(&req).await.unwrap();
    let docs = reply.envelope.payload("tour").unwrap().as_array().unwrap().clone();
    assert_eq!(docs.len(), 3);
    assert_eq!(docs[0]["name"], "The Sea Explorer");
    let keys: Vec<_> = docs[0].as_object().unwrap().keys().cloned().collect();
    assert_eq!(keys.len(), 5);
    assert!(!keys.contains(&"_id".to_string()));
}

#[tokio::test]
async fn sorting_mixed_text_values_is_lexical() {
    let docs = (0..300)
        .map(|i| match i % 3 {
            0 => doc! { "code": i.to_string() },
            1 => doc! { "code": format!("{}x", i % 13) },
            _ => doc! { "code": i },
        })
        .collect();
    let h = plain_handlers(docs);
    let reply = h.get_all(&Request::new().with_query("sort=code&fields=code&limit=400")).await.unwrap();
    assert_eq!(reply.envelope.results, Some(300));
    let codes = reply.envelope.payload("tour").unwrap().as_array().unwrap().clone();
    let (numbers, texts): (Vec<_>, Vec<_>) = codes.iter().map(|d| &d["code"]).partition(|c| c.is_number());
    assert_eq!(numbers.len(), 100);
    assert!(codes[..100].iter().all(|d| d["code"].is_number()));
    let texts: Vec<&str> = texts.iter().map(|c| c.as_str().unwrap()).collect();
    assert!(texts.windows(2).all(|w| w[0] <= w[1]));
}

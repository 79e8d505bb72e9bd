use crate::integration_tests::_support::{FOREST_HIKER, SEA_EXPLORER, USER, seeded};
use bson::doc;
use natours::errors::AppError;
use natours::handlers::Request;
use serde_json::json;

// POST /tours/:tourId/reviews, with the tour id taken from the route.
fn review_for(tour_id: &str, text: &str, rating: i32) -> Request {
    Request::new()
        .with_body(doc! { "review": text, "rating": rating, "user": USER })
        .default_body_field("tour", tour_id)
}

#[tokio::test]
async fn reviews_listed_per_tour() {
    let (_, reviews) = seeded();
    for (tour, text, rating) in [
        (FOREST_HIKER, "Lovely walk", 5),
        (FOREST_HIKER, "Too many bugs", 3),
        (SEA_EXPLORER, "Wet", 4),
    ] {
        let reply = reviews.create_one(&review_for(tour, text, rating)).await.unwrap();
        assert_eq!(reply.status_code, 201);
    }

    let nested = Request::new()
        .with_query("sort=rating&fields=review")
        .with_base_filter(doc! { "tour": FOREST_HIKER });
    let reply = reviews.get_all(&nested).await.unwrap();
    assert_eq!(
        reply.envelope.payload("review"),
        Some(&json!([{ "review": "Too many bugs" }, { "review": "Lovely walk" }]))
    );

    // Criteria narrow the base filter; they never widen it.
    let nested = Request::new()
        .with_query(&format!("tour={SEA_EXPLORER}"))
        .with_base_filter(doc! { "tour": FOREST_HIKER });
    assert_eq!(reviews.get_all(&nested).await.unwrap().envelope.results, Some(0));
}

#[tokio::test]
async fn review_rating_rules_apply() {
    let (_, reviews) = seeded();
    let err = reviews.create_one(&review_for(FOREST_HIKER, "Wow", 9)).await.unwrap_err();
    assert!(matches!(err, AppError::ValidationFailed(ref v) if v[0].message == "rating cannot be greater than 5"));

    let req = Request::new().with_body(doc! { "review": "orphan", "user": USER });
    let err = reviews.create_one(&req).await.unwrap_err();
    assert!(matches!(err, AppError::ValidationFailed(ref v) if v[0].message == "A review must belong to a Tour"));
}

#[tokio::test]
async fn get_one_populates_relations() {
    let (tours, reviews) = seeded();
    let created = reviews.create_one(&review_for(FOREST_HIKER, "Lovely walk", 5)).await.unwrap();
    let review_id = created.envelope.payload("review").unwrap()["_id"].as_str().unwrap().to_string();

    let reply = reviews.get_one(&Request::new().with_id(review_id.as_str())).await.unwrap();
    let review = reply.envelope.payload("review").unwrap();
    assert_eq!(review["tour"], json!({ "name": "The Forest Hiker" }));

    let reply = tours.get_one(&Request::new().with_id(FOREST_HIKER)).await.unwrap();
    let listed = reply.envelope.payload("tour").unwrap()["reviews"].as_array().unwrap().clone();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["review"], "Lovely walk");
    assert!(listed[0].get("__v").is_none());
    assert!(listed[0].get("createdAt").is_none());
}

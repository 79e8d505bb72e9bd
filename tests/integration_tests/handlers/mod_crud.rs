use crate::integration_tests::_support::{FOREST_HIKER, SEA_EXPLORER, plain_handlers, seeded};
use bson::doc;
use natours::config::Environment;
use natours::errors::{AppError, ModelError};
use natours::handlers::{HandlerKind, Request};
use natours::response::{ErrorTranslator, Status};
use serde_json::json;

#[tokio::test]
async fn get_one_missing_is_not_found() {
    let (tours, _) = seeded();
    let err = tours.get_one(&Request::new().with_id("5c88fa8cf4afda39709c2999")).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(ref m) if m == "No document found with that ID"));

    let reply = ErrorTranslator::new(Environment::Production).translate(&err);
    assert_eq!(reply.status_code, 404);
    assert_eq!(reply.envelope.status, Status::Fail);
    assert!(reply.envelope.data.is_none());
}

#[tokio::test]
async fn get_one_with_malformed_id_is_a_cast_failure() {
    let (tours, _) = seeded();
    let err = tours.get_one(&Request::new().with_id("wwwwww")).await.unwrap_err();
    assert!(matches!(err, AppError::ExecutionFailed(ModelError::Cast { .. })));
    let reply = ErrorTranslator::new(Environment::Production).translate(&err);
    assert_eq!(reply.status_code, 400);
    assert_eq!(reply.envelope.message.as_deref(), Some("Invalid _id: wwwwww."));
}

#[tokio::test]
async fn get_one_hides_hidden_fields() {
    let (tours, _) = seeded();
    let reply = tours.get_one(&Request::new().with_id(FOREST_HIKER)).await.unwrap();
    let tour = reply.envelope.payload("tour").unwrap();
    assert_eq!(tour["name"], "The Forest Hiker");
    assert!(tour.get("createdAt").is_none());
    assert_eq!(tour["reviews"], json!([]));
}

#[tokio::test]
async fn delete_twice_is_success_then_not_found() {
    let (tours, _) = seeded();
    let req = Request::new().with_id(SEA_EXPLORER);
    let reply = tours.delete_one(&req).await.unwrap();
    assert_eq!(reply.status_code, 204);
    assert!(reply.body().is_none());
    assert_eq!(reply.envelope.data, Some(serde_json::Value::Null));

    let err = tours.delete_one(&req).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    assert!(matches!(tours.get_one(&req).await, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn create_applies_schema_defaults() {
    let (tours, _) = seeded();
    let body = json!({
        "name": "  The Park Camper  ",
        "duration": "10",
        "maxGroupSize": 15,
        "difficulty": "medium",
        "price": 1497,
        "summary": "Breathing in Nature in America's most spectacular National Parks",
        "imageCover": "tour-4-cover.jpg",
        "secretTour": true,
    });
    let reply = tours.create_one(&Request::new().with_json_body(body).unwrap()).await.unwrap();
    assert_eq!(reply.status_code, 201);
    let tour = reply.envelope.payload("tour").unwrap();
    assert_eq!(tour["name"], "The Park Camper");
    assert_eq!(tour["duration"], 10);
    assert_eq!(tour["ratingsAverage"], 4.5);
    assert_eq!(tour["__v"], 0);
    assert!(tour.get("secretTour").is_none());
    assert!(tour["_id"].is_string());
}

#[tokio::test]
async fn create_reports_every_violation() {
    let (tours, _) = seeded();
    let req = Request::new().with_body(doc! { "name": "Lonely", "duration": "long" });
    let err = tours.create_one(&req).await.unwrap_err();
    let AppError::ValidationFailed(violations) = &err else {
        panic!("expected validation failure, got {err:?}");
    };
    assert!(violations.iter().any(|v| v.path == "duration" && v.message.contains("Cast to Number")));
    assert!(violations.iter().any(|v| v.message == "A tour must have a price"));

    let reply = ErrorTranslator::new(Environment::Production).translate(&err);
    assert_eq!(reply.status_code, 400);
    assert!(reply.envelope.message.as_deref().unwrap().starts_with("Invalid input data. "));
}

#[tokio::test]
async fn duplicate_names_are_rejected() {
    let (tours, _) = seeded();
    let mut body = crate::integration_tests::_support::tour(
        "5c88fa8cf4afda39709c2961",
        "The Forest Hiker",
        3,
        "easy",
        100,
        4.0,
    );
    body.remove("_id");
    let err = tours.create_one(&Request::new().with_body(body)).await.unwrap_err();
    let reply = ErrorTranslator::new(Environment::Production).translate(&err);
    assert_eq!(
        reply.envelope.message.as_deref(),
        Some("Duplicate field value: The Forest Hiker. Please use another value!")
    );
}

#[tokio::test]
async fn update_returns_new_version_and_validates() {
    let (tours, _) = seeded();
    let req = Request::new().with_id(FOREST_HIKER).with_body(doc! { "price": "450", "__v": 9 });
    let reply = tours.update_one(&req).await.unwrap();
    assert_eq!(reply.status_code, 200);
    let tour = reply.envelope.payload("tour").unwrap();
    assert_eq!(tour["price"], 450);
    assert_eq!(tour["__v"], 0);
    assert_eq!(tour["name"], "The Forest Hiker");

    let req = Request::new().with_id(FOREST_HIKER).with_body(doc! { "name": "   " });
    let err = tours.update_one(&req).await.unwrap_err();
    assert!(matches!(err, AppError::ValidationFailed(ref v) if v[0].message == "A tour must have a name"));

    let req = Request::new().with_id(FOREST_HIKER).with_body(doc! { "price": "cheap" });
    let err = tours.update_one(&req).await.unwrap_err();
    assert!(matches!(err, AppError::ExecutionFailed(ModelError::Cast { ref path, .. }) if path == "price"));
}

#[tokio::test]
async fn update_missing_is_not_found() {
    let (tours, _) = seeded();
    let req = Request::new().with_id("5c88fa8cf4afda39709c2999").with_body(doc! { "price": 1 });
    assert!(matches!(tours.update_one(&req).await, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn dispatch_by_kind() {
    let h = plain_handlers(vec![]);
    let created = h
        .handle(HandlerKind::CreateOne, &Request::new().with_body(doc! { "name": "A" }))
        .await
        .unwrap();
    let id = created.envelope.payload("tour").unwrap()["_id"].as_str().unwrap().to_string();
    for kind in ["getOne", "updateOne", "deleteOne"] {
        let req = Request::new().with_id(id.as_str()).with_body(doc! { "name": "B" });
        let reply = h.handle(kind.parse().unwrap(), &req).await.unwrap();
        assert!(reply.is_success(), "{kind} failed");
    }
    let listed = h.handle(HandlerKind::GetAll, &Request::new()).await.unwrap();
    assert_eq!(listed.envelope.results, Some(0));
}

#[tokio::test]
async fn development_replies_carry_error_detail() {
    let (tours, _) = seeded();
    let err = tours.get_one(&Request::new().with_id("nope")).await.unwrap_err();
    let reply = ErrorTranslator::new(Environment::Development).translate(&err);
    assert_eq!(reply.status_code, 400);
    assert!(reply.envelope.error.as_deref().unwrap().contains("Cast"));
}

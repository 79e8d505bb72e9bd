use bson::{Bson, doc};
use natours::config::FeatureConfig;
use natours::features::{FieldSelection, Order, SortFields};
use natours::handlers::{Request, ResourceHandlers};
use natours::store::Store;
use proptest::prelude::*;
use std::sync::Arc;

fn field_name() -> impl Strategy<Value = String> {
    "[a-z][a-zA-Z]{0,8}"
}

proptest! {
    #![proptest_config(proptest::test_runner::Config {
        failure_persistence: Some(Box::new(proptest::test_runner::FileFailurePersistence::WithSource("proptest-regressions"))),
        cases: 48,
        .. proptest::test_runner::Config::default()
    })]
    #[test]
    fn prop_sort_keeps_client_order(fields in prop::collection::vec((field_name(), any::<bool>()), 1..8)) {
        let raw = fields
            .iter()
            .map(|(f, desc)| if *desc { format!("-{f}") } else { f.clone() })
            .collect::<Vec<_>>()
            .join(",");
        let sort = SortFields::parse(&raw);
        prop_assert_eq!(sort.specs().len(), fields.len());
        for (spec, (f, desc)) in sort.specs().iter().zip(&fields) {
            prop_assert_eq!(&spec.field, f);
            prop_assert_eq!(spec.order == Order::Desc, *desc);
        }
    }

    #[test]
    fn prop_select_parse_is_stable(fields in prop::collection::vec(field_name(), 1..6)) {
        let once = FieldSelection::parse(&fields.join(","));
        let twice = FieldSelection::parse(&once.to_string());
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn prop_listing_is_sorted_by_price(prices in prop::collection::vec(-1000i32..1000, 1..20)) {
        let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let store = Store::new();
        let model = store.model("Tour", "tours");
        model.collection().import(prices.iter().map(|p| doc! { "price": *p })).unwrap();
        let h = ResourceHandlers::new(Arc::new(model), FeatureConfig::default());
        let req = Request::new().with_query("sort=-price&fields=price&limit=100");
        let reply = rt.block_on(h.get_all(&req)).unwrap();
        let listed: Vec<i64> = reply.envelope.payload("tour").unwrap()
            .as_array().unwrap()
            .iter()
            .map(|d| d["price"].as_i64().unwrap())
            .collect();
        let mut expected: Vec<i64> = prices.iter().map(|p| i64::from(*p)).collect();
        expected.sort_unstable_by(|a, b| b.cmp(a));
        prop_assert_eq!(listed, expected);
    }
}

#[test]
fn applying_the_same_selection_twice_equals_once() {
    use natours::model::{Model, Query};
    let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
    let store = Store::new();
    let model = store.model("Tour", "tours");
    model.collection().import([doc! { "name": "A", "price": 1, "duration": 2 }]).unwrap();
    let sel = FieldSelection::parse("name,price");
    let once = rt.block_on(model.find(doc! {}).apply_select(&sel).execute()).unwrap();
    let twice = rt.block_on(model.find(doc! {}).apply_select(&sel).apply_select(&sel).execute()).unwrap();
    assert_eq!(once, twice);
    assert_eq!(once[0].get("duration"), None::<&Bson>);
}

use bson::{Bson, Document};
use natours::features::{COMPARISON_OPERATORS, criteria_from_params, rewrite_operators};
use natours::params::{RESERVED_PARAMETERS, RawParameters};
use proptest::prelude::*;

fn field_name() -> impl Strategy<Value = String> {
    "[a-z][a-zA-Z]{0,8}".prop_filter("comparison token", |s| !COMPARISON_OPERATORS.contains(&s.as_str()))
}

fn token() -> impl Strategy<Value = &'static str> {
    prop::sample::select(COMPARISON_OPERATORS.to_vec())
}

/// `{f1: {f2: ... {op: v}}}` at the given depth.
fn nest(path: &[String], op: &str, value: i32) -> Document {
    let mut inner = Document::new();
    inner.insert(op, value);
    for f in path.iter().rev() {
        let mut outer = Document::new();
        outer.insert(f.as_str(), inner);
        inner = outer;
    }
    inner
}

fn has_bare_token(doc: &Document) -> bool {
    doc.iter().any(|(k, v)| {
        COMPARISON_OPERATORS.contains(&k.as_str())
            || matches!(v, Bson::Document(d) if has_bare_token(d))
    })
}

proptest! {
    #![proptest_config(proptest::test_runner::Config {
        failure_persistence: Some(Box::new(proptest::test_runner::FileFailurePersistence::WithSource("proptest-regressions"))),
        cases: 64,
        .. proptest::test_runner::Config::default()
    })]
    #[test]
    fn prop_reserved_names_never_become_criteria(
        reserved in prop::collection::vec(prop::sample::select(RESERVED_PARAMETERS.to_vec()), 1..4),
        fields in prop::collection::vec((field_name(), "[a-z0-9]{1,6}"), 0..5),
    ) {
        let mut params = RawParameters::new();
        for name in &reserved {
            params.set(*name, "1");
        }
        for (k, v) in &fields {
            params.set(k.clone(), v.clone());
        }
        let criteria = criteria_from_params(&params);
        for name in RESERVED_PARAMETERS {
            prop_assert!(!criteria.contains_key(name));
        }
        for (k, _) in fields.iter().filter(|(k, _)| !RESERVED_PARAMETERS.contains(&k.as_str())) {
            prop_assert!(criteria.contains_key(k.as_str()));
        }
    }

    #[test]
    fn prop_tokens_rewritten_at_any_depth(
        path in prop::collection::vec(field_name(), 1..6),
        op in token(),
        value in any::<i32>(),
    ) {
        let out = rewrite_operators(nest(&path, op, value));
        prop_assert!(!has_bare_token(&out));
        prop_assert_eq!(out, nest(&path, &format!("${op}"), value));
    }

    #[test]
    fn prop_string_values_pass_through(field in field_name(), op in token()) {
        let mut criteria = Document::new();
        criteria.insert(field.as_str(), op);
        prop_assert_eq!(rewrite_operators(criteria.clone()), criteria);
    }
}

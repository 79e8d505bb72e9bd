use natours::config::FeatureConfig;
use natours::features::Pagination;
use natours::params::RawParameters;
use proptest::prelude::*;

fn not_positive() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z]{1,6}",
        (i64::MIN..=0i64).prop_map(|n| n.to_string()),
        Just(String::new()),
        Just("0.5".to_string()),
    ]
}

proptest! {
    #![proptest_config(proptest::test_runner::Config {
        failure_persistence: Some(Box::new(proptest::test_runner::FileFailurePersistence::WithSource("proptest-regressions"))),
        cases: 64,
        .. proptest::test_runner::Config::default()
    })]
    #[test]
    fn prop_bad_values_fall_back_to_defaults(page in not_positive(), limit in not_positive()) {
        let params = RawParameters::new().with("page", page).with("limit", limit);
        let p = Pagination::from_params(&params, &FeatureConfig::default());
        prop_assert_eq!((p.page, p.limit, p.skip), (1, 10, 0));
    }

    #[test]
    fn prop_skip_is_previous_pages(page in 1u64..10_000, limit in 1u64..1_000) {
        let params = RawParameters::new().with("page", page.to_string()).with("limit", limit.to_string());
        let p = Pagination::from_params(&params, &FeatureConfig::default());
        prop_assert_eq!(p.limit, limit);
        prop_assert_eq!(p.skip, (page - 1) * limit);
    }
}

//! Criteria construction for the filter stage.
//!
//! Comparison tokens are rewritten by walking the criteria tree, so only
//! mapping keys are touched; string values such as `"gte"` pass through.

use bson::{Bson, Document};

use crate::params::{ParamValue, RawParameters};

/// Bare comparison tokens accepted from clients.
pub const COMPARISON_OPERATORS: [&str; 4] = ["gte", "gt", "lte", "lt"];

const OPERATOR_SIGIL: char = '$';

fn operator_key(key: &str) -> Option<String> {
    COMPARISON_OPERATORS.contains(&key).then(|| format!("{OPERATOR_SIGIL}{key}"))
}

/// Rewrite every comparison token used as a key, at any depth.
#[must_use]
pub fn rewrite_operators(criteria: Document) -> Document {
    criteria
        .into_iter()
        .map(|(key, value)| {
            let key = operator_key(&key).unwrap_or(key);
            (key, rewrite_value(value))
        })
        .collect()
}

fn rewrite_value(value: Bson) -> Bson {
    match value {
        Bson::Document(doc) => Bson::Document(rewrite_operators(doc)),
        Bson::Array(items) => Bson::Array(items.into_iter().map(rewrite_value).collect()),
        other => other,
    }
}

fn param_to_bson(value: &ParamValue) -> Bson {
    match value {
        ParamValue::Single(s) => Bson::String(s.clone()),
        ParamValue::Many(values) => {
            Bson::Array(values.iter().cloned().map(Bson::String).collect())
        }
        ParamValue::Nested(map) => {
            Bson::Document(map.iter().map(|(k, v)| (k.clone(), param_to_bson(v))).collect())
        }
    }
}

/// Build the filter document from every non-reserved parameter.
#[must_use]
pub fn criteria_from_params(params: &RawParameters) -> Document {
    let raw: Document =
        params.criteria_entries().map(|(k, v)| (k.clone(), param_to_bson(v))).collect();
    rewrite_operators(raw)
}

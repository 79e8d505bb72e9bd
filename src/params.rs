//! Request parameters as handed over by the routing layer.
//!
//! Values are plain strings, lists of strings for repeated keys, or nested maps
//! for bracket syntax (`price[gte]=500`).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Names consumed by the sort, select and paginate stages; never filter criteria.
pub const RESERVED_PARAMETERS: [&str; 4] = ["page", "sort", "limit", "fields"];

// Deeper bracket segments are folded into the last key.
const MAX_NESTING_DEPTH: usize = 5;

#[must_use]
pub fn is_reserved(name: &str) -> bool {
    RESERVED_PARAMETERS.contains(&name)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Single(String),
    Many(Vec<String>),
    Nested(BTreeMap<String, ParamValue>),
}

impl ParamValue {
    /// Scalar view of the value; repeated keys resolve to the last occurrence.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Single(s) => Some(s),
            Self::Many(values) => values.last().map(String::as_str),
            Self::Nested(_) => None,
        }
    }

    fn accumulate(&mut self, value: String) {
        match self {
            Self::Single(old) => {
                let first = std::mem::take(old);
                *self = Self::Many(vec![first, value]);
            }
            Self::Many(values) => values.push(value),
            Self::Nested(_) => {
                log::debug!("ignoring scalar for key that already holds nested parameters");
            }
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        Self::Single(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        Self::Single(s)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawParameters(BTreeMap<String, ParamValue>);

impl RawParameters {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, replacing any previous value for `name`.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        self.0.insert(name.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(ParamValue::as_str)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.0.iter()
    }

    /// Entries that qualify as document criteria (reserved names removed).
    pub fn criteria_entries(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.0.iter().filter(|(k, _)| !is_reserved(k))
    }

    /// Decode an `application/x-www-form-urlencoded` query string.
    ///
    /// `a[b]=c` nests, repeated keys collect into [`ParamValue::Many`], empty keys are dropped.
    #[must_use]
    pub fn from_query_str(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut out = Self::new();
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            let path = split_key(&key);
            if path.is_empty() {
                continue;
            }
            insert_path(&mut out.0, &path, value.into_owned());
        }
        out
    }

    #[must_use]
    pub fn with_preset(mut self, preset: &QueryPreset) -> Self {
        preset.apply_to(&mut self);
        self
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for RawParameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

fn split_key(raw: &str) -> Vec<String> {
    let Some(open) = raw.find('[') else {
        return if raw.is_empty() { Vec::new() } else { vec![raw.to_string()] };
    };
    let head = &raw[..open];
    if head.is_empty() {
        return vec![raw.to_string()];
    }
    let mut path = vec![head.to_string()];
    let mut rest = &raw[open..];
    while let Some(stripped) = rest.strip_prefix('[') {
        let Some(close) = stripped.find(']') else {
            // Unbalanced bracket: keep the remainder literally.
            return vec![raw.to_string()];
        };
        let segment = &stripped[..close];
        if path.len() > MAX_NESTING_DEPTH {
            if let Some(last) = path.last_mut() {
                last.push('[');
                last.push_str(segment);
                last.push(']');
            }
        } else if !segment.is_empty() {
            path.push(segment.to_string());
        }
        rest = &stripped[close + 1..];
    }
    path
}

fn insert_path(map: &mut BTreeMap<String, ParamValue>, path: &[String], value: String) {
    match path {
        [] => {}
        [leaf] => match map.get_mut(leaf) {
            Some(existing) => existing.accumulate(value),
            None => {
                map.insert(leaf.clone(), ParamValue::Single(value));
            }
        },
        [head, rest @ ..] => {
            let entry =
                map.entry(head.clone()).or_insert_with(|| ParamValue::Nested(BTreeMap::new()));
            match entry {
                ParamValue::Nested(inner) => insert_path(inner, rest, value),
                _ => log::debug!("ignoring nested parameter under scalar key {head}"),
            }
        }
    }
}

/// A canned set of list parameters behind a friendly route, e.g. `/top-5-cheap`.
///
/// Preset values override whatever the client sent for the same names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryPreset {
    pub limit: Option<u64>,
    pub sort: Option<String>,
    pub fields: Option<String>,
}

impl QueryPreset {
    #[must_use]
    pub fn top_five_cheap() -> Self {
        Self {
            limit: Some(5),
            sort: Some("-ratingsAverage,price".into()),
            fields: Some("name,price,ratingsAverage,summary,difficulty".into()),
        }
    }

    #[must_use]
    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "top-5-cheap" | "top_five_cheap" => Some(Self::top_five_cheap()),
            _ => None,
        }
    }

    pub fn apply_to(&self, params: &mut RawParameters) {
        if let Some(limit) = self.limit {
            params.set("limit", limit.to_string());
        }
        if let Some(sort) = &self.sort {
            params.set("sort", sort.as_str());
        }
        if let Some(fields) = &self.fields {
            params.set("fields", fields.as_str());
        }
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::FeatureConfig;
use crate::params::RawParameters;

// Safety limits to prevent resource abuse
pub(crate) const MAX_SORT_FIELDS: usize = 8;
pub(crate) const MAX_PROJECTION_FIELDS: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Order {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    pub order: Order,
}

impl SortSpec {
    pub fn asc(field: impl Into<String>) -> Self {
        Self { field: field.into(), order: Order::Asc }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self { field: field.into(), order: Order::Desc }
    }
}

/// Split a client list on commas and whitespace, dropping empty tokens.
fn tokens(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(|c: char| c == ',' || c.is_whitespace()).filter(|t| !t.is_empty())
}

/// Ordered sort keys; a leading `-` on a token means descending.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortFields(Vec<SortSpec>);

impl SortFields {
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let specs = tokens(raw)
            .filter_map(|t| match t.strip_prefix('-') {
                Some("") => None,
                Some(field) => Some(SortSpec::desc(field)),
                None => Some(SortSpec::asc(t)),
            })
            .take(MAX_SORT_FIELDS)
            .collect();
        Self(specs)
    }

    #[must_use]
    pub fn specs(&self) -> &[SortSpec] {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<SortSpec>> for SortFields {
    fn from(specs: Vec<SortSpec>) -> Self {
        Self(specs)
    }
}

/// Space-joined token list, e.g. `-price name`.
impl fmt::Display for SortFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, s) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            if s.order == Order::Desc {
                f.write_str("-")?;
            }
            f.write_str(&s.field)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectField {
    pub name: String,
    pub exclude: bool,
}

/// Projection: plain tokens include a field, `-field` excludes it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSelection(Vec<SelectField>);

impl FieldSelection {
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let fields = tokens(raw)
            .filter_map(|t| match t.strip_prefix('-') {
                Some("") => None,
                Some(name) => Some(SelectField { name: name.to_string(), exclude: true }),
                None => Some(SelectField { name: t.to_string(), exclude: false }),
            })
            .take(MAX_PROJECTION_FIELDS)
            .collect();
        Self(fields)
    }

    #[must_use]
    pub fn excluding(field: &str) -> Self {
        Self(vec![SelectField { name: field.to_string(), exclude: true }])
    }

    #[must_use]
    pub fn fields(&self) -> &[SelectField] {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn included(&self) -> impl Iterator<Item = &str> {
        self.0.iter().filter(|f| !f.exclude).map(|f| f.name.as_str())
    }

    pub fn excluded(&self) -> impl Iterator<Item = &str> {
        self.0.iter().filter(|f| f.exclude).map(|f| f.name.as_str())
    }
}

impl fmt::Display for FieldSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, s) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            if s.exclude {
                f.write_str("-")?;
            }
            f.write_str(&s.name)?;
        }
        Ok(())
    }
}

/// Resolved page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    pub skip: u64,
}

impl Pagination {
    /// `page` and `limit` from the parameters, `skip = (page - 1) * limit`.
    #[must_use]
    pub fn from_params(params: &RawParameters, config: &FeatureConfig) -> Self {
        let page = to_positive_int(params.get_str("page"), config.default_page);
        let limit = to_positive_int(params.get_str("limit"), config.default_limit)
            .min(config.max_limit.max(1));
        let skip = page.saturating_sub(1).saturating_mul(limit);
        Self { page, limit, skip }
    }
}

/// Coerce a parameter to a positive integer, falling back to `default`.
///
/// Fractional input is truncated; zero, negatives and non-numbers yield the default.
#[must_use]
pub fn to_positive_int(raw: Option<&str>, default: u64) -> u64 {
    let Some(s) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return default;
    };
    if let Ok(n) = s.parse::<u64>() {
        return if n > 0 { n } else { default };
    }
    match s.parse::<f64>() {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Ok(f) if f.is_finite() && f >= 1.0 => f.trunc().min(u64::MAX as f64) as u64,
        _ => default,
    }
}

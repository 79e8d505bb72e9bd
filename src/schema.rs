//! Field rules enforced by the in-memory store on create and update.
//!
//! A schema casts incoming values to the declared kind, applies trimming and
//! defaults, and reports every broken rule at once. Fields not declared in the
//! schema are dropped from bodies.

use bson::{Bson, Document};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

use crate::errors::{FieldViolation, ModelError};

/// Keys managed by the store itself; never declared, never dropped.
pub const MANAGED_FIELDS: [&str; 2] = ["_id", "__v"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Number,
    Boolean,
    /// RFC 3339 timestamp, stored as a UTC string with millisecond precision.
    Date,
    /// Reference to another document's `_id`.
    Id,
    StringList,
    DateList,
    Any,
}

impl FieldKind {
    fn label(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "Number",
            Self::Boolean => "Boolean",
            Self::Date => "Date",
            Self::Id => "ObjectId",
            Self::StringList => "[string]",
            Self::DateList => "[Date]",
            Self::Any => "Mixed",
        }
    }

    /// Kind of a single element; list kinds cast scalar operands element-wise.
    fn element(self) -> Self {
        match self {
            Self::StringList => Self::String,
            Self::DateList => Self::Date,
            other => other,
        }
    }

    /// Cast `value` to this kind, `None` when it cannot be represented.
    #[must_use]
    pub fn cast(self, value: &Bson) -> Option<Bson> {
        match (self, value) {
            (Self::Any, v) => Some(v.clone()),
            (Self::String, Bson::String(_)) => Some(value.clone()),
            (Self::String, Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Boolean(_)) => {
                Some(Bson::String(plain_string(value)))
            }
            (Self::Number, Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_)) => Some(value.clone()),
            (Self::Number, Bson::String(s)) => parse_number(s),
            (Self::Boolean, Bson::Boolean(_)) => Some(value.clone()),
            (Self::Boolean, Bson::String(s)) => match s.trim() {
                "true" | "1" | "yes" => Some(Bson::Boolean(true)),
                "false" | "0" | "no" => Some(Bson::Boolean(false)),
                _ => None,
            },
            (Self::Date, Bson::String(s)) => parse_date(s).map(Bson::String),
            (Self::Date, Bson::Int64(ms)) => {
                DateTime::<Utc>::from_timestamp_millis(*ms).map(|d| Bson::String(format_date(d)))
            }
            (Self::Id, Bson::String(s)) => is_valid_id(s).then(|| value.clone()),
            (Self::Id, Bson::ObjectId(oid)) => Some(Bson::String(oid.to_hex())),
            (Self::StringList | Self::DateList, Bson::Array(items)) => items
                .iter()
                .map(|item| self.element().cast(item))
                .collect::<Option<Vec<_>>>()
                .map(Bson::Array),
            (Self::StringList | Self::DateList, scalar) => {
                self.element().cast(scalar).map(|v| Bson::Array(vec![v]))
            }
            _ => None,
        }
    }
}

pub(crate) fn plain_string(value: &Bson) -> String {
    match value {
        Bson::String(s) => s.clone(),
        Bson::Int32(i) => i.to_string(),
        Bson::Int64(i) => i.to_string(),
        Bson::Double(f) => f.to_string(),
        Bson::Boolean(b) => b.to_string(),
        other => other.to_string(),
    }
}

fn parse_number(s: &str) -> Option<Bson> {
    let s = s.trim();
    if let Ok(i) = s.parse::<i64>() {
        return Some(Bson::Int64(i));
    }
    s.parse::<f64>().ok().filter(|f| f.is_finite()).map(Bson::Double)
}

pub(crate) fn format_date(d: DateTime<Utc>) -> String {
    d.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_date(s: &str) -> Option<String> {
    let s = s.trim();
    if let Ok(d) = DateTime::parse_from_rfc3339(s) {
        return Some(format_date(d.with_timezone(&Utc)));
    }
    let day = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
    day.and_hms_opt(0, 0, 0).map(|dt| format_date(dt.and_utc()))
}

/// Document ids are either UUIDs or 24-digit hex object ids.
#[must_use]
pub fn is_valid_id(s: &str) -> bool {
    (s.len() == 24 && s.bytes().all(|b| b.is_ascii_hexdigit())) || uuid::Uuid::parse_str(s).is_ok()
}

#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    Value(Bson),
    /// Current time, formatted like a [`FieldKind::Date`] value.
    Now,
}

impl DefaultValue {
    fn resolve(&self) -> Bson {
        match self {
            Self::Value(v) => v.clone(),
            Self::Now => Bson::String(format_date(Utc::now())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldRule {
    pub kind: FieldKind,
    /// Message reported when the field is missing.
    pub required: Option<String>,
    pub unique: bool,
    pub trim: bool,
    /// Left out of results unless a projection names it.
    pub hidden: bool,
    pub default: Option<DefaultValue>,
    pub min: Option<(f64, String)>,
    pub max: Option<(f64, String)>,
}

impl FieldRule {
    #[must_use]
    pub fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            required: None,
            unique: false,
            trim: false,
            hidden: false,
            default: None,
            min: None,
            max: None,
        }
    }

    #[must_use]
    pub fn required(mut self, message: &str) -> Self {
        self.required = Some(message.to_string());
        self
    }

    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    #[must_use]
    pub fn trim(mut self) -> Self {
        self.trim = true;
        self
    }

    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    #[must_use]
    pub fn default_value(mut self, value: impl Into<Bson>) -> Self {
        self.default = Some(DefaultValue::Value(value.into()));
        self
    }

    #[must_use]
    pub fn default_now(mut self) -> Self {
        self.default = Some(DefaultValue::Now);
        self
    }

    #[must_use]
    pub fn min(mut self, bound: f64, message: &str) -> Self {
        self.min = Some((bound, message.to_string()));
        self
    }

    #[must_use]
    pub fn max(mut self, bound: f64, message: &str) -> Self {
        self.max = Some((bound, message.to_string()));
        self
    }

    fn cast_failure(&self, path: &str, value: &Bson) -> FieldViolation {
        FieldViolation::new(
            path,
            format!(
                "Cast to {} failed for value \"{}\" at path \"{path}\"",
                self.kind.label(),
                plain_string(value)
            ),
        )
    }

    /// Cast, trim and bounds-check a present value.
    fn check(&self, path: &str, value: &Bson) -> Result<Bson, FieldViolation> {
        let mut cast = self.kind.cast(value).ok_or_else(|| self.cast_failure(path, value))?;
        if self.trim {
            if let Bson::String(s) = &cast {
                cast = Bson::String(s.trim().to_string());
            }
        }
        if let Some(n) = as_number(&cast) {
            if let Some((bound, msg)) = &self.min {
                if n < *bound {
                    return Err(FieldViolation::new(path, msg.clone()));
                }
            }
            if let Some((bound, msg)) = &self.max {
                if n > *bound {
                    return Err(FieldViolation::new(path, msg.clone()));
                }
            }
        }
        Ok(cast)
    }

    fn is_blank(value: &Bson) -> bool {
        match value {
            Bson::Null => true,
            Bson::String(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

#[allow(clippy::cast_precision_loss)]
pub(crate) fn as_number(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(i) => Some(f64::from(*i)),
        Bson::Int64(i) => Some(*i as f64),
        Bson::Double(f) => Some(*f),
        _ => None,
    }
}

/// Ordered field declarations for one collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    fields: Vec<(String, FieldRule)>,
}

impl Schema {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn field(mut self, name: &str, rule: FieldRule) -> Self {
        self.fields.push((name.to_string(), rule));
        self
    }

    #[must_use]
    pub fn rule(&self, name: &str) -> Option<&FieldRule> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, r)| r)
    }

    pub fn unique_fields(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().filter(|(_, r)| r.unique).map(|(n, _)| n.as_str())
    }

    pub fn hidden_fields(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().filter(|(_, r)| r.hidden).map(|(n, _)| n.as_str())
    }

    fn keeps(&self, key: &str) -> bool {
        MANAGED_FIELDS.contains(&key) || self.rule(key).is_some()
    }

    /// Full document for an insert: every rule is checked, defaults are filled in.
    ///
    /// # Errors
    /// [`ModelError::Validation`] listing every broken rule.
    pub fn prepare_create(&self, body: Document) -> Result<Document, ModelError> {
        let mut out = Document::new();
        let mut violations = Vec::new();
        for key in MANAGED_FIELDS {
            if let Some(v) = body.get(key) {
                out.insert(key, v.clone());
            }
        }
        for (name, rule) in &self.fields {
            match body.get(name).filter(|v| !matches!(v, Bson::Null)) {
                Some(value) => match rule.check(name, value) {
                    Ok(v) if rule.required.is_some() && FieldRule::is_blank(&v) => {
                        violations.push(FieldViolation::new(
                            name.as_str(),
                            rule.required.clone().unwrap_or_default(),
                        ));
                    }
                    Ok(v) => {
                        out.insert(name.clone(), v);
                    }
                    Err(violation) => violations.push(violation),
                },
                None => {
                    if let Some(default) = &rule.default {
                        out.insert(name.clone(), default.resolve());
                    } else if let Some(msg) = &rule.required {
                        violations.push(FieldViolation::new(name.as_str(), msg.clone()));
                    }
                }
            }
        }
        for key in body.keys().filter(|k| !self.keeps(k)) {
            log::debug!("dropping undeclared field {key}");
        }
        if violations.is_empty() { Ok(out) } else { Err(ModelError::Validation(violations)) }
    }

    /// Changes for a partial update. Values are always cast; rules are checked
    /// only when `run_validators` is set.
    ///
    /// # Errors
    /// [`ModelError::Cast`] for a value of the wrong kind, [`ModelError::Validation`]
    /// for broken rules.
    pub fn prepare_update(
        &self,
        body: Document,
        run_validators: bool,
    ) -> Result<Document, ModelError> {
        let mut out = Document::new();
        let mut violations = Vec::new();
        for (key, value) in body {
            if MANAGED_FIELDS.contains(&key.as_str()) {
                continue;
            }
            let Some(rule) = self.rule(&key) else {
                log::debug!("dropping undeclared field {key}");
                continue;
            };
            if matches!(value, Bson::Null) {
                if run_validators {
                    if let Some(msg) = &rule.required {
                        violations.push(FieldViolation::new(key.as_str(), msg.clone()));
                        continue;
                    }
                }
                out.insert(key, Bson::Null);
                continue;
            }
            let cast = rule
                .kind
                .cast(&value)
                .ok_or_else(|| ModelError::Cast { path: key.clone(), value: plain_string(&value) })?;
            if run_validators {
                match rule.check(&key, &cast) {
                    Ok(v) if rule.required.is_some() && FieldRule::is_blank(&v) => {
                        violations.push(FieldViolation::new(
                            key.as_str(),
                            rule.required.clone().unwrap_or_default(),
                        ));
                    }
                    Ok(v) => {
                        out.insert(key, v);
                    }
                    Err(violation) => violations.push(violation),
                }
            } else {
                out.insert(key, cast);
            }
        }
        if violations.is_empty() { Ok(out) } else { Err(ModelError::Validation(violations)) }
    }

    /// Cast a query operand for `path`; undeclared paths pass through.
    ///
    /// # Errors
    /// [`ModelError::Cast`] when the operand does not fit the declared kind.
    pub fn cast_operand(&self, path: &str, value: Bson) -> Result<Bson, ModelError> {
        let head = path.split('.').next().unwrap_or(path);
        let Some(rule) = self.rule(head).filter(|_| head == path) else {
            return Ok(value);
        };
        let kind = rule.kind.element();
        match value {
            Bson::Array(items) => items
                .into_iter()
                .map(|item| Self::cast_scalar(kind, path, item))
                .collect::<Result<Vec<_>, _>>()
                .map(Bson::Array),
            scalar => Self::cast_scalar(kind, path, scalar),
        }
    }

    fn cast_scalar(kind: FieldKind, path: &str, value: Bson) -> Result<Bson, ModelError> {
        kind.cast(&value)
            .ok_or_else(|| ModelError::Cast { path: path.to_string(), value: plain_string(&value) })
    }
}

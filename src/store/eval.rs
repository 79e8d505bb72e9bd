//! Criteria parsing, matching, ordering and projection over BSON documents.

use bson::{Bson, Document};
use std::cmp::Ordering;

use crate::errors::ModelError;
use crate::features::{FieldSelection, Order, SortSpec};
use crate::schema::{Schema, as_number};

// Safety limits to prevent resource abuse
pub(crate) const MAX_PATH_DEPTH: usize = 32;
pub(crate) const MAX_IN_SET: usize = 1000;
const MAX_LOGICAL_DEPTH: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    True,
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    Exists { path: String, exists: bool },
    In { path: String, values: Vec<Bson> },
    Nin { path: String, values: Vec<Bson> },
    Cmp { path: String, op: CmpOp, value: Bson },
}

impl Filter {
    /// Parse a criteria document, casting operands through `schema` when given.
    ///
    /// # Errors
    /// [`ModelError::InvalidOperator`] for unknown `$` keys or malformed logical
    /// operands, [`ModelError::Cast`] for operands the schema rejects.
    pub fn parse(criteria: &Document, schema: Option<&Schema>) -> Result<Self, ModelError> {
        Parser { schema }.document(criteria, 0)
    }
}

struct Parser<'s> {
    schema: Option<&'s Schema>,
}

impl Parser<'_> {
    fn document(&self, criteria: &Document, depth: usize) -> Result<Filter, ModelError> {
        if depth > MAX_LOGICAL_DEPTH {
            return Err(ModelError::InvalidOperator("criteria nested too deeply".into()));
        }
        let mut parts = Vec::with_capacity(criteria.len());
        for (key, value) in criteria {
            parts.push(match key.as_str() {
                "$and" => Filter::And(self.branches(key, value, depth)?),
                "$or" => Filter::Or(self.branches(key, value, depth)?),
                op if op.starts_with('$') => return Err(ModelError::InvalidOperator(op.into())),
                path => self.field(path, value)?,
            });
        }
        Ok(match parts.len() {
            0 => Filter::True,
            1 => parts.remove(0),
            _ => Filter::And(parts),
        })
    }

    fn branches(&self, op: &str, value: &Bson, depth: usize) -> Result<Vec<Filter>, ModelError> {
        let Bson::Array(items) = value else {
            return Err(ModelError::InvalidOperator(format!("{op} needs an array")));
        };
        items
            .iter()
            .map(|item| match item {
                Bson::Document(d) => self.document(d, depth + 1),
                _ => Err(ModelError::InvalidOperator(format!("{op} entries must be documents"))),
            })
            .collect()
    }

    fn field(&self, path: &str, value: &Bson) -> Result<Filter, ModelError> {
        match value {
            Bson::Document(ops) if ops.keys().next().is_some_and(|k| k.starts_with('$')) => {
                let mut parts = Vec::with_capacity(ops.len());
                for (op, operand) in ops {
                    parts.push(self.operator(path, op, operand)?);
                }
                Ok(if parts.len() == 1 { parts.remove(0) } else { Filter::And(parts) })
            }
            other => Ok(Filter::Cmp {
                path: path.to_string(),
                op: CmpOp::Eq,
                value: self.cast(path, other.clone())?,
            }),
        }
    }

    fn operator(&self, path: &str, op: &str, operand: &Bson) -> Result<Filter, ModelError> {
        let cmp = |op| -> Result<Filter, ModelError> {
            Ok(Filter::Cmp { path: path.to_string(), op, value: self.cast(path, operand.clone())? })
        };
        match op {
            "$eq" => cmp(CmpOp::Eq),
            "$gt" => cmp(CmpOp::Gt),
            "$gte" => cmp(CmpOp::Gte),
            "$lt" => cmp(CmpOp::Lt),
            "$lte" => cmp(CmpOp::Lte),
            "$ne" => Ok(Filter::Not(Box::new(cmp(CmpOp::Eq)?))),
            "$in" => Ok(Filter::In { path: path.to_string(), values: self.set(path, operand)? }),
            "$nin" => Ok(Filter::Nin { path: path.to_string(), values: self.set(path, operand)? }),
            "$exists" => Ok(Filter::Exists { path: path.to_string(), exists: truthy(operand) }),
            other => Err(ModelError::InvalidOperator(other.to_string())),
        }
    }

    fn set(&self, path: &str, operand: &Bson) -> Result<Vec<Bson>, ModelError> {
        let items = match operand {
            Bson::Array(items) => items.iter().take(MAX_IN_SET).cloned().collect(),
            // `tags[in]=a,b` arrives as one string.
            Bson::String(s) => s.split(',').map(|t| Bson::String(t.trim().to_string())).collect(),
            scalar => vec![scalar.clone()],
        };
        match self.cast(path, Bson::Array(items))? {
            Bson::Array(values) => Ok(values),
            single => Ok(vec![single]),
        }
    }

    fn cast(&self, path: &str, value: Bson) -> Result<Bson, ModelError> {
        match self.schema {
            Some(schema) => schema.cast_operand(path, value),
            None => Ok(value),
        }
    }
}

fn truthy(v: &Bson) -> bool {
    match v {
        Bson::Boolean(b) => *b,
        Bson::String(s) => !matches!(s.trim(), "false" | "0" | ""),
        Bson::Null => false,
        other => as_number(other).is_none_or(|n| n != 0.0),
    }
}

pub fn eval_filter(doc: &Document, filter: &Filter) -> bool {
    match filter {
        Filter::True => true,
        Filter::And(fs) => fs.iter().all(|f| eval_filter(doc, f)),
        Filter::Or(fs) => fs.iter().any(|f| eval_filter(doc, f)),
        Filter::Not(f) => !eval_filter(doc, f),
        Filter::Exists { path, exists } => get_path(doc, path).is_some() == *exists,
        Filter::In { path, values } => get_path(doc, path).is_some_and(|v| in_set(v, values)),
        Filter::Nin { path, values } => !get_path(doc, path).is_some_and(|v| in_set(v, values)),
        Filter::Cmp { path, op, value } => {
            get_path(doc, path).is_some_and(|v| compare_with(v, *op, value))
        }
    }
}

fn compare_with(field: &Bson, op: CmpOp, operand: &Bson) -> bool {
    if op == CmpOp::Eq {
        return loosely_equal(field, operand);
    }
    // A comparison on an array field holds when any element satisfies it.
    if let Bson::Array(items) = field {
        return items.iter().any(|item| compare_with(item, op, operand));
    }
    if !comparable(field, operand) {
        return false;
    }
    let ord = compare_operand(field, operand);
    match op {
        CmpOp::Gt => ord == Ordering::Greater,
        CmpOp::Gte => ord != Ordering::Less,
        CmpOp::Lt => ord == Ordering::Less,
        CmpOp::Lte => ord != Ordering::Greater,
        CmpOp::Eq => ord == Ordering::Equal,
    }
}

/// Equality with membership: an array operand matches any of its elements and
/// an array field matches when it contains the operand.
fn loosely_equal(field: &Bson, operand: &Bson) -> bool {
    if same_value(field, operand) {
        return true;
    }
    match (field, operand) {
        (Bson::Array(items), other) if !matches!(other, Bson::Array(_)) => {
            items.iter().any(|item| same_value(item, other))
        }
        (other, Bson::Array(options)) if !matches!(other, Bson::Array(_)) => {
            options.iter().any(|opt| same_value(other, opt))
        }
        _ => false,
    }
}

fn same_value(a: &Bson, b: &Bson) -> bool {
    a == b || (comparable(a, b) && numeric(a).is_some() && compare_operand(a, b) == Ordering::Equal)
}

fn in_set(v: &Bson, set: &[Bson]) -> bool {
    set.iter().take(MAX_IN_SET).any(|x| loosely_equal(v, x))
}

/// Numbers, and strings that read as numbers.
fn numeric(v: &Bson) -> Option<f64> {
    match v {
        Bson::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        other => as_number(other),
    }
}

fn comparable(a: &Bson, b: &Bson) -> bool {
    match (a, b) {
        (Bson::String(_), Bson::String(_)) | (Bson::Boolean(_), Bson::Boolean(_)) => true,
        _ => numeric(a).is_some() && numeric(b).is_some(),
    }
}

/// Resolve a dotted path through nested documents.
pub fn get_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Bson> {
    if path.is_empty() || path.len() > 1024 {
        return None;
    }
    let mut parts = path.split('.');
    let mut cur = doc.get(parts.next()?)?;
    for (depth, part) in parts.enumerate() {
        if depth >= MAX_PATH_DEPTH {
            return None;
        }
        match cur {
            Bson::Document(d) => cur = d.get(part)?,
            _ => return None,
        }
    }
    Some(cur)
}

pub fn compare_docs(a: &Document, b: &Document, sort: &[SortSpec]) -> Ordering {
    for s in sort {
        let ord = match (get_path(a, &s.field), get_path(b, &s.field)) {
            (Some(x), Some(y)) => compare_bson(x, y),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => Ordering::Equal,
        };
        if ord != Ordering::Equal {
            return if s.order == Order::Asc { ord } else { ord.reverse() };
        }
    }
    Ordering::Equal
}

/// Total order over values: grouped by type, then numbers numerically,
/// strings lexically and booleans false first. Used for sorting.
pub fn compare_bson(a: &Bson, b: &Bson) -> Ordering {
    let by_type = type_rank(a).cmp(&type_rank(b));
    if by_type != Ordering::Equal {
        return by_type;
    }
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => x.cmp(y),
        (Bson::Boolean(x), Bson::Boolean(y)) => x.cmp(y),
        _ => match (as_number(a), as_number(b)) {
            (Some(p), Some(q)) => p.total_cmp(&q),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
    }
}

/// Filter comparison, where numeric strings compare as numbers. Not a total
/// order; never hand it to a sort.
fn compare_operand(field: &Bson, operand: &Bson) -> Ordering {
    match (numeric(field), numeric(operand)) {
        (Some(p), Some(q)) => p.total_cmp(&q),
        _ => compare_bson(field, operand),
    }
}

fn type_rank(v: &Bson) -> u8 {
    match v {
        Bson::Null => 0,
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_) => 1,
        Bson::String(_) => 2,
        Bson::Document(_) => 3,
        Bson::Array(_) => 4,
        Bson::ObjectId(_) => 5,
        Bson::Boolean(_) => 6,
        Bson::DateTime(_) => 7,
        _ => 8,
    }
}

/// Apply a field selection. Inclusion keeps only the named fields; exclusion
/// removes them. `hidden` fields are dropped unless explicitly included.
///
/// # Errors
/// [`ModelError::Projection`] when inclusion and exclusion are mixed.
pub fn project(
    doc: &Document,
    selection: Option<&FieldSelection>,
    hidden: &[String],
) -> Result<Document, ModelError> {
    let Some(selection) = selection else {
        return Ok(without(doc, hidden.iter().map(String::as_str)));
    };
    let included: Vec<&str> = selection.included().collect();
    if included.is_empty() {
        let excluded = selection.excluded().chain(hidden.iter().map(String::as_str));
        return Ok(without(doc, excluded));
    }
    if selection.excluded().any(|f| f != "_id") {
        return Err(ModelError::Projection(
            "Projection cannot have a mix of inclusion and exclusion.".into(),
        ));
    }
    let mut out = Document::new();
    for field in included {
        if let Some(v) = doc.get(field) {
            out.insert(field, v.clone());
        }
    }
    Ok(out)
}

fn without<'a>(doc: &Document, fields: impl Iterator<Item = &'a str>) -> Document {
    let mut out = doc.clone();
    for f in fields {
        out.remove(f);
    }
    out
}

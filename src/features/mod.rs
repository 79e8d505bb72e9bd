//! The list pipeline: filter, sort, select, paginate.

pub mod pipeline;
pub mod rewrite;
pub mod types;

pub use pipeline::{Filtered, Fresh, Paginated, QueryFeatures, Selected, Sorted};
pub use rewrite::{COMPARISON_OPERATORS, criteria_from_params, rewrite_operators};
pub use types::{
    FieldSelection, Order, Pagination, SelectField, SortFields, SortSpec, to_positive_int,
};

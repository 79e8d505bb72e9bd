use std::marker::PhantomData;

use super::rewrite::criteria_from_params;
use super::types::{FieldSelection, Pagination, SortFields};
use crate::config::FeatureConfig;
use crate::model::Query;
use crate::params::RawParameters;

/// Stage markers. Each stage method is only defined on its predecessor, so the
/// order filter, sort, select, paginate cannot be changed.
#[derive(Debug)]
pub struct Fresh;
#[derive(Debug)]
pub struct Filtered;
#[derive(Debug)]
pub struct Sorted;
#[derive(Debug)]
pub struct Selected;
#[derive(Debug)]
pub struct Paginated;

/// List-query builder driven by request parameters. Nothing here executes the query.
#[derive(Debug)]
pub struct QueryFeatures<'a, Q, S = Fresh> {
    query: Q,
    params: &'a RawParameters,
    config: &'a FeatureConfig,
    pagination: Option<Pagination>,
    _stage: PhantomData<S>,
}

impl<'a, Q: Query> QueryFeatures<'a, Q, Fresh> {
    pub fn new(query: Q, params: &'a RawParameters, config: &'a FeatureConfig) -> Self {
        Self { query, params, config, pagination: None, _stage: PhantomData }
    }

    /// Every non-reserved parameter becomes a criterion, with comparison tokens rewritten.
    pub fn filter(self) -> QueryFeatures<'a, Q, Filtered> {
        let criteria = criteria_from_params(self.params);
        log::debug!("filter criteria: {criteria}");
        self.advance(|q| q.apply_filter(criteria))
    }

    /// Run all four stages in order.
    pub fn apply_all(self) -> QueryFeatures<'a, Q, Paginated> {
        self.filter().sort().select_fields().paginate()
    }
}

impl<'a, Q: Query> QueryFeatures<'a, Q, Filtered> {
    /// Client `sort` list, or the configured default (newest first).
    pub fn sort(self) -> QueryFeatures<'a, Q, Sorted> {
        let requested = self.params.get_str("sort").map(SortFields::parse);
        let sort = match requested {
            Some(s) if !s.is_empty() => s,
            _ => SortFields::parse(&self.config.default_sort),
        };
        log::debug!("sort: {sort}");
        self.advance(|q| q.apply_sort(&sort))
    }
}

impl<'a, Q: Query> QueryFeatures<'a, Q, Sorted> {
    /// Client `fields` projection, or hide the internal version field.
    pub fn select_fields(self) -> QueryFeatures<'a, Q, Selected> {
        let requested = self.params.get_str("fields").map(FieldSelection::parse);
        let selection = match requested {
            Some(s) if !s.is_empty() => s,
            _ => FieldSelection::excluding(&self.config.hidden_field),
        };
        log::debug!("select: {selection}");
        self.advance(|q| q.apply_select(&selection))
    }
}

impl<'a, Q: Query> QueryFeatures<'a, Q, Selected> {
    /// Skip `(page - 1) * limit` documents, then cap at `limit`.
    pub fn paginate(self) -> QueryFeatures<'a, Q, Paginated> {
        let pagination = Pagination::from_params(self.params, self.config);
        log::debug!(
            "paginate: page={} limit={} skip={}",
            pagination.page,
            pagination.limit,
            pagination.skip
        );
        let mut next =
            self.advance(|q| q.apply_skip(pagination.skip).apply_limit(pagination.limit));
        next.pagination = Some(pagination);
        next
    }
}

impl<Q> QueryFeatures<'_, Q, Paginated> {
    #[must_use]
    pub fn pagination(&self) -> Pagination {
        self.pagination.unwrap_or(Pagination {
            page: self.config.default_page,
            limit: self.config.default_limit,
            skip: 0,
        })
    }
}

impl<'a, Q, S> QueryFeatures<'a, Q, S> {
    pub fn query(&self) -> &Q {
        &self.query
    }

    /// Hand the built query back for execution.
    pub fn into_query(self) -> Q {
        self.query
    }

    pub fn params(&self) -> &'a RawParameters {
        self.params
    }

    fn advance<T>(self, stage: impl FnOnce(Q) -> Q) -> QueryFeatures<'a, Q, T> {
        QueryFeatures {
            query: stage(self.query),
            params: self.params,
            config: self.config,
            pagination: self.pagination,
            _stage: PhantomData,
        }
    }
}

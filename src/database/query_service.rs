//! Generic list/get pipeline shared by every entity.
//!
//! A query is assembled in a fixed order: the authorization pre-filter for
//! the caller, then the entity's filter handlers, then ordering. Pagination is
//! applied last, after the total has been counted.

use std::marker::PhantomData;

use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::auth::authorization::DataSetAccess;
use crate::config::AppConfig;
use crate::database::manager::DatabaseError;
use crate::database::query_builder::QueryBuilder;
use crate::filter::filter_order::FilterOrder;
use crate::filter::{
    Filter, FilterHandlerRegistry, FilterOrderInfo, FilteringParameters, OrderingParameters, PaginatedList,
    PaginationParameters, Predicate, QueryError,
};

/// A table the query pipeline can list and fetch.
pub trait Entity: for<'r> FromRow<'r, SqliteRow> + Send + Unpin {
    const TABLE: &'static str;
    const KEY_COLUMN: &'static str = "id";
    /// `(property, column)` pairs accepted by `OrderBy`.
    const SORTABLE: &'static [(&'static str, &'static str)];
    /// Column holding the dataset id that scopes row visibility, if any.
    const SCOPE_COLUMN: Option<&'static str> = None;

    fn filter_handlers() -> &'static FilterHandlerRegistry;

    fn default_order() -> Vec<FilterOrderInfo> {
        vec![FilterOrderInfo::asc("created_at"), FilterOrderInfo::asc(Self::KEY_COLUMN)]
    }
}

#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub filtering: FilteringParameters,
    pub ordering: OrderingParameters,
}

impl QueryOptions {
    pub fn new(filtering: FilteringParameters, ordering: OrderingParameters) -> Self {
        Self { filtering, ordering }
    }
}

pub struct QueryService<'a, E> {
    pool: &'a SqlitePool,
    config: &'a AppConfig,
    _phantom: PhantomData<E>,
}

impl<'a, E: Entity> QueryService<'a, E> {
    pub fn new(pool: &'a SqlitePool, config: &'a AppConfig) -> Self {
        Self { pool, config, _phantom: PhantomData }
    }

    /// Builds the filtered, ordered query without a page window.
    pub fn prepare(&self, options: &QueryOptions, access: &DataSetAccess) -> Result<Filter, QueryError> {
        let mut filter = Filter::new(E::TABLE)?;

        if let Some(column) = E::SCOPE_COLUMN {
            if let Some(predicate) = access.predicate(column) {
                filter.and_where(predicate);
            }
        }

        let filters = options.filtering.effective_filters();
        filter.and_where_all(E::filter_handlers().predicates(E::TABLE, &filters)?);

        filter.order(FilterOrder::resolve(&options.ordering, E::SORTABLE)?)?;
        filter.order(E::default_order())?;

        if self.config.query.debug_logging {
            tracing::debug!("Prepared {} query: {}", E::TABLE, filter.to_sql().query);
        }
        Ok(filter)
    }

    /// Counts the prepared query, then fetches the requested page.
    pub async fn execute_paginated(
        &self,
        mut filter: Filter,
        pagination: &PaginationParameters,
    ) -> Result<PaginatedList<E>, DatabaseError> {
        let mut pagination = pagination.clone();
        if !pagination.has_page_size() && self.config.query.default_page_size > 0 {
            pagination.set_page_size(self.config.query.default_page_size);
        }
        if let Some(max) = self.config.query.max_page_size {
            if pagination.page_size() > max {
                tracing::warn!("Page size {} exceeds max {}, capping to max", pagination.page_size(), max);
                pagination.set_page_size(max);
            }
        }

        let total_items = self.builder(filter.clone()).count(self.pool).await?;

        filter.limit(pagination.page_size() as i64, Some(pagination.skip() as i64))?;
        let items = self.builder(filter).select_all(self.pool).await?;

        Ok(PaginatedList::new(items, total_items, pagination.page_number(), pagination.page_size()))
    }

    pub async fn fetch_all(&self, filter: Filter) -> Result<Vec<E>, DatabaseError> {
        self.builder(filter).select_all(self.pool).await
    }

    /// Loads one row by key, subject to the same pre-filter as listing.
    pub async fn get_by_id(&self, id: Uuid, access: &DataSetAccess) -> Result<Option<E>, DatabaseError> {
        let mut filter = Filter::new(E::TABLE)?;
        filter.and_where(Predicate::new(
            format!("\"{}\" = ?", E::KEY_COLUMN),
            vec![Value::String(id.to_string())],
        ));
        if let Some(column) = E::SCOPE_COLUMN {
            if let Some(predicate) = access.predicate(column) {
                filter.and_where(predicate);
            }
        }
        self.builder(filter).select_optional(self.pool).await
    }

    fn builder(&self, filter: Filter) -> QueryBuilder<E> {
        let threshold = self
            .config
            .database
            .enable_slow_query_warning
            .then_some(self.config.database.slow_query_threshold_ms);
        QueryBuilder::new(filter).warn_slower_than(threshold)
    }
}

//! Request-side query parameters shared by every list request.
//!
//! Field names follow the web client's wire format (PascalCase).

use serde::{Deserialize, Deserializer, Serialize};

use super::query_filter::QueryFilter;
use super::types::SortDirection;

pub const DEFAULT_PAGE_SIZE: i32 = 20;

/// Page position. `page_number` and `skip` are two views of the same offset and
/// are kept consistent by the setters.
///
/// A request that names no page size gets the configured default when the query runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", try_from = "RawPagination")]
pub struct PaginationParameters {
    page_number: i32,
    page_size: i32,
    skip: i32,
    #[serde(skip_serializing)]
    size_given: bool,
    #[serde(skip_serializing)]
    skip_given: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawPagination {
    page_number: Option<i32>,
    page_size: Option<i32>,
    skip: Option<i32>,
}

impl TryFrom<RawPagination> for PaginationParameters {
    type Error = String;

    fn try_from(raw: RawPagination) -> Result<Self, Self::Error> {
        let page_size = raw.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        if page_size < 1 {
            return Err(format!("PageSize must be at least 1, got {}", page_size));
        }

        let mut params = Self::new(1, page_size);
        params.size_given = raw.page_size.is_some();
        if let Some(page_number) = raw.page_number {
            if page_number < 1 {
                return Err(format!("PageNumber must be at least 1, got {}", page_number));
            }
            params.set_page_number(page_number);
        }
        // An explicit Skip wins over PageNumber.
        if let Some(skip) = raw.skip {
            if skip < 0 {
                return Err(format!("Skip must not be negative, got {}", skip));
            }
            params.set_skip(skip);
            params.skip_given = true;
        }
        Ok(params)
    }
}

impl Default for PaginationParameters {
    fn default() -> Self {
        let mut params = Self::new(1, DEFAULT_PAGE_SIZE);
        params.size_given = false;
        params
    }
}

impl PaginationParameters {
    pub fn new(page_number: i32, page_size: i32) -> Self {
        let mut params = Self { page_number: 1, page_size, skip: 0, size_given: true, skip_given: false };
        params.set_page_number(page_number);
        params
    }

    /// First page with an unbounded page size.
    pub fn all_items() -> Self {
        Self::new(1, i32::MAX)
    }

    pub fn page_number(&self) -> i32 {
        self.page_number
    }

    pub fn page_size(&self) -> i32 {
        self.page_size
    }

    pub fn skip(&self) -> i32 {
        self.skip
    }

    pub fn set_page_number(&mut self, page_number: i32) {
        self.page_number = page_number;
        self.skip = (page_number.saturating_sub(1)).saturating_mul(self.page_size);
    }

    pub fn set_skip(&mut self, skip: i32) {
        self.skip = skip;
        self.page_number = if self.page_size > 0 { skip / self.page_size + 1 } else { 1 };
    }

    /// Whether the caller asked for a specific page size.
    pub fn has_page_size(&self) -> bool {
        self.size_given
    }

    /// Changes the page size, keeping the explicit skip if one was given and the page number otherwise.
    pub fn set_page_size(&mut self, page_size: i32) {
        self.page_size = page_size;
        if self.skip_given {
            self.set_skip(self.skip);
        } else {
            self.set_page_number(self.page_number);
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct OrderingParameters {
    pub order_by: Option<String>,
    pub order_direction: Option<String>,
}

impl OrderingParameters {
    pub fn new(order_by: Option<String>, order_direction: Option<String>) -> Self {
        Self { order_by, order_direction }
    }

    pub fn has_ordering(&self) -> bool {
        self.order_by.as_deref().is_some_and(|s| !s.is_empty())
    }

    /// Ascending when no direction is given or it is "asc"; anything else sorts descending.
    pub fn direction(&self) -> SortDirection {
        match self.order_direction.as_deref() {
            None | Some("") => SortDirection::Asc,
            Some(d) if d.eq_ignore_ascii_case("asc") => SortDirection::Asc,
            Some(_) => SortDirection::Desc,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct FilteringParameters {
    pub search_term: Option<String>,
    #[serde(deserialize_with = "null_as_empty")]
    pub query_filters: Vec<QueryFilter>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

impl FilteringParameters {
    pub fn with_filters(query_filters: Vec<QueryFilter>) -> Self {
        Self { search_term: None, query_filters }
    }

    pub fn has_filter(&self) -> bool {
        self.search_term.as_deref().is_some_and(|s| !s.trim().is_empty())
    }

    /// Explicit filters, preceded by the legacy `SearchTerm` as a `Search` filter when set.
    pub fn effective_filters(&self) -> Vec<QueryFilter> {
        let mut filters = Vec::with_capacity(self.query_filters.len() + 1);
        if self.has_filter() {
            filters.push(QueryFilter::search(self.search_term.clone().unwrap_or_default()));
        }
        filters.extend(self.query_filters.iter().cloned());
        filters
    }
}

/// Common body of every paginated list request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct PaginatedQuery {
    pub pagination: PaginationParameters,
    pub ordering: OrderingParameters,
    pub filtering: FilteringParameters,
}

impl PaginatedQuery {
    pub fn all_items(order_by: Option<String>, order_direction: Option<String>) -> Self {
        Self {
            pagination: PaginationParameters::all_items(),
            ordering: OrderingParameters::new(order_by, order_direction),
            filtering: FilteringParameters::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn page_number_drives_skip() {
        let mut p = PaginationParameters::new(3, 20);
        assert_eq!(p.skip(), 40);
        p.set_page_number(1);
        assert_eq!(p.skip(), 0);
    }

    #[test]
    fn skip_drives_page_number() {
        let mut p = PaginationParameters::new(1, 20);
        p.set_skip(45);
        assert_eq!(p.page_number(), 3);
        p.set_skip(0);
        assert_eq!(p.page_number(), 1);
    }

    #[test]
    fn all_items_is_first_page_with_max_size() {
        let p = PaginationParameters::all_items();
        assert_eq!(p.page_number(), 1);
        assert_eq!(p.page_size(), i32::MAX);
        assert_eq!(p.skip(), 0);
    }

    #[test]
    fn deserializes_wire_pagination() {
        let p: PaginationParameters = serde_json::from_value(json!({ "PageNumber": 2, "PageSize": 10 })).unwrap();
        assert_eq!((p.page_number(), p.page_size(), p.skip()), (2, 10, 10));

        let p: PaginationParameters =
            serde_json::from_value(json!({ "PageNumber": 2, "PageSize": 10, "Skip": 35 })).unwrap();
        assert_eq!((p.page_number(), p.skip()), (4, 35));
    }

    #[test]
    fn missing_page_size_is_left_to_config() {
        let p: PaginationParameters = serde_json::from_value(json!({ "PageNumber": 3 })).unwrap();
        assert!(!p.has_page_size());
        assert!(!PaginationParameters::default().has_page_size());
        assert!(PaginationParameters::new(1, 5).has_page_size());

        let mut p = p;
        p.set_page_size(5);
        assert_eq!((p.page_number(), p.skip()), (3, 10));

        let mut p: PaginationParameters = serde_json::from_value(json!({ "Skip": 7 })).unwrap();
        p.set_page_size(5);
        assert_eq!((p.page_number(), p.skip()), (2, 7));
    }

    #[test]
    fn rejects_invalid_pagination() {
        assert!(serde_json::from_value::<PaginationParameters>(json!({ "PageSize": 0 })).is_err());
        assert!(serde_json::from_value::<PaginationParameters>(json!({ "PageNumber": 0 })).is_err());
        assert!(serde_json::from_value::<PaginationParameters>(json!({ "Skip": -1 })).is_err());
    }

    #[test]
    fn ordering_direction_defaults_to_ascending() {
        let o = OrderingParameters::new(Some("Name".into()), None);
        assert!(o.has_ordering());
        assert_eq!(o.direction(), SortDirection::Asc);
        assert_eq!(OrderingParameters::new(None, Some("ASC".into())).direction(), SortDirection::Asc);
        assert_eq!(OrderingParameters::new(None, Some("desc".into())).direction(), SortDirection::Desc);
        assert_eq!(OrderingParameters::new(None, Some("down".into())).direction(), SortDirection::Desc);
        assert!(!OrderingParameters::new(Some(String::new()), None).has_ordering());
    }

    #[test]
    fn legacy_search_term_becomes_search_filter() {
        let f = FilteringParameters { search_term: Some("  ".into()), query_filters: vec![] };
        assert!(!f.has_filter());
        assert!(f.effective_filters().is_empty());

        let f = FilteringParameters { search_term: Some("Hello".into()), query_filters: vec![] };
        assert_eq!(f.effective_filters(), vec![QueryFilter::search("Hello")]);
    }

    #[test]
    fn null_query_filters_deserialize_as_empty() {
        let f: FilteringParameters = serde_json::from_value(json!({ "QueryFilters": null })).unwrap();
        assert!(f.query_filters.is_empty());
    }

    #[test]
    fn empty_body_is_default_query() {
        let q: PaginatedQuery = serde_json::from_value(json!({})).unwrap();
        assert_eq!(q.pagination.page_number(), 1);
        assert!(!q.ordering.has_ordering());
    }
}

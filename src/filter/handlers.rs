use std::collections::HashMap;

use serde_json::Value;

use super::error::QueryError;
use super::query_filter::{QueryFilter, SEARCH};
use super::types::Predicate;

/// Turns one named filter into a SQL predicate for a single entity type.
pub trait FilterHandler: Send + Sync {
    fn filter_name(&self) -> &'static str;

    /// `None` when the filter contributes nothing.
    fn predicate(&self, filter: &QueryFilter) -> Result<Option<Predicate>, QueryError>;
}

/// Filter handlers of one entity type, keyed by filter name.
#[derive(Default)]
pub struct FilterHandlerRegistry {
    handlers: HashMap<&'static str, Box<dyn FilterHandler>>,
}

impl FilterHandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, handler: impl FilterHandler + 'static) -> Self {
        self.handlers.insert(handler.filter_name(), Box::new(handler));
        self
    }

    pub fn handles(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Predicates for every active filter with a registered handler. Active
    /// filters nobody handles are skipped.
    pub fn predicates(&self, entity: &str, filters: &[QueryFilter]) -> Result<Vec<Predicate>, QueryError> {
        let mut out = Vec::new();
        for filter in filters.iter().filter(|f| f.is_active()) {
            match self.handlers.get(filter.name()) {
                Some(handler) => {
                    if let Some(predicate) = handler.predicate(filter)? {
                        out.push(predicate);
                    }
                }
                None => {
                    tracing::warn!("No handler for filter '{}' on {}, skipping", filter.name(), entity);
                }
            }
        }
        Ok(out)
    }
}

/// Substring match over a fixed set of text columns.
///
/// SQLite's `LOWER` folds ASCII letters only, so the term is folded the same way:
/// matching ignores ASCII case and is exact for every other character.
pub struct SearchFilterHandler {
    columns: &'static [&'static str],
}

impl SearchFilterHandler {
    pub fn new(columns: &'static [&'static str]) -> Self {
        Self { columns }
    }
}

impl FilterHandler for SearchFilterHandler {
    fn filter_name(&self) -> &'static str {
        SEARCH
    }

    fn predicate(&self, filter: &QueryFilter) -> Result<Option<Predicate>, QueryError> {
        let term = match filter {
            QueryFilter::Search(f) => f.search_term.as_deref().unwrap_or_default(),
            other => return Err(QueryError::InvalidFilter(format!("'{}' is not a search filter", other.name()))),
        };
        if term.trim().is_empty() || self.columns.is_empty() {
            return Ok(None);
        }

        let pattern = Value::String(format!("%{}%", escape_like(&term.to_ascii_lowercase())));
        let clauses: Vec<String> = self
            .columns
            .iter()
            .map(|c| format!("LOWER(\"{}\") LIKE ? ESCAPE '\\'", c))
            .collect();
        let params = vec![pattern; clauses.len()];
        Ok(Some(Predicate::new(format!("({})", clauses.join(" OR ")), params)))
    }
}

/// Column equality against the filter's single value.
pub struct EqualsFilterHandler {
    name: &'static str,
    column: &'static str,
}

impl EqualsFilterHandler {
    pub fn new(name: &'static str, column: &'static str) -> Self {
        Self { name, column }
    }
}

impl FilterHandler for EqualsFilterHandler {
    fn filter_name(&self) -> &'static str {
        self.name
    }

    fn predicate(&self, filter: &QueryFilter) -> Result<Option<Predicate>, QueryError> {
        if filter.name() != self.name {
            return Err(QueryError::InvalidFilter(format!(
                "handler for '{}' cannot apply '{}'",
                self.name,
                filter.name()
            )));
        }
        Ok(filter
            .value()
            .map(|v| Predicate::new(format!("\"{}\" = ?", self.column), vec![v])))
    }
}

fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::query_filter::{TRANSLATION_CULTURE_NAME, TRANSLATION_DATA_SET_ID};
    use serde_json::json;
    use uuid::Uuid;

    fn registry() -> FilterHandlerRegistry {
        FilterHandlerRegistry::new()
            .register(SearchFilterHandler::new(&["name", "notes"]))
            .register(EqualsFilterHandler::new(TRANSLATION_CULTURE_NAME, "culture_name"))
    }

    #[test]
    fn search_matches_any_column_lowercased() {
        let p = SearchFilterHandler::new(&["name", "notes"])
            .predicate(&QueryFilter::search("WeLcome"))
            .unwrap()
            .unwrap();
        assert_eq!(
            p.sql,
            "(LOWER(\"name\") LIKE ? ESCAPE '\\' OR LOWER(\"notes\") LIKE ? ESCAPE '\\')"
        );
        assert_eq!(p.params, vec![json!("%welcome%"), json!("%welcome%")]);
    }

    #[test]
    fn search_folds_ascii_case_only() {
        let p = SearchFilterHandler::new(&["content"])
            .predicate(&QueryFilter::search("ÄNDERN"))
            .unwrap()
            .unwrap();
        assert_eq!(p.params, vec![json!("%Ändern%")]);
    }

    #[test]
    fn search_escapes_like_wildcards() {
        let p = SearchFilterHandler::new(&["name"])
            .predicate(&QueryFilter::search("50%_off"))
            .unwrap()
            .unwrap();
        assert_eq!(p.params, vec![json!("%50\\%\\_off%")]);
    }

    #[test]
    fn equals_binds_value() {
        let id = Uuid::new_v4();
        let p = EqualsFilterHandler::new(TRANSLATION_DATA_SET_ID, "data_set_id")
            .predicate(&QueryFilter::data_set_id(id))
            .unwrap()
            .unwrap();
        assert_eq!(p.sql, "\"data_set_id\" = ?");
        assert_eq!(p.params, vec![json!(id.to_string())]);
    }

    #[test]
    fn registry_skips_inactive_and_unhandled_filters() {
        let filters = vec![
            QueryFilter::search(" "),
            QueryFilter::data_set_id(Uuid::new_v4()),
            QueryFilter::culture_name("en-US"),
        ];
        let predicates = registry().predicates("project_instances", &filters).unwrap();
        assert_eq!(predicates.len(), 1);
        assert_eq!(predicates[0].sql, "\"culture_name\" = ?");
    }

    #[test]
    fn registry_knows_its_handlers() {
        let r = registry();
        assert!(r.handles(SEARCH));
        assert!(!r.handles(TRANSLATION_DATA_SET_ID));
    }
}

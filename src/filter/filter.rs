use super::error::QueryError;
use super::filter_order::FilterOrder;
use super::types::{FilterOrderInfo, Predicate, SqlResult};

/// SELECT builder over one table: AND-combined predicates, ordering and a
/// LIMIT/OFFSET window.
#[derive(Debug, Clone)]
pub struct Filter {
    table_name: String,
    select_columns: Vec<String>,
    conditions: Vec<Predicate>,
    order_data: Vec<FilterOrderInfo>,
    limit: Option<i64>,
    offset: Option<i64>,
}

impl Filter {
    pub fn new(table_name: impl Into<String>) -> Result<Self, QueryError> {
        let table_name = table_name.into();
        validate_identifier(&table_name)?;
        Ok(Self {
            table_name,
            select_columns: vec![],
            conditions: vec![],
            order_data: vec![],
            limit: None,
            offset: None,
        })
    }

    pub fn select(&mut self, columns: &[&str]) -> Result<&mut Self, QueryError> {
        for column in columns {
            validate_identifier(column)?;
        }
        self.select_columns = columns.iter().map(|c| c.to_string()).collect();
        Ok(self)
    }

    pub fn and_where(&mut self, predicate: Predicate) -> &mut Self {
        self.conditions.push(predicate);
        self
    }

    pub fn and_where_all(&mut self, predicates: impl IntoIterator<Item = Predicate>) -> &mut Self {
        self.conditions.extend(predicates);
        self
    }

    pub fn order(&mut self, order: Vec<FilterOrderInfo>) -> Result<&mut Self, QueryError> {
        for info in &order {
            validate_identifier(&info.column)?;
        }
        self.order_data.extend(order);
        Ok(self)
    }

    pub fn has_order(&self) -> bool {
        !self.order_data.is_empty()
    }

    pub fn limit(&mut self, limit: i64, offset: Option<i64>) -> Result<&mut Self, QueryError> {
        if limit < 0 {
            return Err(QueryError::InvalidPagination("Limit must be non-negative".to_string()));
        }
        if let Some(off) = offset {
            if off < 0 {
                return Err(QueryError::InvalidPagination("Offset must be non-negative".to_string()));
            }
        }
        self.limit = Some(limit);
        self.offset = offset;
        Ok(self)
    }

    pub fn to_sql(&self) -> SqlResult {
        let where_result = self.to_where_sql();
        let query = [
            format!("SELECT {}", self.build_select_clause()),
            format!("FROM \"{}\"", self.table_name),
            if where_result.query.is_empty() { String::new() } else { format!("WHERE {}", where_result.query) },
            FilterOrder::generate(&self.order_data),
            self.build_limit_clause(),
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        SqlResult { query, params: where_result.params }
    }

    pub fn to_where_sql(&self) -> SqlResult {
        let query = self
            .conditions
            .iter()
            .map(|p| format!("({})", p.sql))
            .collect::<Vec<_>>()
            .join(" AND ");
        let params = self.conditions.iter().flat_map(|p| p.params.iter().cloned()).collect();
        SqlResult { query, params }
    }

    pub fn to_count_sql(&self) -> SqlResult {
        let where_result = self.to_where_sql();
        let query = if where_result.query.is_empty() {
            format!("SELECT COUNT(*) as count FROM \"{}\"", self.table_name)
        } else {
            format!("SELECT COUNT(*) as count FROM \"{}\" WHERE {}", self.table_name, where_result.query)
        };
        SqlResult { query, params: where_result.params }
    }

    fn build_select_clause(&self) -> String {
        if self.select_columns.is_empty() {
            "*".to_string()
        } else {
            self.select_columns.iter().map(|c| format!("\"{}\"", c)).collect::<Vec<_>>().join(", ")
        }
    }

    fn build_limit_clause(&self) -> String {
        match (self.limit, self.offset) {
            (Some(l), Some(o)) => format!("LIMIT {} OFFSET {}", l, o),
            (Some(l), None) => format!("LIMIT {}", l),
            _ => String::new(),
        }
    }
}

/// Table and column names: ASCII letters, digits and underscores, not starting with a digit.
pub fn validate_identifier(name: &str) -> Result<(), QueryError> {
    let mut chars = name.chars();
    let valid_start = chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if !valid_start || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(QueryError::InvalidIdentifier(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bare_select() {
        let f = Filter::new("translations").unwrap();
        assert_eq!(f.to_sql().query, "SELECT * FROM \"translations\"");
        assert_eq!(f.to_count_sql().query, "SELECT COUNT(*) as count FROM \"translations\"");
    }

    #[test]
    fn combines_predicates_order_and_window() {
        let mut f = Filter::new("translations").unwrap();
        f.select(&["id", "content"]).unwrap();
        f.and_where(Predicate::is_in("data_set_id", vec![json!("a"), json!("b")]));
        f.and_where(Predicate::new("\"culture_name\" = ?", vec![json!("en-US")]));
        f.order(vec![FilterOrderInfo::asc("created_at")]).unwrap();
        f.limit(20, Some(40)).unwrap();

        let sql = f.to_sql();
        assert_eq!(
            sql.query,
            "SELECT \"id\", \"content\" FROM \"translations\" \
             WHERE (\"data_set_id\" IN (?, ?)) AND (\"culture_name\" = ?) \
             ORDER BY \"created_at\" ASC LIMIT 20 OFFSET 40"
        );
        assert_eq!(sql.params, vec![json!("a"), json!("b"), json!("en-US")]);

        let count = f.to_count_sql();
        assert!(count.query.ends_with("WHERE (\"data_set_id\" IN (?, ?)) AND (\"culture_name\" = ?)"));
        assert_eq!(count.params.len(), 3);
    }

    #[test]
    fn empty_allow_list_matches_nothing() {
        let mut f = Filter::new("data_sets").unwrap();
        f.and_where(Predicate::is_in("id", vec![]));
        assert_eq!(f.to_sql().query, "SELECT * FROM \"data_sets\" WHERE (1 = 0)");
    }

    #[test]
    fn rejects_bad_identifiers() {
        assert!(Filter::new("").is_err());
        assert!(Filter::new("1table").is_err());
        assert!(Filter::new("users; DROP TABLE x").is_err());
        let mut f = Filter::new("t").unwrap();
        assert!(f.select(&["na me"]).is_err());
        assert!(f.order(vec![FilterOrderInfo::asc("x\"y")]).is_err());
    }

    #[test]
    fn rejects_negative_window() {
        let mut f = Filter::new("t").unwrap();
        assert!(f.limit(-1, None).is_err());
        assert!(f.limit(1, Some(-5)).is_err());
    }
}

use super::error::QueryError;
use super::params::OrderingParameters;
use super::types::FilterOrderInfo;

pub struct FilterOrder;

impl FilterOrder {
    /// Resolves the requested property against `sortable` (`(property, column)`
    /// pairs). Either name matches, ignoring case.
    pub fn resolve(
        ordering: &OrderingParameters,
        sortable: &[(&str, &str)],
    ) -> Result<Vec<FilterOrderInfo>, QueryError> {
        if !ordering.has_ordering() {
            return Ok(vec![]);
        }
        let requested = ordering.order_by.as_deref().unwrap_or_default().trim();

        let column = sortable
            .iter()
            .find(|(property, column)| {
                property.eq_ignore_ascii_case(requested) || column.eq_ignore_ascii_case(requested)
            })
            .map(|(_, column)| *column)
            .ok_or_else(|| QueryError::InvalidOrdering(format!("Cannot order by unknown property '{}'", requested)))?;

        Ok(vec![FilterOrderInfo { column: column.to_string(), sort: ordering.direction() }])
    }

    pub fn generate(infos: &[FilterOrderInfo]) -> String {
        if infos.is_empty() {
            return String::new();
        }
        let parts: Vec<String> = infos
            .iter()
            .map(|i| format!("\"{}\" {}", i.column, i.sort.to_sql()))
            .collect();
        format!("ORDER BY {}", parts.join(", "))
    }
}

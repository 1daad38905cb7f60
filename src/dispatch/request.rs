use serde::de::DeserializeOwned;
use serde_json::Value;

use super::DispatchError;
use crate::filter::PaginatedQuery;
use crate::services::{
    ExportTranslationsQuery, IdRequest, ImportTranslationsCommand, SaveDataSetCommand, SaveProjectInstanceCommand,
    SaveTranslationCommand,
};

/// A named request and its decoded body.
#[derive(Debug, Clone)]
pub enum ApiRequest {
    GetProjectInstances(PaginatedQuery),
    GetProjectInstanceById(IdRequest),
    SaveProjectInstance(SaveProjectInstanceCommand),
    DeleteProjectInstance(IdRequest),
    GetDataSets(PaginatedQuery),
    GetDataSetById(IdRequest),
    SaveDataSet(SaveDataSetCommand),
    DeleteDataSet(IdRequest),
    GetTranslations(PaginatedQuery),
    GetSimpleTranslations(PaginatedQuery),
    GetTranslationById(IdRequest),
    SaveTranslation(SaveTranslationCommand),
    DeleteTranslation(IdRequest),
    ExportTranslations(ExportTranslationsQuery),
    ImportTranslations(ImportTranslationsCommand),
}

/// Every request name the dispatcher accepts, in registration order.
pub const REQUEST_NAMES: &[&str] = &[
    "GetProjectInstancesQuery",
    "GetProjectInstanceByIdQuery",
    "SaveProjectInstanceCommand",
    "DeleteProjectInstanceCommand",
    "GetDataSetsQuery",
    "GetDataSetByIdQuery",
    "SaveDataSetCommand",
    "DeleteDataSetCommand",
    "GetTranslationsQuery",
    "GetSimpleTranslationsQuery",
    "GetTranslationByIdQuery",
    "SaveTranslationCommand",
    "DeleteTranslationCommand",
    "ExportTranslationsQuery",
    "ImportTranslationsCommand",
];

fn body<T: DeserializeOwned>(name: &str, body: Value) -> Result<T, DispatchError> {
    // An absent body means "all defaults".
    let body = if body.is_null() { Value::Object(Default::default()) } else { body };
    serde_json::from_value(body).map_err(|source| DispatchError::InvalidBody { name: name.to_string(), source })
}

impl ApiRequest {
    /// Decodes `body` for the request registered as `name` (case-insensitive).
    pub fn parse(name: &str, raw: Value) -> Result<Self, DispatchError> {
        let canonical = REQUEST_NAMES
            .iter()
            .find(|n| n.eq_ignore_ascii_case(name))
            .ok_or_else(|| DispatchError::UnknownRequest(name.to_string()))?;

        Ok(match *canonical {
            "GetProjectInstancesQuery" => ApiRequest::GetProjectInstances(body(canonical, raw)?),
            "GetProjectInstanceByIdQuery" => ApiRequest::GetProjectInstanceById(body(canonical, raw)?),
            "SaveProjectInstanceCommand" => ApiRequest::SaveProjectInstance(body(canonical, raw)?),
            "DeleteProjectInstanceCommand" => ApiRequest::DeleteProjectInstance(body(canonical, raw)?),
            "GetDataSetsQuery" => ApiRequest::GetDataSets(body(canonical, raw)?),
            "GetDataSetByIdQuery" => ApiRequest::GetDataSetById(body(canonical, raw)?),
            "SaveDataSetCommand" => ApiRequest::SaveDataSet(body(canonical, raw)?),
            "DeleteDataSetCommand" => ApiRequest::DeleteDataSet(body(canonical, raw)?),
            "GetTranslationsQuery" => ApiRequest::GetTranslations(body(canonical, raw)?),
            "GetSimpleTranslationsQuery" => ApiRequest::GetSimpleTranslations(body(canonical, raw)?),
            "GetTranslationByIdQuery" => ApiRequest::GetTranslationById(body(canonical, raw)?),
            "SaveTranslationCommand" => ApiRequest::SaveTranslation(body(canonical, raw)?),
            "DeleteTranslationCommand" => ApiRequest::DeleteTranslation(body(canonical, raw)?),
            "ExportTranslationsQuery" => ApiRequest::ExportTranslations(body(canonical, raw)?),
            "ImportTranslationsCommand" => ApiRequest::ImportTranslations(body(canonical, raw)?),
            other => return Err(DispatchError::UnknownRequest(other.to_string())),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            ApiRequest::GetProjectInstances(_) => "GetProjectInstancesQuery",
            ApiRequest::GetProjectInstanceById(_) => "GetProjectInstanceByIdQuery",
            ApiRequest::SaveProjectInstance(_) => "SaveProjectInstanceCommand",
            ApiRequest::DeleteProjectInstance(_) => "DeleteProjectInstanceCommand",
            ApiRequest::GetDataSets(_) => "GetDataSetsQuery",
            ApiRequest::GetDataSetById(_) => "GetDataSetByIdQuery",
            ApiRequest::SaveDataSet(_) => "SaveDataSetCommand",
            ApiRequest::DeleteDataSet(_) => "DeleteDataSetCommand",
            ApiRequest::GetTranslations(_) => "GetTranslationsQuery",
            ApiRequest::GetSimpleTranslations(_) => "GetSimpleTranslationsQuery",
            ApiRequest::GetTranslationById(_) => "GetTranslationByIdQuery",
            ApiRequest::SaveTranslation(_) => "SaveTranslationCommand",
            ApiRequest::DeleteTranslation(_) => "DeleteTranslationCommand",
            ApiRequest::ExportTranslations(_) => "ExportTranslationsQuery",
            ApiRequest::ImportTranslations(_) => "ImportTranslationsCommand",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn every_registered_name_parses() {
        for name in REQUEST_NAMES {
            let body = match *name {
                n if n.contains("ById") || n.starts_with("Delete") => json!({ "Id": uuid::Uuid::new_v4() }),
                "SaveProjectInstanceCommand" | "SaveDataSetCommand" => json!({ "Name": "x" }),
                "ImportTranslationsCommand" => json!({ "DataSetId": uuid::Uuid::new_v4(), "Content": "" }),
                _ => Value::Null,
            };
            let request = ApiRequest::parse(name, body).unwrap();
            assert_eq!(request.name(), *name);
        }
    }

    #[test]
    fn names_are_case_insensitive() {
        let request = ApiRequest::parse("gettranslationsquery", json!({})).unwrap();
        assert_eq!(request.name(), "GetTranslationsQuery");
    }

    #[test]
    fn unknown_name_and_bad_body() {
        assert!(matches!(ApiRequest::parse("DropTables", Value::Null), Err(DispatchError::UnknownRequest(_))));
        assert!(matches!(
            ApiRequest::parse("GetTranslationByIdQuery", json!({ "Id": "not-a-uuid" })),
            Err(DispatchError::InvalidBody { .. })
        ));
        assert!(matches!(
            ApiRequest::parse("GetTranslationsQuery", json!({ "Pagination": { "PageSize": 0 } })),
            Err(DispatchError::InvalidBody { .. })
        ));
    }

    #[test]
    fn paginated_body_uses_wire_names() {
        let body = json!({
            "Pagination": { "PageNumber": 2, "PageSize": 10 },
            "Ordering": { "OrderBy": "Name", "OrderDirection": "desc" },
            "Filtering": { "SearchTerm": "portal", "QueryFilters": [{ "Name": "Translation.CultureName", "Value": "en-US" }] }
        });
        match ApiRequest::parse("GetProjectInstancesQuery", body).unwrap() {
            ApiRequest::GetProjectInstances(q) => {
                assert_eq!(q.pagination.skip(), 10);
                assert_eq!(q.ordering.order_by.as_deref(), Some("Name"));
                assert_eq!(q.filtering.query_filters.len(), 1);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}

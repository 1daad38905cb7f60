use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

pub const SEARCH: &str = "Search";
pub const TRANSLATION_DATA_SET_ID: &str = "Translation.DataSetId";
pub const TRANSLATION_CULTURE_NAME: &str = "Translation.CultureName";

/// A named, individually-activatable query filter. On the wire the `Name`
/// property selects the variant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "Name")]
pub enum QueryFilter {
    #[serde(rename = "Search")]
    Search(SearchFilter),
    #[serde(rename = "Translation.DataSetId")]
    DataSetId(DataSetIdFilter),
    #[serde(rename = "Translation.CultureName")]
    CultureName(CultureNameFilter),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SearchFilter {
    pub search_term: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DataSetIdFilter {
    pub value: Option<Uuid>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct CultureNameFilter {
    pub value: Option<String>,
}

impl QueryFilter {
    pub fn search(term: impl Into<String>) -> Self {
        QueryFilter::Search(SearchFilter { search_term: Some(term.into()) })
    }

    pub fn data_set_id(id: Uuid) -> Self {
        QueryFilter::DataSetId(DataSetIdFilter { value: Some(id) })
    }

    pub fn culture_name(culture: impl Into<String>) -> Self {
        QueryFilter::CultureName(CultureNameFilter { value: Some(culture.into()) })
    }

    pub fn name(&self) -> &'static str {
        match self {
            QueryFilter::Search(_) => SEARCH,
            QueryFilter::DataSetId(_) => TRANSLATION_DATA_SET_ID,
            QueryFilter::CultureName(_) => TRANSLATION_CULTURE_NAME,
        }
    }

    /// Whether the filter carries a value and should be applied.
    pub fn is_active(&self) -> bool {
        match self {
            QueryFilter::Search(f) => f.search_term.as_deref().is_some_and(|s| !s.trim().is_empty()),
            QueryFilter::DataSetId(f) => f.value.is_some(),
            QueryFilter::CultureName(f) => f.value.as_deref().is_some_and(|s| !s.trim().is_empty()),
        }
    }

    /// The comparison value of single-value filters, as a bind parameter.
    pub fn value(&self) -> Option<Value> {
        match self {
            QueryFilter::Search(f) => f.search_term.clone().map(Value::String),
            QueryFilter::DataSetId(f) => f.value.map(|id| Value::String(id.to_string())),
            QueryFilter::CultureName(f) => f.value.clone().map(Value::String),
        }
    }
}

impl<'de> Deserialize<'de> for QueryFilter {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Value::deserialize(deserializer)?;
        let name = raw.get("Name").and_then(Value::as_str).unwrap_or_default();

        let filter = match name {
            SEARCH => serde_json::from_value(raw).map(QueryFilter::Search),
            TRANSLATION_DATA_SET_ID => serde_json::from_value(raw).map(QueryFilter::DataSetId),
            TRANSLATION_CULTURE_NAME => serde_json::from_value(raw).map(QueryFilter::CultureName),
            _ => {
                return Err(D::Error::custom(
                    "Unable to determine query filter type. Missing or invalid 'Name' property.",
                ))
            }
        };
        filter.map_err(D::Error::custom)
    }
}

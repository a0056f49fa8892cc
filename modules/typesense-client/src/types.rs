use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// --- Collections ---

/// A field in a collection schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub facet: bool,
    /// Unset means the engine default: numeric fields sortable, strings not.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<bool>,
}

impl Field {
    pub fn new(name: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.into(),
            facet: false,
            sort: None,
        }
    }

    pub fn facet(mut self) -> Self {
        self.facet = true;
        self
    }

    pub fn sortable(mut self, sort: bool) -> Self {
        self.sort = Some(sort);
        self
    }
}

/// Body for `POST /collections`.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionSchema {
    pub name: String,
    pub fields: Vec<Field>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_sorting_field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

/// Collection as returned by `GET /collections/:name`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CollectionResponse {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default)]
    pub num_documents: u64,
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
}

impl CollectionResponse {
    /// String-valued metadata entry for `key`, if any.
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.as_ref()?.get(key)?.as_str()
    }
}

// --- Search ---

/// Query parameters for `GET /collections/:name/documents/search`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facet_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_facet_values: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse<T> {
    #[serde(default)]
    pub found: u64,
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default = "Vec::new")]
    pub hits: Vec<Hit<T>>,
    #[serde(default)]
    pub facet_counts: Vec<FacetCounts>,
    #[serde(default)]
    pub request_params: RequestParams,
    #[serde(default)]
    pub search_time_ms: u64,
}

fn first_page() -> u32 {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct Hit<T> {
    pub document: T,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestParams {
    #[serde(default)]
    pub per_page: u32,
    #[serde(default)]
    pub q: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FacetCounts {
    pub field_name: String,
    #[serde(default)]
    pub counts: Vec<FacetCount>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FacetCount {
    pub value: String,
    pub count: u64,
}

// --- Import ---

/// How `documents/import` treats documents whose id already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImportAction {
    #[default]
    Create,
    Upsert,
    Update,
}

impl ImportAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportAction::Create => "create",
            ImportAction::Upsert => "upsert",
            ImportAction::Update => "update",
        }
    }
}

/// One line of the import response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ImportResult {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub document: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_serializes_without_defaults() {
        let json = serde_json::to_value(Field::new("year", "int32")).unwrap();
        assert_eq!(json, serde_json::json!({"name": "year", "type": "int32"}));

        let json = serde_json::to_value(Field::new("make", "string").facet()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"name": "make", "type": "string", "facet": true})
        );
    }

    #[test]
    fn collection_metadata_lookup() {
        let json = r#"{
            "name": "cars",
            "fields": [{"name": "msrp", "type": "int32", "facet": false, "sort": true}],
            "num_documents": 11914,
            "metadata": {"msrp": "in USD", "weird": 3}
        }"#;
        let collection: CollectionResponse = serde_json::from_str(json).unwrap();
        assert_eq!(collection.metadata_str("msrp"), Some("in USD"));
        assert_eq!(collection.metadata_str("weird"), None);
        assert_eq!(collection.metadata_str("missing"), None);
        assert_eq!(collection.fields[0].sort, Some(true));
    }

    #[test]
    fn search_response_defaults() {
        let json = r#"{"found": 0, "hits": []}"#;
        let response: SearchResponse<serde_json::Value> = serde_json::from_str(json).unwrap();
        assert_eq!(response.page, 1);
        assert!(response.facet_counts.is_empty());
        assert_eq!(response.request_params.per_page, 0);
    }

    #[test]
    fn import_result_failure_line() {
        let line = r#"{"success": false, "error": "Bad JSON.", "document": "{oops"}"#;
        let result: ImportResult = serde_json::from_str(line).unwrap();
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Bad JSON."));
    }
}

pub mod error;
pub mod types;

pub use error::{Result, TypesenseError};
pub use types::{
    CollectionResponse, CollectionSchema, FacetCount, FacetCounts, Field, Hit, ImportAction,
    ImportResult, RequestParams, SearchParams, SearchResponse,
};

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

const API_KEY_HEADER: &str = "X-TYPESENSE-API-KEY";

#[derive(Clone)]
pub struct TypesenseClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl TypesenseClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::with_http(reqwest::Client::new(), base_url, api_key)
    }

    /// Client whose connections give up after `timeout`.
    pub fn with_timeout(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_http(client, base_url, api_key))
    }

    pub fn with_http(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let base_url: String = base_url.into();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Map a non-success response to an error, reading its body as the message.
    async fn check(resp: reqwest::Response, what: &str) -> Result<reqwest::Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let message = resp.text().await.unwrap_or_default();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(TypesenseError::NotFound(format!("{what}: {message}")));
        }
        Err(TypesenseError::Api {
            status: status.as_u16(),
            message,
        })
    }

    /// `GET /collections/:name`
    pub async fn retrieve_collection(&self, name: &str) -> Result<CollectionResponse> {
        let resp = self
            .client
            .get(self.url(&format!("/collections/{name}")))
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;

        let resp = Self::check(resp, name).await?;
        Ok(resp.json().await?)
    }

    /// `POST /collections`
    pub async fn create_collection(&self, schema: &CollectionSchema) -> Result<CollectionResponse> {
        tracing::debug!(collection = %schema.name, fields = schema.fields.len(), "Creating collection");

        let resp = self
            .client
            .post(self.url("/collections"))
            .header(API_KEY_HEADER, &self.api_key)
            .json(schema)
            .send()
            .await?;

        let resp = Self::check(resp, &schema.name).await?;
        Ok(resp.json().await?)
    }

    /// `DELETE /collections/:name`
    pub async fn delete_collection(&self, name: &str) -> Result<()> {
        let resp = self
            .client
            .delete(self.url(&format!("/collections/{name}")))
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;

        Self::check(resp, name).await?;
        Ok(())
    }

    /// `PATCH /collections/:name` replacing the collection metadata object.
    pub async fn update_collection_metadata(
        &self,
        name: &str,
        metadata: Map<String, Value>,
    ) -> Result<()> {
        let body = serde_json::json!({ "metadata": metadata });
        let resp = self
            .client
            .patch(self.url(&format!("/collections/{name}")))
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await?;

        Self::check(resp, name).await?;
        Ok(())
    }

    /// `GET /collections/:name/documents/search`
    pub async fn search<T: DeserializeOwned>(
        &self,
        collection: &str,
        params: &SearchParams,
    ) -> Result<SearchResponse<T>> {
        let resp = self
            .client
            .get(self.url(&format!("/collections/{collection}/documents/search")))
            .header(API_KEY_HEADER, &self.api_key)
            .query(params)
            .send()
            .await?;

        let resp = Self::check(resp, collection).await?;
        Ok(resp.json().await?)
    }

    /// `POST /collections/:name/documents/import` with a JSONL body.
    /// Returns one result per input line; per-document failures are not errors.
    pub async fn import_jsonl(
        &self,
        collection: &str,
        jsonl: String,
        action: ImportAction,
    ) -> Result<Vec<ImportResult>> {
        let resp = self
            .client
            .post(self.url(&format!("/collections/{collection}/documents/import")))
            .header(API_KEY_HEADER, &self.api_key)
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .query(&[("action", action.as_str())])
            .body(jsonl)
            .send()
            .await?;

        let resp = Self::check(resp, collection).await?;
        let body = resp.text().await?;

        body.lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(TypesenseError::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[tokio::test]
    async fn retrieve_collection_sends_api_key() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/collections/cars")
            .match_header("x-typesense-api-key", "xyz")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"name":"cars","num_documents":2,"fields":[{"name":"make","type":"string","facet":true}]}"#,
            )
            .create_async()
            .await;

        let client = TypesenseClient::new(server.url(), "xyz");
        let collection = client.retrieve_collection("cars").await.unwrap();

        assert_eq!(collection.name, "cars");
        assert!(collection.fields[0].facet);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn missing_collection_is_not_found() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/collections/cars")
            .with_status(404)
            .with_body(r#"{"message":"Not Found"}"#)
            .create_async()
            .await;

        let client = TypesenseClient::new(server.url(), "xyz");
        let err = client.retrieve_collection("cars").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn search_encodes_params() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/collections/cars/documents/search")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("q".into(), "*".into()),
                Matcher::UrlEncoded("filter_by".into(), "make:[Honda,BMW]".into()),
                Matcher::UrlEncoded("per_page".into(), "12".into()),
            ]))
            .with_status(200)
            .with_body(
                r#"{"found":1,"page":1,"hits":[{"document":{"make":"Honda"}}],"request_params":{"per_page":12}}"#,
            )
            .create_async()
            .await;

        let client = TypesenseClient::new(server.url(), "xyz");
        let params = SearchParams {
            q: "*".into(),
            filter_by: Some("make:[Honda,BMW]".into()),
            per_page: Some(12),
            ..Default::default()
        };
        let response: SearchResponse<serde_json::Value> =
            client.search("cars", &params).await.unwrap();

        assert_eq!(response.found, 1);
        assert_eq!(response.hits[0].document["make"], "Honda");
        assert_eq!(response.request_params.per_page, 12);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn search_rejection_is_api_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/collections/cars/documents/search")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body(r#"{"message":"Could not parse the filter query."}"#)
            .create_async()
            .await;

        let client = TypesenseClient::new(server.url(), "xyz");
        let err = client
            .search::<serde_json::Value>("cars", &SearchParams::default())
            .await
            .unwrap_err();
        assert!(matches!(err, TypesenseError::Api { status: 400, .. }));
    }

    #[tokio::test]
    async fn import_parses_each_line() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/collections/cars/documents/import")
            .match_query(Matcher::UrlEncoded("action".into(), "create".into()))
            .match_body("{\"make\":\"BMW\"}\n{oops")
            .with_status(200)
            .with_body("{\"success\":true}\n{\"success\":false,\"error\":\"Bad JSON.\",\"document\":\"{oops\"}\n")
            .create_async()
            .await;

        let client = TypesenseClient::new(server.url(), "xyz");
        let results = client
            .import_jsonl("cars", "{\"make\":\"BMW\"}\n{oops".into(), ImportAction::Create)
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert!(results[0].success);
        assert!(!results[1].success);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn update_metadata_patches_collection() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PATCH", "/collections/cars")
            .match_body(Matcher::Json(serde_json::json!({"metadata": {"msrp": "in USD"}})))
            .with_status(200)
            .with_body(r#"{"metadata":{"msrp":"in USD"}}"#)
            .create_async()
            .await;

        let client = TypesenseClient::new(server.url(), "xyz");
        let mut metadata = Map::new();
        metadata.insert("msrp".into(), Value::String("in USD".into()));
        client.update_collection_metadata("cars", metadata).await.unwrap();
        mock.assert_async().await;
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let client = TypesenseClient::new("http://localhost:8108/", "xyz");
        assert_eq!(client.base_url(), "http://localhost:8108");
    }
}

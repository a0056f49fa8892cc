use anyhow::Result;
use async_trait::async_trait;
use carsearch_common::{next_page, Car, SearchPage, SearchRequest, StructuredQuery};
use tracing::info;
use typesense_client::{SearchParams, SearchResponse, TypesenseClient};

pub const DEFAULT_Q: &str = "*";
pub const DEFAULT_SORT_BY: &str = "popularity:desc";
pub const QUERY_BY: &str = "make,model,market_category";
pub const PER_PAGE: u32 = 12;

/// Apply search defaults to a translated query: match-all term, no filter,
/// most popular first.
pub fn search_request(query: &StructuredQuery) -> SearchRequest {
    SearchRequest {
        q: query.query.clone().unwrap_or_else(|| DEFAULT_Q.to_string()),
        filter_by: query.filter_by.clone().unwrap_or_default(),
        sort_by: query
            .sort_by
            .clone()
            .unwrap_or_else(|| DEFAULT_SORT_BY.to_string()),
    }
}

/// Dyn-compatible search over the car collection.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    async fn search(&self, request: &SearchRequest, page: u32) -> Result<SearchPage>;
}

pub struct TypesenseSearchIndex {
    client: TypesenseClient,
    collection: String,
}

impl TypesenseSearchIndex {
    pub fn new(client: TypesenseClient, collection: impl Into<String>) -> Self {
        Self {
            client,
            collection: collection.into(),
        }
    }

    fn params(&self, request: &SearchRequest, page: u32) -> SearchParams {
        SearchParams {
            q: request.q.clone(),
            query_by: Some(QUERY_BY.to_string()),
            filter_by: Some(request.filter_by.clone()).filter(|f| !f.is_empty()),
            sort_by: Some(request.sort_by.clone()).filter(|s| !s.is_empty()),
            per_page: Some(PER_PAGE),
            page: Some(page),
            ..Default::default()
        }
    }
}

#[async_trait]
impl SearchIndex for TypesenseSearchIndex {
    async fn search(&self, request: &SearchRequest, page: u32) -> Result<SearchPage> {
        let params = self.params(request, page);
        let response: SearchResponse<Car> = self.client.search(&self.collection, &params).await?;

        let per_page = match response.request_params.per_page {
            0 => PER_PAGE,
            n => n,
        };

        info!(
            collection = %self.collection,
            found = response.found,
            page = response.page,
            search_time_ms = response.search_time_ms,
            "Search completed"
        );

        Ok(SearchPage {
            found: response.found,
            page: response.page,
            per_page,
            next_page: next_page(response.page, per_page, response.found),
            hits: response.hits.into_iter().map(|h| h.document).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[test]
    fn defaults_fill_absent_parts() {
        let request = search_request(&StructuredQuery::default());
        assert_eq!(request.q, "*");
        assert_eq!(request.filter_by, "");
        assert_eq!(request.sort_by, "popularity:desc");

        let request = search_request(&StructuredQuery {
            query: Some("hellcat".into()),
            filter_by: Some("make:Dodge".into()),
            sort_by: Some("engine_hp:desc".into()),
        });
        assert_eq!(request.q, "hellcat");
        assert_eq!(request.filter_by, "make:Dodge");
        assert_eq!(request.sort_by, "engine_hp:desc");
    }

    #[tokio::test]
    async fn search_sends_params_and_pages() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/collections/cars/documents/search")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("q".into(), "*".into()),
                Matcher::UrlEncoded("query_by".into(), "make,model,market_category".into()),
                Matcher::UrlEncoded("filter_by".into(), "make:[Honda,BMW] && year:>2014".into()),
                Matcher::UrlEncoded("sort_by".into(), "popularity:desc".into()),
                Matcher::UrlEncoded("per_page".into(), "12".into()),
                Matcher::UrlEncoded("page".into(), "2".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"found":30,"page":2,"search_time_ms":3,"request_params":{"per_page":12,"q":"*"},
                    "hits":[{"document":{"id":"7","make":"BMW","model":"M4","year":2016,"msrp":64200,"market_category":["Luxury","High-Performance"]}}]}"#,
            )
            .create_async()
            .await;

        let index = TypesenseSearchIndex::new(TypesenseClient::new(server.url(), "xyz"), "cars");
        let request = SearchRequest {
            q: "*".into(),
            filter_by: "make:[Honda,BMW] && year:>2014".into(),
            sort_by: "popularity:desc".into(),
        };
        let page = index.search(&request, 2).await.unwrap();

        mock.assert_async().await;
        assert_eq!(page.found, 30);
        assert_eq!(page.page, 2);
        assert_eq!(page.per_page, 12);
        assert_eq!(page.next_page, Some(3));
        assert_eq!(page.hits[0].model, "M4");
        assert_eq!(page.hits[0].market_category.len(), 2);
    }

    #[test]
    fn empty_filter_is_not_sent() {
        let index =
            TypesenseSearchIndex::new(TypesenseClient::new("http://localhost:8108", "xyz"), "cars");
        let params = index.params(&search_request(&StructuredQuery::default()), 1);

        assert_eq!(params.filter_by, None);
        assert_eq!(params.sort_by.as_deref(), Some("popularity:desc"));
        assert_eq!(params.per_page, Some(PER_PAGE));
        assert_eq!(params.page, Some(1));
    }

    #[tokio::test]
    async fn last_page_has_no_next() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/collections/cars/documents/search")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"found":0,"page":1,"hits":[]}"#)
            .create_async()
            .await;

        let index = TypesenseSearchIndex::new(TypesenseClient::new(server.url(), "xyz"), "cars");
        let page = index
            .search(&search_request(&StructuredQuery::default()), 1)
            .await
            .unwrap();

        assert_eq!(page.found, 0);
        assert_eq!(page.per_page, 12);
        assert_eq!(page.next_page, None);
        assert!(page.hits.is_empty());
    }

    #[tokio::test]
    async fn rejected_filter_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/collections/cars/documents/search")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body(r#"{"message":"Could not find a filter field named `color` in the schema."}"#)
            .create_async()
            .await;

        let index = TypesenseSearchIndex::new(TypesenseClient::new(server.url(), "xyz"), "cars");
        let request = SearchRequest {
            q: "*".into(),
            filter_by: "color:red".into(),
            sort_by: DEFAULT_SORT_BY.into(),
        };
        let err = index.search(&request, 1).await.unwrap_err();
        assert!(err.to_string().contains("400"));
    }
}

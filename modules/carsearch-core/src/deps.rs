use std::sync::Arc;
use std::time::{Duration, Instant};

use ai_client::OpenAi;
use anyhow::Context;
use carsearch_common::{
    AppConfig, CarSearchError, FieldCatalog, Result, SearchPage, SearchRequest, StructuredQuery,
};
use serde::Serialize;
use tracing::info;
use typesense_client::TypesenseClient;

use crate::cache::{CatalogCache, CATALOG_TAG};
use crate::catalog::{enrich_catalog, CatalogSource, TypesenseCatalogSource};
use crate::llm::OpenAiCompletionService;
use crate::search::{search_request, SearchIndex, TypesenseSearchIndex};
use crate::translator::{CompletionService, QueryTranslator};

/// A translated search: what the model produced, the parameters sent to the
/// index after defaults, and the first page of results.
#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub generated_query: StructuredQuery,
    pub params: SearchRequest,
    #[serde(flatten)]
    pub page: SearchPage,
}

/// Central dependency container passed to handlers and commands.
#[derive(Clone)]
pub struct SearchDeps {
    pub translator: QueryTranslator,
    pub index: Arc<dyn SearchIndex>,
    pub catalog_source: Arc<dyn CatalogSource>,
    pub catalog_cache: Arc<CatalogCache>,
    pub max_facet_values: u32,
}

impl SearchDeps {
    pub fn new(
        completion: Arc<dyn CompletionService>,
        index: Arc<dyn SearchIndex>,
        catalog_source: Arc<dyn CatalogSource>,
        max_facet_values: u32,
    ) -> Self {
        Self {
            translator: QueryTranslator::new(completion),
            index,
            catalog_source,
            catalog_cache: Arc::new(CatalogCache::new()),
            max_facet_values,
        }
    }

    /// Wire up Typesense (search-only key) and the completion endpoint.
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let typesense = TypesenseClient::with_timeout(
            &config.typesense_url,
            &config.typesense_search_api_key,
            Duration::from_secs(config.typesense_timeout_secs),
        )
        .context("failed to build Typesense client")?;

        let ai = OpenAi::new(config.llm_api_key()?, &config.llm_model)
            .with_base_url(&config.llm_base_url);

        Ok(Self::new(
            Arc::new(OpenAiCompletionService::new(Arc::new(ai))),
            Arc::new(TypesenseSearchIndex::new(
                typesense.clone(),
                &config.collection_name,
            )),
            Arc::new(TypesenseCatalogSource::new(
                typesense,
                &config.collection_name,
            )),
            config.max_facet_values,
        ))
    }

    /// The enriched catalog, computed once per cache tag.
    pub async fn catalog(&self) -> Result<Arc<FieldCatalog>> {
        self.catalog_cache
            .get_or(CATALOG_TAG, || {
                enrich_catalog(self.catalog_source.as_ref(), self.max_facet_values)
            })
            .await
    }

    /// Forget the cached catalog; the next search enriches again.
    pub fn invalidate_catalog(&self) -> bool {
        self.catalog_cache.invalidate(CATALOG_TAG)
    }

    /// Translate `raw_query` and fetch the first page of matches.
    pub async fn search_cars(&self, raw_query: &str) -> Result<SearchOutcome> {
        let raw_query = raw_query.trim();
        if raw_query.is_empty() {
            return Err(CarSearchError::Validation("query must not be empty".into()));
        }

        let started = Instant::now();
        let catalog = self.catalog().await?;
        let generated_query = self.translator.translate(raw_query, &catalog).await?;

        let params = search_request(&generated_query);
        let page = self.search_page(&params, 1).await?;

        info!(
            raw_query,
            found = page.found,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Search finished"
        );

        Ok(SearchOutcome {
            generated_query,
            params,
            page,
        })
    }

    /// Run already-generated parameters against the index.
    pub async fn search_page(&self, params: &SearchRequest, page: u32) -> Result<SearchPage> {
        self.index
            .search(params, page.max(1))
            .await
            .map_err(|e| CarSearchError::Search(format!("{e:#}")))
    }
}

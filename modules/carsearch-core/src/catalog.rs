//! Field catalog enrichment: the collection schema merged with facet values
//! and per-field descriptions from collection metadata.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use carsearch_common::{CarSearchError, EnumValues, FieldCatalog, FieldDescriptor};
use tracing::{debug, info};
use typesense_client::{CollectionResponse, SearchParams, SearchResponse, TypesenseClient};

/// Where the catalog comes from. Implemented over Typesense in production
/// and by in-memory fakes in tests.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Field names, types, facet and sort flags and descriptions, in schema
    /// order.
    async fn schema(&self) -> Result<Vec<FieldDescriptor>>;

    /// Up to `limit` distinct values for each of `fields`, most frequent first.
    async fn facet_values(
        &self,
        fields: &[String],
        limit: u32,
    ) -> Result<HashMap<String, Vec<String>>>;
}

/// Build the enriched catalog: one schema read, then one facet query for the
/// facet fields it names.
///
/// `max_facet_values + 1` values are requested so fields with more than
/// `max_facet_values` distinct values can be marked `has_more`; at most
/// `max_facet_values` are kept.
pub async fn enrich_catalog(
    source: &dyn CatalogSource,
    max_facet_values: u32,
) -> std::result::Result<FieldCatalog, CarSearchError> {
    let started = std::time::Instant::now();

    let mut fields = source.schema().await.map_err(search_error)?;
    let facet_names: Vec<String> = fields
        .iter()
        .filter(|f| f.facet)
        .map(|f| f.name.clone())
        .collect();

    let mut facets = if facet_names.is_empty() {
        HashMap::new()
    } else {
        source
            .facet_values(&facet_names, max_facet_values.saturating_add(1))
            .await
            .map_err(search_error)?
    };

    let limit = max_facet_values as usize;
    for field in fields.iter_mut().filter(|f| f.facet) {
        if let Some(mut values) = facets.remove(&field.name) {
            let has_more = values.len() > limit;
            values.truncate(limit);
            field.enum_values = Some(EnumValues { values, has_more });
        }
    }

    info!(
        fields = fields.len(),
        facet_fields = facet_names.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Field catalog enriched"
    );

    Ok(FieldCatalog::new(fields))
}

fn search_error(e: anyhow::Error) -> CarSearchError {
    CarSearchError::Search(format!("catalog enrichment failed: {e:#}"))
}

/// Descriptors for the fields of a collection, with descriptions taken from
/// string-valued collection metadata. Wildcard fields are skipped.
pub fn descriptors_from_collection(collection: &CollectionResponse) -> Vec<FieldDescriptor> {
    collection
        .fields
        .iter()
        .filter(|f| !f.name.contains('*'))
        .map(|f| {
            let mut descriptor = FieldDescriptor::new(&f.name, &f.field_type);
            if f.facet {
                descriptor = descriptor.facet();
            }
            if let Some(sort) = f.sort {
                descriptor = descriptor.sortable(sort);
            }
            if let Some(description) = collection.metadata_str(&f.name) {
                descriptor = descriptor.describe(description);
            }
            descriptor
        })
        .collect()
}

// =============================================================================
// Typesense
// =============================================================================

pub struct TypesenseCatalogSource {
    client: TypesenseClient,
    collection: String,
}

impl TypesenseCatalogSource {
    pub fn new(client: TypesenseClient, collection: impl Into<String>) -> Self {
        Self {
            client,
            collection: collection.into(),
        }
    }
}

#[async_trait]
impl CatalogSource for TypesenseCatalogSource {
    async fn schema(&self) -> Result<Vec<FieldDescriptor>> {
        let collection = self.client.retrieve_collection(&self.collection).await?;
        Ok(descriptors_from_collection(&collection))
    }

    async fn facet_values(
        &self,
        fields: &[String],
        limit: u32,
    ) -> Result<HashMap<String, Vec<String>>> {
        let params = SearchParams {
            q: "*".to_string(),
            facet_by: Some(fields.join(",")),
            max_facet_values: Some(limit),
            per_page: Some(0),
            ..Default::default()
        };
        let response: SearchResponse<serde_json::Value> =
            self.client.search(&self.collection, &params).await?;

        debug!(
            collection = %self.collection,
            facets = response.facet_counts.len(),
            "Fetched facet values"
        );

        Ok(response
            .facet_counts
            .into_iter()
            .map(|fc| {
                let values = fc.counts.into_iter().map(|c| c.value).collect();
                (fc.field_name, values)
            })
            .collect())
    }
}

//! The car collection: schema, field descriptions and (re)indexing.

use anyhow::{bail, Context, Result};
use serde_json::{Map, Value};
use tracing::{info, warn};
use typesense_client::{CollectionSchema, Field, ImportAction, TypesenseClient};

/// Fixed schema of the car dataset.
pub fn car_collection_schema(name: &str) -> CollectionSchema {
    CollectionSchema {
        name: name.to_string(),
        fields: vec![
            Field::new("make", "string").facet(),
            Field::new("model", "string").facet(),
            Field::new("year", "int32"),
            Field::new("engine_fuel_type", "string").facet(),
            Field::new("engine_hp", "float"),
            Field::new("engine_cylinders", "int32"),
            Field::new("transmission_type", "string").facet(),
            Field::new("driven_wheels", "string").facet(),
            Field::new("number_of_doors", "int32"),
            Field::new("market_category", "string[]").facet(),
            Field::new("vehicle_size", "string").facet(),
            Field::new("vehicle_style", "string").facet(),
            Field::new("highway_mpg", "int32"),
            Field::new("city_mpg", "int32"),
            Field::new("popularity", "int32"),
            Field::new("msrp", "int32"),
        ],
        default_sorting_field: None,
        metadata: None,
    }
}

/// Field descriptions stored in collection metadata when none are given.
pub fn default_field_descriptions() -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("msrp".to_string(), Value::String("in USD".to_string()));
    map
}

/// Parse `name=description` pairs into a metadata map.
pub fn parse_field_descriptions(pairs: &[String]) -> Result<Map<String, Value>> {
    let mut map = Map::new();
    for pair in pairs {
        let (name, description) = pair
            .split_once('=')
            .with_context(|| format!("expected name=description, got `{pair}`"))?;
        let name = name.trim();
        if name.is_empty() {
            bail!("empty field name in `{pair}`");
        }
        map.insert(name.to_string(), Value::String(description.trim().to_string()));
    }
    Ok(map)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexOutcome {
    /// The collection already existed and reindexing was not forced.
    Skipped,
    Indexed { imported: usize, failed: usize },
}

/// Create the collection and import `jsonl` into it.
///
/// An existing collection is left alone unless `force` is set, in which case
/// it is dropped and recreated.
pub async fn index_dataset(
    client: &TypesenseClient,
    collection: &str,
    jsonl: String,
    force: bool,
) -> Result<IndexOutcome> {
    match client.retrieve_collection(collection).await {
        Ok(existing) => {
            info!(collection, documents = existing.num_documents, "Found existing collection");
            if !force {
                info!("Reindexing not forced, nothing to do");
                return Ok(IndexOutcome::Skipped);
            }
            info!(collection, "Deleting collection");
            client.delete_collection(collection).await?;
        }
        Err(e) if e.is_not_found() => {}
        Err(e) => return Err(e).context("failed to look up collection"),
    }

    info!(collection, "Creating schema");
    client
        .create_collection(&car_collection_schema(collection))
        .await
        .context("failed to create collection")?;

    info!(collection, bytes = jsonl.len(), "Importing documents");
    let results = client
        .import_jsonl(collection, jsonl, ImportAction::Create)
        .await
        .context("import request failed")?;

    let mut failed = 0;
    for (line, result) in results.iter().enumerate() {
        if !result.success {
            failed += 1;
            warn!(
                line = line + 1,
                error = result.error.as_deref().unwrap_or("unknown"),
                "Document rejected"
            );
        }
    }

    let imported = results.len() - failed;
    info!(collection, imported, failed, "Import finished");
    Ok(IndexOutcome::Indexed { imported, failed })
}

/// Replace the field descriptions of an existing collection.
pub async fn update_field_descriptions(
    client: &TypesenseClient,
    collection: &str,
    descriptions: Map<String, Value>,
) -> Result<()> {
    client
        .retrieve_collection(collection)
        .await
        .with_context(|| format!("could not find collection `{collection}`"))?;

    info!(collection, fields = descriptions.len(), "Updating collection metadata");
    client
        .update_collection_metadata(collection, descriptions)
        .await
        .context("failed to update collection metadata")?;
    Ok(())
}

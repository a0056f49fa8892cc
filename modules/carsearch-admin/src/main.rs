//! Collection maintenance for the car search index.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use carsearch_common::AppConfig;
use carsearch_core::catalog::TypesenseCatalogSource;
use carsearch_core::dataset::{self, IndexOutcome};
use carsearch_core::enrich_catalog;
use carsearch_core::prompt::render_catalog_table;
use typesense_client::TypesenseClient;

#[derive(Parser)]
#[command(name = "carsearch-admin")]
#[command(about = "Car search index maintenance")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the car collection and import a JSONL dataset
    Index {
        /// Path to the JSONL dataset
        #[arg(long, default_value = "./data/cars.jsonl")]
        dataset: PathBuf,

        /// Drop and recreate an existing collection (or set FORCE_REINDEX=true)
        #[arg(long)]
        force: bool,
    },

    /// Replace the per-field descriptions stored in collection metadata
    UpdateMetadata {
        /// Field description as name=description; repeatable. Defaults to msrp=in USD
        #[arg(long = "field")]
        fields: Vec<String>,
    },

    /// Print the field catalog table shown to the model
    ShowCatalog,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::from_env()?;
    config.log_redacted();

    match cli.command {
        Commands::Index { dataset, force } => {
            cmd_index(&config, &dataset, force || config.force_reindex).await
        }
        Commands::UpdateMetadata { fields } => cmd_update_metadata(&config, &fields).await,
        Commands::ShowCatalog => cmd_show_catalog(&config).await,
    }
}

fn admin_client(config: &AppConfig) -> Result<TypesenseClient> {
    Ok(TypesenseClient::with_timeout(
        &config.typesense_url,
        config.admin_api_key()?,
        Duration::from_secs(config.typesense_timeout_secs),
    )?)
}

async fn cmd_index(config: &AppConfig, path: &Path, force: bool) -> Result<()> {
    let jsonl = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read dataset {}", path.display()))?;

    let client = admin_client(config)?;
    match dataset::index_dataset(&client, &config.collection_name, jsonl, force).await? {
        IndexOutcome::Skipped => {
            println!(
                "Collection `{}` already exists; pass --force to reindex",
                config.collection_name
            );
        }
        IndexOutcome::Indexed { imported, failed } => {
            println!("Imported {imported} documents ({failed} failed)");
        }
    }
    Ok(())
}

async fn cmd_update_metadata(config: &AppConfig, fields: &[String]) -> Result<()> {
    let descriptions = if fields.is_empty() {
        dataset::default_field_descriptions()
    } else {
        dataset::parse_field_descriptions(fields)?
    };

    let client = admin_client(config)?;
    dataset::update_field_descriptions(&client, &config.collection_name, descriptions).await?;
    println!("Updated metadata of `{}`", config.collection_name);
    Ok(())
}

async fn cmd_show_catalog(config: &AppConfig) -> Result<()> {
    let client = TypesenseClient::with_timeout(
        &config.typesense_url,
        &config.typesense_search_api_key,
        Duration::from_secs(config.typesense_timeout_secs),
    )?;
    let source = TypesenseCatalogSource::new(client, &config.collection_name);
    let catalog = enrich_catalog(&source, config.max_facet_values).await?;
    println!("{}", render_catalog_table(&catalog));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn update_metadata_collects_repeated_fields() {
        let cli = Cli::parse_from([
            "carsearch-admin",
            "update-metadata",
            "--field",
            "msrp=in USD",
            "--field",
            "engine_hp=horsepower",
        ]);
        match cli.command {
            Commands::UpdateMetadata { fields } => assert_eq!(fields.len(), 2),
            _ => panic!("expected update-metadata"),
        }
    }

    #[test]
    fn index_defaults() {
        let cli = Cli::parse_from(["carsearch-admin", "index"]);
        match cli.command {
            Commands::Index { dataset, force } => {
                assert_eq!(dataset, PathBuf::from("./data/cars.jsonl"));
                assert!(!force);
            }
            _ => panic!("expected index"),
        }
    }
}

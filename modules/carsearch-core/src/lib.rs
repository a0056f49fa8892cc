pub mod cache;
pub mod catalog;
pub mod dataset;
pub mod deps;
pub mod grammar;
pub mod llm;
pub mod prompt;
pub mod search;
pub mod translator;

pub use cache::{CatalogCache, CATALOG_TAG};
pub use catalog::{enrich_catalog, CatalogSource, TypesenseCatalogSource};
pub use deps::{SearchDeps, SearchOutcome};
pub use llm::OpenAiCompletionService;
pub use prompt::{build_prompt, Prompt};
pub use search::{SearchIndex, TypesenseSearchIndex};
pub use translator::{CompletionService, QueryTranslator};

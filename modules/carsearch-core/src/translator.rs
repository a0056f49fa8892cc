//! Natural-language query translation.

use std::sync::Arc;

use ai_client::{strip_code_blocks, StructuredOutput};
use anyhow::Result as AnyResult;
use async_trait::async_trait;
use carsearch_common::{CarSearchError, FieldCatalog, Result, StructuredQuery};
use tracing::{debug, info, warn};

use crate::grammar::{parse_filter, parse_sort};
use crate::prompt::{build_prompt, Prompt};

/// Dyn-compatible schema-constrained completion.
///
/// `Ok(None)` means the model produced no output.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(
        &self,
        prompt: &Prompt,
        schema_name: &str,
        schema: serde_json::Value,
    ) -> AnyResult<Option<String>>;
}

/// Turns free text into a validated [`StructuredQuery`]. One completion
/// call per translation; no retries, no caching.
#[derive(Clone)]
pub struct QueryTranslator {
    completion: Arc<dyn CompletionService>,
}

impl QueryTranslator {
    pub fn new(completion: Arc<dyn CompletionService>) -> Self {
        Self { completion }
    }

    pub async fn translate(
        &self,
        raw_query: &str,
        catalog: &FieldCatalog,
    ) -> Result<StructuredQuery> {
        let prompt = build_prompt(catalog, raw_query);
        debug!(system = %prompt.system, "Translation prompt");

        let output = self
            .completion
            .complete(
                &prompt,
                &StructuredQuery::schema_name(),
                StructuredQuery::response_schema(),
            )
            .await
            .map_err(|e| CarSearchError::Generation(format!("completion failed: {e:#}")))?
            .ok_or_else(|| CarSearchError::Generation("model returned no output".into()))?;

        let query = parse_structured_query(&output, catalog).inspect_err(|e| {
            warn!(raw_query, output = %output, error = %e, "Rejected model output");
        })?;

        info!(
            raw_query,
            query = ?query.query,
            filter_by = ?query.filter_by,
            sort_by = ?query.sort_by,
            "Generated structured query"
        );

        Ok(query)
    }
}

/// Parse and validate raw model output against the catalog.
///
/// Blank properties count as absent. `filter_by` and `sort_by` are re-parsed
/// under the grammar, checked against the catalog and returned in canonical
/// form, with same-field `||` chains folded into `field:[a,b]`.
pub fn parse_structured_query(output: &str, catalog: &FieldCatalog) -> Result<StructuredQuery> {
    let json = strip_code_blocks(output);
    let raw: StructuredQuery = serde_json::from_str(json).map_err(|e| {
        CarSearchError::Generation(format!("output does not match the query schema: {e}"))
    })?;

    let query = non_blank(raw.query);

    let filter_by = match non_blank(raw.filter_by) {
        Some(expr) => {
            let parsed = parse_filter(&expr).map_err(|e| invalid("filter_by", &expr, e))?;
            parsed
                .validate(catalog)
                .map_err(|e| invalid("filter_by", &expr, e))?;
            if parsed.has_same_field_disjunction() {
                debug!(filter_by = %expr, "Folding same-field disjunction");
            }
            Some(parsed.normalize().to_string())
        }
        None => None,
    };

    let sort_by = match non_blank(raw.sort_by) {
        Some(expr) => {
            let parsed = parse_sort(&expr).map_err(|e| invalid("sort_by", &expr, e))?;
            parsed
                .validate(catalog)
                .map_err(|e| invalid("sort_by", &expr, e))?;
            Some(parsed.to_string())
        }
        None => None,
    };

    Ok(StructuredQuery {
        query,
        filter_by,
        sort_by,
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn invalid(property: &str, expr: &str, err: crate::grammar::GrammarError) -> CarSearchError {
    CarSearchError::Generation(format!("invalid {property} `{expr}`: {err}"))
}

mod client;
pub(crate) mod schema;
pub(crate) mod types;

pub use schema::StructuredOutput;

use crate::error::Result;
use crate::util::strip_code_blocks;
use client::OpenAiClient;
use types::{default_temperature, StructuredRequest};

pub const OPENAI_API_URL: &str = "https://api.openai.com/v1";

/// Gemini's OpenAI-compatible surface.
pub const GEMINI_OPENAI_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

// =============================================================================
// OpenAi Agent
// =============================================================================

/// Chat-completions agent for any OpenAI-compatible endpoint.
#[derive(Clone)]
pub struct OpenAi {
    api_key: String,
    model: String,
    base_url: String,
    temperature: Option<f32>,
    http: reqwest::Client,
}

impl OpenAi {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let model = model.into();
        Self {
            api_key: api_key.into(),
            temperature: default_temperature(&model),
            model,
            base_url: OPENAI_API_URL.to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Get the model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn client(&self) -> OpenAiClient {
        OpenAiClient::new(&self.api_key, &self.base_url, self.http.clone())
    }

    /// Schema-constrained completion returning the raw JSON text.
    ///
    /// `Ok(None)` means the model answered with no content.
    pub async fn structured_output(
        &self,
        system: &str,
        user: &str,
        schema_name: &str,
        schema: serde_json::Value,
    ) -> Result<Option<String>> {
        let request = StructuredRequest::new(&self.model, system, user, schema_name, schema)
            .temperature(self.temperature);

        let content = self.client().structured_output(&request).await?;

        Ok(content
            .map(|raw| strip_code_blocks(&raw).to_string())
            .filter(|s| !s.is_empty()))
    }
}

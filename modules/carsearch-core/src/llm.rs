use std::sync::Arc;

use ai_client::OpenAi;
use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use crate::prompt::Prompt;
use crate::translator::CompletionService;

/// [`CompletionService`] backed by an OpenAI-compatible chat endpoint
/// (OpenAI itself, or Gemini through its compatibility layer).
pub struct OpenAiCompletionService {
    ai: Arc<OpenAi>,
}

impl OpenAiCompletionService {
    pub fn new(ai: Arc<OpenAi>) -> Self {
        Self { ai }
    }
}

#[async_trait]
impl CompletionService for OpenAiCompletionService {
    async fn complete(
        &self,
        prompt: &Prompt,
        schema_name: &str,
        schema: serde_json::Value,
    ) -> Result<Option<String>> {
        debug!(
            model = %self.ai.model(),
            endpoint = %self.ai.base_url(),
            schema = schema_name,
            "Requesting structured completion"
        );
        Ok(self
            .ai
            .structured_output(&prompt.system, &prompt.user, schema_name, schema)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translator::QueryTranslator;
    use carsearch_common::{CarSearchError, FieldCatalog, FieldDescriptor};
    use mockito::Matcher;
    use serde_json::json;

    fn chat_body(content: serde_json::Value) -> String {
        json!({
            "choices": [{"message": {"role": "assistant", "content": content}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 900, "completion_tokens": 20}
        })
        .to_string()
    }

    fn translator(url: &str) -> QueryTranslator {
        let ai = OpenAi::new("test-key", "gemini-1.5-flash").with_base_url(url);
        QueryTranslator::new(Arc::new(OpenAiCompletionService::new(Arc::new(ai))))
    }

    fn catalog() -> FieldCatalog {
        FieldCatalog::new(vec![
            FieldDescriptor::new("year", "int32"),
            FieldDescriptor::new("make", "string").facet(),
        ])
    }

    #[tokio::test]
    async fn sends_schema_constrained_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer test-key")
            .match_body(Matcher::PartialJson(json!({
                "model": "gemini-1.5-flash",
                "response_format": {
                    "type": "json_schema",
                    "json_schema": {"name": "structured_query", "strict": true}
                }
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(chat_body(json!(
                "{\"filter_by\":\"make:Ford\",\"sort_by\":\"year:desc\"}"
            )))
            .create_async()
            .await;

        let query = translator(&server.url())
            .translate("newest Ford", &catalog())
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(query.filter_by.as_deref(), Some("make:Ford"));
        assert_eq!(query.sort_by.as_deref(), Some("year:desc"));
    }

    #[tokio::test]
    async fn null_content_is_a_generation_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(chat_body(serde_json::Value::Null))
            .create_async()
            .await;

        let err = translator(&server.url())
            .translate("newest Ford", &catalog())
            .await
            .unwrap_err();
        assert!(matches!(err, CarSearchError::Generation(_)));
    }

    #[tokio::test]
    async fn upstream_error_is_a_generation_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(503)
            .with_body("overloaded")
            .create_async()
            .await;

        let err = translator(&server.url())
            .translate("newest Ford", &catalog())
            .await
            .unwrap_err();
        assert!(matches!(err, CarSearchError::Generation(ref m) if m.contains("503")));
    }
}

use std::str::FromStr;

use tracing::info;

use crate::error::{CarSearchError, Result};

pub const DEFAULT_TYPESENSE_URL: &str = "http://localhost:8108";
pub const DEFAULT_COLLECTION: &str = "cars";
pub const DEFAULT_MAX_FACET_VALUES: u32 = 20;
pub const DEFAULT_LLM_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";
pub const DEFAULT_LLM_MODEL: &str = "gemini-1.5-flash";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    // Typesense
    pub typesense_url: String,
    pub typesense_search_api_key: String,
    pub typesense_admin_api_key: Option<String>,
    pub collection_name: String,
    pub max_facet_values: u32,
    pub typesense_timeout_secs: u64,

    // Completion service
    pub llm_api_key: Option<String>,
    pub llm_base_url: String,
    pub llm_model: String,

    // Web server
    pub web_host: String,
    pub web_port: u16,
    pub allowed_origins: Vec<String>,

    // Indexing
    pub force_reindex: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        Ok(Self {
            typesense_url: or("TYPESENSE_URL", DEFAULT_TYPESENSE_URL),
            typesense_search_api_key: or("TYPESENSE_SEARCH_API_KEY", "xyz"),
            typesense_admin_api_key: get("TYPESENSE_ADMIN_API_KEY"),
            collection_name: or("TYPESENSE_COLLECTION_NAME", DEFAULT_COLLECTION),
            max_facet_values: parse(
                "TYPESENSE_MAX_FACET_VALUES",
                &or("TYPESENSE_MAX_FACET_VALUES", "20"),
                "a non-negative integer",
            )?,
            typesense_timeout_secs: parse(
                "TYPESENSE_TIMEOUT_SECS",
                &or("TYPESENSE_TIMEOUT_SECS", "3600"),
                "a number of seconds",
            )?,
            llm_api_key: get("LLM_API_KEY"),
            llm_base_url: or("LLM_BASE_URL", DEFAULT_LLM_BASE_URL),
            llm_model: or("LLM_MODEL", DEFAULT_LLM_MODEL),
            web_host: or("WEB_HOST", "0.0.0.0"),
            web_port: parse("WEB_PORT", &or("WEB_PORT", "3000"), "a port number")?,
            allowed_origins: get("ALLOWED_ORIGINS")
                .unwrap_or_default()
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
            force_reindex: get("FORCE_REINDEX")
                .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
                .unwrap_or(false),
        })
    }

    pub fn llm_api_key(&self) -> Result<&str> {
        self.llm_api_key
            .as_deref()
            .ok_or_else(|| missing("LLM_API_KEY"))
    }

    pub fn admin_api_key(&self) -> Result<&str> {
        self.typesense_admin_api_key
            .as_deref()
            .ok_or_else(|| missing("TYPESENSE_ADMIN_API_KEY"))
    }

    /// Log the effective configuration with secrets elided.
    pub fn log_redacted(&self) {
        info!(
            typesense_url = %self.typesense_url,
            collection = %self.collection_name,
            max_facet_values = self.max_facet_values,
            admin_key_set = self.typesense_admin_api_key.is_some(),
            llm_base_url = %self.llm_base_url,
            llm_model = %self.llm_model,
            llm_key_set = self.llm_api_key.is_some(),
            web = %format!("{}:{}", self.web_host, self.web_port),
            allowed_origins = ?self.allowed_origins,
            "Loaded config"
        );
    }
}

fn parse<T: FromStr>(key: &str, raw: &str, expected: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| CarSearchError::Config(format!("{key} must be {expected}, got `{raw}`")))
}

fn missing(key: &str) -> CarSearchError {
    CarSearchError::Config(format!("{key} environment variable is required"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config(&[]).unwrap();
        assert_eq!(config.typesense_url, DEFAULT_TYPESENSE_URL);
        assert_eq!(config.collection_name, "cars");
        assert_eq!(config.max_facet_values, 20);
        assert_eq!(config.llm_model, DEFAULT_LLM_MODEL);
        assert_eq!(config.web_port, 3000);
        assert!(config.allowed_origins.is_empty());
        assert!(!config.force_reindex);
        assert!(config.llm_api_key().is_err());
    }

    #[test]
    fn overrides_are_read() {
        let config = config(&[
            ("TYPESENSE_COLLECTION_NAME", "cars_v2"),
            ("TYPESENSE_MAX_FACET_VALUES", "5"),
            ("LLM_API_KEY", "secret"),
            ("ALLOWED_ORIGINS", "http://a.test, http://b.test,"),
            ("FORCE_REINDEX", "true"),
        ])
        .unwrap();
        assert_eq!(config.collection_name, "cars_v2");
        assert_eq!(config.max_facet_values, 5);
        assert_eq!(config.llm_api_key().unwrap(), "secret");
        assert_eq!(config.allowed_origins, vec!["http://a.test", "http://b.test"]);
        assert!(config.force_reindex);
    }

    #[test]
    fn blank_values_count_as_unset() {
        let config = config(&[("LLM_API_KEY", "  "), ("WEB_PORT", "")]).unwrap();
        assert!(config.llm_api_key.is_none());
        assert_eq!(config.web_port, 3000);
    }

    #[test]
    fn bad_numbers_are_config_errors() {
        let err = config(&[("WEB_PORT", "eighty")]).unwrap_err();
        assert!(matches!(err, CarSearchError::Config(_)), "{err:?}");
        assert!(err.to_string().contains("WEB_PORT"));
        assert!(matches!(
            config(&[("TYPESENSE_MAX_FACET_VALUES", "-1")]),
            Err(CarSearchError::Config(_))
        ));
    }

    #[test]
    fn missing_keys_are_config_errors() {
        let config = config(&[]).unwrap();
        assert_eq!(config.llm_api_key().unwrap_err().kind(), "config");
        assert_eq!(config.admin_api_key().unwrap_err().kind(), "config");
    }
}

//! Configuration types for table indexing.
//!
//! Every collaborator endpoint and tuning knob lives in [`IndexConfig`],
//! built via its [`IndexConfigBuilder`]. The page concurrency ceiling is
//! not a field: it is the fixed constant
//! [`crate::pipeline::fanout::PAGE_CONCURRENCY`].

use crate::error::TableSearchError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::sync::Arc;

/// Configuration for building a table index.
///
/// Built via [`IndexConfig::builder()`] or using [`IndexConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_tables::IndexConfig;
///
/// let config = IndexConfig::builder()
///     .table_detector_endpoint("https://tables.example.net/extract")
///     .embedding_endpoint("https://api.openai.com/v1/embeddings")
///     .embedding_model("text-embedding-3-small")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct IndexConfig {
    /// URL of the table-detection service. Required when the default
    /// collaborators are used.
    pub table_detector_endpoint: Option<String>,

    /// Value sent in the `x-api-key` header to the table detector.
    pub table_detector_api_key: Option<String>,

    /// URL of an OpenAI-compatible `/embeddings` endpoint.
    pub embedding_endpoint: Option<String>,

    /// Embedding model name sent with every embedding request.
    pub embedding_model: String,

    /// Bearer token for the embedding endpoint.
    pub embedding_api_key: Option<String>,

    /// LLM model identifier used to describe tables.
    /// If None, uses provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If None along with `provider`, uses `ProviderFactory::from_env()`.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for table descriptions. Default: 0.0.
    pub temperature: f32,

    /// Maximum tokens the LLM may generate per page of descriptions. Default: 2048.
    pub max_tokens: usize,

    /// Custom describer prompt. If None, uses the built-in default.
    pub describer_prompt: Option<String>,

    /// Timeout for each table-detection and embedding request, in seconds. Default: 60.
    pub request_timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Per-page progress events. Default: None.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            table_detector_endpoint: None,
            table_detector_api_key: None,
            embedding_endpoint: None,
            embedding_model: "text-embedding-3-small".to_string(),
            embedding_api_key: None,
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.0,
            max_tokens: 2048,
            describer_prompt: None,
            request_timeout_secs: 60,
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for IndexConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexConfig")
            .field("table_detector_endpoint", &self.table_detector_endpoint)
            .field(
                "table_detector_api_key",
                &self.table_detector_api_key.as_ref().map(|_| "<redacted>"),
            )
            .field("embedding_endpoint", &self.embedding_endpoint)
            .field("embedding_model", &self.embedding_model)
            .field(
                "embedding_api_key",
                &self.embedding_api_key.as_ref().map(|_| "<redacted>"),
            )
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .finish()
    }
}

impl IndexConfig {
    /// Create a new builder for `IndexConfig`.
    pub fn builder() -> IndexConfigBuilder {
        IndexConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`IndexConfig`].
#[derive(Debug)]
pub struct IndexConfigBuilder {
    config: IndexConfig,
}

impl IndexConfigBuilder {
    pub fn table_detector_endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.table_detector_endpoint = Some(url.into());
        self
    }

    pub fn table_detector_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.table_detector_api_key = Some(key.into());
        self
    }

    pub fn embedding_endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.embedding_endpoint = Some(url.into());
        self
    }

    pub fn embedding_model(mut self, model: impl Into<String>) -> Self {
        self.config.embedding_model = model.into();
        self
    }

    pub fn embedding_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.embedding_api_key = Some(key.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn describer_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.describer_prompt = Some(prompt.into());
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.config.progress_callback = Some(callback);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<IndexConfig, TableSearchError> {
        let c = &self.config;
        for (name, url) in [
            ("table detector", &c.table_detector_endpoint),
            ("embedding", &c.embedding_endpoint),
        ] {
            if let Some(url) = url {
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    return Err(TableSearchError::InvalidConfig(format!(
                        "{} endpoint must be an HTTP/HTTPS URL, got '{}'",
                        name, url
                    )));
                }
            }
        }
        if c.embedding_model.trim().is_empty() {
            return Err(TableSearchError::InvalidConfig(
                "Embedding model must not be empty".into(),
            ));
        }
        if c.request_timeout_secs == 0 {
            return Err(TableSearchError::InvalidConfig(
                "Request timeout must be ≥ 1 second".into(),
            ));
        }
        if c.max_tokens == 0 {
            return Err(TableSearchError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_build() {
        let config = IndexConfig::builder().build().expect("defaults are valid");
        assert_eq!(config.request_timeout_secs, 60);
        assert_eq!(config.max_tokens, 2048);
        assert_eq!(config.temperature, 0.0);
    }

    #[test]
    fn rejects_non_http_endpoint() {
        let err = IndexConfig::builder()
            .table_detector_endpoint("ftp://tables")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("table detector"), "got: {err}");
    }

    #[test]
    fn rejects_zero_timeout() {
        assert!(IndexConfig::builder()
            .request_timeout_secs(0)
            .build()
            .is_err());
    }

    #[test]
    fn temperature_is_clamped() {
        let config = IndexConfig::builder().temperature(9.0).build().unwrap();
        assert_eq!(config.temperature, 2.0);
    }

    #[test]
    fn debug_redacts_keys() {
        let config = IndexConfig::builder()
            .table_detector_api_key("secret-detector-key")
            .embedding_api_key("secret-embedding-key")
            .build()
            .unwrap();
        let printed = format!("{config:?}");
        assert!(!printed.contains("secret-detector-key"));
        assert!(!printed.contains("secret-embedding-key"));
    }
}

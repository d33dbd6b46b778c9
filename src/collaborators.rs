//! External collaborators: the four services a page pipeline calls out to.
//!
//! Each collaborator is a `Send + Sync` trait object so pages can run on
//! any worker thread. Every call is a suspension point; nothing else in a
//! page pipeline awaits.
//!
//! | Trait | Default implementation | Backend |
//! |-------|------------------------|---------|
//! | [`LayoutAnalyzer`] | [`PdfiumLayoutAnalyzer`] | pdfium text segments |
//! | [`TableDetector`]  | [`HttpTableDetector`]    | table-extraction HTTP API |
//! | [`TableDescriber`] | [`LlmTableDescriber`]    | any `edgequake-llm` provider |
//! | [`Embedder`]       | [`HttpEmbedder`]         | OpenAI-compatible `/embeddings` |

use crate::config::IndexConfig;
use crate::error::{CollaboratorError, TableSearchError};
use crate::model::{PageLayout, TableRegion};
use crate::pipeline::describe::{LlmTableDescriber, TableDescription};
use crate::pipeline::detect::HttpTableDetector;
use crate::pipeline::index::HttpEmbedder;
use crate::pipeline::layout::PdfiumLayoutAnalyzer;
use async_trait::async_trait;
use edgequake_llm::{LLMProvider, ProviderFactory};
use std::sync::Arc;

/// Structured-text analysis of a one-page PDF.
#[async_trait]
pub trait LayoutAnalyzer: Send + Sync {
    /// Blocks in reading order, in text space (top-left origin).
    async fn analyze(&self, page_pdf: &[u8]) -> Result<PageLayout, CollaboratorError>;
}

/// Table-region detection on a one-page PDF.
#[async_trait]
pub trait TableDetector: Send + Sync {
    /// Regions in table space (bottom-left origin), in detection order.
    async fn detect(&self, page_pdf: &[u8]) -> Result<Vec<TableRegion>, CollaboratorError>;
}

/// Title/description generation for the tables in a page's markup.
#[async_trait]
pub trait TableDescriber: Send + Sync {
    /// Zero or more rows; rows may lack a table id and are filtered later.
    async fn describe(&self, page_markup: &str)
        -> Result<Vec<TableDescription>, CollaboratorError>;
}

/// Text embedding generation.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, CollaboratorError>;
}

/// The full set of collaborators one indexing run uses.
#[derive(Clone)]
pub struct Collaborators {
    pub layout: Arc<dyn LayoutAnalyzer>,
    pub detector: Arc<dyn TableDetector>,
    pub describer: Arc<dyn TableDescriber>,
    pub embedder: Arc<dyn Embedder>,
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

impl Collaborators {
    pub fn new(
        layout: Arc<dyn LayoutAnalyzer>,
        detector: Arc<dyn TableDetector>,
        describer: Arc<dyn TableDescriber>,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        Self {
            layout,
            detector,
            describer,
            embedder,
        }
    }

    /// Build the default collaborators from `config`.
    ///
    /// # Errors
    /// - [`TableSearchError::InvalidConfig`] when an endpoint is missing
    /// - [`TableSearchError::ProviderNotConfigured`] when no LLM provider
    ///   can be resolved
    /// - [`TableSearchError::PdfiumBindingFailed`] when pdfium is unavailable
    pub async fn from_config(config: &IndexConfig) -> Result<Self, TableSearchError> {
        let layout = PdfiumLayoutAnalyzer::new().await?;
        let detector = HttpTableDetector::from_config(config)?;
        let embedder = HttpEmbedder::from_config(config)?;
        let provider = resolve_provider(config)?;
        let describer = LlmTableDescriber::new(provider, config);

        Ok(Self::new(
            Arc::new(layout),
            Arc::new(detector),
            Arc::new(describer),
            Arc::new(embedder),
        ))
    }
}

/// Instantiate a named provider with the given model.
fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, TableSearchError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        TableSearchError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the describer's LLM provider, from most-specific to least-specific:
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider + model** (`config.provider_name`).
/// 3. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`).
/// 4. **Full auto-detection** (`ProviderFactory::from_env`), preferring
///    OpenAI when `OPENAI_API_KEY` is set.
pub fn resolve_provider(config: &IndexConfig) -> Result<Arc<dyn LLMProvider>, TableSearchError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or("gpt-4.1-nano");
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config.model.as_deref().unwrap_or("gpt-4.1-nano");
            return create_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| TableSearchError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

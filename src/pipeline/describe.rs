//! Table description: ask an LLM for a title and description of every
//! tagged table on a page, then pair each row with its table markup.
//!
//! LLM output is unreliable. Rows without a table id are discarded, rows
//! naming a table that is not in the markup are discarded, and code fences
//! around the JSON are tolerated. None of this is ever fatal.

use crate::collaborators::TableDescriber;
use crate::config::IndexConfig;
use crate::error::CollaboratorError;
use crate::pipeline::markup;
use crate::prompts::{describer_user_message, DEFAULT_DESCRIBER_PROMPT};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

const SERVICE: &str = "table describer";

static RE_CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^\s*```[a-zA-Z]*\s*\n(.*?)\n?\s*```\s*$").unwrap());

/// One row returned by a [`TableDescriber`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDescription {
    #[serde(default)]
    pub table_id: Option<String>,
    #[serde(default)]
    pub table_title: Option<String>,
    #[serde(default)]
    pub table_description: Option<String>,
}

impl TableDescription {
    pub fn new(
        table_id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            table_id: Some(table_id.into()),
            table_title: Some(title.into()),
            table_description: Some(description.into()),
        }
    }

    /// The table id, if present and not blank.
    pub fn id(&self) -> Option<&str> {
        self.table_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

/// A described table, ready to embed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescribedTable {
    pub table_id: String,
    /// `title\ndescription\n<table …>` with the id attribute stripped.
    pub content: String,
    /// The table alone, id attribute stripped.
    pub table: String,
}

/// Pair describer rows with the tables in `page_markup`.
///
/// Output follows row order. Rows are dropped when their id is missing or
/// blank, or when no table in the markup carries that id.
pub fn describe_tables(page_markup: &str, rows: Vec<TableDescription>) -> Vec<DescribedTable> {
    let mut described = Vec::with_capacity(rows.len());

    for row in rows {
        let Some(id) = row.id() else {
            debug!("Discarding description row without a table id");
            continue;
        };
        let Some(table_html) = markup::find_table_by_id(page_markup, id) else {
            debug!("Discarding description for unknown table '{}'", id);
            continue;
        };

        let table = markup::strip_table_id(&table_html);
        let content = format!(
            "{}\n{}\n{}",
            row.table_title.as_deref().unwrap_or_default(),
            row.table_description.as_deref().unwrap_or_default(),
            table
        );
        described.push(DescribedTable {
            table_id: id.to_string(),
            content,
            table,
        });
    }

    described
}

/// Parse describer output: a JSON array of rows, optionally fenced, or an
/// object wrapping the array under `tables`.
pub fn parse_descriptions(raw: &str) -> Result<Vec<TableDescription>, CollaboratorError> {
    let body = match RE_CODE_FENCE.captures(raw) {
        Some(caps) => caps.get(1).map_or("", |m| m.as_str()),
        None => raw,
    }
    .trim();

    if body.is_empty() {
        return Ok(Vec::new());
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Payload {
        Rows(Vec<TableDescription>),
        Wrapped { tables: Vec<TableDescription> },
    }

    match serde_json::from_str::<Payload>(body) {
        Ok(Payload::Rows(rows)) | Ok(Payload::Wrapped { tables: rows }) => Ok(rows),
        Err(e) => Err(CollaboratorError::InvalidResponse {
            service: SERVICE,
            detail: format!("describer output is not a JSON row list: {}", e),
        }),
    }
}

/// [`TableDescriber`] backed by any `edgequake-llm` chat provider.
pub struct LlmTableDescriber {
    provider: Arc<dyn LLMProvider>,
    system_prompt: String,
    options: CompletionOptions,
}

impl LlmTableDescriber {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &IndexConfig) -> Self {
        Self {
            provider,
            system_prompt: config
                .describer_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_DESCRIBER_PROMPT.to_string()),
            options: build_options(config),
        }
    }
}

#[async_trait]
impl TableDescriber for LlmTableDescriber {
    async fn describe(
        &self,
        page_markup: &str,
    ) -> Result<Vec<TableDescription>, CollaboratorError> {
        let messages = vec![
            ChatMessage::system(&self.system_prompt),
            ChatMessage::user(describer_user_message(page_markup)),
        ];

        let response = self
            .provider
            .chat(&messages, Some(&self.options))
            .await
            .map_err(|e| CollaboratorError::Request {
                service: SERVICE,
                detail: e.to_string(),
            })?;

        debug!(
            "Describer: {} input tokens, {} output tokens",
            response.prompt_tokens, response.completion_tokens
        );
        parse_descriptions(&response.content)
    }
}

fn build_options(config: &IndexConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

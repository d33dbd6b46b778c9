//! Indexing: embed each described table and record it against its page.
//!
//! The default [`Embedder`] speaks the OpenAI-compatible `/embeddings`
//! protocol, which most hosted and local embedding servers accept.

use crate::collaborators::Embedder;
use crate::config::IndexConfig;
use crate::error::{CollaboratorError, TableSearchError};
use crate::output::IndexEntry;
use crate::pipeline::describe::DescribedTable;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const SERVICE: &str = "embeddings";

/// Embed every described table of one page, in order.
///
/// The first embedding failure aborts the page; entries already embedded
/// for it are discarded by the caller along with the error.
pub async fn index_tables(
    page_number: usize,
    tables: Vec<DescribedTable>,
    embedder: &dyn Embedder,
) -> Result<Vec<IndexEntry>, CollaboratorError> {
    let mut entries = Vec::with_capacity(tables.len());
    for table in tables {
        let embedding = embedder.embed(&table.content).await?;
        entries.push(IndexEntry {
            page_number,
            table_id: table.table_id,
            content: table.content,
            table: table.table,
            embedding,
        });
    }
    Ok(entries)
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Extract the first embedding from an `/embeddings` response body.
pub fn parse_embedding_response(body: &str) -> Result<Vec<f32>, CollaboratorError> {
    let parsed: EmbeddingResponse =
        serde_json::from_str(body).map_err(|e| CollaboratorError::InvalidResponse {
            service: SERVICE,
            detail: e.to_string(),
        })?;
    parsed
        .data
        .into_iter()
        .next()
        .map(|d| d.embedding)
        .filter(|v| !v.is_empty())
        .ok_or(CollaboratorError::InvalidResponse {
            service: SERVICE,
            detail: "response carries no embedding".to_string(),
        })
}

/// [`Embedder`] calling an OpenAI-compatible embeddings endpoint.
#[derive(Debug, Clone)]
pub struct HttpEmbedder {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl HttpEmbedder {
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
        timeout_secs: u64,
    ) -> Result<Self, TableSearchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| TableSearchError::Internal(format!("HTTP client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            model: model.into(),
            api_key,
        })
    }

    pub fn from_config(config: &IndexConfig) -> Result<Self, TableSearchError> {
        let endpoint = config.embedding_endpoint.clone().ok_or_else(|| {
            TableSearchError::InvalidConfig(
                "embedding endpoint is not set (EMBEDDING_ENDPOINT)".into(),
            )
        })?;
        Self::new(
            endpoint,
            config.embedding_model.clone(),
            config.embedding_api_key.clone(),
            config.request_timeout_secs,
        )
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, CollaboratorError> {
        let body = EmbeddingRequest {
            model: &self.model,
            input: text,
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| CollaboratorError::Request {
            service: SERVICE,
            detail: e.to_string(),
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| CollaboratorError::Request {
            service: SERVICE,
            detail: e.to_string(),
        })?;

        if !status.is_success() {
            return Err(CollaboratorError::Status {
                service: SERVICE,
                status: status.as_u16(),
                body: text,
            });
        }

        parse_embedding_response(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct LengthEmbedder {
        fail_on_call: Option<usize>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Embedder for LengthEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, CollaboratorError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_on_call == Some(call) {
                return Err(CollaboratorError::Status {
                    service: SERVICE,
                    status: 503,
                    body: "busy".into(),
                });
            }
            Ok(vec![text.len() as f32, 1.0])
        }
    }

    fn described(id: &str, content: &str) -> DescribedTable {
        DescribedTable {
            table_id: id.to_string(),
            content: content.to_string(),
            table: "<table></table>".to_string(),
        }
    }

    #[tokio::test]
    async fn entries_carry_page_and_order() {
        let embedder = LengthEmbedder {
            fail_on_call: None,
            calls: AtomicUsize::new(0),
        };
        let entries = index_tables(
            3,
            vec![described("table1", "abc"), described("table2", "abcdef")],
            &embedder,
        )
        .await
        .unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.page_number == 3));
        assert_eq!(entries[0].embedding, vec![3.0, 1.0]);
        assert_eq!(entries[1].table_id, "table2");
    }

    #[tokio::test]
    async fn embedding_failure_aborts() {
        let embedder = LengthEmbedder {
            fail_on_call: Some(1),
            calls: AtomicUsize::new(0),
        };
        let result = index_tables(
            1,
            vec![described("table1", "a"), described("table2", "b")],
            &embedder,
        )
        .await;
        assert!(matches!(result, Err(CollaboratorError::Status { status: 503, .. })));
    }

    #[test]
    fn parses_openai_style_response() {
        let body = r#"{"object":"list","data":[{"object":"embedding","index":0,"embedding":[0.5,-1.25]}],"model":"m"}"#;
        assert_eq!(parse_embedding_response(body).unwrap(), vec![0.5, -1.25]);
    }

    #[test]
    fn empty_data_is_invalid() {
        assert!(parse_embedding_response(r#"{"data":[]}"#).is_err());
    }
}

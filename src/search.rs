//! Top-level entry points: build a table index for a document and search it.
//!
//! All entry points take the whole document in memory. Only document-level
//! problems are fatal (the document does not decode, embedding lengths
//! disagree, configuration is incomplete); a page that fails anywhere in its
//! pipeline just contributes no tables.

use crate::collaborators::{Collaborators, Embedder};
use crate::config::IndexConfig;
use crate::error::TableSearchError;
use crate::output::{IndexStats, PageMarkupResult, SearchResult, TableIndex};
use crate::pipeline::{debug_svg, fanout, input, retrieve, split};
use std::time::Instant;
use tracing::info;

/// Split `document`, run every page through the pipeline and collect the
/// resulting entries in page order.
///
/// # Errors
/// Returns [`TableSearchError::Decode`] when the document cannot be parsed.
/// Page failures are recorded in [`TableIndex::pages`], never returned.
pub async fn build_index(
    document: Vec<u8>,
    collaborators: &Collaborators,
    config: &IndexConfig,
) -> Result<TableIndex, TableSearchError> {
    let total_start = Instant::now();

    // ── Step 1: Split ────────────────────────────────────────────────────
    let split_start = Instant::now();
    let units = split::split_document(document).await?;
    let split_duration_ms = split_start.elapsed().as_millis() as u64;
    let total_pages = units.len();

    if let Some(ref cb) = config.progress_callback {
        cb.on_index_start(total_pages);
    }

    // ── Step 2: Fan out ──────────────────────────────────────────────────
    let pages = fanout::index_pages(units, collaborators, config.progress_callback.as_ref()).await;

    // ── Step 3: Aggregate ────────────────────────────────────────────────
    let entries: Vec<_> = pages.iter().flat_map(|p| p.entries.iter().cloned()).collect();
    let succeeded = pages.iter().filter(|p| p.is_success()).count();

    let stats = IndexStats {
        total_pages,
        succeeded_pages: succeeded,
        failed_pages: total_pages - succeeded,
        tables_indexed: entries.len(),
        split_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Indexed {} table(s) from {}/{} page(s) in {}ms",
        stats.tables_indexed, succeeded, total_pages, stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_index_complete(total_pages, succeeded);
    }

    Ok(TableIndex {
        entries,
        pages,
        stats,
    })
}

/// Index `document` and rank its tables against `reference`, nearest first.
///
/// # Example
/// ```rust,no_run
/// use edgequake_tables::{build_table_index_and_search, Collaborators, IndexConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = IndexConfig::builder()
///     .table_detector_endpoint("https://tables.example.net/extract")
///     .embedding_endpoint("https://api.openai.com/v1/embeddings")
///     .build()?;
/// let collaborators = Collaborators::from_config(&config).await?;
/// let document = std::fs::read("report.pdf")?;
/// let reference = vec![0.0_f32; 1536];
///
/// for hit in build_table_index_and_search(document, &reference, &collaborators, &config).await? {
///     println!("page {} at {:.3}", hit.page_number, hit.distance);
/// }
/// # Ok(())
/// # }
/// ```
pub async fn build_table_index_and_search(
    document: Vec<u8>,
    reference: &[f32],
    collaborators: &Collaborators,
    config: &IndexConfig,
) -> Result<Vec<SearchResult>, TableSearchError> {
    let index = build_index(document, collaborators, config).await?;
    retrieve::search(&index.entries, reference)
}

/// Synchronous wrapper around [`build_table_index_and_search`].
///
/// Creates a temporary tokio runtime internally.
pub fn build_table_index_and_search_sync(
    document: Vec<u8>,
    reference: &[f32],
    collaborators: &Collaborators,
    config: &IndexConfig,
) -> Result<Vec<SearchResult>, TableSearchError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| TableSearchError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(build_table_index_and_search(
            document,
            reference,
            collaborators,
            config,
        ))
}

/// Load a document from a path or URL and index it with the default
/// collaborators built from `config`.
pub async fn index_document(
    input_str: impl AsRef<str>,
    config: &IndexConfig,
) -> Result<TableIndex, TableSearchError> {
    let input_str = input_str.as_ref();
    info!("Indexing tables in: {}", input_str);
    let document = input::load_document(input_str, config.download_timeout_secs).await?;
    let collaborators = Collaborators::from_config(config).await?;
    build_index(document, &collaborators, config).await
}

/// Embed `query` and rank the index against it.
pub async fn search_text(
    index: &TableIndex,
    query: &str,
    embedder: &dyn Embedder,
) -> Result<Vec<SearchResult>, TableSearchError> {
    let reference = embedder.embed(query).await?;
    index.search(&reference)
}

/// Reconciled markup for every page, in page order.
///
/// Runs layout analysis, table detection and reconciliation only; nothing
/// is described or embedded.
pub async fn page_markup(
    document: Vec<u8>,
    collaborators: &Collaborators,
) -> Result<Vec<PageMarkupResult>, TableSearchError> {
    let units = split::split_document(document).await?;
    Ok(fanout::markup_pages(units, collaborators).await)
}

/// SVG overlay of page `page_number` (1-based).
///
/// Unlike the indexing path, a collaborator failure here is returned.
pub async fn page_debug_svg(
    document: Vec<u8>,
    page_number: usize,
    collaborators: &Collaborators,
) -> Result<String, TableSearchError> {
    let units = split::split_document(document).await?;
    let total = units.len();
    let unit = units
        .into_iter()
        .find(|u| u.page_number == page_number)
        .ok_or_else(|| TableSearchError::InvalidInput {
            input: format!("page {} (document has {} pages)", page_number, total),
        })?;

    let layout = collaborators.layout.analyze(&unit.bytes).await?;
    let tables = collaborators.detector.detect(&unit.bytes).await?;
    Ok(debug_svg::render_debug_svg(&layout, &tables))
}

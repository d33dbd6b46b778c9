//! # edgequake-tables
//!
//! Find the tables in a PDF and rank them by semantic distance to a
//! reference embedding.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input      resolve local file or download from URL
//!  ├─ 2. Split      one standalone PDF per page (lopdf)
//!  ├─ 3. Fan out    one task per page, at most 4 in flight
//!  │    ├─ Layout     text blocks via pdfium (spawn_blocking)
//!  │    ├─ Detect     table regions via the table-extraction service
//!  │    ├─ Reconcile  blocks + tables → page markup, tables tagged table{N}
//!  │    ├─ Describe   title + description per table (LLM)
//!  │    └─ Index      embed `title\ndescription\n<table>` per table
//!  └─ 4. Retrieve   Euclidean distance to the reference, ascending
//! ```
//!
//! A page that fails anywhere in step 3 contributes no tables and is logged;
//! it never fails the request. A document that does not decode, or
//! embeddings whose length differs from the reference, do.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_tables::{index_document, IndexConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Describer provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / …
//!     let config = IndexConfig::builder()
//!         .table_detector_endpoint("https://tables.example.net/extract")
//!         .embedding_endpoint("https://api.openai.com/v1/embeddings")
//!         .build()?;
//!     let index = index_document("report.pdf", &config).await?;
//!     let reference = index.entries.first().map(|e| e.embedding.clone()).unwrap_or_default();
//!     for hit in index.search(&reference)? {
//!         println!("page {}: {:.3}", hit.page_number, hit.distance);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2tables` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-tables = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod collaborators;
pub mod config;
pub mod error;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod search;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use collaborators::{Collaborators, Embedder, LayoutAnalyzer, TableDescriber, TableDetector};
pub use config::{IndexConfig, IndexConfigBuilder};
pub use error::{CollaboratorError, PageError, TableSearchError};
pub use model::{BoundingBox, PageDimensions, PageLayout, PageUnit, TableRegion, TextBlock, TextLine};
pub use output::{IndexEntry, IndexStats, PageMarkupResult, PageResult, SearchResult, TableIndex};
pub use pipeline::describe::TableDescription;
pub use pipeline::fanout::PAGE_CONCURRENCY;
pub use progress::{IndexProgressCallback, NoopProgressCallback, ProgressCallback};
pub use search::{
    build_index, build_table_index_and_search, build_table_index_and_search_sync, index_document,
    page_debug_svg, page_markup, search_text,
};

//! Result types produced by indexing and searching.

use crate::error::{PageError, TableSearchError};
use crate::pipeline::retrieve;
use serde::{Deserialize, Serialize};

/// One indexed table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// 1-based page the table was found on.
    pub page_number: usize,
    /// Identifier the table carried in the page markup, e.g. `table2`.
    pub table_id: String,
    /// `title\ndescription\n<table …>` with the identifier attribute removed.
    /// This is the text that was embedded.
    pub content: String,
    /// The table part of `content` on its own.
    pub table: String,
    pub embedding: Vec<f32>,
}

/// One ranked table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub page_number: usize,
    /// Euclidean distance to the reference vector.
    pub distance: f32,
    /// Table markup including its identifier attribute.
    pub table: String,
}

/// Outcome of one page's pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResult {
    /// 1-based page number.
    pub page_num: usize,
    /// Entries this page contributed; empty on failure or when the page
    /// has no tables.
    pub entries: Vec<IndexEntry>,
    pub duration_ms: u64,
    /// Why the page contributed nothing, if it failed.
    pub error: Option<PageError>,
}

impl PageResult {
    pub fn success(page_num: usize, entries: Vec<IndexEntry>, duration_ms: u64) -> Self {
        Self {
            page_num,
            entries,
            duration_ms,
            error: None,
        }
    }

    pub fn failure(error: PageError, duration_ms: u64) -> Self {
        Self {
            page_num: error.page(),
            entries: Vec::new(),
            duration_ms,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Reconciled markup for one page, as returned by [`crate::page_markup`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageMarkupResult {
    pub page_num: usize,
    /// Empty when `error` is set.
    pub markup: String,
    pub error: Option<PageError>,
}

/// Counters and timings for one indexing run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexStats {
    pub total_pages: usize,
    pub succeeded_pages: usize,
    pub failed_pages: usize,
    pub tables_indexed: usize,
    pub split_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// The in-memory table index for one document.
///
/// Lives for a single request; nothing is persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableIndex {
    /// All entries, grouped by page in page order.
    pub entries: Vec<IndexEntry>,
    /// Per-page outcomes in page order.
    pub pages: Vec<PageResult>,
    pub stats: IndexStats,
}

impl TableIndex {
    /// Rank every entry by distance to `reference`, nearest first.
    pub fn search(&self, reference: &[f32]) -> Result<Vec<SearchResult>, TableSearchError> {
        retrieve::search(&self.entries, reference)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

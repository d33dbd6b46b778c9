//! Progress-callback trait for per-page indexing events.
//!
//! Inject an [`Arc<dyn IndexProgressCallback>`] via
//! [`crate::config::IndexConfigBuilder::progress_callback`] to receive
//! events as the fan-out scheduler works through the pages.
//!
//! # Example
//!
//! ```rust
//! use edgequake_tables::{IndexConfig, IndexProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct TableCounter {
//!     tables: AtomicUsize,
//! }
//!
//! impl IndexProgressCallback for TableCounter {
//!     fn on_page_complete(&self, page_num: usize, total_pages: usize, tables: usize) {
//!         self.tables.fetch_add(tables, Ordering::SeqCst);
//!         eprintln!("page {page_num}/{total_pages}: {tables} tables");
//!     }
//! }
//!
//! let counter = Arc::new(TableCounter { tables: AtomicUsize::new(0) });
//! let config = IndexConfig::builder()
//!     .progress_callback(counter as Arc<dyn IndexProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the scheduler as it processes each page.
///
/// Up to four pages run at once, so `on_page_*` methods may be called
/// concurrently from different threads. All methods default to no-ops.
pub trait IndexProgressCallback: Send + Sync {
    /// Called once, after splitting, before any page is scheduled.
    fn on_index_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called when a page acquires a concurrency slot.
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called when a page finishes; `tables` is the number of entries it
    /// contributed (zero for table-free pages).
    fn on_page_complete(&self, page_num: usize, total_pages: usize, tables: usize) {
        let _ = (page_num, total_pages, tables);
    }

    /// Called when a page fails and contributes nothing.
    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let _ = (page_num, total_pages, error);
    }

    /// Called once after every page has been attempted.
    fn on_index_complete(&self, total_pages: usize, success_count: usize) {
        let _ = (total_pages, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl IndexProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::IndexConfig`].
pub type ProgressCallback = Arc<dyn IndexProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_callback_does_not_panic() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_index_start(3);
        cb.on_page_start(1, 3);
        cb.on_page_complete(1, 3, 2);
        cb.on_page_error(2, 3, "detector down");
        cb.on_index_complete(3, 2);
    }
}

//! Pipeline stages for table indexing.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ split ──▶ fanout ─┬─▶ page: layout + detect ──▶ reconcile ──▶ describe ──▶ index
//! (bytes)  (lopdf)   (≤ 4)    │         (pdfium)  (HTTP)      (markup)       (LLM)      (embed)
//!                             └─▶ … one task per page …
//!                                              │
//!                                   TableIndex ──▶ retrieve (Euclidean, ascending)
//! ```
//!
//! 1. [`input`]     — path or URL to document bytes, `%PDF` checked
//! 2. [`split`]     — one standalone single-page PDF per page
//! 3. [`fanout`]    — one task per page, at most [`fanout::PAGE_CONCURRENCY`]
//!    in flight, results in page order
//! 4. [`page`]      — the per-page pipeline; every failure becomes a
//!    `PageResult` with an error
//! 5. [`layout`] / [`detect`] — the two geometric analyses
//! 6. [`reconcile`] — merge blocks and tables into page markup
//! 7. [`describe`]  — title and description for each tagged table
//! 8. [`index`]     — embed each described table
//! 9. [`retrieve`]  — rank entries against a reference vector
//!
//! [`markup`] holds the HTML helpers shared by reconcile, describe and
//! retrieve; [`debug_svg`] draws a page's geometry for inspection.

pub mod debug_svg;
pub mod describe;
pub mod detect;
pub mod fanout;
pub mod index;
pub mod input;
pub mod layout;
pub mod markup;
pub mod page;
pub mod reconcile;
pub mod retrieve;
pub mod split;

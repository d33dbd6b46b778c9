//! Geometry reconciliation: merge text blocks and detected tables into one
//! linear markup document per page.
//!
//! ## Rules
//!
//! 1. Table boxes are converted to text space once, up front.
//! 2. Blocks are visited in layout order. A block belongs to a table when
//!    the block's centroid lies inside the table's box (edges inclusive).
//! 3. A block that belongs to one or more tables is replaced by those
//!    tables, each tagged `id="table{N}"` (N = 1-based detection order).
//!    A table is emitted only at its first owning block; the block's own
//!    text is dropped.
//! 4. Any other block becomes a `<div>` of `<p>` lines, blank lines skipped.
//!
//! Tables that own no block never appear in the output.

use std::collections::HashSet;

use crate::model::{BoundingBox, PageLayout, TableRegion};
use crate::pipeline::markup;
use tracing::debug;

/// One unit of reconciled page output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    /// A detected table with its identifier injected.
    Table { id: String, html: String },
    /// The non-blank lines of one text block.
    Paragraphs(String),
}

impl Fragment {
    pub fn as_markup(&self) -> &str {
        match self {
            Fragment::Table { html, .. } => html,
            Fragment::Paragraphs(html) => html,
        }
    }
}

/// Ordered fragments of one page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMarkup {
    pub fragments: Vec<Fragment>,
}

impl PageMarkup {
    /// Fragments joined with newlines.
    pub fn to_html(&self) -> String {
        self.fragments
            .iter()
            .map(Fragment::as_markup)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Identifiers of the tables that made it into the markup, in order.
    pub fn table_ids(&self) -> Vec<&str> {
        self.fragments
            .iter()
            .filter_map(|f| match f {
                Fragment::Table { id, .. } => Some(id.as_str()),
                Fragment::Paragraphs(_) => None,
            })
            .collect()
    }

    pub fn has_tables(&self) -> bool {
        self.fragments
            .iter()
            .any(|f| matches!(f, Fragment::Table { .. }))
    }
}

/// Reconcile one page's layout with its detected tables.
///
/// Pure and deterministic: the same inputs always give the same markup.
/// The emitted-table set lives on this call's stack, so concurrent pages
/// never share it.
pub fn reconcile(layout: &PageLayout, tables: &[TableRegion]) -> PageMarkup {
    let table_boxes: Vec<BoundingBox> = tables
        .iter()
        .map(|t| layout.page.table_to_text_space(&t.bbox))
        .collect();

    let mut emitted: HashSet<usize> = HashSet::new();
    let mut fragments = Vec::new();

    for block in &layout.blocks {
        let owners: Vec<usize> = table_boxes
            .iter()
            .enumerate()
            .filter(|(_, table_box)| block.bbox.centroid_within(table_box))
            .map(|(idx, _)| idx)
            .collect();

        if !owners.is_empty() {
            for idx in owners {
                if emitted.insert(idx) {
                    let id = markup::table_id(idx);
                    let html = markup::inject_table_id(&tables[idx].html, &id);
                    fragments.push(Fragment::Table { id, html });
                }
            }
            continue;
        }

        if let Some(paragraphs) = markup::paragraph_group(&block.lines) {
            fragments.push(Fragment::Paragraphs(paragraphs));
        }
    }

    let orphaned = tables.len() - emitted.len();
    if orphaned > 0 {
        debug!("{} detected table(s) own no text block and were dropped", orphaned);
    }

    PageMarkup { fragments }
}

//! Per-page pipeline: layout + detection → reconcile → describe → index.
//!
//! Every failure is caught at this boundary and returned as a
//! [`PageResult`] carrying a [`PageError`]; nothing a single page does can
//! fail the run.

use crate::collaborators::Collaborators;
use crate::error::PageError;
use crate::model::PageUnit;
use crate::output::{IndexEntry, PageMarkupResult, PageResult};
use crate::pipeline::describe::describe_tables;
use crate::pipeline::index::index_tables;
use crate::pipeline::markup;
use crate::pipeline::reconcile::{reconcile, PageMarkup};
use std::time::Instant;
use tracing::{debug, warn};

/// Analyse and detect in parallel, then reconcile.
async fn reconcile_unit(
    unit: &PageUnit,
    collaborators: &Collaborators,
) -> Result<PageMarkup, PageError> {
    let page = unit.page_number;
    let (layout, tables) = tokio::join!(
        collaborators.layout.analyze(&unit.bytes),
        collaborators.detector.detect(&unit.bytes),
    );

    let layout = layout.map_err(|e| PageError::Layout {
        page,
        detail: e.to_string(),
    })?;
    let tables = tables.map_err(|e| PageError::TableDetection {
        page,
        detail: e.to_string(),
    })?;

    debug!(
        "Page {}: {} block(s), {} detected table(s)",
        page,
        layout.blocks.len(),
        tables.len()
    );
    Ok(reconcile(&layout, &tables))
}

async fn index_unit(
    unit: &PageUnit,
    collaborators: &Collaborators,
) -> Result<Vec<IndexEntry>, PageError> {
    let page = unit.page_number;
    let html = reconcile_unit(unit, collaborators).await?.to_html();

    if markup::count_tables(&html) == 0 {
        debug!("Page {}: no tables, skipping description", page);
        return Ok(Vec::new());
    }

    let rows = collaborators
        .describer
        .describe(&html)
        .await
        .map_err(|e| PageError::Description {
            page,
            detail: e.to_string(),
        })?;
    let described = describe_tables(&html, rows);

    index_tables(page, described, collaborators.embedder.as_ref())
        .await
        .map_err(|e| PageError::Embedding {
            page,
            detail: e.to_string(),
        })
}

/// Run the full pipeline for one page.
pub async fn process_page(unit: PageUnit, collaborators: &Collaborators) -> PageResult {
    let start = Instant::now();
    let page = unit.page_number;

    match index_unit(&unit, collaborators).await {
        Ok(entries) => {
            let duration_ms = start.elapsed().as_millis() as u64;
            debug!("Page {}: {} table(s) indexed in {}ms", page, entries.len(), duration_ms);
            PageResult::success(page, entries, duration_ms)
        }
        Err(e) => {
            warn!("{}", e);
            PageResult::failure(e, start.elapsed().as_millis() as u64)
        }
    }
}

/// Run only the reconciliation half of the pipeline for one page.
pub async fn markup_page(unit: PageUnit, collaborators: &Collaborators) -> PageMarkupResult {
    let page_num = unit.page_number;
    match reconcile_unit(&unit, collaborators).await {
        Ok(markup) => PageMarkupResult {
            page_num,
            markup: markup.to_html(),
            error: None,
        },
        Err(e) => {
            warn!("{}", e);
            PageMarkupResult {
                page_num,
                markup: String::new(),
                error: Some(e),
            }
        }
    }
}

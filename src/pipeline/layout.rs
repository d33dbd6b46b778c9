//! Layout analysis: text blocks in reading order via pdfium.
//!
//! pdfium reports text as segments (runs of identically styled characters)
//! with bottom-left-origin bounds. Segments are flipped into text space,
//! merged into lines when they share a baseline, and lines are stacked into
//! blocks when they sit close together and overlap horizontally.
//!
//! pdfium is not async-safe, so all of this runs in `spawn_blocking`.

use crate::collaborators::LayoutAnalyzer;
use crate::error::{CollaboratorError, TableSearchError};
use crate::model::{BoundingBox, PageDimensions, PageLayout, TextBlock, TextLine};
use async_trait::async_trait;
use pdfium_render::prelude::*;
use tracing::debug;

const SERVICE: &str = "layout";

/// Two segments are on the same line when their vertical centres differ by
/// at most this fraction of the shorter segment's height.
const SAME_LINE_TOLERANCE: f32 = 0.5;

/// A line joins the current block when the gap above it is at most this
/// multiple of its own height.
const BLOCK_GAP_FACTOR: f32 = 1.0;

/// Bind to pdfium: `PDFIUM_LIB_PATH` first, then the working directory,
/// then the system library path.
pub(crate) fn bind_pdfium() -> Result<Pdfium, String> {
    let bindings = match std::env::var("PDFIUM_LIB_PATH") {
        Ok(path) if !path.is_empty() => Pdfium::bind_to_library(&path),
        _ => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| format!("{:?}", e))?;
    Ok(Pdfium::new(bindings))
}

/// [`LayoutAnalyzer`] backed by pdfium's text extraction.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfiumLayoutAnalyzer;

impl PdfiumLayoutAnalyzer {
    /// Verify pdfium can be bound before any page is scheduled.
    pub async fn new() -> Result<Self, TableSearchError> {
        tokio::task::spawn_blocking(|| bind_pdfium().map(|_| ()))
            .await
            .map_err(|e| TableSearchError::Internal(format!("pdfium bind task panicked: {}", e)))?
            .map_err(TableSearchError::PdfiumBindingFailed)?;
        Ok(Self)
    }
}

#[async_trait]
impl LayoutAnalyzer for PdfiumLayoutAnalyzer {
    async fn analyze(&self, page_pdf: &[u8]) -> Result<PageLayout, CollaboratorError> {
        let bytes = page_pdf.to_vec();
        tokio::task::spawn_blocking(move || analyze_blocking(&bytes))
            .await
            .map_err(|e| CollaboratorError::Local {
                service: SERVICE,
                detail: format!("layout task panicked: {}", e),
            })?
    }
}

fn analyze_blocking(page_pdf: &[u8]) -> Result<PageLayout, CollaboratorError> {
    let local = |detail: String| CollaboratorError::Local {
        service: SERVICE,
        detail,
    };

    let pdfium = bind_pdfium().map_err(local)?;
    let document = pdfium
        .load_pdf_from_byte_slice(page_pdf, None)
        .map_err(|e| local(format!("{:?}", e)))?;
    let page = document
        .pages()
        .get(0)
        .map_err(|e| local(format!("{:?}", e)))?;

    let page_dims = PageDimensions::new(page.width().value, page.height().value);
    let text = page.text().map_err(|e| local(format!("{:?}", e)))?;

    let mut segments = Vec::new();
    for segment in text.segments().iter() {
        let content = segment.text();
        let content = content.trim();
        if content.is_empty() {
            continue;
        }
        let bounds = segment.bounds();
        segments.push((
            content.to_string(),
            BoundingBox::from_corners(
                bounds.left().value,
                page_dims.h - bounds.top().value,
                bounds.right().value,
                page_dims.h - bounds.bottom().value,
            ),
        ));
    }

    let blocks = group_blocks(group_lines(segments));
    debug!("Layout: {} blocks on a {}x{} page", blocks.len(), page_dims.w, page_dims.h);

    Ok(PageLayout {
        page: page_dims,
        blocks,
    })
}

/// Merge consecutive segments that share a baseline.
fn group_lines(segments: Vec<(String, BoundingBox)>) -> Vec<(String, BoundingBox)> {
    let mut lines: Vec<(String, BoundingBox)> = Vec::new();

    for (text, bbox) in segments {
        if let Some((line_text, line_box)) = lines.last_mut() {
            let (_, cy_line) = line_box.centroid();
            let (_, cy_seg) = bbox.centroid();
            let tolerance = line_box.h.min(bbox.h) * SAME_LINE_TOLERANCE;
            if (cy_line - cy_seg).abs() <= tolerance && bbox.x >= line_box.x {
                line_text.push(' ');
                line_text.push_str(&text);
                *line_box = line_box.union(&bbox);
                continue;
            }
        }
        lines.push((text, bbox));
    }

    lines
}

/// Stack consecutive lines into blocks.
fn group_blocks(lines: Vec<(String, BoundingBox)>) -> Vec<TextBlock> {
    let mut blocks: Vec<TextBlock> = Vec::new();

    for (text, bbox) in lines {
        if let Some(block) = blocks.last_mut() {
            let gap = bbox.y - block.bbox.bottom();
            let overlaps = bbox.x <= block.bbox.right() && bbox.right() >= block.bbox.x;
            if gap >= -bbox.h && gap <= bbox.h * BLOCK_GAP_FACTOR && overlaps {
                block.bbox = block.bbox.union(&bbox);
                block.lines.push(TextLine::new(text));
                continue;
            }
        }
        blocks.push(TextBlock::new(bbox, vec![TextLine::new(text)]));
    }

    blocks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(text: &str, x: f32, y: f32, w: f32, h: f32) -> (String, BoundingBox) {
        (text.to_string(), BoundingBox::new(x, y, w, h))
    }

    #[test]
    fn segments_on_one_baseline_form_a_line() {
        let lines = group_lines(vec![
            seg("Total", 10.0, 100.0, 30.0, 12.0),
            seg("revenue", 45.0, 101.0, 50.0, 12.0),
            seg("Next line", 10.0, 120.0, 60.0, 12.0),
        ]);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].0, "Total revenue");
        assert_eq!(lines[0].1, BoundingBox::new(10.0, 100.0, 85.0, 13.0));
    }

    #[test]
    fn close_lines_stack_into_one_block() {
        let blocks = group_blocks(vec![
            seg("first", 10.0, 100.0, 100.0, 12.0),
            seg("second", 10.0, 114.0, 80.0, 12.0),
            seg("far below", 10.0, 300.0, 80.0, 12.0),
        ]);
        assert_eq!(blocks.len(), 2);
        assert_eq!(
            blocks[0].lines,
            vec![TextLine::new("first"), TextLine::new("second")]
        );
        assert_eq!(blocks[0].bbox, BoundingBox::new(10.0, 100.0, 100.0, 26.0));
    }

    #[test]
    fn side_by_side_columns_are_separate_blocks() {
        let blocks = group_blocks(vec![
            seg("left", 10.0, 100.0, 100.0, 12.0),
            seg("right", 300.0, 114.0, 100.0, 12.0),
        ]);
        assert_eq!(blocks.len(), 2);
    }

    #[test]
    fn no_segments_no_blocks() {
        assert!(group_blocks(group_lines(Vec::new())).is_empty());
    }
}

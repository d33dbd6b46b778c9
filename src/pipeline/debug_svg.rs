//! SVG overlay of one page's geometry, for eyeballing reconciliation.
//!
//! Text blocks are outlined in black, confident tables in red. Table boxes
//! go through [`PageDimensions::table_to_text_space`], the same conversion
//! the reconciler uses.
//!
//! [`PageDimensions::table_to_text_space`]: crate::model::PageDimensions::table_to_text_space

use crate::model::{BoundingBox, PageLayout, TableRegion};

/// Tables below this detector accuracy are left out of the overlay.
pub const MIN_DRAWN_ACCURACY: f32 = 90.0;

fn rect(bbox: &BoundingBox, stroke: &str) -> String {
    format!(
        "<rect width=\"{}\" height=\"{}\" x=\"{}\" y=\"{}\" stroke=\"{}\" fill=\"none\"/>",
        bbox.w, bbox.h, bbox.x, bbox.y, stroke
    )
}

/// Render the page's blocks and tables as a standalone SVG document.
pub fn render_debug_svg(layout: &PageLayout, tables: &[TableRegion]) -> String {
    let blocks = layout.blocks.iter().map(|block| rect(&block.bbox, "black"));
    let tables = tables
        .iter()
        .filter(|t| t.accuracy >= MIN_DRAWN_ACCURACY)
        .map(|t| rect(&layout.page.table_to_text_space(&t.bbox), "red"));
    let rects: Vec<String> = blocks.chain(tables).collect();

    format!(
        "<svg width=\"{}\" height=\"{}\" xmlns=\"http://www.w3.org/2000/svg\">\n{}\n</svg>",
        layout.page.w,
        layout.page.h,
        rects.join("\n")
    )
}

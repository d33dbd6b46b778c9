//! Geometry and per-page analysis types.
//!
//! Two coordinate conventions meet in this crate:
//!
//! * **text space** — origin at the top-left corner of the page, `y` grows
//!   downward. Layout analysis reports text blocks in this space.
//! * **table space** — origin at the bottom-left corner, `y` grows upward.
//!   The table detector reports regions in this space.
//!
//! [`PageDimensions::table_to_text_space`] is the only place that converts
//! between them; the reconciler and the SVG debug view both go through it.

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle: `x`/`y` is the corner nearest the origin.
///
/// Width and height are never negative; constructors clamp them to zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl BoundingBox {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self {
            x,
            y,
            w: w.max(0.0),
            h: h.max(0.0),
        }
    }

    /// Build a box from two opposite corners, `(x0, y0)` and `(x1, y1)`.
    pub fn from_corners(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self::new(x0.min(x1), y0.min(y1), (x1 - x0).abs(), (y1 - y0).abs())
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    /// Smallest box covering both `self` and `other`.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        Self::from_corners(
            self.x.min(other.x),
            self.y.min(other.y),
            self.right().max(other.right()),
            self.bottom().max(other.bottom()),
        )
    }

    pub fn centroid(&self) -> (f32, f32) {
        (self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    /// Point-in-box test, inclusive on all four edges.
    pub fn contains_point(&self, px: f32, py: f32) -> bool {
        px >= self.x && px <= self.x + self.w && py >= self.y && py <= self.y + self.h
    }

    /// True when this box's centroid lies inside `other`.
    ///
    /// Asymmetric: a box that overlaps `other` but whose centre
    /// falls outside it does not count, and `a.centroid_within(b)` says
    /// nothing about `b.centroid_within(a)`.
    pub fn centroid_within(&self, other: &BoundingBox) -> bool {
        let (cx, cy) = self.centroid();
        other.contains_point(cx, cy)
    }
}

/// Size of a page in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageDimensions {
    pub w: f32,
    pub h: f32,
}

impl PageDimensions {
    pub fn new(w: f32, h: f32) -> Self {
        Self { w, h }
    }

    /// Convert a table-space box (bottom-left origin) into text space.
    ///
    /// `y_text = page.h - y_table - h_table`
    pub fn table_to_text_space(&self, bbox: &BoundingBox) -> BoundingBox {
        BoundingBox::new(bbox.x, self.h - bbox.y - bbox.h, bbox.w, bbox.h)
    }
}

/// One line of extracted text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextLine {
    #[serde(default)]
    pub text: String,
}

impl TextLine {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// A block of lines as grouped by layout analysis, in text space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    pub bbox: BoundingBox,
    #[serde(default)]
    pub lines: Vec<TextLine>,
}

impl TextBlock {
    pub fn new(bbox: BoundingBox, lines: Vec<TextLine>) -> Self {
        Self { bbox, lines }
    }
}

/// Structured text of one page: its size plus its blocks in reading order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageLayout {
    pub page: PageDimensions,
    #[serde(default)]
    pub blocks: Vec<TextBlock>,
}

/// A table found by the detector. `bbox` is in table space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRegion {
    pub bbox: BoundingBox,
    /// Detector confidence, 0–100.
    pub accuracy: f32,
    /// Rendered markup of the table, rooted at a `<table>` element.
    pub html: String,
}

impl TableRegion {
    pub fn new(bbox: BoundingBox, accuracy: f32, html: impl Into<String>) -> Self {
        Self {
            bbox,
            accuracy,
            html: html.into(),
        }
    }
}

/// A standalone single-page PDF cut from a larger document.
#[derive(Debug, Clone)]
pub struct PageUnit {
    /// 1-based position of the page in the source document.
    pub page_number: usize,
    /// Complete PDF file containing only this page.
    pub bytes: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_corners_normalises_order() {
        let b = BoundingBox::from_corners(50.0, 80.0, 10.0, 20.0);
        assert_eq!(b, BoundingBox::new(10.0, 20.0, 40.0, 60.0));
    }

    #[test]
    fn negative_extent_is_clamped() {
        let b = BoundingBox::new(0.0, 0.0, -5.0, -1.0);
        assert_eq!(b.w, 0.0);
        assert_eq!(b.h, 0.0);
    }

    #[test]
    fn contains_point_is_inclusive() {
        let b = BoundingBox::new(10.0, 10.0, 10.0, 10.0);
        assert!(b.contains_point(10.0, 10.0));
        assert!(b.contains_point(20.0, 20.0));
        assert!(!b.contains_point(20.01, 15.0));
    }

    #[test]
    fn table_space_conversion_flips_y() {
        let page = PageDimensions::new(600.0, 800.0);
        // 100pt tall table whose bottom edge is 50pt above the page bottom
        let table = BoundingBox::new(20.0, 50.0, 300.0, 100.0);
        let converted = page.table_to_text_space(&table);
        assert_eq!(converted, BoundingBox::new(20.0, 650.0, 300.0, 100.0));
    }

    #[test]
    fn centroid_within_is_asymmetric() {
        let big = BoundingBox::new(0.0, 0.0, 100.0, 100.0);
        let small = BoundingBox::new(90.0, 90.0, 40.0, 40.0);
        // small's centre (110, 110) is outside big, big's centre (50, 50)
        // is outside small, yet the boxes overlap
        assert!(!small.centroid_within(&big));
        assert!(!big.centroid_within(&small));

        let inner = BoundingBox::new(10.0, 10.0, 20.0, 20.0);
        assert!(inner.centroid_within(&big));
        assert!(!big.centroid_within(&inner));
    }

    #[test]
    fn layout_deserialises_structured_text_json() {
        let json = r#"{
            "page": {"w": 612, "h": 792},
            "blocks": [{"bbox": {"x": 1, "y": 2, "w": 3, "h": 4}, "lines": [{"text": "hi"}, {}]}]
        }"#;
        let layout: PageLayout = serde_json::from_str(json).expect("valid layout json");
        assert_eq!(layout.blocks.len(), 1);
        assert_eq!(layout.blocks[0].lines[0].text, "hi");
        assert!(layout.blocks[0].lines[1].is_blank());
    }
}

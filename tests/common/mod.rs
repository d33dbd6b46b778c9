//! Shared fixtures for integration tests: synthetic PDFs and scripted
//! collaborators that never touch the network.

#![allow(dead_code)]

use async_trait::async_trait;
use edgequake_tables::{
    BoundingBox, CollaboratorError, Collaborators, Embedder, LayoutAnalyzer, PageDimensions,
    PageLayout, TableDescriber, TableDescription, TableDetector, TableRegion, TextBlock, TextLine,
};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const PAGE_W: f32 = 600.0;
pub const PAGE_H: f32 = 800.0;

/// Route library logs to the test harness; `RUST_LOG` selects the level.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A PDF with one page per marker; each page shows its marker as text.
pub fn sample_pdf(markers: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for marker in markers {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![100.into(), 600.into()]),
                Operation::new("Tj", vec![Object::string_literal(*marker)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => Object::Integer(markers.len() as i64),
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

/// The marker a split page was built with.
pub fn page_marker(page_pdf: &[u8]) -> Option<String> {
    let doc = Document::load_mem(page_pdf).ok()?;
    let page_id = *doc.get_pages().values().next()?;
    let content = doc.get_page_content(page_id).ok()?;
    let text = String::from_utf8_lossy(&content);
    let start = text.find('(')? + 1;
    let end = start + text[start..].find(')')?;
    Some(text[start..end].to_string())
}

pub fn block(x: f32, y: f32, w: f32, h: f32, lines: &[&str]) -> TextBlock {
    TextBlock::new(
        BoundingBox::new(x, y, w, h),
        lines.iter().map(|l| TextLine::new(*l)).collect(),
    )
}

/// Table given in text-space coordinates, stored in table space.
pub fn table_at(x: f32, y: f32, w: f32, h: f32, html: &str) -> TableRegion {
    TableRegion::new(BoundingBox::new(x, PAGE_H - y - h, w, h), 95.0, html)
}

/// What the scripted layout analyzer and detector report for one page.
#[derive(Debug, Clone, Default)]
pub struct PageScript {
    pub blocks: Vec<TextBlock>,
    pub tables: Vec<TableRegion>,
    pub fail_layout: bool,
    pub fail_detection: bool,
    /// The detector panics instead of answering.
    pub panic_detection: bool,
}

impl PageScript {
    pub fn text_only(text: &str) -> Self {
        Self {
            blocks: vec![block(10.0, 10.0, 200.0, 20.0, &[text])],
            ..Default::default()
        }
    }

    /// An intro paragraph followed by one table that owns one block.
    pub fn with_table(cell: &str) -> Self {
        Self {
            blocks: vec![
                block(10.0, 10.0, 200.0, 20.0, &["Intro"]),
                block(60.0, 110.0, 50.0, 20.0, &[cell]),
            ],
            tables: vec![table_at(
                50.0,
                100.0,
                200.0,
                100.0,
                &format!("<table><tr><td>{cell}</td></tr></table>"),
            )],
            ..Default::default()
        }
    }
}

/// Layout analyzer and table detector answering from a per-marker script.
///
/// Detection calls are instrumented: the peak number of concurrent calls is
/// recorded, and each call can be held open for `detect_delay`.
#[derive(Default)]
pub struct ScriptedPages {
    pub pages: HashMap<String, PageScript>,
    pub detect_delay: Duration,
    in_flight: AtomicUsize,
    pub peak_in_flight: AtomicUsize,
    pub detect_calls: AtomicUsize,
}

impl ScriptedPages {
    pub fn new(pages: Vec<(&str, PageScript)>) -> Self {
        Self {
            pages: pages
                .into_iter()
                .map(|(marker, script)| (marker.to_string(), script))
                .collect(),
            ..Default::default()
        }
    }

    fn script(&self, page_pdf: &[u8]) -> Result<PageScript, CollaboratorError> {
        let marker = page_marker(page_pdf).ok_or(CollaboratorError::Local {
            service: "scripted",
            detail: "page has no marker".into(),
        })?;
        Ok(self.pages.get(&marker).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl LayoutAnalyzer for ScriptedPages {
    async fn analyze(&self, page_pdf: &[u8]) -> Result<PageLayout, CollaboratorError> {
        let script = self.script(page_pdf)?;
        if script.fail_layout {
            return Err(CollaboratorError::Local {
                service: "layout",
                detail: "scripted layout failure".into(),
            });
        }
        Ok(PageLayout {
            page: PageDimensions::new(PAGE_W, PAGE_H),
            blocks: script.blocks,
        })
    }
}

#[async_trait]
impl TableDetector for ScriptedPages {
    async fn detect(&self, page_pdf: &[u8]) -> Result<Vec<TableRegion>, CollaboratorError> {
        self.detect_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.detect_delay.is_zero() {
            tokio::time::sleep(self.detect_delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let script = self.script(page_pdf)?;
        if script.panic_detection {
            panic!("scripted detector panic");
        }
        if script.fail_detection {
            return Err(CollaboratorError::Status {
                service: "table detector",
                status: 500,
                body: "scripted detection failure".into(),
            });
        }
        Ok(script.tables)
    }
}

/// Describes every tagged table in the markup as "Table" / "Described",
/// optionally adding rows that carry no table id.
#[derive(Default)]
pub struct TaggingDescriber {
    pub calls: AtomicUsize,
    pub add_idless_row: bool,
}

#[async_trait]
impl TableDescriber for TaggingDescriber {
    async fn describe(
        &self,
        page_markup: &str,
    ) -> Result<Vec<TableDescription>, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let re = Regex::new(r#"id="(table\d+)""#).unwrap();
        let mut rows: Vec<TableDescription> = re
            .captures_iter(page_markup)
            .map(|c| TableDescription::new(&c[1], "Table", "Described"))
            .collect();
        if self.add_idless_row {
            rows.push(TableDescription {
                table_id: None,
                table_title: Some("Ghost".into()),
                table_description: Some("no id".into()),
            });
        }
        Ok(rows)
    }
}

/// Maps content keywords to fixed vectors; unknown content embeds to
/// `default`. Content containing a word in `failing` errors.
pub struct KeywordEmbedder {
    pub vectors: Vec<(&'static str, Vec<f32>)>,
    pub default: Vec<f32>,
    pub failing: HashSet<&'static str>,
    pub calls: AtomicUsize,
}

impl KeywordEmbedder {
    pub fn new(vectors: Vec<(&'static str, Vec<f32>)>) -> Self {
        Self {
            vectors,
            default: vec![0.0, 1.0],
            failing: HashSet::new(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.iter().any(|word| text.contains(word)) {
            return Err(CollaboratorError::Status {
                service: "embeddings",
                status: 429,
                body: "scripted embedding failure".into(),
            });
        }
        Ok(self
            .vectors
            .iter()
            .find(|(word, _)| text.contains(word))
            .map(|(_, v)| v.clone())
            .unwrap_or_else(|| self.default.clone()))
    }
}

pub fn collaborators(
    pages: &Arc<ScriptedPages>,
    describer: &Arc<TaggingDescriber>,
    embedder: &Arc<KeywordEmbedder>,
) -> Collaborators {
    Collaborators::new(
        Arc::clone(pages) as Arc<dyn LayoutAnalyzer>,
        Arc::clone(pages) as Arc<dyn TableDetector>,
        Arc::clone(describer) as Arc<dyn TableDescriber>,
        Arc::clone(embedder) as Arc<dyn Embedder>,
    )
}

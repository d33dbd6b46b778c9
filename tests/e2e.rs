//! End-to-end tests against live services.
//!
//! These need a pdfium library, a table-detection endpoint, an embedding
//! endpoint and an LLM provider key. They are gated behind `E2E_ENABLED` so
//! they do not run in CI unless explicitly requested.
//!
//! Run with:
//!   E2E_ENABLED=1 PDFIUM_LIB_PATH=./libpdfium.so \
//!   EXTRACT_TABLES_ENDPOINT=... EMBEDDING_ENDPOINT=... OPENAI_API_KEY=... \
//!   cargo test --test e2e -- --nocapture

mod common;

use common::{init_tracing, sample_pdf};
use edgequake_tables::pipeline::layout::PdfiumLayoutAnalyzer;
use edgequake_tables::pipeline::split::split_pages;
use edgequake_tables::{index_document, IndexConfig, LayoutAnalyzer};
use std::path::PathBuf;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn test_cases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases")
}

macro_rules! e2e_skip_unless_enabled {
    () => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
            return;
        }
    }};
}

fn live_config() -> Option<IndexConfig> {
    let detector = std::env::var("EXTRACT_TABLES_ENDPOINT").ok()?;
    let embeddings = std::env::var("EMBEDDING_ENDPOINT").ok()?;
    let mut builder = IndexConfig::builder()
        .table_detector_endpoint(detector)
        .embedding_endpoint(embeddings);
    if let Ok(key) = std::env::var("EXTRACT_TABLES_KEY") {
        builder = builder.table_detector_api_key(key);
    }
    if let Ok(key) = std::env::var("EMBEDDING_API_KEY").or_else(|_| std::env::var("OPENAI_API_KEY")) {
        builder = builder.embedding_api_key(key);
    }
    builder.build().ok()
}

// ── Layout analysis (pdfium only, no network) ────────────────────────────────

#[tokio::test]
async fn pdfium_reads_text_of_a_split_page() {
    e2e_skip_unless_enabled!();

    let units = split_pages(&sample_pdf(&["alpha marker", "bravo marker"])).unwrap();
    let analyzer = PdfiumLayoutAnalyzer::new().await.expect("pdfium must bind");
    let layout = analyzer.analyze(&units[1].bytes).await.unwrap();

    let text: Vec<&str> = layout
        .blocks
        .iter()
        .flat_map(|b| b.lines.iter().map(|l| l.text.as_str()))
        .collect();
    assert!(text.iter().any(|t| t.contains("bravo marker")), "got: {text:?}");
    assert!(!text.iter().any(|t| t.contains("alpha marker")), "got: {text:?}");
    assert!(layout.page.h > 800.0, "A4 height expected, got {}", layout.page.h);
}

// ── Full pipeline (all live services) ────────────────────────────────────────

#[tokio::test]
async fn index_and_search_real_document() {
    e2e_skip_unless_enabled!();
    init_tracing();
    let path = test_cases_dir().join("tables.pdf");
    if !path.exists() {
        println!("SKIP — test file not found: {}", path.display());
        return;
    }
    let Some(config) = live_config() else {
        println!("SKIP — EXTRACT_TABLES_ENDPOINT and EMBEDDING_ENDPOINT must be set");
        return;
    };

    let index = index_document(path.to_str().unwrap(), &config)
        .await
        .expect("indexing should succeed");
    println!("{:?}", index.stats);
    assert!(index.stats.total_pages > 0);
    assert!(!index.is_empty(), "expected at least one table");

    let reference = index.entries[0].embedding.clone();
    let results = index.search(&reference).unwrap();
    assert_eq!(results.len(), index.len());
    assert_eq!(results[0].distance, 0.0);
    assert!(results.windows(2).all(|w| w[0].distance <= w[1].distance));
}

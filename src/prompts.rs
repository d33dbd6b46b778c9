//! Prompts for the LLM table describer.
//!
//! Callers can override the default via
//! [`crate::config::IndexConfig::describer_prompt`]; the constant here is
//! used only when no override is provided.

/// Default system prompt for describing the tables of one page.
pub const DEFAULT_DESCRIBER_PROMPT: &str = r#"You are given the HTML content of one page of a PDF document. Some of the content is in <table> elements, and every such table has an id attribute.

For EVERY <table> element that has an id, write:
- tableId: the exact value of the table's id attribute
- tableTitle: a short title for the table (at most 12 words)
- tableDescription: one or two sentences describing what the table contains, using the surrounding text for context

Respond with ONLY a JSON array, no commentary and no code fences:
[{"tableId": "table1", "tableTitle": "...", "tableDescription": "..."}]

If the page contains no tables with an id, respond with []."#;

/// Build the user message carrying the page markup.
pub fn describer_user_message(page_markup: &str) -> String {
    format!("Page HTML:\n\n{}", page_markup)
}

//! Page markup helpers: build fragments, tag tables, look tables up again.
//!
//! Fragments are produced by string assembly (cheap, deterministic) and only
//! parsed back with `scraper` when a table must be located by identifier.
//! Parsing normalises the table (html5ever inserts an implied `<tbody>`),
//! so a looked-up table is not byte-identical to the detector's markup.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

use crate::model::TextLine;

static RE_TABLE_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<table(\s|>)").unwrap());

static RE_ROOT_ID_ATTR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)^(\s*<table\b[^>]*?)\s+id\s*=\s*(?:"[^"]*"|'[^']*'|[^\s>]+)"#).unwrap()
});

static TABLE_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("table").unwrap());

/// Stable identifier for the `index`-th detected table (0-based input).
pub fn table_id(index: usize) -> String {
    format!("table{}", index + 1)
}

/// Put `id="<id>"` on the first `<table` tag of `html`.
///
/// Only the first opening tag is touched; nested tables keep their markup.
/// Markup without a table tag is returned unchanged.
pub fn inject_table_id(html: &str, id: &str) -> String {
    RE_TABLE_OPEN
        .replacen(html, 1, |caps: &regex::Captures<'_>| {
            format!("<table id=\"{}\"{}", id, &caps[1])
        })
        .into_owned()
}

/// Remove the `id` attribute from the root `<table>` tag of `table_html`.
pub fn strip_table_id(table_html: &str) -> String {
    RE_ROOT_ID_ATTR.replacen(table_html, 1, "$1").into_owned()
}

/// Render one block's lines as a paragraph group.
///
/// Blank lines are skipped; `None` when every line is blank.
pub fn paragraph_group(lines: &[TextLine]) -> Option<String> {
    let paragraphs: Vec<String> = lines
        .iter()
        .filter(|line| !line.is_blank())
        .map(|line| format!("<p>{}</p>", escape_text(&line.text)))
        .collect();

    if paragraphs.is_empty() {
        None
    } else {
        Some(format!("<div>\n{}\n</div>", paragraphs.join("\n")))
    }
}

/// Number of `<table>` elements anywhere in `markup`, nested ones included.
pub fn count_tables(markup: &str) -> usize {
    Html::parse_fragment(markup).select(&TABLE_SELECTOR).count()
}

/// Outer markup of the table whose `id` attribute equals `id`.
pub fn find_table_by_id(markup: &str, id: &str) -> Option<String> {
    let fragment = Html::parse_fragment(markup);
    let found = fragment
        .select(&TABLE_SELECTOR)
        .find(|table| table.value().attr("id") == Some(id))
        .map(|table| table.html());
    found
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inject_id_with_attributes() {
        let html = r#"<table class="t"><tr><td>1</td></tr></table>"#;
        assert_eq!(
            inject_table_id(html, "table2"),
            r#"<table id="table2" class="t"><tr><td>1</td></tr></table>"#
        );
    }

    #[test]
    fn inject_id_on_bare_tag() {
        assert_eq!(
            inject_table_id("<table><tr></tr></table>", "table1"),
            r#"<table id="table1"><tr></tr></table>"#
        );
    }

    #[test]
    fn inject_id_touches_only_the_root_tag() {
        let html = "<table border=1><tr><td><table ><tr></tr></table></td></tr></table>";
        let out = inject_table_id(html, "table1");
        assert_eq!(out.matches("id=").count(), 1);
        assert!(out.starts_with(r#"<table id="table1" border=1>"#));
    }

    #[test]
    fn inject_id_ignores_lookalike_tags() {
        let html = "<tablet>no</tablet>";
        assert_eq!(inject_table_id(html, "table1"), html);
    }

    #[test]
    fn strip_id_from_root() {
        assert_eq!(
            strip_table_id(r#"<table id="table3" class="x"><tr></tr></table>"#),
            r#"<table class="x"><tr></tr></table>"#
        );
        assert_eq!(
            strip_table_id(r#"<table class="x" id='table3'><tr></tr></table>"#),
            r#"<table class="x"><tr></tr></table>"#
        );
    }

    #[test]
    fn strip_id_leaves_nested_ids() {
        let html = r#"<table><tr><td><table id="inner"></table></td></tr></table>"#;
        assert_eq!(strip_table_id(html), html);
    }

    #[test]
    fn paragraph_group_skips_blank_lines() {
        let lines = vec![TextLine::new("First"), TextLine::new("   "), TextLine::new("Second")];
        assert_eq!(
            paragraph_group(&lines).unwrap(),
            "<div>\n<p>First</p>\n<p>Second</p>\n</div>"
        );
    }

    #[test]
    fn paragraph_group_all_blank_is_none() {
        let lines = vec![TextLine::new(""), TextLine::new("\t")];
        assert!(paragraph_group(&lines).is_none());
        assert!(paragraph_group(&[]).is_none());
    }

    #[test]
    fn paragraph_text_is_escaped() {
        let lines = vec![TextLine::new("a < b & c")];
        assert_eq!(
            paragraph_group(&lines).unwrap(),
            "<div>\n<p>a &lt; b &amp; c</p>\n</div>"
        );
    }

    #[test]
    fn find_table_by_identifier() {
        let markup = concat!(
            "<div>\n<p>intro</p>\n</div>\n",
            r#"<table id="table1"><tr><td>a</td></tr></table>"#,
            "\n",
            r#"<table id="table2"><tr><td>b</td></tr></table>"#
        );
        let found = find_table_by_id(markup, "table2").unwrap();
        assert!(found.starts_with(r#"<table id="table2">"#), "got: {found}");
        assert!(found.contains("<td>b</td>"));
        assert!(find_table_by_id(markup, "table9").is_none());
        assert_eq!(count_tables(markup), 2);
    }
}

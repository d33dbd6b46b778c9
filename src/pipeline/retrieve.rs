//! Retrieval: rank index entries by Euclidean distance to a reference vector.

use crate::error::TableSearchError;
use crate::output::{IndexEntry, SearchResult};
use crate::pipeline::markup;

/// Euclidean distance between two equal-length vectors.
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

/// Rank `entries` by distance to `reference`, nearest first.
///
/// Every entry's embedding must have the reference's length; the first one
/// that does not aborts the search. Equal distances keep index order.
pub fn search(
    entries: &[IndexEntry],
    reference: &[f32],
) -> Result<Vec<SearchResult>, TableSearchError> {
    let mut scored = Vec::with_capacity(entries.len());
    for entry in entries {
        if entry.embedding.len() != reference.len() {
            return Err(TableSearchError::DimensionMismatch {
                page: entry.page_number,
                expected: reference.len(),
                actual: entry.embedding.len(),
            });
        }
        scored.push((euclidean_distance(&entry.embedding, reference), entry));
    }

    // stable; NaN of either sign sorts last
    scored.sort_by(|a, b| {
        a.0.is_nan()
            .cmp(&b.0.is_nan())
            .then_with(|| a.0.total_cmp(&b.0))
    });

    Ok(scored
        .into_iter()
        .map(|(distance, entry)| SearchResult {
            page_number: entry.page_number,
            distance,
            table: stored_table(entry),
        })
        .collect())
}

/// The entry's table markup with its identifier put back.
fn stored_table(entry: &IndexEntry) -> String {
    markup::inject_table_id(&entry.table, &entry.table_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(page_number: usize, id: &str, embedding: Vec<f32>) -> IndexEntry {
        let table = format!("<table><tr><td>{id}</td></tr></table>");
        IndexEntry {
            page_number,
            table_id: id.to_string(),
            content: format!("Title\nDescription\n{table}"),
            table,
            embedding,
        }
    }

    #[test]
    fn nearest_entry_ranks_first() {
        let entries = vec![
            entry(1, "table1", vec![3.0, 4.0]),
            entry(2, "table1", vec![1.0, 1.0]),
        ];
        let results = search(&entries, &[0.0, 0.0]).unwrap();
        assert_eq!(results[0].page_number, 2);
        assert!((results[0].distance - 2f32.sqrt()).abs() < 1e-6);
        assert_eq!(results[1].page_number, 1);
        assert!((results[1].distance - 5.0).abs() < 1e-6);
    }

    #[test]
    fn ties_keep_index_order() {
        let entries = vec![
            entry(3, "table1", vec![0.0, 1.0]),
            entry(1, "table1", vec![1.0, 0.0]),
            entry(2, "table1", vec![0.0, -1.0]),
        ];
        let pages: Vec<usize> = search(&entries, &[0.0, 0.0])
            .unwrap()
            .iter()
            .map(|r| r.page_number)
            .collect();
        assert_eq!(pages, vec![3, 1, 2]);
    }

    #[test]
    fn dimension_mismatch_is_fatal() {
        let entries = vec![
            entry(1, "table1", vec![1.0, 1.0]),
            entry(4, "table2", vec![1.0, 1.0, 1.0]),
        ];
        let err = search(&entries, &[0.0, 0.0]).unwrap_err();
        assert!(matches!(
            err,
            TableSearchError::DimensionMismatch {
                page: 4,
                expected: 2,
                actual: 3
            }
        ));
    }

    #[test]
    fn result_table_carries_identifier_again() {
        let results = search(&[entry(1, "table2", vec![0.0])], &[0.0]).unwrap();
        assert!(results[0].table.starts_with("<table id=\"table2\">"), "got: {}", results[0].table);
        assert!(!results[0].table.contains("Title"));
    }

    #[test]
    fn markup_in_title_does_not_replace_the_table() {
        let mut e = entry(1, "table1", vec![0.0]);
        e.content = format!("Totals <table> x\nD\n{}", e.table);
        let results = search(&[e], &[0.0]).unwrap();
        assert_eq!(
            results[0].table,
            "<table id=\"table1\"><tr><td>table1</td></tr></table>"
        );
    }

    #[test]
    fn nan_distances_rank_last_without_panicking() {
        let entries: Vec<IndexEntry> = (1..=40)
            .map(|page| {
                let value = if page % 3 == 0 { f32::NAN } else { page as f32 };
                entry(page, "table1", vec![value])
            })
            .collect();
        let results = search(&entries, &[0.0]).unwrap();
        assert_eq!(results.len(), 40);

        let finite: Vec<usize> = results
            .iter()
            .take_while(|r| !r.distance.is_nan())
            .map(|r| r.page_number)
            .collect();
        let expected: Vec<usize> = (1..=40).filter(|p| p % 3 != 0).collect();
        assert_eq!(finite, expected);
        assert!(results[finite.len()..].iter().all(|r| r.distance.is_nan()));
    }

    #[test]
    fn empty_index_gives_no_results() {
        assert!(search(&[], &[1.0, 2.0]).unwrap().is_empty());
    }
}

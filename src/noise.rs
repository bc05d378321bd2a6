//! Removal of rows that look like pasted commands, comments, or banner lines
//! rather than data, plus trimming of a near-empty tail.

use itertools::Itertools;
use log::{debug, warn};
use regex::Regex;

use crate::{config::NoiseRules, table::Table};

const TRAILING_NULL_FRACTION: f64 = 0.8;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoiseOutcome {
    pub removed: usize,
    /// True when the table exceeded `max_rows` and was left untouched.
    pub skipped: bool,
}

/// Drops noise rows. `patterns` must be compiled from `rules.patterns`.
/// The first data row is never removed.
pub fn remove_noise_rows(
    mut table: Table,
    rules: &NoiseRules,
    patterns: &[Regex],
) -> (Table, NoiseOutcome) {
    let rows = table.row_count();
    if rows > rules.max_rows {
        warn!(
            "Skipping noise-row detection: {rows} row(s) exceeds the limit of {}",
            rules.max_rows
        );
        return (
            table,
            NoiseOutcome {
                removed: 0,
                skipped: true,
            },
        );
    }

    let keep: Vec<bool> = (0..rows)
        .map(|idx| idx == 0 || !is_noise_row(&table, idx, rules, patterns))
        .collect();
    let removed = keep.iter().filter(|k| !**k).count();
    if removed > 0 {
        table.retain_rows(&keep);
    }
    debug!("Removed {removed} noise row(s)");
    (
        table,
        NoiseOutcome {
            removed,
            skipped: false,
        },
    )
}

fn is_noise_row(table: &Table, idx: usize, rules: &NoiseRules, patterns: &[Regex]) -> bool {
    let values: Vec<String> = table
        .row(idx)
        .into_iter()
        .filter(|cell| !cell.is_null())
        .map(|cell| cell.as_display())
        .collect();
    if values.is_empty() {
        return false;
    }

    if let Ok(banner) = values.iter().all_equal_value()
        && banner.chars().count() > rules.banner_min_chars
    {
        return true;
    }

    table.row_null_fraction(idx) > rules.sparse_null_fraction
        && values
            .iter()
            .any(|value| patterns.iter().any(|pattern| pattern.is_match(value)))
}

/// Pops rows off the end while their null fraction exceeds 0.8.
pub fn trim_trailing_blank_rows(mut table: Table) -> (Table, usize) {
    let mut len = table.row_count();
    while len > 0 && table.row_null_fraction(len - 1) > TRAILING_NULL_FRACTION {
        len -= 1;
    }
    let removed = table.row_count() - len;
    if removed > 0 {
        table.truncate_rows(len);
    }
    debug!("Trimmed {removed} trailing near-empty row(s)");
    (table, removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Cell;

    fn rules() -> (NoiseRules, Vec<Regex>) {
        let rules = NoiseRules::default();
        let patterns = rules.compile().expect("default patterns compile");
        (rules, patterns)
    }

    fn text_rows(rows: &[&[Option<&str>]]) -> Table {
        let width = rows.first().map_or(0, |r| r.len());
        Table::from_rows(
            (0..width).map(|i| format!("c{i}")).collect(),
            rows.iter()
                .map(|row| row.iter().map(|v| Cell::from(*v)).collect())
                .collect(),
        )
    }

    #[test]
    fn removes_sparse_command_rows() {
        let table = text_rows(&[
            &[Some("1"), Some("a"), Some("x")],
            &[Some("pip install pandas"), None, None],
            &[Some("2"), Some("b"), Some("y")],
            &[None, Some("# comment"), None],
        ]);
        let (rules, patterns) = rules();
        let (table, outcome) = remove_noise_rows(table, &rules, &patterns);
        assert_eq!(outcome.removed, 2);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.cell(1, 0), Some(&Cell::text("2")));
    }

    #[test]
    fn command_match_requires_sparsity() {
        let table = text_rows(&[
            &[Some("1"), Some("a"), Some("x")],
            &[Some("cd somewhere"), Some("b"), Some("y")],
        ]);
        let (rules, patterns) = rules();
        let (_, outcome) = remove_noise_rows(table, &rules, &patterns);
        assert_eq!(outcome.removed, 0);
    }

    #[test]
    fn removes_repeated_long_banner_rows() {
        let banner = "=== QUARTERLY EXPORT GENERATED BY SYSTEM ===";
        let table = text_rows(&[
            &[Some("1"), Some("a")],
            &[Some(banner), Some(banner)],
            &[Some("short"), Some("short")],
        ]);
        let (rules, patterns) = rules();
        let (table, outcome) = remove_noise_rows(table, &rules, &patterns);
        assert_eq!(outcome.removed, 1);
        assert_eq!(table.cell(1, 0), Some(&Cell::text("short")));
    }

    #[test]
    fn first_row_is_never_removed() {
        let table = text_rows(&[&[Some("# header-ish"), None, None], &[Some("1"), Some("2"), Some("3")]]);
        let (rules, patterns) = rules();
        let (table, outcome) = remove_noise_rows(table, &rules, &patterns);
        assert_eq!(outcome.removed, 0);
        assert_eq!(table.row_count(), 2);
    }

    #[test]
    fn skipped_above_row_limit() {
        let rows: Vec<Vec<Cell>> = (0..5)
            .map(|_| vec![Cell::text("# note"), Cell::Null, Cell::Null])
            .collect();
        let table = Table::from_rows(vec!["a".into(), "b".into(), "c".into()], rows);
        let (mut rules, _) = rules();
        rules.max_rows = 3;
        let patterns = rules.compile().unwrap();
        let (table, outcome) = remove_noise_rows(table, &rules, &patterns);
        assert!(outcome.skipped);
        assert_eq!(outcome.removed, 0);
        assert_eq!(table.row_count(), 5);
    }

    fn table_with_trailing_comment(rows: usize) -> Table {
        let mut data: Vec<Vec<Cell>> = (0..rows - 1)
            .map(|i| vec![Cell::text(i.to_string()), Cell::text("a"), Cell::text("x")])
            .collect();
        data.push(vec![Cell::text("# note"), Cell::Null, Cell::Null]);
        Table::from_rows(vec!["a".into(), "b".into(), "c".into()], data)
    }

    #[test]
    fn row_limit_is_inclusive_with_default_rules() {
        let (rules, patterns) = rules();
        assert_eq!(rules.max_rows, 1000);

        let (table, outcome) =
            remove_noise_rows(table_with_trailing_comment(1000), &rules, &patterns);
        assert!(!outcome.skipped);
        assert_eq!(outcome.removed, 1);
        assert_eq!(table.row_count(), 999);

        let (table, outcome) =
            remove_noise_rows(table_with_trailing_comment(1001), &rules, &patterns);
        assert!(outcome.skipped);
        assert_eq!(outcome.removed, 0);
        assert_eq!(table.row_count(), 1001);
    }

    #[test]
    fn trims_only_the_contiguous_sparse_tail() {
        let table = text_rows(&[
            &[Some("1"), Some("a"), Some("x"), Some("p"), Some("q")],
            &[None, None, None, None, None],
            &[Some("2"), Some("b"), Some("y"), Some("p"), Some("q")],
            &[Some("note"), None, None, None, None],
            &[None, None, None, None, None],
        ]);
        // 4 of 5 cells null is exactly 0.8, which does not qualify.
        let (table, removed) = trim_trailing_blank_rows(table);
        assert_eq!(removed, 1);
        assert_eq!(table.row_count(), 4);
    }

    #[test]
    fn trimming_can_empty_the_table() {
        let table = text_rows(&[&[None, None], &[None, None]]);
        let (table, removed) = trim_trailing_blank_rows(table);
        assert_eq!(removed, 2);
        assert_eq!(table.row_count(), 0);
    }
}

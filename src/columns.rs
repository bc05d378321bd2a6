//! Column-name standardization and collapsing of byte-identical columns.

use std::collections::HashSet;

use log::debug;

use crate::table::Table;

const UNNAMED: &str = "unnamed";

/// Trims, collapses whitespace runs, optionally lowercases; an empty result
/// becomes `unnamed`.
pub fn normalize_name(raw: &str, lowercase: bool) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let name = if lowercase {
        collapsed.to_lowercase()
    } else {
        collapsed
    };
    if name.is_empty() {
        UNNAMED.to_string()
    } else {
        name
    }
}

/// Normalizes every name and de-duplicates collisions: the first occurrence
/// keeps the bare name, later ones get `_1`, `_2`, ...
pub fn standardize_names(names: &[String], lowercase: bool) -> Vec<String> {
    let mut used: HashSet<String> = HashSet::new();
    let mut output = Vec::with_capacity(names.len());
    for raw in names {
        let base = normalize_name(raw, lowercase);
        let mut candidate = base.clone();
        let mut counter = 1usize;
        while used.contains(&candidate) {
            candidate = format!("{base}_{counter}");
            counter += 1;
        }
        used.insert(candidate.clone());
        output.push(candidate);
    }
    output
}

pub fn standardize_column_names(mut table: Table, lowercase: bool) -> Table {
    let standardized = standardize_names(&table.column_names(), lowercase);
    for (column, name) in table.columns_mut().iter_mut().zip(standardized) {
        if column.name != name {
            debug!("Renamed column '{}' -> '{name}'", column.name);
            column.name = name;
        }
    }
    table
}

/// Drops every column whose full value sequence equals an earlier kept
/// column's. Returns the removed names in discovery order.
pub fn collapse_duplicate_columns(mut table: Table) -> (Table, Vec<String>) {
    let columns = table.columns();
    let mut removed: Vec<usize> = Vec::new();
    for (idx, column) in columns.iter().enumerate() {
        if removed.contains(&idx) {
            continue;
        }
        for (other_idx, other) in columns.iter().enumerate().skip(idx + 1) {
            if !removed.contains(&other_idx) && other.values == column.values {
                removed.push(other_idx);
            }
        }
    }
    let names: Vec<String> = removed
        .iter()
        .map(|idx| columns[*idx].name.clone())
        .collect();
    if !names.is_empty() {
        debug!("Collapsing duplicate column(s): {}", names.join(", "));
        table.drop_columns(&names);
    }
    (table, names)
}

/// Share of header tokens that look like field names:
/// (tokens with a letter - purely numeric tokens) / total, rounded to 3 places.
pub fn header_quality_score(table: &Table) -> f64 {
    if table.is_empty() {
        return 0.0;
    }
    let names = table.column_names();
    let total = names.len() as f64;
    let alpha = names
        .iter()
        .filter(|name| name.chars().any(char::is_alphabetic))
        .count() as f64;
    let numeric = names
        .iter()
        .filter(|name| !name.is_empty() && name.chars().all(char::is_numeric))
        .count() as f64;
    ((alpha - numeric) / total * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{data::Cell, table::Column};

    fn names(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn normalize_name_trims_collapses_and_lowercases() {
        assert_eq!(normalize_name("  Order   ID ", true), "order id");
        assert_eq!(normalize_name("Order\tID", false), "Order ID");
        assert_eq!(normalize_name("   ", true), "unnamed");
    }

    #[test]
    fn collisions_get_numbered_suffixes() {
        let out = standardize_names(&names(&["Name", "name ", "NAME", ""]), true);
        assert_eq!(out, names(&["name", "name_1", "name_2", "unnamed"]));
    }

    #[test]
    fn generated_suffix_never_collides_with_existing_name() {
        let out = standardize_names(&names(&["a_1", "a", "a"]), true);
        assert_eq!(out, names(&["a_1", "a", "a_2"]));
    }

    #[test]
    fn standardization_is_idempotent() {
        let once = standardize_names(&names(&[" A ", "a", "B  c", "", ""]), true);
        let twice = standardize_names(&once, true);
        assert_eq!(once, twice);
    }

    #[test]
    fn later_identical_column_is_removed() {
        let values = vec![Cell::text("1"), Cell::Null, Cell::text("3")];
        let table = Table::new(vec![
            Column::new("a", values.clone()),
            Column::new("b", vec![Cell::text("x"); 3]),
            Column::new("c", values),
        ]);
        let (table, removed) = collapse_duplicate_columns(table);
        assert_eq!(removed, vec!["c".to_string()]);
        assert_eq!(table.column_names(), vec!["a", "b"]);
    }

    #[test]
    fn header_quality_penalizes_numeric_names() {
        let table = Table::new(vec![
            Column::new("id", vec![Cell::Null]),
            Column::new("1", vec![Cell::Null]),
            Column::new("name", vec![Cell::Null]),
        ]);
        assert_eq!(header_quality_score(&table), 0.333);
        assert_eq!(header_quality_score(&Table::empty()), 0.0);
    }
}

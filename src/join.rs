use std::collections::{BTreeMap, HashMap, HashSet};

use log::{debug, info};

use crate::{
    data::Cell,
    error::{MergeError, TableSide},
    merge::{JoinSummary, JoinType, settle_column},
    table::Table,
};

const PREFIX: &str = "new_";
const SUFFIX: &str = "_new";

/// Joins `new` onto `existing` by the display text of `column`.
///
/// Columns present on both sides (other than the key) are renamed on the new
/// side: `new_<name>` when `prefix_conflicts` is set, `<name>_new` otherwise.
/// Null keys never match.
pub fn merge_on_column(
    existing: &Table,
    new: &Table,
    column: &str,
    join_type: JoinType,
    prefix_conflicts: bool,
) -> Result<(Table, JoinSummary), MergeError> {
    let left_key = existing
        .column_index(column)
        .ok_or_else(|| MergeError::MissingColumn {
            column: column.to_string(),
            side: TableSide::Existing,
        })?;
    let right_key = new
        .column_index(column)
        .ok_or_else(|| MergeError::MissingColumn {
            column: column.to_string(),
            side: TableSide::New,
        })?;

    let conflicting_columns: Vec<String> = existing
        .column_names()
        .into_iter()
        .filter(|name| name != column && new.has_column(name))
        .collect();
    let (right_headers, right_columns, renamed_columns) =
        build_right_headers(existing, new, right_key, &conflicting_columns, prefix_conflicts);

    let pairs = match_rows(existing, new, left_key, right_key, join_type);

    let mut columns = Vec::with_capacity(existing.column_count() + right_columns.len());
    for (idx, left) in existing.columns().iter().enumerate() {
        let values = pairs
            .iter()
            .map(|(l, r)| match (l, r) {
                (Some(row), _) => left.values[*row].clone(),
                (None, Some(row)) if idx == left_key => new.columns()[right_key].values[*row].clone(),
                (None, _) => Cell::Null,
            })
            .collect();
        let right_type = (idx == left_key)
            .then(|| new.columns()[right_key].semantic_type)
            .flatten();
        columns.push(settle_column(
            left.name.clone(),
            values,
            left.semantic_type,
            right_type,
        ));
    }
    for (name, source) in right_headers.into_iter().zip(right_columns) {
        let right = &new.columns()[source];
        let values = pairs
            .iter()
            .map(|(_, r)| r.map_or(Cell::Null, |row| right.values[row].clone()))
            .collect();
        columns.push(settle_column(name, values, right.semantic_type, None));
    }
    let table = Table::new(columns);
    let rows_after = table.row_count();

    info!(
        "Column merge completed on '{column}' ({join_type}): {rows_after} rows, {} columns",
        table.column_count()
    );
    let summary = JoinSummary {
        merge_column: column.to_string(),
        join_type,
        existing_columns: existing.column_names(),
        new_columns: new.column_names(),
        conflicting_columns,
        renamed_columns,
        rows_before_existing: existing.row_count(),
        rows_before_new: new.row_count(),
        rows_after,
        columns_before: existing.column_count(),
        columns_after: table.column_count(),
        success: true,
    };
    Ok((table, summary))
}

type RowPair = (Option<usize>, Option<usize>);

struct Bucket {
    rows: Vec<usize>,
}

fn build_lookup(table: &Table, key: usize) -> HashMap<String, Bucket> {
    let mut map: HashMap<String, Bucket> = HashMap::new();
    for (row, cell) in table.columns()[key].values.iter().enumerate() {
        if cell.is_null() {
            continue;
        }
        map.entry(cell.as_display())
            .or_insert_with(|| Bucket { rows: Vec::new() })
            .rows
            .push(row);
    }
    map
}

/// Row pairs in output order: the driving side in its own order, each row
/// followed by its matches in the other side's order.
fn match_rows(
    existing: &Table,
    new: &Table,
    left_key: usize,
    right_key: usize,
    join_type: JoinType,
) -> Vec<RowPair> {
    let mut pairs = Vec::new();
    if join_type == JoinType::Right {
        let lookup = build_lookup(existing, left_key);
        for (row, cell) in new.columns()[right_key].values.iter().enumerate() {
            match lookup.get(&cell.as_display()).filter(|_| !cell.is_null()) {
                Some(bucket) => pairs.extend(bucket.rows.iter().map(|l| (Some(*l), Some(row)))),
                None => pairs.push((None, Some(row))),
            }
        }
        return pairs;
    }

    let lookup = build_lookup(new, right_key);
    let mut matched = vec![false; new.row_count()];
    let keep_unmatched_left = matches!(join_type, JoinType::Left | JoinType::Outer);
    for (row, cell) in existing.columns()[left_key].values.iter().enumerate() {
        match lookup.get(&cell.as_display()).filter(|_| !cell.is_null()) {
            Some(bucket) => {
                for right in &bucket.rows {
                    matched[*right] = true;
                    pairs.push((Some(row), Some(*right)));
                }
            }
            None if keep_unmatched_left => pairs.push((Some(row), None)),
            None => {}
        }
    }
    if join_type == JoinType::Outer {
        pairs.extend(
            matched
                .iter()
                .enumerate()
                .filter(|(_, hit)| !**hit)
                .map(|(row, _)| (None, Some(row))),
        );
    }
    debug!("Matched {} row pair(s)", pairs.len());
    pairs
}

fn build_right_headers(
    existing: &Table,
    new: &Table,
    right_key: usize,
    conflicts: &[String],
    prefix_conflicts: bool,
) -> (Vec<String>, Vec<usize>, BTreeMap<String, String>) {
    let mut seen: HashSet<String> = existing.column_names().into_iter().collect();
    let reserved: HashSet<&str> = new.columns().iter().map(|c| c.name.as_str()).collect();
    let mut headers = Vec::new();
    let mut sources = Vec::new();
    let mut renamed = BTreeMap::new();

    for (idx, column) in new.columns().iter().enumerate() {
        if idx == right_key {
            continue;
        }
        let name = &column.name;
        let mut candidate = if conflicts.contains(name) {
            if prefix_conflicts {
                format!("{PREFIX}{name}")
            } else {
                format!("{name}{SUFFIX}")
            }
        } else {
            name.clone()
        };
        if seen.contains(&candidate) || (candidate != *name && reserved.contains(candidate.as_str()))
        {
            let base = candidate.clone();
            let mut counter = 1usize;
            while seen.contains(&candidate) || reserved.contains(candidate.as_str()) {
                candidate = format!("{base}_{counter}");
                counter += 1;
            }
        }
        if candidate != *name {
            renamed.insert(name.clone(), candidate.clone());
        }
        seen.insert(candidate.clone());
        headers.push(candidate);
        sources.push(idx);
    }
    (headers, sources, renamed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{Column, SemanticType};
    use proptest::prelude::*;

    fn numeric(name: &str, values: &[f64]) -> Column {
        Column::new(name, values.iter().map(|v| Cell::Number(*v)).collect())
            .with_type(SemanticType::Numeric)
    }

    fn text(name: &str, values: &[&str]) -> Column {
        Column::new(name, values.iter().map(|v| Cell::text(*v)).collect())
            .with_type(SemanticType::Categorical)
    }

    fn people() -> Table {
        Table::new(vec![
            numeric("id", &[1.0, 2.0, 3.0]),
            text("name", &["ann", "bob", "cy"]),
        ])
    }

    fn ages() -> Table {
        Table::new(vec![
            numeric("id", &[2.0, 4.0, 1.0]),
            numeric("age", &[20.0, 40.0, 10.0]),
            text("name", &["b", "d", "a"]),
        ])
    }

    #[test]
    fn missing_key_names_the_side() {
        let other = Table::new(vec![text("x", &["1"])]);
        let err = merge_on_column(&people(), &other, "id", JoinType::Inner, true)
            .expect_err("missing key");
        assert_eq!(err.to_string(), "Merge column 'id' not found in new dataset");
        let err = merge_on_column(&Table::empty(), &people(), "id", JoinType::Inner, true)
            .expect_err("missing key");
        assert_eq!(err.to_string(), "Merge column 'id' not found in existing dataset");
    }

    #[test]
    fn inner_join_prefixes_conflicts() {
        let (out, summary) =
            merge_on_column(&people(), &ages(), "id", JoinType::Inner, true).expect("join");
        assert_eq!(out.column_names(), vec!["id", "name", "age", "new_name"]);
        assert_eq!(out.row_count(), 2);
        assert_eq!(out.cell(0, 0), Some(&Cell::Number(1.0)));
        assert_eq!(out.cell(0, 2), Some(&Cell::Number(10.0)));
        assert_eq!(out.cell(1, 3), Some(&Cell::text("b")));
        assert_eq!(summary.conflicting_columns, vec!["name"]);
        assert_eq!(summary.renamed_columns.get("name"), Some(&"new_name".to_string()));
    }

    #[test]
    fn outer_join_appends_unmatched_new_rows_with_their_key() {
        let (out, summary) =
            merge_on_column(&people(), &ages(), "id", JoinType::Outer, false).expect("join");
        assert_eq!(out.column_names(), vec!["id", "name", "age", "name_new"]);
        assert_eq!(out.row_count(), 4);
        // id 3 has no match, id 4 only exists on the new side
        assert!(out.cell(2, 2).is_some_and(Cell::is_null));
        assert_eq!(out.cell(3, 0), Some(&Cell::Number(4.0)));
        assert!(out.cell(3, 1).is_some_and(Cell::is_null));
        assert_eq!(summary.rows_after, 4);
    }

    #[test]
    fn left_and_right_joins_keep_their_driving_side() {
        let (left, _) = merge_on_column(&people(), &ages(), "id", JoinType::Left, true).expect("join");
        assert_eq!(left.row_count(), 3);
        assert_eq!(left.cell(2, 0), Some(&Cell::Number(3.0)));

        let (right, _) =
            merge_on_column(&people(), &ages(), "id", JoinType::Right, true).expect("join");
        assert_eq!(right.row_count(), 3);
        assert_eq!(right.cell(0, 0), Some(&Cell::Number(2.0)));
        assert_eq!(right.cell(1, 0), Some(&Cell::Number(4.0)));
        assert!(right.cell(1, 1).is_some_and(Cell::is_null));
    }

    #[test]
    fn keys_match_across_number_and_text() {
        let existing = Table::new(vec![numeric("id", &[1.0]), text("a", &["x"])]);
        let new = Table::new(vec![text("id", &["1"]), text("b", &["y"])]);
        let (out, _) = merge_on_column(&existing, &new, "id", JoinType::Inner, true).expect("join");
        assert_eq!(out.row_count(), 1);
        assert_eq!(
            out.column("id").and_then(|c| c.semantic_type),
            Some(SemanticType::Categorical)
        );
        assert_eq!(out.cell(0, 0), Some(&Cell::text("1")));
    }

    #[test]
    fn null_keys_never_match() {
        let existing = Table::new(vec![Column::new("k", vec![Cell::Null, Cell::text("a")])]);
        let new = Table::new(vec![Column::new("k", vec![Cell::Null, Cell::text("a")])]);
        let (inner, _) = merge_on_column(&existing, &new, "k", JoinType::Inner, true).expect("join");
        assert_eq!(inner.row_count(), 1);
        let (outer, _) = merge_on_column(&existing, &new, "k", JoinType::Outer, true).expect("join");
        assert_eq!(outer.row_count(), 3);
    }

    #[test]
    fn generated_names_avoid_existing_columns() {
        let existing = Table::new(vec![text("k", &["a"]), text("v", &["1"]), text("new_v", &["2"])]);
        let new = Table::new(vec![text("k", &["a"]), text("v", &["3"])]);
        let (out, summary) = merge_on_column(&existing, &new, "k", JoinType::Inner, true).expect("join");
        assert_eq!(out.column_names(), vec!["k", "v", "new_v", "new_v_1"]);
        assert_eq!(summary.renamed_columns.get("v"), Some(&"new_v_1".to_string()));
    }

    proptest! {
        #[test]
        fn join_row_bounds(left in proptest::collection::hash_set(0u8..30, 0..15),
                           right in proptest::collection::hash_set(0u8..30, 0..15)) {
            let left: Vec<f64> = left.into_iter().map(f64::from).collect();
            let right: Vec<f64> = right.into_iter().map(f64::from).collect();
            let existing = Table::new(vec![numeric("id", &left)]);
            let new = Table::new(vec![numeric("id", &right)]);
            let (inner, _) = merge_on_column(&existing, &new, "id", JoinType::Inner, true).expect("inner");
            let (outer, _) = merge_on_column(&existing, &new, "id", JoinType::Outer, true).expect("outer");
            prop_assert!(inner.row_count() <= left.len().min(right.len()));
            prop_assert!(outer.row_count() >= left.len().max(right.len()));
        }
    }
}

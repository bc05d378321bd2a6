use std::collections::HashSet;

use log::debug;

use crate::{data::Cell, table::Table};

/// Removes rows identical to an earlier row across every column. The first
/// occurrence survives and row order is preserved.
pub fn remove_duplicate_rows(mut table: Table) -> (Table, usize) {
    let mut seen: HashSet<Vec<&Cell>> = HashSet::with_capacity(table.row_count());
    let keep: Vec<bool> = table.rows().map(|row| seen.insert(row)).collect();
    drop(seen);
    let removed = keep.iter().filter(|k| !**k).count();
    if removed > 0 {
        table.retain_rows(&keep);
    }
    debug!("Removed {removed} duplicate row(s)");
    (table, removed)
}

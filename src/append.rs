use log::info;

use crate::{
    data::Cell,
    merge::{AppendSummary, settle_column},
    table::Table,
};

/// Stacks `new` under `existing`.
///
/// Output columns are the existing columns in order followed by the columns
/// only `new` has; a column absent from one side is null for that side's rows.
pub fn append_below(existing: &Table, new: &Table) -> (Table, AppendSummary) {
    let existing_columns = existing.column_names();
    let new_columns = new.column_names();
    let missing_in_new: Vec<String> = existing_columns
        .iter()
        .filter(|name| !new.has_column(name))
        .cloned()
        .collect();
    let missing_in_existing: Vec<String> = new_columns
        .iter()
        .filter(|name| !existing.has_column(name))
        .cloned()
        .collect();

    let output_names = existing_columns.iter().chain(missing_in_existing.iter());
    let rows_after = existing.row_count() + new.row_count();
    let columns = output_names
        .map(|name| {
            let top = existing.column(name);
            let bottom = new.column(name);
            let mut values = Vec::with_capacity(rows_after);
            match top {
                Some(column) => values.extend(column.values.iter().cloned()),
                None => values.resize(existing.row_count(), Cell::Null),
            }
            match bottom {
                Some(column) => values.extend(column.values.iter().cloned()),
                None => values.resize(rows_after, Cell::Null),
            }
            settle_column(
                name.clone(),
                values,
                top.and_then(|c| c.semantic_type),
                bottom.and_then(|c| c.semantic_type),
            )
        })
        .collect();
    let table = Table::new(columns);

    info!(
        "Append below merge completed: {} + {} = {} rows",
        existing.row_count(),
        new.row_count(),
        table.row_count()
    );
    let summary = AppendSummary {
        rows_before: existing.row_count(),
        rows_added: new.row_count(),
        rows_after: table.row_count(),
        columns_before: existing.column_count(),
        columns_after: table.column_count(),
        existing_columns,
        new_columns,
        missing_in_new,
        missing_in_existing,
        success: true,
    };
    (table, summary)
}

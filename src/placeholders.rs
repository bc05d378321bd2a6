use log::debug;

use crate::{data::Cell, table::Table};

const NULL_TOKENS: &[&str] = &["nan", "none"];

fn is_null_token(value: &str) -> bool {
    let trimmed = value.trim();
    NULL_TOKENS
        .iter()
        .any(|token| trimmed.eq_ignore_ascii_case(token))
}

/// Rewrites whole-cell `nan` / `none` (any case, surrounding whitespace
/// ignored) to null. Returns the number of cells replaced.
pub fn normalize_placeholders(mut table: Table) -> (Table, usize) {
    let mut replaced = 0usize;
    for column in table.columns_mut() {
        for cell in &mut column.values {
            if cell.as_text().is_some_and(is_null_token) {
                *cell = Cell::Null;
                replaced += 1;
            }
        }
    }
    debug!("Replaced {replaced} placeholder cell(s) with null");
    (table, replaced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Column;

    #[test]
    fn replaces_whole_cell_tokens_only() {
        let table = Table::new(vec![Column::new(
            "v",
            vec![
                Cell::text("NaN"),
                Cell::text(" None "),
                Cell::text("nonexistent"),
                Cell::text("banana"),
                Cell::Number(1.0),
            ],
        )]);
        let (table, replaced) = normalize_placeholders(table);
        assert_eq!(replaced, 2);
        let values = &table.columns()[0].values;
        assert!(values[0].is_null());
        assert!(values[1].is_null());
        assert_eq!(values[2], Cell::text("nonexistent"));
        assert_eq!(values[3], Cell::text("banana"));
    }
}

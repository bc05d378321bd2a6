use crate::{
    data::Cell,
    table::{SemanticType, Table},
};

pub fn normalize_text(value: &str, lowercase: bool) -> String {
    let collapsed = value.split_whitespace().collect::<Vec<_>>().join(" ");
    if lowercase {
        collapsed.to_lowercase()
    } else {
        collapsed
    }
}

/// Trims and collapses whitespace in every categorical cell, lowercasing when
/// asked. Other column types and nulls are untouched.
pub fn normalize_categoricals(mut table: Table, lowercase: bool) -> Table {
    for column in table.columns_mut() {
        if column.semantic_type != Some(SemanticType::Categorical) {
            continue;
        }
        for cell in &mut column.values {
            if let Cell::Text(value) = cell {
                *value = normalize_text(value, lowercase);
            }
        }
    }
    table
}

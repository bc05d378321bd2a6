//! Missing-data policy applied after deduplication.
//!
//! | mode          | row drop                     | fill                                   |
//! |---------------|------------------------------|----------------------------------------|
//! | `drop_rows`   | null fraction > threshold    | numeric: median/mean/zero; categorical: mode/constant; date: mode |
//! | `impute_mean` | none                         | numeric columns with their mean        |
//! | `leave`       | none                         | none                                   |
//!
//! Date columns always take their mode and ignore `categorical_fill`: a
//! constant or empty-string fill would not parse as a date, so the column
//! would lose its type. A date column with no values keeps its nulls.

use std::collections::HashMap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    config::{CategoricalFill, CleaningConfig, MissingMode, NumericFill},
    data::Cell,
    table::{Column, SemanticType, Table},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingCounts {
    pub before: usize,
    pub after: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MissingOutcome {
    pub rows_dropped: usize,
    /// Null counts per column, in column order.
    pub by_column: Vec<(String, MissingCounts)>,
}

pub fn handle_missing_values(mut table: Table, config: &CleaningConfig) -> (Table, MissingOutcome) {
    let before: Vec<usize> = table.columns().iter().map(Column::null_count).collect();

    let mut rows_dropped = 0usize;
    match config.missing_mode {
        MissingMode::DropRows => {
            let keep: Vec<bool> = (0..table.row_count())
                .map(|idx| table.row_null_fraction(idx) <= config.drop_row_missing_threshold)
                .collect();
            rows_dropped = keep.iter().filter(|k| !**k).count();
            if rows_dropped > 0 {
                table.retain_rows(&keep);
            }
            for column in table.columns_mut() {
                let fill = fill_value(column, config);
                fill_nulls(column, fill);
            }
        }
        MissingMode::ImputeMean => {
            for column in table.columns_mut() {
                if column.semantic_type == Some(SemanticType::Numeric) {
                    let fill = mean(column).map(Cell::Number);
                    fill_nulls(column, fill);
                }
            }
        }
        MissingMode::Leave => {}
    }

    let by_column = table
        .columns()
        .iter()
        .zip(before)
        .map(|(column, before)| {
            (
                column.name.clone(),
                MissingCounts {
                    before,
                    after: column.null_count(),
                },
            )
        })
        .collect();
    debug!(
        "Missing-value handling ({}) dropped {rows_dropped} row(s)",
        config.missing_mode.as_str()
    );
    (
        table,
        MissingOutcome {
            rows_dropped,
            by_column,
        },
    )
}

fn fill_value(column: &Column, config: &CleaningConfig) -> Option<Cell> {
    match column.semantic_type {
        Some(SemanticType::Numeric) => match config.numeric_fill {
            NumericFill::Median => median(column).map(Cell::Number),
            NumericFill::Mean => mean(column).map(Cell::Number),
            NumericFill::Zero => Some(Cell::Number(0.0)),
        },
        Some(SemanticType::Date) => mode(column).map(Cell::Text),
        Some(SemanticType::Categorical) | None => match config.categorical_fill {
            CategoricalFill::Mode => Some(Cell::Text(mode(column).unwrap_or_default())),
            CategoricalFill::Constant => Some(Cell::Text(
                config.constant_fill_value.clone().unwrap_or_default(),
            )),
        },
    }
}

fn fill_nulls(column: &mut Column, fill: Option<Cell>) {
    let Some(fill) = fill else {
        return;
    };
    for cell in &mut column.values {
        if cell.is_null() {
            *cell = fill.clone();
        }
    }
}

fn numbers(column: &Column) -> Vec<f64> {
    column.values.iter().filter_map(Cell::as_number).collect()
}

pub fn mean(column: &Column) -> Option<f64> {
    let values = numbers(column);
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

pub fn median(column: &Column) -> Option<f64> {
    let mut values = numbers(column);
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

/// Most frequent non-null display value; ties go to the smallest value.
pub fn mode(column: &Column) -> Option<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for cell in column.non_null() {
        *counts.entry(cell.as_display()).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .max_by(|(a_value, a_count), (b_value, b_count)| {
            a_count.cmp(b_count).then_with(|| b_value.cmp(a_value))
        })
        .map(|(value, _)| value)
}

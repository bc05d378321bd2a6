//! Per-column profile of a cleaned table.

use std::collections::HashSet;

use serde::Serialize;

use crate::{
    data::{Cell, format_number, parse_datetime},
    missing,
    table::{Column, SemanticType, Table},
};

const SAMPLE_VALUES: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnProfile {
    pub name: String,
    pub semantic_type: Option<SemanticType>,
    pub non_nulls: usize,
    pub nulls: usize,
    pub distinct: usize,
    pub sample_values: Vec<String>,
    pub min: Option<String>,
    pub max: Option<String>,
    pub mean: Option<f64>,
    /// Population standard deviation.
    pub std: Option<f64>,
}

pub fn profile_table(table: &Table) -> Vec<ColumnProfile> {
    table.columns().iter().map(profile_column).collect()
}

pub fn profile_column(column: &Column) -> ColumnProfile {
    let mut seen = HashSet::new();
    let mut sample_values = Vec::new();
    for cell in column.non_null() {
        let display = cell.as_display();
        if seen.insert(display.clone()) && sample_values.len() < SAMPLE_VALUES {
            sample_values.push(display);
        }
    }

    let mut profile = ColumnProfile {
        name: column.name.clone(),
        semantic_type: column.semantic_type,
        non_nulls: column.values.len() - column.null_count(),
        nulls: column.null_count(),
        distinct: seen.len(),
        sample_values,
        min: None,
        max: None,
        mean: None,
        std: None,
    };

    match column.semantic_type {
        Some(SemanticType::Numeric) => {
            let numbers: Vec<f64> = column.values.iter().filter_map(Cell::as_number).collect();
            profile.min = numbers.iter().copied().reduce(f64::min).map(format_number);
            profile.max = numbers.iter().copied().reduce(f64::max).map(format_number);
            profile.mean = missing::mean(column);
            profile.std = profile.mean.map(|mean| {
                let variance = numbers.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
                    / numbers.len() as f64;
                variance.sqrt()
            });
        }
        Some(SemanticType::Date) => {
            let dated = || {
                column
                    .values
                    .iter()
                    .filter_map(|cell| cell.as_text().and_then(|t| parse_datetime(t).map(|d| (d, t))))
            };
            profile.min = dated().min_by_key(|(d, _)| *d).map(|(_, t)| t.to_string());
            profile.max = dated().max_by_key(|(d, _)| *d).map(|(_, t)| t.to_string());
        }
        Some(SemanticType::Categorical) | None => {
            let texts = || column.non_null().map(Cell::as_display);
            profile.min = texts().min();
            profile.max = texts().max();
        }
    }
    profile
}

pub fn profile_headers() -> Vec<String> {
    [
        "column", "type", "non_null", "null", "distinct", "min", "max", "mean", "std", "samples",
    ]
    .iter()
    .map(|h| h.to_string())
    .collect()
}

pub fn profile_rows(profiles: &[ColumnProfile]) -> Vec<Vec<String>> {
    let float = |value: Option<f64>| value.map(|v| format!("{v:.4}")).unwrap_or_default();
    profiles
        .iter()
        .map(|p| {
            vec![
                p.name.clone(),
                p.semantic_type
                    .map(|t| t.to_string())
                    .unwrap_or_else(|| "unknown".to_string()),
                p.non_nulls.to_string(),
                p.nulls.to_string(),
                p.distinct.to_string(),
                p.min.clone().unwrap_or_default(),
                p.max.clone().unwrap_or_default(),
                float(p.mean),
                float(p.std),
                p.sample_values.join(", "),
            ]
        })
        .collect()
}

//! Semantic type inference and canonicalization.
//!
//! Each column is assigned exactly one [`SemanticType`]:
//!
//! - **Date** when the column is forced through `date_cols`, or when it is
//!   text-typed and at least 60% of a sample of up to 200 non-null values
//!   parse as dates. At least one value of the full column must parse.
//!   Values become `YYYY-MM-DD` when every parsed value is at midnight and
//!   `YYYY-MM-DDTHH:MM:SS` otherwise; unparsable values become null.
//! - **Numeric** when the column already stores only numbers, or when it is
//!   text-typed and at least 90% of its non-null values parse as numbers.
//!   Failed conversions become null.
//! - **Categorical** otherwise. Number cells are rendered as text.

use chrono::{NaiveDateTime, NaiveTime};
use log::debug;

use crate::{
    config::CleaningConfig,
    data::{Cell, format_date, format_timestamp, parse_datetime, parse_number},
    table::{Column, SemanticType, Table},
};

pub const DATE_SAMPLE_SIZE: usize = 200;
pub const DATE_SAMPLE_RATIO: f64 = 0.6;
pub const NUMERIC_RATIO: f64 = 0.9;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InferenceOutcome {
    /// Final type per column, in column order.
    pub types: Vec<(String, SemanticType)>,
    /// Columns resolved as dates, in column order.
    pub date_columns: Vec<String>,
}

pub fn infer_types(mut table: Table, config: &CleaningConfig) -> (Table, InferenceOutcome) {
    let mut outcome = InferenceOutcome::default();
    for column in table.columns_mut() {
        let forced = config.is_forced_date(&column.name);
        let semantic = infer_column(column, forced);
        debug!("Column '{}' inferred as {semantic}", column.name);
        if semantic == SemanticType::Date {
            outcome.date_columns.push(column.name.clone());
        }
        outcome.types.push((column.name.clone(), semantic));
    }
    (table, outcome)
}

fn infer_column(column: &mut Column, forced_date: bool) -> SemanticType {
    let text_typed = column.is_text_typed();

    if (forced_date || (text_typed && sample_looks_like_dates(column)))
        && let Some(values) = canonical_dates(column)
    {
        column.values = values;
        column.semantic_type = Some(SemanticType::Date);
        return SemanticType::Date;
    }

    if !text_typed {
        column.semantic_type = Some(SemanticType::Numeric);
        return SemanticType::Numeric;
    }

    if let Some(values) = convert_numeric(column) {
        column.values = values;
        column.semantic_type = Some(SemanticType::Numeric);
        return SemanticType::Numeric;
    }

    column.semantic_type = Some(SemanticType::Categorical);
    column.conform();
    SemanticType::Categorical
}

fn sample_looks_like_dates(column: &Column) -> bool {
    let sample: Vec<String> = column
        .non_null()
        .take(DATE_SAMPLE_SIZE)
        .map(Cell::as_display)
        .collect();
    if sample.is_empty() {
        return false;
    }
    let parsed = sample
        .iter()
        .filter(|value| parse_datetime(value).is_some())
        .count();
    parsed as f64 / sample.len() as f64 >= DATE_SAMPLE_RATIO
}

fn parse_date_cell(cell: &Cell) -> Option<NaiveDateTime> {
    match cell {
        Cell::Text(s) => parse_datetime(s),
        Cell::Null | Cell::Number(_) => None,
    }
}

/// Parses the whole column; `None` when no value parses.
fn canonical_dates(column: &Column) -> Option<Vec<Cell>> {
    let parsed: Vec<Option<NaiveDateTime>> = column.values.iter().map(parse_date_cell).collect();
    if parsed.iter().all(Option::is_none) {
        return None;
    }
    let date_only = parsed
        .iter()
        .flatten()
        .all(|value| value.time() == NaiveTime::MIN);
    Some(
        parsed
            .into_iter()
            .map(|value| match value {
                Some(dt) if date_only => Cell::Text(format_date(&dt)),
                Some(dt) => Cell::Text(format_timestamp(&dt)),
                None => Cell::Null,
            })
            .collect(),
    )
}

/// Converts the column to numbers when enough values parse.
fn convert_numeric(column: &Column) -> Option<Vec<Cell>> {
    let mut non_null = 0usize;
    let mut converted = 0usize;
    let values: Vec<Cell> = column
        .values
        .iter()
        .map(|cell| {
            let number = match cell {
                Cell::Null => return Cell::Null,
                Cell::Number(n) => Some(*n),
                Cell::Text(s) => parse_number(s),
            };
            non_null += 1;
            match number {
                Some(n) => {
                    converted += 1;
                    Cell::Number(n)
                }
                None => Cell::Null,
            }
        })
        .collect();
    if non_null > 0 && converted as f64 / non_null as f64 >= NUMERIC_RATIO {
        Some(values)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn text_column(name: &str, values: &[Option<&str>]) -> Column {
        Column::new(name, values.iter().map(|v| Cell::from(*v)).collect())
    }

    fn infer_single(column: Column, config: &CleaningConfig) -> (Column, InferenceOutcome) {
        let (table, outcome) = infer_types(Table::new(vec![column]), config);
        (table.into_columns().remove(0), outcome)
    }

    #[test]
    fn midnight_dates_become_date_only() {
        let column = text_column(
            "when",
            &[Some("2023-01-01"), Some("2023-02-01"), Some("2023-03-01"), None],
        );
        let (column, outcome) = infer_single(column, &CleaningConfig::default());
        assert_eq!(column.semantic_type, Some(SemanticType::Date));
        assert_eq!(column.values[1], Cell::text("2023-02-01"));
        assert!(column.values[3].is_null());
        assert_eq!(outcome.date_columns, vec!["when".to_string()]);
    }

    #[test]
    fn any_time_of_day_switches_to_full_timestamp() {
        let column = text_column("ts", &[Some("2023-01-01"), Some("2023-01-02 13:45:00")]);
        let (column, _) = infer_single(column, &CleaningConfig::default());
        assert_eq!(column.values[0], Cell::text("2023-01-01T00:00:00"));
        assert_eq!(column.values[1], Cell::text("2023-01-02T13:45:00"));
    }

    #[test]
    fn date_sample_stops_at_the_first_two_hundred_values() {
        let dates: Vec<String> = (0..DATE_SAMPLE_SIZE)
            .map(|i| format!("2024-01-{:02}", i % 28 + 1))
            .collect();
        let mut values: Vec<Option<&str>> = dates.iter().map(|d| Some(d.as_str())).collect();
        values.extend(std::iter::repeat_n(Some("pending"), 2 * DATE_SAMPLE_SIZE));
        let (column, outcome) =
            infer_single(text_column("due", &values), &CleaningConfig::default());
        assert_eq!(column.semantic_type, Some(SemanticType::Date));
        assert_eq!(outcome.date_columns, vec!["due".to_string()]);
        assert_eq!(column.values[0], Cell::text("2024-01-01"));
        assert!(column.values[DATE_SAMPLE_SIZE].is_null());
        assert_eq!(column.null_count(), 2 * DATE_SAMPLE_SIZE);
    }

    #[test]
    fn below_sample_ratio_is_not_a_date() {
        let column = text_column("mixed", &[Some("2023-01-01"), Some("abc"), Some("def")]);
        let (column, outcome) = infer_single(column, &CleaningConfig::default());
        assert_eq!(column.semantic_type, Some(SemanticType::Categorical));
        assert!(outcome.date_columns.is_empty());
    }

    #[test]
    fn forced_date_column_nulls_unparsable_values() {
        let config = CleaningConfig {
            date_cols: Some(BTreeSet::from(["joined".to_string()])),
            ..CleaningConfig::default()
        };
        let column = text_column("joined", &[Some("2021-06-01"), Some("soon"), Some("later")]);
        let (column, _) = infer_single(column, &config);
        assert_eq!(column.semantic_type, Some(SemanticType::Date));
        assert_eq!(
            column.values,
            vec![Cell::text("2021-06-01"), Cell::Null, Cell::Null]
        );
    }

    #[test]
    fn forced_date_with_nothing_parsable_falls_through() {
        let config = CleaningConfig {
            date_cols: Some(BTreeSet::from(["code".to_string()])),
            ..CleaningConfig::default()
        };
        let column = text_column("code", &[Some("10"), Some("20")]);
        let (column, _) = infer_single(column, &config);
        assert_eq!(column.semantic_type, Some(SemanticType::Numeric));
    }

    #[test]
    fn numeric_threshold_is_ninety_percent_of_non_null() {
        let mut values: Vec<Option<&str>> = vec![Some("1"); 9];
        values.push(Some("oops"));
        values.push(None);
        let (column, _) = infer_single(text_column("n", &values), &CleaningConfig::default());
        assert_eq!(column.semantic_type, Some(SemanticType::Numeric));
        assert!(column.values[9].is_null());
        assert_eq!(column.values[0], Cell::Number(1.0));

        let mut values: Vec<Option<&str>> = vec![Some("1"); 8];
        values.push(Some("x"));
        values.push(Some("y"));
        let (column, _) = infer_single(text_column("n", &values), &CleaningConfig::default());
        assert_eq!(column.semantic_type, Some(SemanticType::Categorical));
    }

    #[test]
    fn native_numbers_stay_numeric() {
        let column = Column::new("n", vec![Cell::Number(1.5), Cell::Null]);
        let (column, _) = infer_single(column, &CleaningConfig::default());
        assert_eq!(column.semantic_type, Some(SemanticType::Numeric));
        assert_eq!(column.values[0], Cell::Number(1.5));
    }

    #[test]
    fn categorical_fallback_renders_numbers_as_text() {
        let column = Column::new(
            "mixed",
            vec![Cell::Number(3.0), Cell::text("red"), Cell::text("blue")],
        );
        let (column, _) = infer_single(column, &CleaningConfig::default());
        assert_eq!(column.semantic_type, Some(SemanticType::Categorical));
        assert_eq!(column.values[0], Cell::text("3"));
    }
}

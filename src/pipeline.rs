//! Fixed-order cleaning pipeline.
//!
//! Each stage takes the table by value and hands back the transformed table
//! together with its report fragment; the driver folds fragments into a
//! [`CleaningReport`]. Stages never perform I/O and never retry.

use std::path::Path;

use log::info;

use crate::{
    categorical::normalize_categoricals,
    columns::{collapse_duplicate_columns, header_quality_score, standardize_column_names},
    config::CleaningConfig,
    dedupe::remove_duplicate_rows,
    error::{CleanError, ConfigError},
    inference::infer_types,
    loader::{self, LoadOptions},
    missing::handle_missing_values,
    noise::{remove_noise_rows, trim_trailing_blank_rows},
    placeholders::normalize_placeholders,
    report::{CleaningReport, ReportAssembler, ReportFragment, Stage},
    table::Table,
};

#[derive(Debug, Clone)]
pub struct CleanedTable {
    pub table: Table,
    pub report: CleaningReport,
}

struct Driver {
    assembler: ReportAssembler,
}

impl Driver {
    fn run<F>(&mut self, stage: Stage, table: Table, step: F) -> Table
    where
        F: FnOnce(Table) -> (Table, ReportFragment),
    {
        let before = table.shape();
        let (table, fragment) = step(table);
        let after = table.shape();
        debug_assert!(after.rows <= before.rows && after.cols <= before.cols);
        self.assembler.record(stage, before, after, fragment);
        table
    }
}

/// Runs every cleaning stage over `table` in order.
///
/// Fails only when `config` itself is invalid.
pub fn clean_table(table: Table, config: &CleaningConfig) -> Result<CleanedTable, ConfigError> {
    config.validate()?;
    let patterns = config.noise.compile()?;
    let lowercase = config.lowercase_categoricals;

    let mut driver = Driver {
        assembler: ReportAssembler::new(table.shape(), config.missing_mode),
    };

    let table = driver.run(Stage::Placeholders, table, |t| {
        let (t, replaced) = normalize_placeholders(t);
        (t, ReportFragment::Placeholders { replaced })
    });
    let table = driver.run(Stage::NoiseRows, table, |t| {
        let (t, outcome) = remove_noise_rows(t, &config.noise, &patterns);
        (t, ReportFragment::NoiseRows(outcome))
    });
    let table = driver.run(Stage::TrailingRows, table, |t| {
        let (t, removed) = trim_trailing_blank_rows(t);
        (t, ReportFragment::TrailingRows { removed })
    });
    let table = driver.run(Stage::ColumnNames, table, |t| {
        let t = standardize_column_names(t, lowercase);
        let header_quality_score = header_quality_score(&t);
        (
            t,
            ReportFragment::ColumnNames {
                header_quality_score,
            },
        )
    });
    let table = driver.run(Stage::DuplicateColumns, table, |t| {
        let (t, removed) = collapse_duplicate_columns(t);
        (t, ReportFragment::DuplicateColumns { removed })
    });
    let table = driver.run(Stage::TypeInference, table, |t| {
        let (t, outcome) = infer_types(t, config);
        (t, ReportFragment::Types(outcome))
    });
    let table = driver.run(Stage::Categoricals, table, |t| {
        (normalize_categoricals(t, lowercase), ReportFragment::Categoricals)
    });
    let table = driver.run(Stage::DuplicateRows, table, |t| {
        let (t, removed) = remove_duplicate_rows(t);
        (t, ReportFragment::DuplicateRows { removed })
    });
    let table = driver.run(Stage::MissingValues, table, |t| {
        let (t, outcome) = handle_missing_values(t, config);
        (t, ReportFragment::Missing(outcome))
    });

    let report = driver.assembler.finish();
    info!(
        "Cleaned table: {}x{} -> {}x{}",
        report.rows_before, report.cols_before, report.rows_after, report.cols_after
    );
    Ok(CleanedTable { table, report })
}

pub fn clean_bytes(
    bytes: &[u8],
    options: &LoadOptions,
    config: &CleaningConfig,
) -> Result<CleanedTable, CleanError> {
    let table = loader::load_bytes(bytes, options)?;
    Ok(clean_table(table, config)?)
}

pub fn clean_path(
    path: &Path,
    options: &LoadOptions,
    config: &CleaningConfig,
) -> Result<CleanedTable, CleanError> {
    let table = loader::load_path(path, options)?;
    Ok(clean_table(table, config)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::MissingMode, data::Cell, table::SemanticType};

    fn csv(text: &str) -> CleanedTable {
        clean_bytes(text.as_bytes(), &LoadOptions::default(), &CleaningConfig::default())
            .expect("clean")
    }

    #[test]
    fn sparse_row_is_dropped_for_missing_threshold() {
        let header = "c0,c1,c2,c3,c4,c5,c6,c7,c8,c9";
        let full = |n: usize| {
            (0..10)
                .map(|c| format!("v{n}_{c}"))
                .collect::<Vec<_>>()
                .join(",")
        };
        let sparse = "x,,,,,,,,,";
        let text = format!(
            "{header}\n{}\n{}\n{sparse}\n{}\n{}\n",
            full(0),
            full(1),
            full(3),
            full(4)
        );
        let cleaned = csv(&text);
        assert_eq!(cleaned.report.rows_dropped_for_missing, 1);
        assert_eq!(cleaned.table.row_count(), 4);
        assert!(
            cleaned
                .report
                .notes
                .contains(&"dropped 1 rows exceeding missing threshold".to_string())
        );
    }

    #[test]
    fn date_column_is_standardized_to_date_only() {
        let cleaned = csv("when,n\n2023-01-01,1\n2023-02-01,2\n2023-03-01,3\n,4\n");
        let when = cleaned.table.column("when").expect("when");
        assert_eq!(when.semantic_type, Some(SemanticType::Date));
        assert_eq!(when.values[0], Cell::text("2023-01-01"));
        assert_eq!(cleaned.report.date_columns_standardized, vec!["when"]);
        assert_eq!(
            cleaned.report.dtype_inference.get("when"),
            Some(&SemanticType::Date)
        );
    }

    #[test]
    fn identical_columns_collapse_to_the_first() {
        let cleaned = csv("a,b,c\n1,x,x\n2,y,y\n3,z,z\n");
        assert_eq!(cleaned.report.duplicate_columns_removed, vec!["c"]);
        assert_eq!(cleaned.table.column_count(), 2);
        assert_eq!(cleaned.report.cols_before, 3);
        assert_eq!(cleaned.report.cols_after, 2);
    }

    #[test]
    fn header_quality_is_reported_on_standardized_names() {
        let cleaned = csv("id,1,name\na,2,b\nc,3,d\n");
        assert!((cleaned.report.header_quality_score - 0.333).abs() < 1e-9);
        assert_eq!(cleaned.report.header_row_detected, 0);
    }

    #[test]
    fn noise_placeholders_and_duplicates_feed_the_report() {
        let text = "Name,Score,Note\n\
                    alice,1,ok\n\
                    pip install pandas,,\n\
                    bob,nan,fine\n\
                    alice,1,ok\n\
                    ,,\n";
        let cleaned = csv(text);
        let report = &cleaned.report;
        assert_eq!(report.placeholders_replaced, 1);
        assert_eq!(report.noise_rows_removed, 1);
        assert_eq!(report.trailing_empty_rows_removed, 1);
        assert_eq!(report.duplicates_removed, 1);
        assert_eq!(cleaned.table.column_names(), vec!["name", "score", "note"]);
        assert_eq!(cleaned.table.row_count(), 2);
        // bob's score filled with the median of the remaining values
        assert_eq!(cleaned.table.cell(1, 1), Some(&Cell::Number(1.0)));
        assert_eq!(report.stages.len(), 9);
        assert_eq!(report.notes[0], "standardized column names");
    }

    #[test]
    fn leave_mode_keeps_nulls() {
        let config = CleaningConfig {
            missing_mode: MissingMode::Leave,
            ..CleaningConfig::default()
        };
        let table = loader::load_bytes(b"a,b\n1,\n2,x\n", &LoadOptions::default()).expect("load");
        let cleaned = clean_table(table, &config).expect("clean");
        assert!(cleaned.table.cell(0, 1).is_some_and(Cell::is_null));
        assert_eq!(cleaned.report.missing_mode, MissingMode::Leave);
    }

    #[test]
    fn invalid_threshold_is_rejected_before_any_stage() {
        let config = CleaningConfig {
            drop_row_missing_threshold: 1.5,
            ..CleaningConfig::default()
        };
        let result = clean_table(Table::empty(), &config);
        assert!(matches!(result, Err(ConfigError::Threshold(_))));
    }

    #[test]
    fn empty_input_produces_an_empty_report() {
        let cleaned = csv("");
        assert_eq!(cleaned.table.row_count(), 0);
        assert_eq!(cleaned.report.rows_after, 0);
        assert_eq!(cleaned.report.header_quality_score, 0.0);
    }
}

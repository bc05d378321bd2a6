//! Folds per-stage report fragments into one [`CleaningReport`] with an
//! ordered list of human-readable notes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    config::MissingMode,
    inference::InferenceOutcome,
    missing::{MissingCounts, MissingOutcome},
    noise::NoiseOutcome,
    table::{SemanticType, Shape},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Placeholders,
    NoiseRows,
    TrailingRows,
    ColumnNames,
    DuplicateColumns,
    TypeInference,
    Categoricals,
    DuplicateRows,
    MissingValues,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSummary {
    pub stage: Stage,
    pub rows_before: usize,
    pub rows_after: usize,
    pub cols_before: usize,
    pub cols_after: usize,
}

/// What a single stage contributes to the report.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportFragment {
    Placeholders { replaced: usize },
    NoiseRows(NoiseOutcome),
    TrailingRows { removed: usize },
    ColumnNames { header_quality_score: f64 },
    DuplicateColumns { removed: Vec<String> },
    Types(InferenceOutcome),
    Categoricals,
    DuplicateRows { removed: usize },
    Missing(MissingOutcome),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleaningReport {
    pub rows_before: usize,
    pub cols_before: usize,
    pub rows_after: usize,
    pub cols_after: usize,
    pub stages: Vec<StageSummary>,
    pub placeholders_replaced: usize,
    pub noise_rows_removed: usize,
    pub noise_filter_skipped: bool,
    pub trailing_empty_rows_removed: usize,
    pub duplicate_columns_removed: Vec<String>,
    pub duplicates_removed: usize,
    pub rows_dropped_for_missing: usize,
    pub missing_mode: MissingMode,
    pub missing_by_column: BTreeMap<String, MissingCounts>,
    pub dtype_inference: BTreeMap<String, SemanticType>,
    pub date_columns_standardized: Vec<String>,
    pub header_row_detected: usize,
    pub header_quality_score: f64,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ReportAssembler {
    report: CleaningReport,
}

impl ReportAssembler {
    pub fn new(input: Shape, missing_mode: MissingMode) -> Self {
        Self {
            report: CleaningReport {
                rows_before: input.rows,
                cols_before: input.cols,
                rows_after: input.rows,
                cols_after: input.cols,
                stages: Vec::new(),
                placeholders_replaced: 0,
                noise_rows_removed: 0,
                noise_filter_skipped: false,
                trailing_empty_rows_removed: 0,
                duplicate_columns_removed: Vec::new(),
                duplicates_removed: 0,
                rows_dropped_for_missing: 0,
                missing_mode,
                missing_by_column: BTreeMap::new(),
                dtype_inference: BTreeMap::new(),
                date_columns_standardized: Vec::new(),
                header_row_detected: 0,
                header_quality_score: 0.0,
                notes: Vec::new(),
            },
        }
    }

    pub fn record(&mut self, stage: Stage, before: Shape, after: Shape, fragment: ReportFragment) {
        self.report.stages.push(StageSummary {
            stage,
            rows_before: before.rows,
            rows_after: after.rows,
            cols_before: before.cols,
            cols_after: after.cols,
        });
        self.report.rows_after = after.rows;
        self.report.cols_after = after.cols;

        let report = &mut self.report;
        match fragment {
            ReportFragment::Placeholders { replaced } => report.placeholders_replaced = replaced,
            ReportFragment::NoiseRows(outcome) => {
                report.noise_rows_removed = outcome.removed;
                report.noise_filter_skipped = outcome.skipped;
            }
            ReportFragment::TrailingRows { removed } => {
                report.trailing_empty_rows_removed = removed;
            }
            ReportFragment::ColumnNames {
                header_quality_score,
            } => report.header_quality_score = header_quality_score,
            ReportFragment::DuplicateColumns { removed } => {
                report.duplicate_columns_removed = removed;
            }
            ReportFragment::Types(outcome) => {
                report.dtype_inference = outcome.types.into_iter().collect();
                report.date_columns_standardized = outcome.date_columns;
            }
            ReportFragment::Categoricals => {}
            ReportFragment::DuplicateRows { removed } => report.duplicates_removed = removed,
            ReportFragment::Missing(outcome) => {
                report.rows_dropped_for_missing = outcome.rows_dropped;
                report.missing_by_column = outcome.by_column.into_iter().collect();
            }
        }
    }

    pub fn finish(mut self) -> CleaningReport {
        self.report.notes = build_notes(&self.report);
        self.report
    }
}

/// Notes in fixed order; only non-zero counters produce a note, except the
/// column-name note which is always present.
pub fn build_notes(report: &CleaningReport) -> Vec<String> {
    let mut notes = vec!["standardized column names".to_string()];
    if report.noise_rows_removed > 0 {
        notes.push(format!("removed {} noise rows", report.noise_rows_removed));
    }
    if report.trailing_empty_rows_removed > 0 {
        notes.push(format!(
            "removed {} trailing empty rows",
            report.trailing_empty_rows_removed
        ));
    }
    if !report.duplicate_columns_removed.is_empty() {
        notes.push(format!(
            "dropped duplicate columns: {}",
            report.duplicate_columns_removed.join(", ")
        ));
    }
    if report.duplicates_removed > 0 {
        notes.push(format!("removed {} duplicate rows", report.duplicates_removed));
    }
    if report.rows_dropped_for_missing > 0 {
        notes.push(format!(
            "dropped {} rows exceeding missing threshold",
            report.rows_dropped_for_missing
        ));
    }
    if !report.date_columns_standardized.is_empty() {
        notes.push(format!(
            "standardized date columns: {}",
            report.date_columns_standardized.join(", ")
        ));
    }
    notes
}

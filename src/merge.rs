//! Combining a freshly cleaned table with a dataset's stored table.
//!
//! [`MergeEngine`] loads the existing table through an injected
//! [`TableStore`] and dispatches to one of three strategies. The merge
//! itself never writes; persisting the result is the caller's job.

use std::{collections::BTreeMap, fmt, str::FromStr};

use log::info;
use serde::{Deserialize, Serialize};

use crate::{
    append::append_below,
    data::Cell,
    error::MergeError,
    join::merge_on_column,
    store::TableStore,
    table::{Column, SemanticType, Table},
};

pub const KEEP_SEPARATE_MESSAGE: &str = "Data should be kept as separate dataset";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    AppendBelow,
    MergeOnColumn,
    KeepSeparate,
}

impl MergeStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeStrategy::AppendBelow => "append_below",
            MergeStrategy::MergeOnColumn => "merge_on_column",
            MergeStrategy::KeepSeparate => "keep_separate",
        }
    }
}

impl fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MergeStrategy {
    type Err = MergeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "append_below" => Ok(MergeStrategy::AppendBelow),
            "merge_on_column" => Ok(MergeStrategy::MergeOnColumn),
            "keep_separate" => Ok(MergeStrategy::KeepSeparate),
            _ => Err(MergeError::UnknownStrategy(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinType {
    Inner,
    Left,
    Right,
    #[default]
    Outer,
}

impl JoinType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JoinType::Inner => "inner",
            JoinType::Left => "left",
            JoinType::Right => "right",
            JoinType::Outer => "outer",
        }
    }
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JoinType {
    type Err = MergeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "inner" => Ok(JoinType::Inner),
            "left" => Ok(JoinType::Left),
            "right" => Ok(JoinType::Right),
            "outer" | "full" => Ok(JoinType::Outer),
            _ => Err(MergeError::UnknownJoinType(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeRequest {
    pub strategy: MergeStrategy,
    /// Required for [`MergeStrategy::MergeOnColumn`].
    pub merge_column: Option<String>,
    pub join_type: JoinType,
    pub prefix_conflicting_columns: bool,
}

impl MergeRequest {
    pub fn new(strategy: MergeStrategy) -> Self {
        Self {
            strategy,
            merge_column: None,
            join_type: JoinType::default(),
            prefix_conflicting_columns: true,
        }
    }

    pub fn on_column(column: impl Into<String>, join_type: JoinType) -> Self {
        Self {
            merge_column: Some(column.into()),
            join_type,
            ..Self::new(MergeStrategy::MergeOnColumn)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppendSummary {
    pub existing_columns: Vec<String>,
    pub new_columns: Vec<String>,
    pub missing_in_new: Vec<String>,
    pub missing_in_existing: Vec<String>,
    pub rows_before: usize,
    pub rows_added: usize,
    pub rows_after: usize,
    pub columns_before: usize,
    pub columns_after: usize,
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinSummary {
    pub merge_column: String,
    pub join_type: JoinType,
    pub existing_columns: Vec<String>,
    pub new_columns: Vec<String>,
    pub conflicting_columns: Vec<String>,
    /// New-table column name -> name in the merged table.
    pub renamed_columns: BTreeMap<String, String>,
    pub rows_before_existing: usize,
    pub rows_before_new: usize,
    pub rows_after: usize,
    pub columns_before: usize,
    pub columns_after: usize,
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeparateSummary {
    pub message: String,
    pub merged: bool,
    pub new_rows: usize,
    pub new_columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum MergeMetadata {
    AppendBelow(AppendSummary),
    MergeOnColumn(JoinSummary),
    KeepSeparate(SeparateSummary),
}

impl MergeMetadata {
    pub fn strategy(&self) -> MergeStrategy {
        match self {
            MergeMetadata::AppendBelow(_) => MergeStrategy::AppendBelow,
            MergeMetadata::MergeOnColumn(_) => MergeStrategy::MergeOnColumn,
            MergeMetadata::KeepSeparate(_) => MergeStrategy::KeepSeparate,
        }
    }

    /// False when the new table should be stored as its own dataset.
    pub fn is_merged(&self) -> bool {
        !matches!(self, MergeMetadata::KeepSeparate(_))
    }

    pub fn rows_after(&self) -> usize {
        match self {
            MergeMetadata::AppendBelow(summary) => summary.rows_after,
            MergeMetadata::MergeOnColumn(summary) => summary.rows_after,
            MergeMetadata::KeepSeparate(summary) => summary.new_rows,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeColumns {
    pub common_columns: Vec<String>,
    pub existing_only: Vec<String>,
    pub new_only: Vec<String>,
}

/// Column-set comparison used to preview a merge. Lists follow table order.
pub fn merge_columns(existing: &Table, new: &Table) -> MergeColumns {
    MergeColumns {
        common_columns: existing
            .column_names()
            .into_iter()
            .filter(|name| new.has_column(name))
            .collect(),
        existing_only: existing
            .column_names()
            .into_iter()
            .filter(|name| !new.has_column(name))
            .collect(),
        new_only: new
            .column_names()
            .into_iter()
            .filter(|name| !existing.has_column(name))
            .collect(),
    }
}

pub fn keep_separate(new: &Table) -> (Table, SeparateSummary) {
    (
        new.clone(),
        SeparateSummary {
            message: KEEP_SEPARATE_MESSAGE.to_string(),
            merged: false,
            new_rows: new.row_count(),
            new_columns: new.column_names(),
        },
    )
}

/// Pure dispatch over two in-memory tables.
pub fn merge_tables(
    existing: &Table,
    new: &Table,
    request: &MergeRequest,
) -> Result<(Table, MergeMetadata), MergeError> {
    match request.strategy {
        MergeStrategy::AppendBelow => {
            let (table, summary) = append_below(existing, new);
            Ok((table, MergeMetadata::AppendBelow(summary)))
        }
        MergeStrategy::MergeOnColumn => {
            let column = request
                .merge_column
                .as_deref()
                .filter(|c| !c.trim().is_empty())
                .ok_or(MergeError::MissingMergeColumn)?;
            let (table, summary) = merge_on_column(
                existing,
                new,
                column,
                request.join_type,
                request.prefix_conflicting_columns,
            )?;
            Ok((table, MergeMetadata::MergeOnColumn(summary)))
        }
        MergeStrategy::KeepSeparate => {
            let (table, summary) = keep_separate(new);
            Ok((table, MergeMetadata::KeepSeparate(summary)))
        }
    }
}

/// Builds a merged column whose declared type agrees with its values.
pub(crate) fn settle_column(
    name: String,
    values: Vec<Cell>,
    left: Option<SemanticType>,
    right: Option<SemanticType>,
) -> Column {
    let mut semantic_type = SemanticType::unify(left, right);
    if semantic_type == Some(SemanticType::Numeric)
        && values.iter().any(|cell| matches!(cell, Cell::Text(_)))
    {
        semantic_type = Some(SemanticType::Categorical);
    }
    let mut column = Column {
        name,
        semantic_type,
        values,
    };
    column.conform();
    column
}

pub struct MergeEngine<S> {
    store: S,
}

impl<S: TableStore> MergeEngine<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Loads `dataset` and merges `new` into it. Neither table is modified
    /// and nothing is saved.
    pub fn merge(
        &self,
        dataset: &str,
        new: &Table,
        request: &MergeRequest,
    ) -> Result<(Table, MergeMetadata), MergeError> {
        let existing = self.store.load_table(dataset)?;
        let (table, metadata) = merge_tables(&existing, new, request)?;
        info!(
            "Merged into dataset '{dataset}' via {}: {} row(s), {} column(s)",
            metadata.strategy(),
            table.row_count(),
            table.column_count()
        );
        Ok((table, metadata))
    }

    pub fn available_merge_columns(
        &self,
        dataset: &str,
        new: &Table,
    ) -> Result<MergeColumns, MergeError> {
        let existing = self.store.load_table(dataset)?;
        Ok(merge_columns(&existing, new))
    }
}

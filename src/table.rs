//! In-memory table model shared by every pipeline stage and the merge engine.
//!
//! A [`Table`] is an ordered list of named [`Column`]s that always have the
//! same length. Row-removing operations keep the relative order of surviving
//! rows; nothing here reorders rows.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::data::Cell;

/// Logical kind of a column, decided once by type inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticType {
    Numeric,
    Date,
    Categorical,
}

impl SemanticType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SemanticType::Numeric => "numeric",
            SemanticType::Date => "date",
            SemanticType::Categorical => "categorical",
        }
    }

    /// Type of a column built from two columns of the same name.
    pub fn unify(left: Option<Self>, right: Option<Self>) -> Option<Self> {
        match (left, right) {
            (Some(a), Some(b)) if a == b => Some(a),
            (Some(_), Some(_)) => Some(SemanticType::Categorical),
            (Some(a), None) | (None, Some(a)) => Some(a),
            (None, None) => None,
        }
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    /// `None` until type inference has run.
    pub semantic_type: Option<SemanticType>,
    pub values: Vec<Cell>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Cell>) -> Self {
        Self {
            name: name.into(),
            semantic_type: None,
            values,
        }
    }

    pub fn with_type(mut self, semantic_type: SemanticType) -> Self {
        self.semantic_type = Some(semantic_type);
        self
    }

    pub fn null_count(&self) -> usize {
        self.values.iter().filter(|cell| cell.is_null()).count()
    }

    pub fn non_null(&self) -> impl Iterator<Item = &Cell> {
        self.values.iter().filter(|cell| !cell.is_null())
    }

    /// True when the column holds at least one text cell, i.e. its storage
    /// is not purely numeric.
    pub fn is_text_typed(&self) -> bool {
        self.values.iter().any(|cell| matches!(cell, Cell::Text(_)))
    }

    /// Re-express cells so they agree with the declared semantic type.
    /// Number cells in categorical or date columns become text.
    pub fn conform(&mut self) {
        if matches!(
            self.semantic_type,
            Some(SemanticType::Categorical | SemanticType::Date)
        ) {
            for cell in &mut self.values {
                if let Cell::Number(n) = cell {
                    *cell = Cell::Text(crate::data::format_number(*n));
                }
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    row_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shape {
    pub rows: usize,
    pub cols: usize,
}

impl Table {
    /// Builds a table from columns, padding shorter columns with nulls so the
    /// result is rectangular.
    pub fn new(mut columns: Vec<Column>) -> Self {
        let row_count = columns.iter().map(|c| c.values.len()).max().unwrap_or(0);
        for column in &mut columns {
            column.values.resize(row_count, Cell::Null);
        }
        Self { columns, row_count }
    }

    /// Builds a table from a header and row-major records. Short rows are
    /// padded with nulls, long rows truncated to the header width.
    pub fn from_rows(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let width = headers.len();
        let row_count = rows.len();
        let mut columns: Vec<Column> = headers
            .into_iter()
            .map(|name| Column::new(name, Vec::with_capacity(row_count)))
            .collect();
        for row in rows {
            let mut cells = row.into_iter();
            for column in columns.iter_mut().take(width) {
                column.values.push(cells.next().unwrap_or(Cell::Null));
            }
        }
        Self {
            columns,
            row_count,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn shape(&self) -> Shape {
        Shape {
            rows: self.row_count,
            cols: self.columns.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0 || self.columns.is_empty()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn columns_mut(&mut self) -> &mut [Column] {
        &mut self.columns
    }

    pub fn into_columns(self) -> Vec<Column> {
        self.columns
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.columns.get(col).and_then(|c| c.values.get(row))
    }

    pub fn row(&self, index: usize) -> Vec<&Cell> {
        self.columns
            .iter()
            .filter_map(|c| c.values.get(index))
            .collect()
    }

    pub fn rows(&self) -> impl Iterator<Item = Vec<&Cell>> + '_ {
        (0..self.row_count).map(|idx| self.row(idx))
    }

    /// Fraction of null cells in the row; 0 for a table without columns.
    pub fn row_null_fraction(&self, index: usize) -> f64 {
        if self.columns.is_empty() {
            return 0.0;
        }
        let nulls = self
            .columns
            .iter()
            .filter(|c| c.values.get(index).is_none_or(Cell::is_null))
            .count();
        nulls as f64 / self.columns.len() as f64
    }

    /// Keeps the rows whose flag is `true`, preserving their order.
    pub fn retain_rows(&mut self, keep: &[bool]) {
        for column in &mut self.columns {
            let mut flags = keep.iter();
            column
                .values
                .retain(|_| flags.next().copied().unwrap_or(true));
        }
        self.row_count = self.columns.first().map_or_else(
            || keep.iter().filter(|k| **k).count(),
            |c| c.values.len(),
        );
    }

    pub fn truncate_rows(&mut self, len: usize) {
        for column in &mut self.columns {
            column.values.truncate(len);
        }
        self.row_count = self.row_count.min(len);
    }

    pub fn drop_columns(&mut self, names: &[String]) {
        self.columns.retain(|c| !names.contains(&c.name));
    }

    pub fn push_column(&mut self, mut column: Column) {
        if self.columns.is_empty() && self.row_count == 0 {
            self.row_count = column.values.len();
        }
        column.values.resize(self.row_count, Cell::Null);
        self.columns.push(column);
    }
}

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::{config::MissingMode, merge::JoinType};

#[derive(Debug, Parser)]
#[command(author, version, about = "Clean and merge messy tabular uploads", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Clean a CSV or spreadsheet file and emit the cleaned table plus a report
    Clean(CleanArgs),
    /// Clean a file and merge it into a stored dataset
    Merge(MergeArgs),
    /// Show which columns a file shares with a stored dataset
    MergeColumns(MergeColumnsArgs),
    /// Clean a file and print a per-column profile
    Profile(ProfileArgs),
    /// Clean a file and preview the first rows in a formatted table
    Preview(PreviewArgs),
}

#[derive(Debug, Clone, Args)]
pub struct InputArgs {
    /// Input CSV or spreadsheet file
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// CSV delimiter character (supports ',', 'tab', ';', '|'); sniffed when omitted
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// YAML cleaning configuration
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
#[value(rename_all = "kebab-case")]
pub enum MissingModeArg {
    DropRows,
    ImputeMean,
    Leave,
}

impl From<MissingModeArg> for MissingMode {
    fn from(value: MissingModeArg) -> Self {
        match value {
            MissingModeArg::DropRows => MissingMode::DropRows,
            MissingModeArg::ImputeMean => MissingMode::ImputeMean,
            MissingModeArg::Leave => MissingMode::Leave,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct CleaningOverrides {
    /// Missing-data policy
    #[arg(long = "missing-mode", value_enum)]
    pub missing_mode: Option<MissingModeArg>,
    /// Row null fraction above which a row is dropped (0-1)
    #[arg(long = "drop-threshold")]
    pub drop_threshold: Option<f64>,
    /// Keep the original case of column names and categorical values
    #[arg(long = "keep-case")]
    pub keep_case: bool,
    /// Force a column to be parsed as dates (repeatable)
    #[arg(long = "date-col", action = clap::ArgAction::Append)]
    pub date_cols: Vec<String>,
}

#[derive(Debug, Args)]
pub struct CleanArgs {
    #[command(flatten)]
    pub source: InputArgs,
    #[command(flatten)]
    pub overrides: CleaningOverrides,
    /// Output CSV file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Write the cleaning report as JSON to this path
    #[arg(long)]
    pub report: Option<PathBuf>,
    /// Dataset store directory; requires --dataset
    #[arg(long, requires = "dataset")]
    pub store: Option<PathBuf>,
    /// Dataset id to save the cleaned table under
    #[arg(long, requires = "store")]
    pub dataset: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
#[value(rename_all = "kebab-case")]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Outer,
}

impl From<JoinKind> for JoinType {
    fn from(value: JoinKind) -> Self {
        match value {
            JoinKind::Inner => JoinType::Inner,
            JoinKind::Left => JoinType::Left,
            JoinKind::Right => JoinType::Right,
            JoinKind::Outer => JoinType::Outer,
        }
    }
}

#[derive(Debug, Args)]
pub struct MergeArgs {
    #[command(flatten)]
    pub source: InputArgs,
    #[command(flatten)]
    pub overrides: CleaningOverrides,
    /// Dataset store directory
    #[arg(long)]
    pub store: PathBuf,
    /// Existing dataset id to merge into
    #[arg(long)]
    pub dataset: String,
    /// Merge strategy: append_below, merge_on_column, or keep_separate
    #[arg(long)]
    pub strategy: String,
    /// Join column for merge-on-column
    #[arg(long = "on")]
    pub on: Option<String>,
    /// Join type for merge-on-column
    #[arg(long = "join", value_enum, default_value = "outer")]
    pub join: JoinKind,
    /// Suffix conflicting new columns with `_new` instead of prefixing `new_`
    #[arg(long = "no-prefix-conflicts")]
    pub no_prefix_conflicts: bool,
    /// Dataset id for keep-separate results (defaults to `<dataset>_new`)
    #[arg(long = "separate-dataset")]
    pub separate_dataset: Option<String>,
}

#[derive(Debug, Args)]
pub struct MergeColumnsArgs {
    #[command(flatten)]
    pub source: InputArgs,
    /// Dataset store directory
    #[arg(long)]
    pub store: PathBuf,
    /// Existing dataset id
    #[arg(long)]
    pub dataset: String,
}

#[derive(Debug, Args)]
pub struct ProfileArgs {
    #[command(flatten)]
    pub source: InputArgs,
    #[command(flatten)]
    pub overrides: CleaningOverrides,
    /// Emit the profile as JSON instead of a text table
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct PreviewArgs {
    #[command(flatten)]
    pub source: InputArgs,
    #[command(flatten)]
    pub overrides: CleaningOverrides,
    /// Number of rows to display
    #[arg(long, default_value_t = 10)]
    pub rows: usize,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" | "\\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}

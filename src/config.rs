//! Cleaning configuration, loadable from YAML with documented defaults.

use std::{collections::BTreeSet, fs, path::Path};

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericFill {
    #[default]
    Median,
    Mean,
    Zero,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoricalFill {
    #[default]
    Mode,
    Constant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingMode {
    #[default]
    DropRows,
    ImputeMean,
    Leave,
}

impl MissingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MissingMode::DropRows => "drop_rows",
            MissingMode::ImputeMean => "impute_mean",
            MissingMode::Leave => "leave",
        }
    }
}

impl std::str::FromStr for MissingMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "drop_rows" => Ok(MissingMode::DropRows),
            "impute_mean" => Ok(MissingMode::ImputeMean),
            "leave" => Ok(MissingMode::Leave),
            other => Err(format!(
                "Unknown missing mode '{other}' (expected drop_rows, impute_mean, or leave)"
            )),
        }
    }
}

pub const DEFAULT_NOISE_PATTERNS: &[&str] = &[
    r"^#",
    r"^pip ",
    r"^uvicorn ",
    r"^cd ",
    r"^python ",
    r"^py -",
];

/// Data driving the noise-row heuristic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseRules {
    /// Case-insensitive regular expressions tested against each non-null cell.
    pub patterns: Vec<String>,
    /// Tables with more rows than this skip the noise filter entirely.
    pub max_rows: usize,
    /// A repeated banner cell must be strictly longer than this.
    pub banner_min_chars: usize,
    /// Pattern matches only count on rows sparser than this.
    pub sparse_null_fraction: f64,
}

impl Default for NoiseRules {
    fn default() -> Self {
        Self {
            patterns: DEFAULT_NOISE_PATTERNS.iter().map(|p| p.to_string()).collect(),
            max_rows: 1000,
            banner_min_chars: 25,
            sparse_null_fraction: 0.4,
        }
    }
}

impl NoiseRules {
    pub fn compile(&self) -> Result<Vec<Regex>, ConfigError> {
        self.patterns
            .iter()
            .map(|pattern| {
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|err| ConfigError::NoisePattern {
                        pattern: pattern.clone(),
                        message: err.to_string(),
                    })
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    pub drop_row_missing_threshold: f64,
    pub numeric_fill: NumericFill,
    pub categorical_fill: CategoricalFill,
    pub constant_fill_value: Option<String>,
    pub lowercase_categoricals: bool,
    pub date_cols: Option<BTreeSet<String>>,
    pub missing_mode: MissingMode,
    pub noise: NoiseRules,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            drop_row_missing_threshold: 0.6,
            numeric_fill: NumericFill::default(),
            categorical_fill: CategoricalFill::default(),
            constant_fill_value: None,
            lowercase_categoricals: true,
            date_cols: None,
            missing_mode: MissingMode::default(),
            noise: NoiseRules::default(),
        }
    }
}

impl CleaningConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: CleaningConfig = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let threshold = self.drop_row_missing_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::Threshold(threshold));
        }
        self.noise.compile()?;
        Ok(())
    }

    pub fn is_forced_date(&self, column: &str) -> bool {
        self.date_cols
            .as_ref()
            .is_some_and(|cols| cols.contains(column))
    }
}

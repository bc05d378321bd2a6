//! Storage port for cleaned tables keyed by dataset id.
//!
//! Implementations may fail transiently with [`StoreError::Locked`] when
//! another writer holds the dataset; [`save_with_retry`] is the caller-side
//! helper that backs off and tries again.

use std::{
    collections::HashMap,
    fs::{self, File, OpenOptions},
    io::{self, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
    thread,
    time::Duration,
};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::{
    data::{Cell, parse_number},
    error::StoreError,
    io_utils,
    table::{Column, SemanticType, Table},
};

pub trait TableStore {
    fn load_table(&self, dataset: &str) -> Result<Table, StoreError>;
    fn save_table(&self, dataset: &str, table: &Table) -> Result<(), StoreError>;
}

impl<S: TableStore + ?Sized> TableStore for &S {
    fn load_table(&self, dataset: &str) -> Result<Table, StoreError> {
        (**self).load_table(dataset)
    }

    fn save_table(&self, dataset: &str, table: &Table) -> Result<(), StoreError> {
        (**self).save_table(dataset, table)
    }
}

pub fn cleaned_table_name(dataset: &str) -> String {
    format!("cleaned_{dataset}")
}

fn validate_id(dataset: &str) -> Result<(), StoreError> {
    let valid = !dataset.is_empty()
        && dataset
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidId(dataset.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct StoredColumn {
    name: String,
    semantic_type: Option<SemanticType>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct StoredMetadata {
    dataset: String,
    rows: usize,
    columns: Vec<StoredColumn>,
}

/// Keeps each dataset as `cleaned_<id>.csv` plus a `cleaned_<id>.meta.json`
/// sidecar recording column types. Writers hold `cleaned_<id>.lock` for the
/// duration of a save.
#[derive(Debug, Clone)]
pub struct CsvDirectoryStore {
    root: PathBuf,
}

struct LockGuard {
    path: PathBuf,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Err(err) = fs::remove_file(&self.path) {
            warn!("Failed to release lock {:?}: {err}", self.path);
        }
    }
}

impl CsvDirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn table_path(&self, dataset: &str) -> PathBuf {
        self.root.join(format!("{}.csv", cleaned_table_name(dataset)))
    }

    pub fn metadata_path(&self, dataset: &str) -> PathBuf {
        self.root
            .join(format!("{}.meta.json", cleaned_table_name(dataset)))
    }

    pub fn lock_path(&self, dataset: &str) -> PathBuf {
        self.root.join(format!("{}.lock", cleaned_table_name(dataset)))
    }

    fn acquire(&self, dataset: &str) -> Result<LockGuard, StoreError> {
        let path = self.lock_path(dataset);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => Ok(LockGuard { path }),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                Err(StoreError::Locked(dataset.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn read_metadata(&self, dataset: &str) -> Result<Option<StoredMetadata>, StoreError> {
        let path = self.metadata_path(dataset);
        match File::open(&path) {
            Ok(file) => Ok(Some(serde_json::from_reader(BufReader::new(file))?)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

impl TableStore for CsvDirectoryStore {
    fn load_table(&self, dataset: &str) -> Result<Table, StoreError> {
        validate_id(dataset)?;
        let path = self.table_path(dataset);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(dataset.to_string()));
            }
            Err(err) => return Err(err.into()),
        };
        let mut reader = io_utils::open_csv_reader(BufReader::new(file), io_utils::DEFAULT_CSV_DELIMITER);
        let mut records = reader.records();
        let headers: Vec<String> = match records.next() {
            Some(record) => record?.iter().map(str::to_string).collect(),
            None => return Ok(Table::empty()),
        };
        let mut rows = Vec::new();
        for record in records {
            let record = record?;
            rows.push(
                record
                    .iter()
                    .map(|field| {
                        if field.is_empty() {
                            Cell::Null
                        } else {
                            Cell::text(field)
                        }
                    })
                    .collect(),
            );
        }
        let mut table = Table::from_rows(headers, rows);

        if let Some(metadata) = self.read_metadata(dataset)? {
            for column in table.columns_mut() {
                let declared = metadata
                    .columns
                    .iter()
                    .find(|stored| stored.name == column.name)
                    .and_then(|stored| stored.semantic_type);
                restore_type(column, declared);
            }
        }
        debug!(
            "Loaded dataset '{dataset}' from {:?}: {} row(s)",
            path,
            table.row_count()
        );
        Ok(table)
    }

    fn save_table(&self, dataset: &str, table: &Table) -> Result<(), StoreError> {
        validate_id(dataset)?;
        fs::create_dir_all(&self.root)?;
        let _lock = self.acquire(dataset)?;

        let path = self.table_path(dataset);
        let staging = path.with_extension("csv.tmp");
        {
            let file = BufWriter::new(File::create(&staging)?);
            let mut writer = io_utils::csv_writer(file, io_utils::DEFAULT_CSV_DELIMITER);
            io_utils::write_table(&mut writer, table)?;
            writer.flush()?;
        }

        let metadata = StoredMetadata {
            dataset: dataset.to_string(),
            rows: table.row_count(),
            columns: table
                .columns()
                .iter()
                .map(|column| StoredColumn {
                    name: column.name.clone(),
                    semantic_type: column.semantic_type,
                })
                .collect(),
        };
        let metadata_path = self.metadata_path(dataset);
        let metadata_staging = metadata_path.with_extension("json.tmp");
        {
            let mut sidecar = BufWriter::new(File::create(&metadata_staging)?);
            serde_json::to_writer_pretty(&mut sidecar, &metadata)?;
            sidecar.flush()?;
        }

        // Both files are complete on disk before either replaces the live copy.
        fs::rename(&metadata_staging, &metadata_path)?;
        fs::rename(&staging, &path)?;

        info!(
            "Saved dataset '{dataset}' to {:?} ({} row(s), {} column(s))",
            path,
            table.row_count(),
            table.column_count()
        );
        Ok(())
    }
}

fn restore_type(column: &mut Column, declared: Option<SemanticType>) {
    column.semantic_type = declared;
    if declared == Some(SemanticType::Numeric) {
        for cell in &mut column.values {
            if let Cell::Text(value) = cell
                && let Some(number) = parse_number(value)
            {
                *cell = Cell::Number(number);
            }
        }
    }
}

/// Process-local store, handy for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<String, Table>>,
}

impl MemoryStore {
    pub fn insert(&self, dataset: &str, table: Table) {
        self.tables
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(dataset.to_string(), table);
    }

    pub fn get(&self, dataset: &str) -> Option<Table> {
        self.tables
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(dataset)
            .cloned()
    }
}

impl TableStore for MemoryStore {
    fn load_table(&self, dataset: &str) -> Result<Table, StoreError> {
        self.get(dataset)
            .ok_or_else(|| StoreError::NotFound(dataset.to_string()))
    }

    fn save_table(&self, dataset: &str, table: &Table) -> Result<(), StoreError> {
        self.insert(dataset, table.clone());
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(200),
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self
            .multiplier
            .max(1)
            .saturating_pow(attempt.saturating_sub(1));
        self.initial_delay.saturating_mul(factor)
    }
}

/// Saves `table`, retrying transient failures with exponential backoff.
/// Returns the number of attempts used.
pub fn save_with_retry<S: TableStore + ?Sized>(
    store: &S,
    dataset: &str,
    table: &Table,
    policy: &RetryPolicy,
) -> Result<u32, StoreError> {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match store.save_table(dataset, table) {
            Ok(()) => return Ok(attempt),
            Err(err) if err.is_transient() && attempt < max_attempts => {
                let delay = policy.delay_for(attempt);
                warn!(
                    "Save of dataset '{dataset}' failed (attempt {attempt}/{max_attempts}): {err}; retrying in {delay:?}"
                );
                thread::sleep(delay);
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

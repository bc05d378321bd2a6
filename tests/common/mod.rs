#![allow(dead_code)]

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::{TempDir, tempdir};
use tidytab::{
    data::Cell,
    table::{Column, SemanticType, Table},
};

/// A messy upload: pasted install command, placeholder tokens, a duplicate
/// row, a duplicated column, a sparse row, and a blank tail.
pub const MESSY_CSV: &str = "\
Order ID,Customer  Name,Ordered,Amount,Amount Copy,Region
1,  Alice Smith ,2024-01-05,10.5,10.5,North
pip install pandas,,,,,
2,Bob,2024-01-06,nan,nan,south
3,Cy,2024-02-01,7,7,NORTH
3,Cy,2024-02-01,7,7,NORTH
4,,,,,
5,Dee,2024-03-09,12,12,
,,,,,
";

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }

    pub fn read(&self, name: &str) -> String {
        fs::read_to_string(self.temp_dir.path().join(name)).expect("read temp file")
    }

    pub fn store_dir(&self) -> PathBuf {
        let dir = self.temp_dir.path().join("store");
        fs::create_dir_all(&dir).expect("create store dir");
        dir
    }
}

pub fn numeric(name: &str, values: &[f64]) -> Column {
    Column::new(name, values.iter().map(|v| Cell::Number(*v)).collect())
        .with_type(SemanticType::Numeric)
}

pub fn categorical(name: &str, values: &[&str]) -> Column {
    Column::new(name, values.iter().map(|v| Cell::text(*v)).collect())
        .with_type(SemanticType::Categorical)
}

pub fn table(columns: Vec<Column>) -> Table {
    Table::new(columns)
}

// src/testutil.rs
//! Fixture helpers shared by unit tests.

use std::{fs, path::Path};

use crate::config::DataPaths;
use crate::table::{TableStore, DURATION_FILE, META_FILE, SALARY_FILE};

pub fn fixture_store(root: &Path) -> TableStore {
    TableStore::new(DataPaths::new(root.join("tables"), root.join("allowances")))
}

pub fn write_table(root: &Path, name: &str, salaries: &str, durations: &str, meta: &str) {
    let dir = root.join("tables").join(name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(SALARY_FILE), salaries).unwrap();
    fs::write(dir.join(DURATION_FILE), durations).unwrap();
    fs::write(dir.join(META_FILE), meta).unwrap();
}

pub fn write_allowance(root: &Path, id: &str, meta: &str, grid: Option<&str>) {
    let dir = root.join("allowances").join(id);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(META_FILE), meta).unwrap();
    if let Some(grid) = grid {
        fs::write(dir.join(SALARY_FILE), grid).unwrap();
    }
}

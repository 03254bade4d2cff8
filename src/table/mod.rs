// src/table/mod.rs

pub mod grid;

pub use grid::{read_grid_csv, read_key_value_csv, Grid, GridRow, Metadata};

use glob::{glob, Pattern};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::DataPaths;
use crate::error::{CompareError, Result};

pub const SALARY_FILE: &str = "Table.csv";
pub const DURATION_FILE: &str = "Adv.csv";
pub const META_FILE: &str = "Meta.csv";

/// Everything known about one remuneration table, read fresh from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct TableBundle {
    pub name: String,
    /// Salary per (group, stage).
    pub salaries: Grid,
    /// Years spent in each (group, stage) before advancing.
    pub durations: Grid,
    pub meta: Metadata,
}

/// An allowance definition: its metadata plus its value grid.
#[derive(Debug, Clone, PartialEq)]
pub struct AllowanceSource {
    pub id: String,
    pub meta: Metadata,
    pub grid: Grid,
}

/// Resolves table and allowance names to their directories and reads them.
///
/// Holds no cache: every `load_*` call goes back to disk.
#[derive(Debug, Clone)]
pub struct TableStore {
    paths: DataPaths,
}

impl TableStore {
    pub fn new(paths: DataPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &DataPaths {
        &self.paths
    }

    pub fn table_dir(&self, name: &str) -> PathBuf {
        self.paths.tables_dir.join(name)
    }

    pub fn allowance_dir(&self, id: &str) -> PathBuf {
        self.paths.allowances_dir.join(id)
    }

    /// Load the salary grid, duration grid and metadata for `name`.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn load_bundle(&self, name: &str) -> Result<TableBundle> {
        let base = self.table_dir(name);
        if !base.is_dir() {
            return Err(CompareError::TableNotFound {
                name: name.to_string(),
                path: base,
            });
        }

        let salaries = read_grid_csv(base.join(SALARY_FILE))?;
        let durations = read_grid_csv(base.join(DURATION_FILE))?;
        let meta = read_key_value_csv(base.join(META_FILE))?;
        debug!(
            table = name,
            salary_groups = salaries.groups().count(),
            duration_groups = durations.groups().count(),
            meta_keys = meta.len(),
            "loaded table bundle"
        );

        Ok(TableBundle {
            name: name.to_string(),
            salaries,
            durations,
            meta,
        })
    }

    /// Load an allowance definition, or `None` when either of its files is
    /// missing.
    pub fn load_allowance(&self, id: &str) -> Result<Option<AllowanceSource>> {
        let dir = self.allowance_dir(id);
        let meta_path = dir.join(META_FILE);
        let grid_path = dir.join(SALARY_FILE);
        if !meta_path.is_file() || !grid_path.is_file() {
            debug!(allowance = id, dir = %dir.display(), "allowance definition not available");
            return Ok(None);
        }

        Ok(Some(AllowanceSource {
            id: id.to_string(),
            meta: read_key_value_csv(&meta_path)?,
            grid: read_grid_csv(&grid_path)?,
        }))
    }

    /// Names of every table directory that carries a salary grid, sorted.
    pub fn list_tables(&self) -> Result<Vec<String>> {
        let root = &self.paths.tables_dir;
        let pattern = format!(
            "{}/*/{}",
            Pattern::escape(&root.to_string_lossy()),
            SALARY_FILE
        );

        let mut names = Vec::new();
        let entries = glob(&pattern)
            .map_err(|e| CompareError::Config(format!("bad tables directory {:?}: {}", root, e)))?;
        for entry in entries {
            let path = match entry {
                Ok(path) => path,
                Err(e) => {
                    warn!(
                        path = %e.path().display(),
                        error = %e.error(),
                        "skipping unreadable entry"
                    );
                    continue;
                }
            };
            if let Some(name) = table_name_of(&path) {
                names.push(name);
            }
        }
        names.sort();
        info!(count = names.len(), root = %root.display(), "listed tables");
        Ok(names)
    }
}

fn table_name_of(salary_file: &Path) -> Option<String> {
    salary_file
        .parent()
        .and_then(Path::file_name)
        .map(|n| n.to_string_lossy().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{fixture_store, write_allowance, write_table};
    use tempfile::tempdir;

    #[test]
    fn loads_all_three_sources() {
        let tmp = tempdir().unwrap();
        let store = fixture_store(tmp.path());
        write_table(
            tmp.path(),
            "TV-A",
            "group,1,2\nE1,100,200\n",
            "group,1,2\nE1,1,2\n",
            "key,value\nallowances,jsz\n",
        );

        let bundle = store.load_bundle("TV-A").unwrap();
        assert_eq!(bundle.name, "TV-A");
        assert_eq!(bundle.salaries.get("E1", "2"), Some("200"));
        assert_eq!(bundle.durations.get("E1", "1"), Some("1"));
        assert_eq!(bundle.meta.allowance_ids(), vec!["jsz"]);
    }

    #[test]
    fn unknown_table_is_not_found() {
        let tmp = tempdir().unwrap();
        let store = fixture_store(tmp.path());

        let err = store.load_bundle("missing").unwrap_err();
        match err {
            CompareError::TableNotFound { name, .. } => assert_eq!(name, "missing"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn reload_sees_changes_on_disk() {
        let tmp = tempdir().unwrap();
        let store = fixture_store(tmp.path());
        write_table(tmp.path(), "T", "g,1\nE1,100\n", "g,1\nE1,1\n", "k,v\n");
        assert_eq!(store.load_bundle("T").unwrap().salaries.get("E1", "1"), Some("100"));

        write_table(tmp.path(), "T", "g,1\nE1,150\n", "g,1\nE1,1\n", "k,v\n");
        assert_eq!(store.load_bundle("T").unwrap().salaries.get("E1", "1"), Some("150"));
    }

    #[test]
    fn allowance_with_missing_file_is_none() {
        let tmp = tempdir().unwrap();
        let store = fixture_store(tmp.path());
        write_allowance(tmp.path(), "jsz", "key,value\nlabel_de,JSZ\n", Some("g,1\nA,10\n"));
        write_allowance(tmp.path(), "half", "key,value\n", None);

        let jsz = store.load_allowance("jsz").unwrap().unwrap();
        assert_eq!(jsz.meta.get("label_de"), Some("JSZ"));
        assert!(store.load_allowance("half").unwrap().is_none());
        assert!(store.load_allowance("absent").unwrap().is_none());
    }

    #[test]
    fn list_tables_requires_salary_grid() {
        let tmp = tempdir().unwrap();
        let store = fixture_store(tmp.path());
        write_table(tmp.path(), "B", "g,1\nE1,1\n", "g,1\nE1,1\n", "k,v\n");
        write_table(tmp.path(), "A", "g,1\nE1,1\n", "g,1\nE1,1\n", "k,v\n");
        std::fs::create_dir_all(store.table_dir("empty")).unwrap();

        assert_eq!(store.list_tables().unwrap(), vec!["A", "B"]);
    }

    #[cfg(unix)]
    #[test]
    fn list_tables_survives_unreadable_directory() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempdir().unwrap();
        let store = fixture_store(tmp.path());
        write_table(tmp.path(), "A", "g,1\nE1,1\n", "g,1\nE1,1\n", "k,v\n");
        let locked = store.table_dir("locked");
        std::fs::create_dir_all(&locked).unwrap();
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();

        let listed = store.list_tables();
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();
        assert_eq!(listed.unwrap(), vec!["A"]);
    }
}

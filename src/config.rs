// src/config.rs

use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::debug;

use crate::error::{CompareError, Result};

pub const DEFAULT_TABLES_DIR: &str = "data/tables";
pub const DEFAULT_ALLOWANCES_DIR: &str = "data/allowances";

/// Root directories for remuneration tables and allowance definitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataPaths {
    pub tables_dir: PathBuf,
    pub allowances_dir: PathBuf,
}

impl Default for DataPaths {
    fn default() -> Self {
        Self {
            tables_dir: PathBuf::from(DEFAULT_TABLES_DIR),
            allowances_dir: PathBuf::from(DEFAULT_ALLOWANCES_DIR),
        }
    }
}

/// On-disk shape of a paths file; every key is optional.
#[derive(Debug, Default, Deserialize)]
struct PathsFile {
    tables_dir: Option<PathBuf>,
    allowances_dir: Option<PathBuf>,
}

impl DataPaths {
    pub fn new(tables_dir: impl Into<PathBuf>, allowances_dir: impl Into<PathBuf>) -> Self {
        Self {
            tables_dir: tables_dir.into(),
            allowances_dir: allowances_dir.into(),
        }
    }

    /// Read a YAML paths file. Missing keys fall back to the defaults;
    /// relative paths are resolved against the file's own directory.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| CompareError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let parsed: PathsFile = serde_yaml::from_str(&text)
            .map_err(|e| CompareError::Config(format!("{}: {}", path.display(), e)))?;

        let root = path.parent().unwrap_or_else(|| Path::new("."));
        let resolve = |p: Option<PathBuf>, default: &str| {
            let p = p.unwrap_or_else(|| PathBuf::from(default));
            if p.is_relative() {
                root.join(p)
            } else {
                p
            }
        };

        let paths = Self {
            tables_dir: resolve(parsed.tables_dir, DEFAULT_TABLES_DIR),
            allowances_dir: resolve(parsed.allowances_dir, DEFAULT_ALLOWANCES_DIR),
        };
        debug!(?paths, file = %path.display(), "loaded data paths");
        Ok(paths)
    }

    /// Apply explicit overrides on top of `self`.
    pub fn with_overrides(
        mut self,
        tables_dir: Option<PathBuf>,
        allowances_dir: Option<PathBuf>,
    ) -> Self {
        if let Some(dir) = tables_dir {
            self.tables_dir = dir;
        }
        if let Some(dir) = allowances_dir {
            self.allowances_dir = dir;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn yaml_file_resolves_relative_dirs() {
        let tmp = tempdir().unwrap();
        let cfg = tmp.path().join("paths.yaml");
        let mut f = fs::File::create(&cfg).unwrap();
        writeln!(f, "tables_dir: tariffs").unwrap();
        writeln!(f, "allowances_dir: /srv/allowances").unwrap();

        let paths = DataPaths::from_yaml_file(&cfg).unwrap();
        assert_eq!(paths.tables_dir, tmp.path().join("tariffs"));
        assert_eq!(paths.allowances_dir, PathBuf::from("/srv/allowances"));
    }

    #[test]
    fn yaml_file_missing_keys_use_defaults() {
        let tmp = tempdir().unwrap();
        let cfg = tmp.path().join("paths.yaml");
        fs::write(&cfg, "{}\n").unwrap();

        let paths = DataPaths::from_yaml_file(&cfg).unwrap();
        assert_eq!(paths.tables_dir, tmp.path().join(DEFAULT_TABLES_DIR));
        assert_eq!(paths.allowances_dir, tmp.path().join(DEFAULT_ALLOWANCES_DIR));
    }

    #[test]
    fn invalid_yaml_is_config_error() {
        let tmp = tempdir().unwrap();
        let cfg = tmp.path().join("paths.yaml");
        fs::write(&cfg, "tables_dir: [unclosed\n").unwrap();

        let err = DataPaths::from_yaml_file(&cfg).unwrap_err();
        assert!(matches!(err, CompareError::Config(_)));
    }

    #[test]
    fn overrides_replace_only_given_dirs() {
        let paths = DataPaths::default().with_overrides(Some(PathBuf::from("x")), None);
        assert_eq!(paths.tables_dir, PathBuf::from("x"));
        assert_eq!(paths.allowances_dir, PathBuf::from(DEFAULT_ALLOWANCES_DIR));
    }
}

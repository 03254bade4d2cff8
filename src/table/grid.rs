// src/table/grid.rs

use csv::ReaderBuilder;
use serde::Serialize;
use std::{collections::BTreeMap, path::Path};
use tracing::{trace, warn};

use crate::error::{CompareError, Result};

/// One grid row: stage → raw cell text, in the source's column order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GridRow {
    cells: Vec<(String, String)>,
}

impl GridRow {
    pub fn from_pairs<I, S, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, V)>,
        S: Into<String>,
        V: Into<String>,
    {
        let mut row = GridRow::default();
        for (stage, raw) in pairs {
            row.insert(stage.into(), raw.into());
        }
        row
    }

    /// A repeated stage keeps its first position but takes the later value.
    fn insert(&mut self, stage: String, raw: String) {
        match self.cells.iter_mut().find(|(s, _)| *s == stage) {
            Some(slot) => slot.1 = raw,
            None => self.cells.push((stage, raw)),
        }
    }

    pub fn get(&self, stage: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(s, _)| s == stage)
            .map(|(_, raw)| raw.as_str())
    }

    /// Iterate `(stage, raw)` in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cells.iter().map(|(s, v)| (s.as_str(), v.as_str()))
    }

    pub fn stages(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(s, _)| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Group × stage matrix of raw strings (salaries or durations).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Grid {
    /// Header columns after the label column.
    stages: Vec<String>,
    rows: BTreeMap<String, GridRow>,
}

impl Grid {
    pub fn new(stages: Vec<String>) -> Self {
        Self {
            stages,
            rows: BTreeMap::new(),
        }
    }

    /// Build a grid from a header and `(group, cells)` rows; a row shorter
    /// than the header gets empty strings for the missing stages.
    pub fn from_rows<I>(stages: Vec<String>, rows: I) -> Self
    where
        I: IntoIterator<Item = (String, Vec<String>)>,
    {
        let mut grid = Grid::new(stages);
        for (group, values) in rows {
            let row = GridRow::from_pairs(grid.stages.iter().enumerate().map(|(idx, stage)| {
                (stage.clone(), values.get(idx).cloned().unwrap_or_default())
            }));
            grid.rows.insert(group, row);
        }
        grid
    }

    pub fn stages(&self) -> &[String] {
        &self.stages
    }

    pub fn row(&self, group: &str) -> Option<&GridRow> {
        self.rows.get(group)
    }

    pub fn get(&self, group: &str, stage: &str) -> Option<&str> {
        self.rows.get(group).and_then(|r| r.get(stage))
    }

    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.rows.keys().map(String::as_str)
    }

    pub fn rows(&self) -> impl Iterator<Item = (&str, &GridRow)> {
        self.rows.iter().map(|(g, r)| (g.as_str(), r))
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Flat key → value metadata from a two-column CSV.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Metadata(BTreeMap<String, String>);

impl Metadata {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Value for `key` when present and non-blank.
    pub fn non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.trim().is_empty())
    }

    /// `;`-separated list under `key`, trimmed, empty entries dropped.
    pub fn list(&self, key: &str) -> Vec<String> {
        self.get(key)
            .unwrap_or("")
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Allowance identifiers this table grants.
    pub fn allowance_ids(&self) -> Vec<String> {
        self.list("allowances")
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn csv_error(path: &Path, source: csv::Error) -> CompareError {
    CompareError::Csv {
        path: path.to_path_buf(),
        source,
    }
}

/// Read a header-plus-rows grid. Stages come from the header minus its
/// first (label) column; each row is keyed by its first field.
pub fn read_grid_csv<P: AsRef<Path>>(path: P) -> Result<Grid> {
    let path = path.as_ref();
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| csv_error(path, e))?;

    let mut records = rdr.records();
    let stages: Vec<String> = match records.next() {
        Some(header) => {
            let header = header.map_err(|e| csv_error(path, e))?;
            header.iter().skip(1).map(str::to_string).collect()
        }
        None => {
            warn!(path = %path.display(), "grid has no header row; treating as empty");
            return Ok(Grid::default());
        }
    };

    let mut rows = Vec::new();
    for (idx, result) in records.enumerate() {
        let record = result.map_err(|e| csv_error(path, e))?;
        let Some(group) = record.get(0) else {
            continue;
        };
        let values: Vec<String> = record.iter().skip(1).map(str::to_string).collect();
        trace!(row = idx, group, cells = values.len(), "grid row");
        rows.push((group.to_string(), values));
    }

    Ok(Grid::from_rows(stages, rows))
}

/// Read a key/value CSV: first two columns of each row after the header.
/// Rows with fewer than two fields are ignored; a header with fewer than two
/// columns yields empty metadata.
pub fn read_key_value_csv<P: AsRef<Path>>(path: P) -> Result<Metadata> {
    let path = path.as_ref();
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| csv_error(path, e))?;

    let mut records = rdr.records();
    match records.next() {
        Some(header) => {
            let header = header.map_err(|e| csv_error(path, e))?;
            if header.len() < 2 {
                return Ok(Metadata::default());
            }
        }
        None => return Ok(Metadata::default()),
    }

    let mut data = BTreeMap::new();
    for result in records {
        let record = result.map_err(|e| csv_error(path, e))?;
        if record.len() < 2 {
            continue;
        }
        data.insert(record[0].to_string(), record[1].to_string());
    }
    Ok(Metadata(data))
}

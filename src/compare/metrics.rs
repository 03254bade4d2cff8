// src/compare/metrics.rs

use serde::Serialize;

use crate::cells::{extract_cells, round2};
use crate::error::{CompareError, Result};
use crate::table::{TableBundle, TableStore};

/// Distribution of one table's salary cells.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableMetrics {
    pub table: String,
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub spread: f64,
}

pub fn calculate_metrics(store: &TableStore, table_name: &str) -> Result<TableMetrics> {
    let bundle = store.load_bundle(table_name)?;
    metrics_from_bundle(&bundle)
}

pub fn metrics_from_bundle(bundle: &TableBundle) -> Result<TableMetrics> {
    let mut values: Vec<f64> = extract_cells(&bundle.salaries).into_values().collect();
    if values.is_empty() {
        return Err(CompareError::EmptyData {
            table: bundle.name.clone(),
        });
    }
    values.sort_by(f64::total_cmp);

    let count = values.len();
    let min = values[0];
    let max = values[count - 1];
    let mean = values.iter().sum::<f64>() / count as f64;
    let median = if count % 2 == 1 {
        values[count / 2]
    } else {
        (values[count / 2 - 1] + values[count / 2]) / 2.0
    };

    Ok(TableMetrics {
        table: bundle.name.clone(),
        count,
        mean: round2(mean),
        median: round2(median),
        min: round2(min),
        max: round2(max),
        spread: round2(max - min),
    })
}

// src/compare/quality.rs

use serde::Serialize;

use crate::cells::parse_number;
use crate::error::Result;
use crate::table::{TableBundle, TableStore};

/// Jump between neighbouring stages above which a step is flagged.
pub const OUTLIER_STEP: f64 = 800.0;

/// Plausibility of a salary grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityReport {
    pub table: String,
    pub groups_checked: usize,
    /// No group's salary ever drops from one stage to the next.
    pub monotone: bool,
    pub non_monotone_groups: Vec<String>,
    pub outliers: usize,
    pub round_values: usize,
}

pub fn check_quality(store: &TableStore, table_name: &str) -> Result<QualityReport> {
    let bundle = store.load_bundle(table_name)?;
    Ok(quality_from_bundle(&bundle))
}

pub fn quality_from_bundle(bundle: &TableBundle) -> QualityReport {
    let mut report = QualityReport {
        table: bundle.name.clone(),
        groups_checked: 0,
        monotone: true,
        non_monotone_groups: Vec::new(),
        outliers: 0,
        round_values: 0,
    };

    for (group, row) in bundle.salaries.rows() {
        let values: Vec<f64> = row.iter().filter_map(|(_, raw)| parse_number(raw)).collect();
        if values.is_empty() {
            continue;
        }
        report.groups_checked += 1;
        report.round_values += values.iter().filter(|v| v.fract() == 0.0).count();

        let mut dropped = false;
        for pair in values.windows(2) {
            let step = pair[1] - pair[0];
            if step < 0.0 {
                dropped = true;
            }
            if step.abs() > OUTLIER_STEP {
                report.outliers += 1;
            }
        }
        if dropped {
            report.monotone = false;
            report.non_monotone_groups.push(group.to_string());
        }
    }
    report
}

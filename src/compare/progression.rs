// src/compare/progression.rs

use serde::Serialize;
use std::collections::BTreeMap;

use crate::cells::{parse_number, round2};
use crate::error::Result;
use crate::table::{TableBundle, TableStore};

/// One stage on a group's salary curve.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressionPoint {
    pub group: String,
    pub stage: String,
    /// Years of service at which this stage is reached.
    pub start_year: f64,
    pub duration_years: f64,
    pub salary: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSeries {
    pub base: Vec<ProgressionPoint>,
    pub compare: Vec<ProgressionPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressionGraph {
    pub base_table: String,
    pub compare_table: String,
    pub groups: BTreeMap<String, GroupSeries>,
}

/// Salary curve per group. Stages are walked in the grid's column order and
/// the start year accumulates the unrounded durations before each stage; a
/// missing or unparsable duration counts as zero. Groups without a single
/// parsable salary are left out.
pub fn progression_points(bundle: &TableBundle) -> BTreeMap<String, Vec<ProgressionPoint>> {
    let mut series = BTreeMap::new();
    for (group, salary_row) in bundle.salaries.rows() {
        let mut points = Vec::new();
        let mut year_cursor = 0.0;
        for (stage, raw) in salary_row.iter() {
            let Some(salary) = parse_number(raw) else {
                continue;
            };
            let duration = bundle
                .durations
                .get(group, stage)
                .and_then(parse_number)
                .unwrap_or(0.0);
            points.push(ProgressionPoint {
                group: group.to_string(),
                stage: stage.to_string(),
                start_year: round2(year_cursor),
                duration_years: round2(duration),
                salary: round2(salary),
            });
            year_cursor += duration;
        }
        if !points.is_empty() {
            series.insert(group.to_string(), points);
        }
    }
    series
}

pub fn build_progression_graph_data(
    store: &TableStore,
    base_table: &str,
    compare_table: &str,
) -> Result<ProgressionGraph> {
    let base = store.load_bundle(base_table)?;
    let compare = store.load_bundle(compare_table)?;
    Ok(progression_graph_from_bundles(&base, &compare))
}

/// Both tables' curves for every group that has one on each side.
pub fn progression_graph_from_bundles(
    base: &TableBundle,
    compare: &TableBundle,
) -> ProgressionGraph {
    let left = progression_points(base);
    let mut right = progression_points(compare);

    let groups = left
        .into_iter()
        .filter_map(|(group, base_points)| {
            right.remove(&group).map(|compare_points| {
                (
                    group,
                    GroupSeries {
                        base: base_points,
                        compare: compare_points,
                    },
                )
            })
        })
        .collect();

    ProgressionGraph {
        base_table: base.name.clone(),
        compare_table: compare.name.clone(),
        groups,
    }
}

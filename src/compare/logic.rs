// src/compare/logic.rs

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::trace;

use super::stage_cmp;
use crate::cells::{parse_number, round2};
use crate::error::Result;
use crate::table::{TableBundle, TableStore};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageDuration {
    pub stage: String,
    pub base_duration_years: f64,
    pub compare_duration_years: f64,
    pub delta_years: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupLogic {
    pub stages: Vec<StageDuration>,
    pub base_total_years: f64,
    pub compare_total_years: f64,
    pub delta_total_years: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressionLogic {
    pub base_table: String,
    pub compare_table: String,
    pub groups: BTreeMap<String, GroupLogic>,
}

pub fn build_progression_logic_comparison(
    store: &TableStore,
    base_table: &str,
    compare_table: &str,
) -> Result<ProgressionLogic> {
    let base = store.load_bundle(base_table)?;
    let compare = store.load_bundle(compare_table)?;
    Ok(progression_logic_from_bundles(&base, &compare))
}

/// Diff the duration grids: per shared group, per shared stage (in
/// `stage_cmp` order) the years spent on each side plus running totals.
/// Stages unparsable on either side are skipped; groups left with no
/// stages are omitted.
pub fn progression_logic_from_bundles(
    base: &TableBundle,
    compare: &TableBundle,
) -> ProgressionLogic {
    let mut groups = BTreeMap::new();

    for (group, left_row) in base.durations.rows() {
        let Some(right_row) = compare.durations.row(group) else {
            continue;
        };

        let mut stages: Vec<&str> = left_row
            .stages()
            .filter(|stage| right_row.get(stage).is_some())
            .collect();
        stages.sort_by(|a, b| stage_cmp(a, b));
        stages.dedup();

        let mut rows = Vec::with_capacity(stages.len());
        let (mut left_total, mut right_total) = (0.0, 0.0);
        for stage in stages {
            let left = left_row.get(stage).and_then(parse_number);
            let right = right_row.get(stage).and_then(parse_number);
            let (Some(left), Some(right)) = (left, right) else {
                trace!(group, stage, "duration missing on one side; stage skipped");
                continue;
            };
            left_total += left;
            right_total += right;
            rows.push(StageDuration {
                stage: stage.to_string(),
                base_duration_years: round2(left),
                compare_duration_years: round2(right),
                delta_years: round2(right - left),
            });
        }

        if !rows.is_empty() {
            groups.insert(
                group.to_string(),
                GroupLogic {
                    stages: rows,
                    base_total_years: round2(left_total),
                    compare_total_years: round2(right_total),
                    delta_total_years: round2(right_total - left_total),
                },
            );
        }
    }

    ProgressionLogic {
        base_table: base.name.clone(),
        compare_table: compare.name.clone(),
        groups,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{fixture_store, write_table};
    use tempfile::tempdir;

    const SAL: &str = "g,1\nE1,100\n";

    #[test]
    fn stages_sort_by_length_then_text() {
        let tmp = tempdir().unwrap();
        write_table(
            tmp.path(),
            "A",
            SAL,
            "group,10,2,1,1a\nE1,1,2,3,4\n",
            "k,v\n",
        );
        write_table(
            tmp.path(),
            "B",
            SAL,
            "group,1,2,1a,10\nE1,1,3,4,1\n",
            "k,v\n",
        );
        let store = fixture_store(tmp.path());

        let logic = build_progression_logic_comparison(&store, "A", "B").unwrap();
        let stages: Vec<&str> = logic.groups["E1"]
            .stages
            .iter()
            .map(|s| s.stage.as_str())
            .collect();
        assert_eq!(stages, vec!["1", "2", "10", "1a"]);
    }

    #[test]
    fn totals_and_deltas() {
        let tmp = tempdir().unwrap();
        write_table(tmp.path(), "A", SAL, "g,1,2,3\nE1,1,2,3\nE2,1,1,1\n", "k,v\n");
        write_table(tmp.path(), "B", SAL, "g,1,2,4\nE1,1,3,9\nE3,1,1,1\n", "k,v\n");
        let store = fixture_store(tmp.path());

        let logic = build_progression_logic_comparison(&store, "A", "B").unwrap();
        assert_eq!(logic.groups.keys().collect::<Vec<_>>(), vec!["E1"]);
        let e1 = &logic.groups["E1"];
        assert_eq!(e1.stages.len(), 2);
        assert_eq!(e1.stages[1].delta_years, 1.0);
        assert_eq!(e1.base_total_years, 3.0);
        assert_eq!(e1.compare_total_years, 4.0);
        assert_eq!(e1.delta_total_years, 1.0);
    }

    #[test]
    fn unparsable_stages_skip_and_empty_groups_drop() {
        let tmp = tempdir().unwrap();
        write_table(tmp.path(), "A", SAL, "g,1,2\nE1,1,x\nE2,,\n", "k,v\n");
        write_table(tmp.path(), "B", SAL, "g,1,2\nE1,2,2\nE2,1,1\n", "k,v\n");
        let store = fixture_store(tmp.path());

        let logic = build_progression_logic_comparison(&store, "A", "B").unwrap();
        assert!(!logic.groups.contains_key("E2"));
        let e1 = &logic.groups["E1"];
        assert_eq!(e1.stages.len(), 1);
        assert_eq!(e1.base_total_years, 1.0);
        assert_eq!(e1.compare_total_years, 2.0);
    }
}

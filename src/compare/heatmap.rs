// src/compare/heatmap.rs

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

use super::stage_cmp;
use crate::cells::{extract_cells, round2};
use crate::error::Result;
use crate::table::{TableBundle, TableStore};

const TOP_GROUPS: usize = 3;

/// Salary delta for one coordinate present in both tables.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapCell {
    pub group: String,
    pub stage: String,
    pub base: f64,
    pub compare: f64,
    pub delta: f64,
    pub delta_pct: f64,
}

/// Per-group view of the deltas.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupDelta {
    pub cells: usize,
    pub mean_delta: f64,
    /// Delta at the group's lowest shared stage.
    pub entry_delta: f64,
    /// Delta at the group's highest shared stage.
    pub final_delta: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapSummary {
    pub cell_count: usize,
    pub max_abs_delta: f64,
    pub max_abs_delta_pct: f64,
    pub mean_delta: f64,
    pub mean_delta_pct: f64,
    pub by_group: BTreeMap<String, GroupDelta>,
    /// Groups where the compare table pays most above the base, best first.
    pub winners: Vec<String>,
    /// Groups where the compare table pays least relative to the base, worst first.
    pub losers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Heatmap {
    pub base_table: String,
    pub compare_table: String,
    pub cells: Vec<HeatmapCell>,
    pub summary: HeatmapSummary,
}

/// Load both tables and diff their salary grids.
pub fn build_heatmap(store: &TableStore, base_table: &str, compare_table: &str) -> Result<Heatmap> {
    let base = store.load_bundle(base_table)?;
    let compare = store.load_bundle(compare_table)?;
    Ok(heatmap_from_bundles(&base, &compare))
}

/// Cell-wise `compare - base` over the coordinates both salary grids share.
pub fn heatmap_from_bundles(base: &TableBundle, compare: &TableBundle) -> Heatmap {
    let left = extract_cells(&base.salaries);
    let right = extract_cells(&compare.salaries);

    // BTreeMap iteration already yields the (group, stage) order we want.
    let mut raw = Vec::new();
    for (key, &base_value) in &left {
        let Some(&compare_value) = right.get(key) else {
            continue;
        };
        let delta = compare_value - base_value;
        let pct = if base_value != 0.0 {
            delta / base_value * 100.0
        } else {
            0.0
        };
        raw.push((key, base_value, compare_value, delta, pct));
    }
    debug!(
        base = %base.name,
        compare = %compare.name,
        shared = raw.len(),
        base_only = left.len() - raw.len(),
        compare_only = right.len() - raw.len(),
        "heatmap intersection"
    );

    let summary = summarize(
        raw.iter()
            .map(|(k, _, _, d, p)| (k.group.as_str(), k.stage.as_str(), *d, *p)),
    );
    let cells = raw
        .into_iter()
        .map(|(key, b, c, delta, pct)| HeatmapCell {
            group: key.group.clone(),
            stage: key.stage.clone(),
            base: round2(b),
            compare: round2(c),
            delta: round2(delta),
            delta_pct: round2(pct),
        })
        .collect();

    Heatmap {
        base_table: base.name.clone(),
        compare_table: compare.name.clone(),
        cells,
        summary,
    }
}

#[derive(Default)]
struct GroupAcc<'a> {
    sum: f64,
    n: usize,
    entry: Option<(&'a str, f64)>,
    last: Option<(&'a str, f64)>,
}

fn summarize<'a>(deltas: impl Iterator<Item = (&'a str, &'a str, f64, f64)>) -> HeatmapSummary {
    let mut count = 0usize;
    let (mut sum, mut sum_pct) = (0.0, 0.0);
    let (mut max_abs, mut max_abs_pct) = (0.0f64, 0.0f64);
    let mut groups: BTreeMap<&str, GroupAcc> = BTreeMap::new();

    for (group, stage, delta, pct) in deltas {
        count += 1;
        sum += delta;
        sum_pct += pct;
        max_abs = max_abs.max(delta.abs());
        max_abs_pct = max_abs_pct.max(pct.abs());

        let acc = groups.entry(group).or_default();
        acc.sum += delta;
        acc.n += 1;
        if acc.entry.map_or(true, |(s, _)| stage_cmp(stage, s).is_lt()) {
            acc.entry = Some((stage, delta));
        }
        if acc.last.map_or(true, |(s, _)| stage_cmp(stage, s).is_gt()) {
            acc.last = Some((stage, delta));
        }
    }

    let by_group: BTreeMap<String, GroupDelta> = groups
        .into_iter()
        .map(|(group, acc)| {
            let delta = GroupDelta {
                cells: acc.n,
                mean_delta: round2(acc.sum / acc.n as f64),
                entry_delta: round2(acc.entry.map_or(0.0, |(_, d)| d)),
                final_delta: round2(acc.last.map_or(0.0, |(_, d)| d)),
            };
            (group.to_string(), delta)
        })
        .collect();

    let mut ranked: Vec<(&String, f64)> = by_group.iter().map(|(g, d)| (g, d.mean_delta)).collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    let winners = ranked.iter().take(TOP_GROUPS).map(|(g, _)| (*g).clone()).collect();
    ranked.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(b.0)));
    let losers = ranked.iter().take(TOP_GROUPS).map(|(g, _)| (*g).clone()).collect();

    let mean = |total: f64| if count > 0 { round2(total / count as f64) } else { 0.0 };
    HeatmapSummary {
        cell_count: count,
        max_abs_delta: round2(max_abs),
        max_abs_delta_pct: round2(max_abs_pct),
        mean_delta: mean(sum),
        mean_delta_pct: mean(sum_pct),
        by_group,
        winners,
        losers,
    }
}

// src/compare/aggregate.rs

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

use super::allowances::{allowances_from_bundles, AllowanceComparison};
use super::heatmap::{heatmap_from_bundles, Heatmap};
use super::logic::{progression_logic_from_bundles, ProgressionLogic};
use super::metrics::{metrics_from_bundle, TableMetrics};
use super::progression::{progression_graph_from_bundles, ProgressionGraph};
use super::quality::{quality_from_bundle, QualityReport};
use crate::error::{CompareError, Result};
use crate::table::{TableBundle, TableStore};

/// The three views of one ordered table pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairComparison {
    pub heatmap: Heatmap,
    pub graph: ProgressionGraph,
    pub progression_logic: ProgressionLogic,
}

impl PairComparison {
    pub fn from_bundles(base: &TableBundle, compare: &TableBundle) -> Self {
        Self {
            heatmap: heatmap_from_bundles(base, compare),
            graph: progression_graph_from_bundles(base, compare),
            progression_logic: progression_logic_from_bundles(base, compare),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BaselineComparison {
    pub target: String,
    #[serde(flatten)]
    pub comparison: PairComparison,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairwiseComparison {
    pub a: String,
    pub b: String,
    #[serde(flatten)]
    pub comparison: PairComparison,
}

/// Provenance fields a table's metadata may carry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSource {
    pub version: String,
    pub valid_from: Option<String>,
    pub source_url: Option<String>,
    pub derived: bool,
    pub notes: Option<String>,
}

impl TableSource {
    pub fn from_bundle(bundle: &TableBundle) -> Self {
        let meta = &bundle.meta;
        let field = |key: &str| meta.non_empty(key).map(str::to_string);
        Self {
            version: field("version").unwrap_or_else(|| bundle.name.clone()),
            valid_from: field("valid_from"),
            source_url: field("source_url"),
            derived: meta.get("derived").map(str::trim) == Some("true"),
            notes: field("notes"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonPayload {
    pub selected_tables: Vec<String>,
    pub baseline: String,
    pub metrics: BTreeMap<String, TableMetrics>,
    pub baseline_comparisons: Vec<BaselineComparison>,
    pub pairwise_comparisons: Vec<PairwiseComparison>,
    pub allowances: AllowanceComparison,
    pub quality: BTreeMap<String, QualityReport>,
    pub sources: BTreeMap<String, TableSource>,
}

/// First occurrence wins.
fn dedup_names<S: AsRef<str>>(names: &[S]) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        let name = name.as_ref();
        if !unique.iter().any(|u| u == name) {
            unique.push(name.to_string());
        }
    }
    unique
}

/// Every unordered pair, in the order the names were given.
fn pairs<T>(items: &[T]) -> impl Iterator<Item = (&T, &T)> {
    items
        .iter()
        .enumerate()
        .flat_map(move |(i, a)| items[i + 1..].iter().map(move |b| (a, b)))
}

/// Full payload for a multi-table selection: metrics per table, each table
/// against the baseline, all pairs, and the allowance overview.
///
/// Each selected table is read from disk once for the whole request.
#[tracing::instrument(level = "info", skip(store, table_names), fields(tables = table_names.len()))]
pub fn compare_multiple_tables<S: AsRef<str>>(
    store: &TableStore,
    table_names: &[S],
    baseline: Option<&str>,
) -> Result<ComparisonPayload> {
    if table_names.len() < 2 {
        return Err(CompareError::validation(
            "At least two tables are required for comparison",
        ));
    }

    let unique = dedup_names(table_names);
    let baseline = match baseline {
        Some(b) if unique.iter().any(|u| u == b) => b.to_string(),
        Some(b) => {
            return Err(CompareError::validation(format!(
                "Baseline '{}' must be included in the selected tables",
                b
            )))
        }
        None => unique[0].clone(),
    };

    let bundles = unique
        .iter()
        .map(|name| store.load_bundle(name))
        .collect::<Result<Vec<_>>>()?;
    let by_name: BTreeMap<&str, &TableBundle> =
        bundles.iter().map(|b| (b.name.as_str(), b)).collect();
    let base_bundle = by_name[baseline.as_str()];

    let mut metrics = BTreeMap::new();
    for bundle in &bundles {
        metrics.insert(bundle.name.clone(), metrics_from_bundle(bundle)?);
    }

    let baseline_comparisons: Vec<BaselineComparison> = bundles
        .iter()
        .filter(|b| b.name != baseline)
        .map(|target| BaselineComparison {
            target: target.name.clone(),
            comparison: PairComparison::from_bundles(base_bundle, target),
        })
        .collect();

    let pairwise_comparisons: Vec<PairwiseComparison> = pairs(&bundles)
        .map(|(a, b)| PairwiseComparison {
            a: a.name.clone(),
            b: b.name.clone(),
            comparison: PairComparison::from_bundles(a, b),
        })
        .collect();

    let allowances = allowances_from_bundles(store, bundles.iter())?;
    let quality = bundles
        .iter()
        .map(|b| (b.name.clone(), quality_from_bundle(b)))
        .collect();
    let sources = bundles
        .iter()
        .map(|b| (b.name.clone(), TableSource::from_bundle(b)))
        .collect();

    info!(
        baseline = %baseline,
        selected = unique.len(),
        baseline_comparisons = baseline_comparisons.len(),
        pairwise = pairwise_comparisons.len(),
        "built comparison payload"
    );

    Ok(ComparisonPayload {
        selected_tables: unique,
        baseline,
        metrics,
        baseline_comparisons,
        pairwise_comparisons,
        allowances,
        quality,
        sources,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{fixture_store, write_table};
    use tempfile::tempdir;

    fn three_tables(root: &std::path::Path) -> TableStore {
        let dur = "g,1,2\nE1,1,2\n";
        write_table(root, "A", "g,1,2\nE1,100,200\n", dur, "key,value\nallowances,jsz\n");
        let b_meta = "key,value\nversion,2024-03\nderived,true\n";
        write_table(root, "B", "g,1,2\nE1,210,190\n", dur, b_meta);
        write_table(root, "C", "g,1,2\nE1,90,210\n", dur, "key,value\nallowances,jsz;vwl\n");
        fixture_store(root)
    }

    #[test]
    fn pairs_follow_combination_order() {
        let got: Vec<(i32, i32)> = pairs(&[1, 2, 3, 4]).map(|(a, b)| (*a, *b)).collect();
        assert_eq!(got, vec![(1, 2), (1, 3), (1, 4), (2, 3), (2, 4), (3, 4)]);
        assert_eq!(pairs(&[1]).count(), 0);
    }

    #[test]
    fn three_tables_give_two_baseline_and_three_pairwise() {
        let tmp = tempdir().unwrap();
        let store = three_tables(tmp.path());

        let payload = compare_multiple_tables(&store, &["A", "B", "C"], Some("A")).unwrap();
        assert_eq!(payload.baseline, "A");
        assert_eq!(payload.baseline_comparisons.len(), 2);
        assert_eq!(payload.pairwise_comparisons.len(), 3);
        assert_eq!(payload.metrics.len(), 3);

        let targets: Vec<&str> = payload
            .baseline_comparisons
            .iter()
            .map(|c| c.target.as_str())
            .collect();
        assert_eq!(targets, vec!["B", "C"]);
        let first = &payload.baseline_comparisons[0].comparison;
        assert_eq!(first.heatmap.base_table, "A");
        assert_eq!(first.heatmap.compare_table, "B");

        let pairs: Vec<(&str, &str)> = payload
            .pairwise_comparisons
            .iter()
            .map(|p| (p.a.as_str(), p.b.as_str()))
            .collect();
        assert_eq!(pairs, vec![("A", "B"), ("A", "C"), ("B", "C")]);
    }

    #[test]
    fn duplicates_collapse_and_baseline_defaults_to_first() {
        let tmp = tempdir().unwrap();
        let store = three_tables(tmp.path());

        let payload = compare_multiple_tables(&store, &["C", "A", "C"], None).unwrap();
        assert_eq!(payload.selected_tables, vec!["C", "A"]);
        assert_eq!(payload.baseline, "C");
        assert_eq!(payload.baseline_comparisons.len(), 1);
        assert_eq!(payload.baseline_comparisons[0].target, "A");
        assert_eq!(payload.pairwise_comparisons.len(), 1);
    }

    #[test]
    fn explicit_baseline_reorders_targets_only() {
        let tmp = tempdir().unwrap();
        let store = three_tables(tmp.path());

        let payload = compare_multiple_tables(&store, &["A", "B", "C"], Some("B")).unwrap();
        let targets: Vec<&str> = payload
            .baseline_comparisons
            .iter()
            .map(|c| c.target.as_str())
            .collect();
        assert_eq!(targets, vec!["A", "C"]);
        assert_eq!(payload.pairwise_comparisons[0].a, "A");
    }

    #[test]
    fn validation_errors() {
        let tmp = tempdir().unwrap();
        let store = three_tables(tmp.path());

        let err = compare_multiple_tables(&store, &["A"], None).unwrap_err();
        assert!(matches!(err, CompareError::Validation(_)));

        // baseline is checked before anything is loaded
        let err = compare_multiple_tables(&store, &["A", "missing"], Some("C")).unwrap_err();
        assert!(matches!(err, CompareError::Validation(_)));
    }

    #[test]
    fn unknown_table_aborts_whole_request() {
        let tmp = tempdir().unwrap();
        let store = three_tables(tmp.path());

        let err = compare_multiple_tables(&store, &["A", "missing"], None).unwrap_err();
        assert!(matches!(err, CompareError::TableNotFound { .. }));
    }

    #[test]
    fn sources_and_quality_per_table() {
        let tmp = tempdir().unwrap();
        let store = three_tables(tmp.path());

        let payload = compare_multiple_tables(&store, &["A", "B"], None).unwrap();
        assert_eq!(payload.sources["A"].version, "A");
        assert!(!payload.sources["A"].derived);
        assert_eq!(payload.sources["B"].version, "2024-03");
        assert!(payload.sources["B"].derived);
        assert!(payload.quality["A"].monotone);
        assert!(!payload.quality["B"].monotone);
        assert!(payload.allowances.presence_matrix["jsz"]["A"]);
        assert!(!payload.allowances.presence_matrix["jsz"]["B"]);
    }

    #[test]
    fn payload_serializes_with_flattened_pairs() {
        let tmp = tempdir().unwrap();
        let store = three_tables(tmp.path());

        let payload = compare_multiple_tables(&store, &["A", "B"], None).unwrap();
        let json = serde_json::to_value(&payload).unwrap();
        let entry = &json["baseline_comparisons"][0];
        assert_eq!(entry["target"], "B");
        assert!(entry["heatmap"]["cells"].is_array());
        assert!(entry["graph"]["groups"]["E1"]["base"].is_array());
        assert_eq!(
            entry["progression_logic"]["groups"]["E1"]["delta_total_years"],
            0.0
        );
        assert_eq!(json["pairwise_comparisons"][0]["a"], "A");
    }
}

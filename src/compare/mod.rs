// src/compare/mod.rs
//! Derived comparison views over loaded tables.
//!
//! Each builder comes in two flavours: `*_from_bundle(s)` works on tables
//! already in memory, the name-based variant loads them from a
//! [`TableStore`](crate::table::TableStore) first.

pub mod aggregate;
pub mod allowances;
pub mod heatmap;
pub mod logic;
pub mod metrics;
pub mod progression;
pub mod quality;
pub mod simulate;

pub use aggregate::{
    compare_multiple_tables, BaselineComparison, ComparisonPayload, PairComparison,
    PairwiseComparison, TableSource,
};
pub use allowances::{
    allowance_summary, compare_allowances, AllowanceComparison, AllowanceDetails, AllowanceSummary,
};
pub use heatmap::{build_heatmap, GroupDelta, Heatmap, HeatmapCell, HeatmapSummary};
pub use logic::{build_progression_logic_comparison, GroupLogic, ProgressionLogic, StageDuration};
pub use metrics::{calculate_metrics, TableMetrics};
pub use progression::{
    build_progression_graph_data, progression_points, GroupSeries, ProgressionGraph,
    ProgressionPoint,
};
pub use quality::{check_quality, QualityReport};
pub use simulate::{simulate_lifetime, Components, Simulation, SimulationParams, SimulationYear};

use std::cmp::Ordering;

/// Stage order for duration tables: shorter identifiers first, then text.
/// Keeps "2" before "10" without assuming stages are numeric.
// TODO: "1a"-style sub-stages land after every two-digit stage; revisit once
// a table actually ships them.
pub fn stage_cmp(a: &str, b: &str) -> Ordering {
    a.chars()
        .count()
        .cmp(&b.chars().count())
        .then_with(|| a.cmp(b))
}

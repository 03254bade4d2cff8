//! Comparison engine for collective-agreement remuneration tables.
//!
//! Loads salary grids, stage durations and metadata per table and derives
//! UI-ready views: cell heatmaps, salary progression series, progression
//! timing diffs, distribution metrics and allowance overviews.

pub mod cells;
pub mod compare;
pub mod config;
pub mod error;
pub mod table;

#[cfg(test)]
pub(crate) mod testutil;

pub use compare::compare_multiple_tables;
pub use config::DataPaths;
pub use error::{CompareError, Result};
pub use table::{TableBundle, TableStore};

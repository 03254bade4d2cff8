// src/cells.rs

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

use crate::table::Grid;

/// A (group, stage) coordinate. Orders by group, then stage, lexically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct CellKey {
    pub group: String,
    pub stage: String,
}

impl CellKey {
    pub fn new(group: impl Into<String>, stage: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            stage: stage.into(),
        }
    }
}

/// Parsed numeric cells of one grid.
pub type NumericCells = BTreeMap<CellKey, f64>;

/// Parse a grid cell: trims, accepts `,` as decimal separator.
/// Blank and non-numeric text (placeholders like "entfällt") give `None`.
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned = raw.trim().replace(',', ".");
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Round to two decimal places; exact ties go to the even cent.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

/// Every parsable cell of `grid`, keyed by coordinate.
pub fn extract_cells(grid: &Grid) -> NumericCells {
    let mut cells = NumericCells::new();
    let mut skipped = 0usize;
    for (group, row) in grid.rows() {
        for (stage, raw) in row.iter() {
            match parse_number(raw) {
                Some(value) => {
                    cells.insert(CellKey::new(group, stage), value);
                }
                None => {
                    if !raw.trim().is_empty() {
                        skipped += 1;
                    }
                }
            }
        }
    }
    if skipped > 0 {
        debug!(skipped, parsed = cells.len(), "skipped non-numeric grid cells");
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_number_tolerates_comma_and_whitespace() {
        assert_eq!(parse_number(" 2,5 "), Some(2.5));
        assert_eq!(parse_number("3100.75"), Some(3100.75));
        assert_eq!(parse_number("-1"), Some(-1.0));
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("   "), None);
        assert_eq!(parse_number("entfällt"), None);
        assert_eq!(parse_number("NaN"), None);
    }

    #[test]
    fn round2_sends_ties_to_even() {
        assert_eq!(round2(0.125), 0.12);
        assert_eq!(round2(0.375), 0.38);
        assert_eq!(round2(-0.125), -0.12);
        assert_eq!(round2(1.005_000_1), 1.01);
        assert_eq!(round2(-2.345_01), -2.35);
        assert_eq!(round2(7.0), 7.0);
    }

    #[test]
    fn extract_skips_blank_and_placeholder_cells() {
        let grid = Grid::from_rows(
            vec!["1".into(), "2".into(), "3".into()],
            vec![
                ("E1".to_string(), vec!["100".into(), "".into(), "n/a".into()]),
                ("E2".to_string(), vec!["200,5".into()]),
            ],
        );

        let cells = extract_cells(&grid);
        assert_eq!(cells.len(), 2);
        assert_eq!(cells[&CellKey::new("E1", "1")], 100.0);
        assert_eq!(cells[&CellKey::new("E2", "1")], 200.5);
        assert!(!cells.contains_key(&CellKey::new("E1", "3")));
    }
}

// src/compare/simulate.rs

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::cmp::Ordering;
use tracing::debug;

use crate::cells::{extract_cells, parse_number, round2, CellKey};
use crate::error::{CompareError, Result};
use crate::table::{Metadata, TableBundle, TableStore};

static STAGE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+").expect("stage regex should compile"));

pub const DEFAULT_STAGE_YEARS: f64 = 2.0;
pub const MAX_SIMULATION_YEARS: u32 = 100;

/// Which pay components make up the monthly amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Components {
    /// The grid salary itself.
    pub base_salary: bool,
    /// `vwl_amount_monthly` from the table metadata.
    pub vwl: bool,
    /// `allowance_flat_monthly` from the table metadata.
    pub flat_allowances: bool,
    /// Annual bonus of `jsz_percent` of the salary, spread over twelve months.
    pub annual_bonus: bool,
}

impl Default for Components {
    fn default() -> Self {
        Self {
            base_salary: true,
            vwl: false,
            flat_allowances: false,
            annual_bonus: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationParams {
    pub group: String,
    pub years: u32,
    /// 1-based position in the group's ordered stages.
    pub start_stage: usize,
    /// Share of full-time employment.
    pub work_factor: f64,
    /// Years per stage when the base table gives none.
    pub default_duration: f64,
    pub components: Components,
}

impl SimulationParams {
    pub fn new(group: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            years: 10,
            start_stage: 1,
            work_factor: 1.0,
            default_duration: DEFAULT_STAGE_YEARS,
            components: Components::default(),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.years == 0 {
            return Err(CompareError::validation("Simulation needs at least one year"));
        }
        if self.years > MAX_SIMULATION_YEARS {
            return Err(CompareError::validation(format!(
                "Simulation is limited to {} years, got {}",
                MAX_SIMULATION_YEARS, self.years
            )));
        }
        if !(self.work_factor.is_finite() && self.work_factor > 0.0) {
            return Err(CompareError::validation("Work factor must be a positive number"));
        }
        if !(self.default_duration.is_finite() && self.default_duration > 0.0) {
            return Err(CompareError::validation("Default stage duration must be positive"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationYear {
    pub year: u32,
    pub stage: String,
    pub annual_base: f64,
    pub annual_compare: f64,
    /// `annual_compare - annual_base`.
    pub delta: f64,
    pub cum_base: f64,
    pub cum_compare: f64,
    pub cum_delta: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Simulation {
    pub base_table: String,
    pub compare_table: String,
    pub group: String,
    pub years: Vec<SimulationYear>,
}

/// Order stages by their first number, then text; stages without a number
/// go last.
pub fn stage_number_cmp(a: &str, b: &str) -> Ordering {
    let num = |s: &str| STAGE_NUMBER.find(s).and_then(|m| m.as_str().parse::<u64>().ok());
    match (num(a), num(b)) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

fn meta_amount(meta: &Metadata, key: &str) -> f64 {
    meta.get(key).and_then(parse_number).unwrap_or(0.0)
}

fn monthly(salary: f64, meta: &Metadata, c: Components) -> f64 {
    let mut total = 0.0;
    if c.base_salary {
        total += salary;
    }
    if c.vwl {
        total += meta_amount(meta, "vwl_amount_monthly");
    }
    if c.flat_allowances {
        total += meta_amount(meta, "allowance_flat_monthly");
    }
    if c.annual_bonus {
        total += salary * meta_amount(meta, "jsz_percent") / 100.0 / 12.0;
    }
    total
}

pub fn simulate_lifetime(
    store: &TableStore,
    base_table: &str,
    compare_table: &str,
    params: &SimulationParams,
) -> Result<Simulation> {
    params.validate()?;
    let base = store.load_bundle(base_table)?;
    let compare = store.load_bundle(compare_table)?;
    simulate_from_bundles(&base, &compare, params)
}

/// Year-by-year earnings of one group in both tables. Progression timing
/// follows the base table's durations.
pub fn simulate_from_bundles(
    base: &TableBundle,
    compare: &TableBundle,
    params: &SimulationParams,
) -> Result<Simulation> {
    params.validate()?;
    let group = params.group.as_str();

    let left = extract_cells(&base.salaries);
    let right = extract_cells(&compare.salaries);
    let mut stages: Vec<(&str, f64, f64)> = left
        .iter()
        .filter(|(key, _)| key.group == group)
        .filter_map(|(key, &b)| {
            right
                .get(&CellKey::new(group, key.stage.as_str()))
                .map(|&c| (key.stage.as_str(), b, c))
        })
        .collect();
    if stages.is_empty() {
        return Err(CompareError::validation(format!(
            "Group '{}' has no salary stages shared by '{}' and '{}'",
            group, base.name, compare.name
        )));
    }
    stages.sort_by(|a, b| stage_number_cmp(a.0, b.0));

    let duration_of = |stage: &str| {
        base.durations
            .get(group, stage)
            .and_then(parse_number)
            .filter(|d| *d > 0.0)
            .unwrap_or(params.default_duration)
    };

    let last = stages.len() - 1;
    let mut idx = params.start_stage.saturating_sub(1).min(last);
    let mut remaining = duration_of(stages[idx].0);
    let (mut cum_base, mut cum_compare) = (0.0, 0.0);
    let mut years = Vec::with_capacity(params.years as usize);

    for year in 1..=params.years {
        let (stage, base_salary, compare_salary) = stages[idx];
        let annual_base =
            monthly(base_salary, &base.meta, params.components) * 12.0 * params.work_factor;
        let annual_compare =
            monthly(compare_salary, &compare.meta, params.components) * 12.0 * params.work_factor;
        cum_base += annual_base;
        cum_compare += annual_compare;
        years.push(SimulationYear {
            year,
            stage: stage.to_string(),
            annual_base: round2(annual_base),
            annual_compare: round2(annual_compare),
            delta: round2(annual_compare - annual_base),
            cum_base: round2(cum_base),
            cum_compare: round2(cum_compare),
            cum_delta: round2(cum_compare - cum_base),
        });

        remaining -= 1.0;
        if remaining <= 0.0 && idx < last {
            idx += 1;
            remaining = duration_of(stages[idx].0);
        }
    }
    debug!(group, years = years.len(), final_stage = stages[idx].0, "simulated lifetime earnings");

    Ok(Simulation {
        base_table: base.name.clone(),
        compare_table: compare.name.clone(),
        group: group.to_string(),
        years,
    })
}

// src/compare/allowances.rs

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

use crate::cells::{parse_number, round2};
use crate::error::Result;
use crate::table::{AllowanceSource, TableBundle, TableStore};

const UNNAMED_LABEL: &str = "(unbenannt)";
const LABEL_KEYS: &[&str] = &["label_de", "label_en"];

/// What an allowance definition says about itself.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllowanceDetails {
    pub label: String,
    pub adding_type: String,
    pub func_type: String,
    pub options: Vec<String>,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
}

/// One referenced allowance; `details` is absent when the definition
/// could not be found.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllowanceSummary {
    pub allowance: String,
    pub available: bool,
    #[serde(flatten)]
    pub details: Option<AllowanceDetails>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllowanceComparison {
    /// Table → summaries of the allowances it declares, in declaration order.
    pub by_table: BTreeMap<String, Vec<AllowanceSummary>>,
    /// Allowance → table → whether that table declares it.
    pub presence_matrix: BTreeMap<String, BTreeMap<String, bool>>,
}

fn details_from_source(source: &AllowanceSource) -> AllowanceDetails {
    let meta = &source.meta;
    let label = LABEL_KEYS
        .iter()
        .find_map(|key| meta.get(key).filter(|v| !v.is_empty()))
        .unwrap_or(UNNAMED_LABEL)
        .to_string();

    let values: Vec<f64> = source
        .grid
        .rows()
        .flat_map(|(_, row)| row.iter().filter_map(|(_, raw)| parse_number(raw)))
        .collect();
    let min_value = values.iter().copied().reduce(f64::min).map(round2);
    let max_value = values.iter().copied().reduce(f64::max).map(round2);

    AllowanceDetails {
        label,
        adding_type: meta.get("adding_type").unwrap_or_default().to_string(),
        func_type: meta.get("func_type").unwrap_or_default().to_string(),
        options: meta.list("options"),
        min_value,
        max_value,
    }
}

/// Resolve one allowance identifier against the allowance store.
pub fn allowance_summary(store: &TableStore, allowance: &str) -> Result<AllowanceSummary> {
    let summary = match store.load_allowance(allowance)? {
        Some(source) => AllowanceSummary {
            allowance: allowance.to_string(),
            available: true,
            details: Some(details_from_source(&source)),
        },
        None => {
            warn!(allowance, "referenced allowance has no definition");
            AllowanceSummary {
                allowance: allowance.to_string(),
                available: false,
                details: None,
            }
        }
    };
    Ok(summary)
}

pub fn compare_allowances<S: AsRef<str>>(
    store: &TableStore,
    table_names: &[S],
) -> Result<AllowanceComparison> {
    let bundles = table_names
        .iter()
        .map(|name| store.load_bundle(name.as_ref()))
        .collect::<Result<Vec<_>>>()?;
    allowances_from_bundles(store, bundles.iter())
}

/// Summaries per table plus the presence matrix across all given tables.
/// Each allowance definition is read at most once per call.
pub fn allowances_from_bundles<'a>(
    store: &TableStore,
    bundles: impl IntoIterator<Item = &'a TableBundle>,
) -> Result<AllowanceComparison> {
    let mut resolved: BTreeMap<String, AllowanceSummary> = BTreeMap::new();
    let mut by_table = BTreeMap::new();
    let mut declared: Vec<(String, BTreeSet<String>)> = Vec::new();

    for bundle in bundles {
        let ids = bundle.meta.allowance_ids();
        let mut summaries = Vec::with_capacity(ids.len());
        for id in &ids {
            if !resolved.contains_key(id) {
                resolved.insert(id.clone(), allowance_summary(store, id)?);
            }
            summaries.push(resolved[id].clone());
        }
        debug!(table = %bundle.name, allowances = ids.len(), "resolved allowances");
        by_table.insert(bundle.name.clone(), summaries);
        declared.push((bundle.name.clone(), ids.into_iter().collect()));
    }

    let all: BTreeSet<&String> = declared.iter().flat_map(|(_, ids)| ids).collect();
    let presence_matrix = all
        .into_iter()
        .map(|id| {
            let row = declared
                .iter()
                .map(|(table, ids)| (table.clone(), ids.contains(id)))
                .collect();
            (id.clone(), row)
        })
        .collect();

    Ok(AllowanceComparison {
        by_table,
        presence_matrix,
    })
}

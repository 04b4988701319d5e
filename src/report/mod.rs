use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::model::state::state_order;
use crate::model::thresholds::UNKNOWN_LABEL;
use crate::pipeline::stage4_gating::{GatedTable, STATE_LABEL};

pub mod json;
pub mod merge;

pub const UNKNOWN_COLOUR: &str = "#808080";

const PALETTE: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#bcbd22",
    "#17becf", "#393b79",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelCount {
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UncertaintyCount {
    pub label: String,
    pub greater_than: usize,
    pub less_than: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GatingSummaryRow {
    pub species: String,
    pub gate: String,
    pub value: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorMap {
    entries: Vec<(String, &'static str)>,
}

impl ColorMap {
    pub fn colour_for(&self, label: &str) -> &'static str {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, c)| *c)
            .unwrap_or(UNKNOWN_COLOUR)
    }

    #[cfg(test)]
    pub fn entries(&self) -> &[(String, &'static str)] {
        &self.entries
    }
}

/// Label frequencies, most frequent first; ties by name.
pub fn prediction_counts(labels: &[String]) -> Vec<LabelCount> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for label in labels {
        *counts.entry(label.as_str()).or_insert(0) += 1;
    }
    let mut out = counts
        .into_iter()
        .map(|(label, count)| LabelCount {
            label: label.to_string(),
            count,
        })
        .collect::<Vec<_>>();
    out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    out
}

/// Per label: rows above the threshold and rows at or below it.
pub fn uncertainty_counts(
    labels: &[String],
    uncertainties: &[f64],
    threshold: f64,
) -> Vec<UncertaintyCount> {
    let mut counts: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for (label, &u) in labels.iter().zip(uncertainties.iter()) {
        let entry = counts.entry(label.as_str()).or_insert((0, 0));
        if u > threshold {
            entry.0 += 1;
        } else {
            entry.1 += 1;
        }
    }
    counts
        .into_iter()
        .map(|(label, (greater_than, less_than))| UncertaintyCount {
            label: label.to_string(),
            greater_than,
            less_than,
        })
        .collect()
}

/// Species (first-appearance order) × gate label × outcome counts, zero rows included.
pub fn gating_summary(gated: &GatedTable) -> Vec<GatingSummaryRow> {
    let species = first_appearance(&gated.predictions);
    let mut rows = Vec::new();
    for label in &gated.labels {
        let Some(values) = gated.label_values(label) else {
            continue;
        };
        let outcomes: Vec<String> = if label == STATE_LABEL {
            state_order()
                .iter()
                .map(|s| s.as_str().to_string())
                .collect()
        } else {
            vec![label.clone(), format!("not_{}", label)]
        };

        let mut counts: HashMap<(&str, &str), usize> = HashMap::new();
        for (sp, v) in gated.predictions.iter().zip(values.iter()) {
            *counts.entry((sp.as_str(), v.as_str())).or_insert(0) += 1;
        }
        for sp in &species {
            for outcome in &outcomes {
                rows.push(GatingSummaryRow {
                    species: sp.clone(),
                    gate: label.clone(),
                    value: outcome.clone(),
                    count: counts
                        .get(&(sp.as_str(), outcome.as_str()))
                        .copied()
                        .unwrap_or(0),
                });
            }
        }
    }
    rows
}

/// One palette colour per distinct label in first-appearance order; `Unknown` is grey.
pub fn color_map(labels: &[String]) -> ColorMap {
    let mut entries = Vec::new();
    let mut next = 0usize;
    for label in first_appearance(labels) {
        if label == UNKNOWN_LABEL {
            entries.push((label, UNKNOWN_COLOUR));
        } else {
            entries.push((label, PALETTE[next % PALETTE.len()]));
            next += 1;
        }
    }
    ColorMap { entries }
}

pub fn first_appearance(labels: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for label in labels {
        if !out.iter().any(|l| l == label) {
            out.push(label.clone());
        }
    }
    out
}

pub fn format_f64_6(v: f64) -> String {
    format!("{:.6}", v)
}

pub fn quantile_indexed(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len();
    let idx = ((n - 1) as f64 * p).ceil() as usize;
    sorted[idx]
}

pub fn median(values: &[f64]) -> f64 {
    quantile_indexed(values, 0.5)
}

pub fn p90(values: &[f64]) -> f64 {
    quantile_indexed(values, 0.90)
}

#[cfg(test)]
#[path = "../../tests/src_inline/report/mod.rs"]
mod tests;

use std::collections::HashSet;

use serde::Serialize;

use crate::input::SampleTable;
use crate::model::stain::StainSpec;
use crate::model::state::CellState;
use crate::pipeline::stage1_transform::run_stage1;
use crate::pipeline::{PREDICTIONS_COLUMN, PipelineError, PredictionTable, UNCERTAINTIES_COLUMN};
use crate::simd;

pub const DEAD_LABEL: &str = "dead";
pub const CELL_LABEL: &str = "cell";
pub const STATE_LABEL: &str = "state";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GateConfig {
    /// Viability stain; a hit marks the event `dead`.
    pub viability: Option<StainSpec>,
    /// Cell-vs-debris stain; a hit marks the event `cell`.
    pub cell_marker: Option<StainSpec>,
    pub extra: Vec<StainSpec>,
}

impl GateConfig {
    pub fn is_empty(&self) -> bool {
        self.viability.is_none() && self.cell_marker.is_none() && self.extra.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GateColumn {
    pub label: String,
    pub values: Vec<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GatedTable {
    /// Prediction table channels after the gating transform.
    pub table: SampleTable,
    pub predictions: Vec<String>,
    pub uncertainties: Vec<f64>,
    pub gates: Vec<GateColumn>,
    pub state: Option<Vec<CellState>>,
    /// Labels exposed downstream: `state` (when derived) replaces `dead` and `cell`.
    pub labels: Vec<String>,
}

impl GatedTable {
    pub fn gate(&self, label: &str) -> Option<&[bool]> {
        self.gates
            .iter()
            .find(|g| g.label == label)
            .map(|g| g.values.as_slice())
    }

    /// Rows whose state is `live`, when a state was derived.
    pub fn live_rows(&self) -> Option<Vec<usize>> {
        self.state.as_ref().map(|states| {
            states
                .iter()
                .enumerate()
                .filter(|(_, s)| **s == CellState::Live)
                .map(|(i, _)| i)
                .collect()
        })
    }

    /// String value of `label` at every row, as written to the gated data table.
    pub fn label_values(&self, label: &str) -> Option<Vec<String>> {
        if label == STATE_LABEL {
            return self
                .state
                .as_ref()
                .map(|s| s.iter().map(|v| v.as_str().to_string()).collect());
        }
        self.gate(label).map(|values| {
            values
                .iter()
                .map(|&v| {
                    if v {
                        label.to_string()
                    } else {
                        format!("not_{}", label)
                    }
                })
                .collect()
        })
    }
}

/// Stain Gate Evaluator: one boolean per row, rejected unless both outcomes occur.
pub fn evaluate_stain(
    table: &SampleTable,
    spec: &StainSpec,
    label: &str,
) -> Result<GateColumn, PipelineError> {
    let channel = table.numeric(&spec.channel).ok_or_else(|| {
        PipelineError::InvalidInput(format!(
            "stain channel {} is not a numeric column of the sample",
            spec.channel
        ))
    })?;
    let values = channel
        .iter()
        .map(|&v| spec.relation.holds(v, spec.threshold))
        .collect::<Vec<_>>();

    let any_true = values.iter().any(|&v| v);
    let any_false = values.iter().any(|&v| !v);
    if !(any_true && any_false) {
        let (min, max) = simd::min_max_f64(channel);
        return Err(PipelineError::GatingConfiguration {
            label: label.to_string(),
            channel: spec.channel.clone(),
            relation: spec.relation,
            threshold: spec.threshold,
            min,
            max,
        });
    }

    Ok(GateColumn {
        label: label.to_string(),
        values,
    })
}

pub fn derive_states(dead: &[bool], cell: &[bool]) -> Vec<CellState> {
    dead.iter()
        .zip(cell.iter())
        .map(|(&d, &c)| CellState::from_gates(d, c))
        .collect()
}

/// Gating Engine over the raw prediction table, in `asinh(x / c)` space.
pub fn run_stage4(
    predictions: &PredictionTable,
    config: &GateConfig,
    scaling_constant: f64,
) -> Result<GatedTable, PipelineError> {
    validate_labels(predictions, config)?;

    let table = run_stage1(&predictions.table, scaling_constant);
    let mut gates = Vec::new();
    let mut labels = Vec::new();

    if let Some(spec) = &config.viability {
        gates.push(evaluate_stain(&table, spec, DEAD_LABEL)?);
        labels.push(DEAD_LABEL.to_string());
    }
    if let Some(spec) = &config.cell_marker {
        gates.push(evaluate_stain(&table, spec, CELL_LABEL)?);
        labels.push(CELL_LABEL.to_string());
    }

    let state = match (gate_values(&gates, DEAD_LABEL), gate_values(&gates, CELL_LABEL)) {
        (Some(dead), Some(cell)) => Some(derive_states(dead, cell)),
        _ => None,
    };
    if state.is_some() {
        labels.clear();
        labels.push(STATE_LABEL.to_string());
    }

    for spec in &config.extra {
        let label = spec.label_or(&spec.channel).to_string();
        gates.push(evaluate_stain(&table, spec, &label)?);
        labels.push(label);
    }

    if let Some(states) = &state {
        let live = states.iter().filter(|s| **s == CellState::Live).count();
        tracing::info!(
            n_cells = states.len(),
            live,
            labels = ?labels,
            "derived cell states"
        );
    } else {
        tracing::info!(labels = ?labels, "applied stain gates");
    }

    Ok(GatedTable {
        table,
        predictions: predictions.predictions.clone(),
        uncertainties: predictions.uncertainties.clone(),
        gates,
        state,
        labels,
    })
}

fn gate_values<'a>(gates: &'a [GateColumn], label: &str) -> Option<&'a [bool]> {
    gates
        .iter()
        .find(|g| g.label == label)
        .map(|g| g.values.as_slice())
}

fn validate_labels(predictions: &PredictionTable, config: &GateConfig) -> Result<(), PipelineError> {
    let mut seen: HashSet<&str> = [
        DEAD_LABEL,
        CELL_LABEL,
        STATE_LABEL,
        PREDICTIONS_COLUMN,
        UNCERTAINTIES_COLUMN,
    ]
    .into_iter()
    .collect();
    for spec in &config.extra {
        let Some(label) = spec.label.as_deref() else {
            return Err(PipelineError::InvalidInput(format!(
                "extra stain on {} needs an output label",
                spec.channel
            )));
        };
        if !seen.insert(label) {
            return Err(PipelineError::InvalidInput(format!(
                "extra stain label {} is reserved or used twice",
                label
            )));
        }
        if predictions.table.column(label).is_some() {
            return Err(PipelineError::InvalidInput(format!(
                "extra stain label {} collides with a sample column",
                label
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage4_gating.rs"]
mod tests;

use serde::Serialize;
use thiserror::Error;

use crate::input::{InputError, SampleTable};
use crate::model::ModelError;
use crate::model::bundle::ModelBundle;
use crate::model::stain::Relation;
use crate::model::thresholds::{ClusteringProfile, UNKNOWN_LABEL, UncertaintyThreshold};
use crate::report::json::{GatingStats, RunSummary, TOOL_NAME, UncertaintyStats};
use crate::report::{self, color_map};
use crate::simd;

pub mod stage1_transform;
pub mod stage2_predict;
pub mod stage3_uncertainty;
pub mod stage4_gating;
pub mod stage5_heterogeneity;
pub mod stage6_output;

use stage1_transform::{run_stage1, validate_scaling_constant};
use stage2_predict::run_stage2;
use stage3_uncertainty::{max_entropy, resolve_threshold, run_stage3};
use stage4_gating::{GateConfig, GatedTable, run_stage4};
use stage5_heterogeneity::{GroupHeterogeneity, run_stage5};
use stage6_output::{OutputSink, ScatterRequest};

pub const PREDICTIONS_COLUMN: &str = "predictions";
pub const UNCERTAINTIES_COLUMN: &str = "uncertainties";

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error(
        "uncertainty threshold {threshold} must be between 0 and {max_entropy:.6} (ln of {n_classes} species)"
    )]
    InvalidThreshold {
        threshold: f64,
        max_entropy: f64,
        n_classes: usize,
    },
    #[error(
        "invalid gating for {label} stain {channel}: transformed values range between {min} and {max} while the gate is {relation} {threshold}; refine the threshold"
    )]
    GatingConfiguration {
        label: String,
        channel: String,
        relation: Relation,
        threshold: f64,
        min: f64,
        max: f64,
    },
    #[error("heterogeneity failed for {group}: {reason}")]
    ClusteringFailure { group: String, reason: String },
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("output error: {0}")]
    Output(String),
}

impl From<csv::Error> for PipelineError {
    fn from(value: csv::Error) -> Self {
        PipelineError::Output(value.to_string())
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(value: serde_json::Error) -> Self {
        PipelineError::Output(value.to_string())
    }
}

/// Sample table with one prediction and one uncertainty per row.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionTable {
    pub table: SampleTable,
    pub predictions: Vec<String>,
    pub uncertainties: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunConfig {
    pub sample: String,
    pub axes: [String; 3],
    pub scaling_constant: f64,
    pub filter_uncertain: bool,
    /// `-1` selects the automatic threshold.
    pub uncertainty_threshold: f64,
    /// `Some` when gating is enabled.
    pub gating: Option<GateConfig>,
    pub drop_columns: Vec<String>,
    pub clustering: ClusteringProfile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Raw,
    Predicted,
    UncertaintyFiltered,
    Gated,
    HeterogeneityComputed,
    Persisted,
}

impl PipelineStage {
    pub fn as_str(self) -> &'static str {
        match self {
            PipelineStage::Raw => "raw",
            PipelineStage::Predicted => "predicted",
            PipelineStage::UncertaintyFiltered => "uncertainty-filtered",
            PipelineStage::Gated => "gated",
            PipelineStage::HeterogeneityComputed => "heterogeneity-computed",
            PipelineStage::Persisted => "persisted",
        }
    }
}

#[derive(Debug)]
pub struct PipelineOutcome {
    pub predictions: PredictionTable,
    pub threshold: Option<f64>,
    pub gated: Option<GatedTable>,
    pub heterogeneity: Vec<GroupHeterogeneity>,
    pub summary: RunSummary,
}

impl PipelineOutcome {
    pub fn n_unknown(&self) -> usize {
        self.predictions
            .predictions
            .iter()
            .filter(|l| l.as_str() == UNKNOWN_LABEL)
            .count()
    }

    /// Rows kept for heterogeneity when a `state` column was derived.
    pub fn live_cells(&self) -> Option<usize> {
        self.gated
            .as_ref()
            .and_then(|g| g.live_rows())
            .map(|rows| rows.len())
    }
}

/// Plot axes: explicit names must be numeric columns; missing ones fill from the
/// first numeric channels in table order.
pub fn resolve_axes(
    table: &SampleTable,
    explicit: [Option<String>; 3],
) -> Result<[String; 3], PipelineError> {
    let numeric = table.numeric_names();
    if numeric.is_empty() {
        return Err(PipelineError::InvalidInput(
            "sample table has no numeric channels".to_string(),
        ));
    }
    let mut out: [String; 3] = Default::default();
    for (i, axis) in explicit.into_iter().enumerate() {
        out[i] = match axis {
            Some(name) => {
                if !numeric.contains(&name) {
                    return Err(PipelineError::InvalidInput(format!(
                        "axis {} is not a numeric column of the sample",
                        name
                    )));
                }
                name
            }
            None => numeric[i.min(numeric.len() - 1)].clone(),
        };
    }
    Ok(out)
}

fn enter(stage: PipelineStage, sample: &str) {
    tracing::info!(stage = stage.as_str(), sample, "pipeline stage");
}

fn request_plot(sink: &mut dyn OutputSink, request: &ScatterRequest<'_>) {
    if let Err(err) = sink.plot_scatter(request) {
        tracing::warn!(plot = %request.name, error = %err, "visualization request failed");
    }
}

/// Runs one sample end to end and hands every artefact to `sink` as soon as it exists.
pub fn run_pipeline(
    config: &RunConfig,
    table: &SampleTable,
    bundle: &ModelBundle,
    sink: &mut dyn OutputSink,
) -> Result<PipelineOutcome, PipelineError> {
    enter(PipelineStage::Raw, &config.sample);
    let c = validate_scaling_constant(config.scaling_constant)?;
    let n_classes = bundle.n_classes();
    let threshold = if config.filter_uncertain {
        Some(resolve_threshold(
            UncertaintyThreshold::from_raw(config.uncertainty_threshold),
            n_classes,
        )?)
    } else {
        None
    };
    if let Some(gating) = &config.gating {
        if gating.is_empty() {
            return Err(PipelineError::InvalidInput(
                "gating is enabled but no stain is configured".to_string(),
            ));
        }
    }
    sink.write_run_config(config)?;

    let features = table.numeric_projection(&[]);
    let predicted = run_stage2(&features, bundle, c)?;
    let mut labels = predicted.labels;
    enter(PipelineStage::Predicted, &config.sample);

    let mut n_unknown = 0usize;
    if let Some(t) = threshold {
        n_unknown = run_stage3(&mut labels, &predicted.uncertainties, t);
        enter(PipelineStage::UncertaintyFiltered, &config.sample);
    }

    let predictions = PredictionTable {
        table: table.clone(),
        predictions: labels,
        uncertainties: predicted.uncertainties,
    };
    sink.write_predictions(&predictions)?;
    let prediction_counts = report::prediction_counts(&predictions.predictions);
    sink.write_prediction_counts(&prediction_counts)?;
    let uncertainty_counts = match threshold {
        Some(t) => {
            let counts =
                report::uncertainty_counts(&predictions.predictions, &predictions.uncertainties, t);
            sink.write_uncertainty_counts(&counts)?;
            Some(counts)
        }
        None => None,
    };

    let transformed = run_stage1(table, c);
    let species_colours = color_map(&predictions.predictions);
    request_plot(
        sink,
        &ScatterRequest {
            name: "species".to_string(),
            table: &transformed,
            axes: &config.axes,
            labels: &predictions.predictions,
            colours: &species_colours,
            values: None,
        },
    );
    if threshold.is_some() {
        let confidence = predictions
            .predictions
            .iter()
            .map(|l| {
                if l == UNKNOWN_LABEL {
                    UNKNOWN_LABEL.to_string()
                } else {
                    "confident".to_string()
                }
            })
            .collect::<Vec<_>>();
        let colours = color_map(&confidence);
        request_plot(
            sink,
            &ScatterRequest {
                name: "uncertainty".to_string(),
                table: &transformed,
                axes: &config.axes,
                labels: &confidence,
                colours: &colours,
                values: Some((
                    UNCERTAINTIES_COLUMN,
                    predictions.uncertainties.as_slice(),
                )),
            },
        );
    }

    let gated = match &config.gating {
        Some(gating) => {
            let gated = run_stage4(&predictions, gating, c)?;
            let summary = report::gating_summary(&gated);
            sink.write_gating(&summary, &gated)?;
            for label in &gated.labels {
                if let Some(values) = gated.label_values(label) {
                    let colours = color_map(&values);
                    request_plot(
                        sink,
                        &ScatterRequest {
                            name: format!("gating_{}", label),
                            table: &gated.table,
                            axes: &config.axes,
                            labels: &values,
                            colours: &colours,
                            values: None,
                        },
                    );
                }
            }
            enter(PipelineStage::Gated, &config.sample);
            Some(gated)
        }
        None => None,
    };

    let (het_features, het_labels) = match &gated {
        Some(g) => match g.live_rows() {
            Some(rows) => (
                g.table.select_rows(&rows).numeric_projection(&[]),
                rows.iter()
                    .map(|&i| g.predictions[i].clone())
                    .collect::<Vec<_>>(),
            ),
            None => (g.table.numeric_projection(&[]), g.predictions.clone()),
        },
        None => (features, predictions.predictions.clone()),
    };
    let heterogeneity = run_stage5(
        &het_features,
        &het_labels,
        bundle.label_encoder.classes(),
        &config.clustering,
        &mut |row: &GroupHeterogeneity| sink.write_heterogeneity(row),
    )?;
    if let Err(err) = sink.plot_heterogeneity(&heterogeneity) {
        tracing::warn!(error = %err, "heterogeneity plot request failed");
    }
    enter(PipelineStage::HeterogeneityComputed, &config.sample);

    let summary = RunSummary {
        tool: TOOL_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        simd_backend: simd::backend_name().to_string(),
        sample: config.sample.clone(),
        n_cells: table.n_rows,
        species: bundle.label_encoder.classes().to_vec(),
        scaling_constant: c,
        prediction_counts,
        uncertainty: match (threshold, uncertainty_counts) {
            (Some(t), Some(counts)) => Some(UncertaintyStats {
                threshold: t,
                max_entropy: max_entropy(n_classes),
                n_unknown,
                median: report::median(&predictions.uncertainties),
                p90: report::p90(&predictions.uncertainties),
                counts,
            }),
            _ => None,
        },
        gating: gated.as_ref().map(|g| GatingStats {
            labels: g.labels.clone(),
            live_cells: g.live_rows().map(|rows| rows.len()),
        }),
        heterogeneity: heterogeneity.clone(),
    };
    sink.write_summary(&summary)?;
    enter(PipelineStage::Persisted, &config.sample);

    Ok(PipelineOutcome {
        predictions,
        threshold,
        gated,
        heterogeneity,
        summary,
    })
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/fixtures.rs"]
pub(crate) mod fixtures;

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/mod.rs"]
mod tests;

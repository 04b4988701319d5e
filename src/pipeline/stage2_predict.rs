use crate::input::{ColumnData, SampleTable};
use crate::model::ModelError;
use crate::model::bundle::ModelBundle;
use crate::pipeline::PipelineError;
use crate::pipeline::stage1_transform::arcsinh_in_place;
use crate::simd;

#[derive(Debug, Clone, PartialEq)]
pub struct Stage2Output {
    pub class_index: Vec<usize>,
    pub uncertainties: Vec<f64>,
    pub labels: Vec<String>,
}

/// Species Predictor: asinh transform, standardisation, classifier, arg-max and entropy.
///
/// `features` must be the numeric projection of the sample table with exactly the
/// scaler's feature count, in training order.
pub fn run_stage2(
    features: &SampleTable,
    bundle: &ModelBundle,
    scaling_constant: f64,
) -> Result<Stage2Output, PipelineError> {
    validate_features(features, bundle)?;

    let mut rows = features.numeric_rows();
    for row in rows.iter_mut() {
        arcsinh_in_place(row, scaling_constant);
    }
    let scaled = bundle.scaler.transform(&rows);
    let probabilities = bundle.classifier.predict(&scaled);

    let n_classes = bundle.n_classes();
    if probabilities.len() != features.n_rows {
        return Err(ModelError::Invalid(format!(
            "classifier returned {} rows for {} events",
            probabilities.len(),
            features.n_rows
        ))
        .into());
    }

    let mut class_index = Vec::with_capacity(features.n_rows);
    let mut uncertainties = Vec::with_capacity(features.n_rows);
    let mut labels = Vec::with_capacity(features.n_rows);
    for (row, probs) in probabilities.iter().enumerate() {
        // all-zero rows (e.g. a relu head) carry no prediction
        if probs.len() != n_classes
            || probs.iter().any(|p| !p.is_finite() || *p < 0.0)
            || simd::sum_f64(probs) <= 0.0
        {
            return Err(ModelError::Invalid(format!(
                "classifier returned an invalid probability row at event {}",
                row
            ))
            .into());
        }
        let idx = argmax(probs);
        let label = bundle.label_encoder.decode(idx).ok_or_else(|| {
            ModelError::Invalid(format!("class index {} has no species name", idx))
        })?;
        class_index.push(idx);
        uncertainties.push(simd::entropy_f64(probs));
        labels.push(label.to_string());
    }

    tracing::info!(
        n_cells = features.n_rows,
        n_species = n_classes,
        "predicted species"
    );

    Ok(Stage2Output {
        class_index,
        uncertainties,
        labels,
    })
}

/// First index of the maximum; ties resolve to the lowest index.
pub fn argmax(values: &[f64]) -> usize {
    let mut best = 0usize;
    for (idx, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = idx;
        }
    }
    best
}

fn validate_features(features: &SampleTable, bundle: &ModelBundle) -> Result<(), PipelineError> {
    if features.n_rows == 0 {
        return Err(PipelineError::InvalidInput(
            "sample table has no events".to_string(),
        ));
    }
    for column in &features.columns {
        match &column.data {
            ColumnData::Text(_) => {
                return Err(PipelineError::InvalidInput(format!(
                    "feature column {} is not numeric",
                    column.name
                )));
            }
            ColumnData::Numeric(values) => {
                if let Some(row) = values.iter().position(|v| !v.is_finite()) {
                    return Err(PipelineError::InvalidInput(format!(
                        "feature column {} has a non-finite value at event {}",
                        column.name, row
                    )));
                }
            }
        }
    }
    let expected = bundle.scaler.n_features();
    if features.n_cols() != expected {
        return Err(PipelineError::InvalidInput(format!(
            "sample has {} numeric channels but the model expects {}",
            features.n_cols(),
            expected
        )));
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage2_predict.rs"]
mod tests;

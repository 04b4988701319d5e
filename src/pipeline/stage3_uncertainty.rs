use crate::model::thresholds::{AUTO_THRESHOLD_FRACTION, UNKNOWN_LABEL, UncertaintyThreshold};
use crate::pipeline::PipelineError;

/// Largest entropy a distribution over `n_classes` classes can reach.
pub fn max_entropy(n_classes: usize) -> f64 {
    (n_classes as f64).ln()
}

/// Effective entropy threshold; a fixed value must lie in `[0, ln K]`.
pub fn resolve_threshold(
    threshold: UncertaintyThreshold,
    n_classes: usize,
) -> Result<f64, PipelineError> {
    let max = max_entropy(n_classes);
    match threshold {
        UncertaintyThreshold::Auto => {
            let effective = AUTO_THRESHOLD_FRACTION * max;
            tracing::info!(
                threshold = effective,
                max_entropy = max,
                "using automatic uncertainty threshold"
            );
            Ok(effective)
        }
        UncertaintyThreshold::Fixed(t) => {
            if t.is_finite() && (0.0..=max).contains(&t) {
                Ok(t)
            } else {
                Err(PipelineError::InvalidThreshold {
                    threshold: t,
                    max_entropy: max,
                    n_classes,
                })
            }
        }
    }
}

/// Relabels rows whose uncertainty is strictly above `threshold`; returns how many changed.
pub fn run_stage3(labels: &mut [String], uncertainties: &[f64], threshold: f64) -> usize {
    let mut relabeled = 0usize;
    for (label, &u) in labels.iter_mut().zip(uncertainties.iter()) {
        if u > threshold {
            *label = UNKNOWN_LABEL.to_string();
            relabeled += 1;
        }
    }
    tracing::info!(threshold, relabeled, "filtered uncertain predictions");
    relabeled
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage3_uncertainty.rs"]
mod tests;

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use crate::input::{ColumnData, SampleTable};
use crate::model::thresholds::{ClusteringProfile, MedoidMeasure};
use crate::pipeline::PipelineError;
use crate::simd;

pub const OVERALL_GROUP: &str = "Coculture overall";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Heterogeneity {
    pub simple: f64,
    pub medoid: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupHeterogeneity {
    pub group: String,
    pub n_cells: usize,
    pub value: Heterogeneity,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Centroid {
    pub center: Vec<f64>,
    pub inertia: f64,
}

/// Mean over feature columns of `max - min`.
pub fn simple_heterogeneity(features: &SampleTable) -> Result<f64, String> {
    if features.n_rows == 0 {
        return Err("no events in group".to_string());
    }
    let mut ranges = Vec::with_capacity(features.n_cols());
    for column in &features.columns {
        if let ColumnData::Numeric(values) = &column.data {
            ranges.push(simd::range_f64(values));
        }
    }
    if ranges.is_empty() {
        return Err("no numeric features".to_string());
    }
    Ok(simd::mean_f64(&ranges))
}

/// Single-centroid mini-batch k-means; the best of `n_init` seeded restarts by inertia.
pub fn fit_single_centroid(
    rows: &[Vec<f64>],
    profile: &ClusteringProfile,
) -> Result<Centroid, String> {
    let n = rows.len();
    if n == 0 {
        return Err("no events in group".to_string());
    }
    let dim = rows[0].len();
    if dim == 0 {
        return Err("no numeric features".to_string());
    }
    if rows.iter().any(|r| r.len() != dim || r.iter().any(|v| !v.is_finite())) {
        return Err("features contain non-finite values".to_string());
    }
    if profile.n_init == 0 || profile.batch_size == 0 {
        return Err("clustering needs at least one initialisation and batch".to_string());
    }

    let batch = profile.batch_size.min(n);
    let n_steps = (profile.max_iter * n).div_ceil(batch).max(1);
    let alpha = (batch as f64 * 2.0 / (n as f64 + 1.0)).min(1.0);
    let mut rng = ChaCha8Rng::seed_from_u64(profile.seed);
    let mut best: Option<Centroid> = None;

    for _ in 0..profile.n_init {
        let mut center = rows[rng.gen_range(0..n)].clone();
        let mut weight = 0f64;
        let mut ewa_inertia: Option<f64> = None;
        let mut best_ewa = f64::INFINITY;
        let mut no_improvement = 0usize;
        let mut batch_sum = vec![0f64; dim];

        for _ in 0..n_steps {
            batch_sum.iter_mut().for_each(|v| *v = 0.0);
            let mut batch_inertia = 0f64;
            for _ in 0..batch {
                let row = &rows[rng.gen_range(0..n)];
                let d = simd::euclidean_f64(row, &center);
                batch_inertia += d * d;
                for (s, x) in batch_sum.iter_mut().zip(row.iter()) {
                    *s += x;
                }
            }

            let new_weight = weight + batch as f64;
            for (c, s) in center.iter_mut().zip(batch_sum.iter()) {
                *c = (*c * weight + s) / new_weight;
            }
            weight = new_weight;

            let batch_inertia = batch_inertia / batch as f64;
            let ewa = match ewa_inertia {
                None => batch_inertia,
                Some(prev) => prev * (1.0 - alpha) + batch_inertia * alpha,
            };
            ewa_inertia = Some(ewa);
            if ewa < best_ewa {
                best_ewa = ewa;
                no_improvement = 0;
            } else {
                no_improvement += 1;
                if no_improvement >= profile.max_no_improvement {
                    break;
                }
            }
        }

        let inertia = rows
            .iter()
            .map(|row| {
                let d = simd::euclidean_f64(row, &center);
                d * d
            })
            .sum::<f64>();
        if !inertia.is_finite() {
            return Err("clustering diverged".to_string());
        }
        if best.as_ref().is_none_or(|b| inertia < b.inertia) {
            best = Some(Centroid { center, inertia });
        }
    }

    best.ok_or_else(|| "clustering produced no centroid".to_string())
}

/// Mean (or max) Euclidean distance from every row to the fitted centroid.
pub fn medoid_heterogeneity(
    features: &SampleTable,
    profile: &ClusteringProfile,
) -> Result<f64, String> {
    let rows = features.numeric_rows();
    let centroid = fit_single_centroid(&rows, profile)?;
    let distances = rows
        .iter()
        .map(|row| simd::euclidean_f64(row, &centroid.center))
        .collect::<Vec<_>>();
    Ok(match profile.measure {
        MedoidMeasure::Mean => simd::mean_f64(&distances),
        MedoidMeasure::Max => simd::min_max_f64(&distances).1,
    })
}

pub fn group_heterogeneity(
    group: &str,
    features: &SampleTable,
    profile: &ClusteringProfile,
) -> Result<GroupHeterogeneity, PipelineError> {
    let failure = |reason: String| PipelineError::ClusteringFailure {
        group: group.to_string(),
        reason,
    };
    let simple = simple_heterogeneity(features).map_err(failure)?;
    let medoid = medoid_heterogeneity(features, profile).map_err(failure)?;
    tracing::info!(group, n_cells = features.n_rows, simple, medoid, "computed heterogeneity");
    Ok(GroupHeterogeneity {
        group: group.to_string(),
        n_cells: features.n_rows,
        value: Heterogeneity { simple, medoid },
    })
}

/// Heterogeneity for the whole table, then each species in `species` order.
///
/// `on_group` sees each result as soon as it exists, so output written for earlier
/// groups survives a failure in a later one.
pub fn run_stage5(
    features: &SampleTable,
    labels: &[String],
    species: &[String],
    profile: &ClusteringProfile,
    on_group: &mut dyn FnMut(&GroupHeterogeneity) -> Result<(), PipelineError>,
) -> Result<Vec<GroupHeterogeneity>, PipelineError> {
    let mut out = Vec::with_capacity(species.len() + 1);

    let overall = group_heterogeneity(OVERALL_GROUP, features, profile)?;
    on_group(&overall)?;
    out.push(overall);

    for name in species {
        let rows = labels
            .iter()
            .enumerate()
            .filter(|(_, l)| *l == name)
            .map(|(i, _)| i)
            .collect::<Vec<_>>();
        let subset = features.select_rows(&rows);
        let result = group_heterogeneity(name, &subset, profile)?;
        on_group(&result)?;
        out.push(result);
    }

    Ok(out)
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage5_heterogeneity.rs"]
mod tests;

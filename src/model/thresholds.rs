use serde::{Deserialize, Serialize};

pub const UNKNOWN_LABEL: &str = "Unknown";
pub const AUTO_THRESHOLD_SENTINEL: f64 = -1.0;
pub const DEFAULT_SCALING_CONSTANT: f64 = 150.0;
pub const AUTO_THRESHOLD_FRACTION: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum UncertaintyThreshold {
    Auto,
    Fixed(f64),
}

impl UncertaintyThreshold {
    /// `-1` selects the automatic threshold; any other value is taken literally.
    pub fn from_raw(raw: f64) -> Self {
        if raw == AUTO_THRESHOLD_SENTINEL {
            UncertaintyThreshold::Auto
        } else {
            UncertaintyThreshold::Fixed(raw)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MedoidMeasure {
    /// Average distance to the centroid.
    Mean,
    /// Largest distance to the centroid.
    Max,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusteringProfile {
    pub batch_size: usize,
    pub n_init: usize,
    pub max_iter: usize,
    pub max_no_improvement: usize,
    pub seed: u64,
    pub measure: MedoidMeasure,
}

impl ClusteringProfile {
    pub fn default_v1() -> Self {
        Self {
            batch_size: 3080,
            n_init: 3,
            max_iter: 100,
            max_no_improvement: 10,
            seed: 0,
            measure: MedoidMeasure::Mean,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_measure(mut self, measure: MedoidMeasure) -> Self {
        self.measure = measure;
        self
    }
}

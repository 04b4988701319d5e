use serde::Serialize;

use crate::pipeline::stage5_heterogeneity::GroupHeterogeneity;
use crate::report::{LabelCount, UncertaintyCount};

pub const TOOL_NAME: &str = "kira-coculture";

#[derive(Debug, Clone, Serialize)]
pub struct UncertaintyStats {
    pub threshold: f64,
    pub max_entropy: f64,
    pub n_unknown: usize,
    pub median: f64,
    pub p90: f64,
    pub counts: Vec<UncertaintyCount>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GatingStats {
    pub labels: Vec<String>,
    /// Cells passing to heterogeneity when a state was derived.
    pub live_cells: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub tool: String,
    pub version: String,
    pub simd_backend: String,
    pub sample: String,
    pub n_cells: usize,
    pub species: Vec<String>,
    pub scaling_constant: f64,
    pub prediction_counts: Vec<LabelCount>,
    pub uncertainty: Option<UncertaintyStats>,
    pub gating: Option<GatingStats>,
    pub heterogeneity: Vec<GroupHeterogeneity>,
}

pub fn render_summary_json(summary: &RunSummary) -> Result<String, serde_json::Error> {
    let mut out = serde_json::to_string_pretty(summary)?;
    out.push('\n');
    Ok(out)
}

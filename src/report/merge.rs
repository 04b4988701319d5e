use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::pipeline::PipelineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MergeKind {
    Prediction,
    Uncertainty,
}

impl MergeKind {
    pub fn file_suffix(self) -> &'static str {
        match self {
            MergeKind::Prediction => "_prediction_counts.csv",
            MergeKind::Uncertainty => "_uncertainty_counts.csv",
        }
    }

    pub fn value_columns(self) -> &'static [&'static str] {
        match self {
            MergeKind::Prediction => &["count"],
            MergeKind::Uncertainty => &["greater_than", "less_than"],
        }
    }

    pub fn output_name(self) -> &'static str {
        match self {
            MergeKind::Prediction => "merged_prediction_counts.csv",
            MergeKind::Uncertainty => "merged_uncertainty_counts.csv",
        }
    }
}

/// Per-sample count files in `dir`, sorted by sample id.
pub fn find_count_files(dir: &Path, kind: MergeKind) -> Result<Vec<(String, PathBuf)>, PipelineError> {
    let mut out = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.starts_with("merged_") {
            continue;
        }
        if let Some(sample) = name.strip_suffix(kind.file_suffix()) {
            if !sample.is_empty() {
                out.push((sample.to_string(), path.clone()));
            }
        }
    }
    out.sort();
    Ok(out)
}

/// Outer join of per-sample count tables on the label column; absent labels count 0.
pub fn merge_counts(dir: &Path, kind: MergeKind) -> Result<PathBuf, PipelineError> {
    let files = find_count_files(dir, kind)?;
    if files.is_empty() {
        return Err(PipelineError::InvalidInput(format!(
            "no *{} files in {}",
            kind.file_suffix(),
            dir.display()
        )));
    }

    let value_columns = kind.value_columns();
    let mut merged: BTreeMap<String, Vec<u64>> = BTreeMap::new();
    let width = files.len() * value_columns.len();
    for (sample_idx, (sample, path)) in files.iter().enumerate() {
        let mut reader = csv::Reader::from_path(path)?;
        let headers = reader.headers()?.clone();
        let mut positions = Vec::with_capacity(value_columns.len());
        for column in value_columns {
            let pos = headers.iter().position(|h| h == *column).ok_or_else(|| {
                PipelineError::InvalidInput(format!(
                    "{} has no {} column",
                    path.display(),
                    column
                ))
            })?;
            positions.push(pos);
        }

        for record in reader.records() {
            let record = record?;
            let label = record.get(0).unwrap_or_default().to_string();
            let slot = merged.entry(label).or_insert_with(|| vec![0; width]);
            for (k, &pos) in positions.iter().enumerate() {
                let raw = record.get(pos).unwrap_or_default();
                let value = raw.parse::<u64>().map_err(|_| {
                    PipelineError::InvalidInput(format!(
                        "{}: count {:?} for sample {} is not an integer",
                        path.display(),
                        raw,
                        sample
                    ))
                })?;
                slot[sample_idx * value_columns.len() + k] += value;
            }
        }
    }

    let out_path = dir.join(kind.output_name());
    let mut writer = csv::Writer::from_path(&out_path)?;
    let mut header = vec!["predictions".to_string()];
    for (sample, _) in &files {
        if value_columns.len() == 1 {
            header.push(sample.clone());
        } else {
            for column in value_columns {
                header.push(format!("{}_{}", sample, column));
            }
        }
    }
    writer.write_record(&header)?;
    for (label, values) in &merged {
        let mut row = vec![label.clone()];
        row.extend(values.iter().map(|v| v.to_string()));
        writer.write_record(&row)?;
    }
    writer.flush()?;

    tracing::info!(
        kind = ?kind,
        n_samples = files.len(),
        n_labels = merged.len(),
        path = %out_path.display(),
        "merged count tables"
    );
    Ok(out_path)
}

#[cfg(test)]
#[path = "../../tests/src_inline/report/merge.rs"]
mod tests;

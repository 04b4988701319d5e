use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::input::SampleTable;
use crate::pipeline::stage4_gating::GatedTable;
use crate::pipeline::stage5_heterogeneity::GroupHeterogeneity;
use crate::pipeline::{PREDICTIONS_COLUMN, PipelineError, PredictionTable, RunConfig, UNCERTAINTIES_COLUMN};
use crate::report::json::{RunSummary, render_summary_json};
use crate::report::{ColorMap, GatingSummaryRow, LabelCount, UncertaintyCount, format_f64_6};

pub const HETEROGENEITY_HEADER: &str = "Species\tSimple Heterogeneity\tMedoid Heterogeneity";

/// A scatter of three axis columns, one label and colour per row, optionally
/// with a named per-row value such as the uncertainty.
#[derive(Debug, Clone)]
pub struct ScatterRequest<'a> {
    pub name: String,
    pub table: &'a SampleTable,
    pub axes: &'a [String; 3],
    pub labels: &'a [String],
    pub colours: &'a ColorMap,
    pub values: Option<(&'a str, &'a [f64])>,
}

/// Destination for every artefact of a run. Writes are appended as the pipeline
/// advances and are never rolled back.
pub trait OutputSink {
    fn write_run_config(&mut self, config: &RunConfig) -> Result<(), PipelineError>;
    fn write_predictions(&mut self, predictions: &PredictionTable) -> Result<(), PipelineError>;
    fn write_prediction_counts(&mut self, counts: &[LabelCount]) -> Result<(), PipelineError>;
    fn write_uncertainty_counts(&mut self, counts: &[UncertaintyCount])
    -> Result<(), PipelineError>;
    fn write_gating(
        &mut self,
        summary: &[GatingSummaryRow],
        gated: &GatedTable,
    ) -> Result<(), PipelineError>;
    /// Called once per group; the first call starts the results table.
    fn write_heterogeneity(&mut self, row: &GroupHeterogeneity) -> Result<(), PipelineError>;
    fn write_summary(&mut self, summary: &RunSummary) -> Result<(), PipelineError>;
    fn plot_scatter(&mut self, request: &ScatterRequest<'_>) -> Result<(), PipelineError>;
    fn plot_heterogeneity(&mut self, rows: &[GroupHeterogeneity]) -> Result<(), PipelineError>;
}

/// Writes everything under one output directory, file names prefixed by the sample id.
pub struct FileSink {
    out_dir: PathBuf,
    sample: String,
    heterogeneity: Option<BufWriter<File>>,
}

impl FileSink {
    pub fn new(out_dir: &Path, sample: &str) -> Result<Self, PipelineError> {
        fs::create_dir_all(out_dir)?;
        Ok(Self {
            out_dir: out_dir.to_path_buf(),
            sample: sample.to_string(),
            heterogeneity: None,
        })
    }

    pub fn predictions_path(&self) -> PathBuf {
        self.out_dir
            .join(format!("{}_raw_predictions.csv", self.sample))
    }

    pub fn prediction_counts_path(&self) -> PathBuf {
        self.out_dir
            .join(format!("{}_prediction_counts.csv", self.sample))
    }

    pub fn uncertainty_counts_path(&self) -> PathBuf {
        self.out_dir
            .join(format!("{}_uncertainty_counts.csv", self.sample))
    }

    pub fn gating_path(&self) -> PathBuf {
        self.out_dir
            .join("gated")
            .join(format!("{}_gating.csv", self.sample))
    }

    pub fn gated_data_path(&self) -> PathBuf {
        self.out_dir
            .join("gated")
            .join(format!("{}_gated_data.tsv", self.sample))
    }

    pub fn heterogeneity_path(&self) -> PathBuf {
        self.out_dir
            .join("heterogeneity_results")
            .join(format!("{}_heterogeneity_results.txt", self.sample))
    }

    pub fn plot_path(&self, name: &str) -> PathBuf {
        self.out_dir
            .join("plots")
            .join(format!("{}_{}.tsv", self.sample, name))
    }

    pub fn summary_path(&self) -> PathBuf {
        self.out_dir.join("summary.json")
    }

    pub fn run_config_path(&self) -> PathBuf {
        self.out_dir.join("run_config.json")
    }
}

fn create_in_dir(path: &Path) -> Result<BufWriter<File>, PipelineError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(BufWriter::new(File::create(path)?))
}

fn write_text(path: &Path, text: &str) -> Result<(), PipelineError> {
    let mut w = create_in_dir(path)?;
    w.write_all(text.as_bytes())?;
    w.flush()?;
    Ok(())
}

impl OutputSink for FileSink {
    fn write_run_config(&mut self, config: &RunConfig) -> Result<(), PipelineError> {
        let mut json = serde_json::to_string_pretty(config)?;
        json.push('\n');
        write_text(&self.run_config_path(), &json)
    }

    fn write_predictions(&mut self, predictions: &PredictionTable) -> Result<(), PipelineError> {
        let path = self.predictions_path();
        let mut w = csv::Writer::from_writer(create_in_dir(&path)?);
        let table = &predictions.table;

        let mut header = table
            .columns
            .iter()
            .map(|c| c.name.clone())
            .collect::<Vec<_>>();
        header.push(PREDICTIONS_COLUMN.to_string());
        header.push(UNCERTAINTIES_COLUMN.to_string());
        w.write_record(&header)?;

        for row in 0..table.n_rows {
            let mut record = table
                .columns
                .iter()
                .map(|c| c.data.render(row))
                .collect::<Vec<_>>();
            record.push(predictions.predictions[row].clone());
            record.push(predictions.uncertainties[row].to_string());
            w.write_record(&record)?;
        }
        w.flush()?;
        tracing::info!(path = %path.display(), n_cells = table.n_rows, "wrote raw predictions");
        Ok(())
    }

    fn write_prediction_counts(&mut self, counts: &[LabelCount]) -> Result<(), PipelineError> {
        let mut w = csv::Writer::from_writer(create_in_dir(&self.prediction_counts_path())?);
        w.write_record([PREDICTIONS_COLUMN, "count"])?;
        for c in counts {
            let count = c.count.to_string();
            w.write_record([c.label.as_str(), count.as_str()])?;
        }
        w.flush()?;
        Ok(())
    }

    fn write_uncertainty_counts(
        &mut self,
        counts: &[UncertaintyCount],
    ) -> Result<(), PipelineError> {
        let mut w = csv::Writer::from_writer(create_in_dir(&self.uncertainty_counts_path())?);
        w.write_record([PREDICTIONS_COLUMN, "greater_than", "less_than"])?;
        for c in counts {
            let greater = c.greater_than.to_string();
            let less = c.less_than.to_string();
            w.write_record([c.label.as_str(), greater.as_str(), less.as_str()])?;
        }
        w.flush()?;
        Ok(())
    }

    fn write_gating(
        &mut self,
        summary: &[GatingSummaryRow],
        gated: &GatedTable,
    ) -> Result<(), PipelineError> {
        let mut w = csv::Writer::from_writer(create_in_dir(&self.gating_path())?);
        w.write_record(["species", "gate", "value", "count"])?;
        for r in summary {
            let count = r.count.to_string();
            w.write_record([
                r.species.as_str(),
                r.gate.as_str(),
                r.value.as_str(),
                count.as_str(),
            ])?;
        }
        w.flush()?;

        let label_columns = gated
            .labels
            .iter()
            .filter_map(|l| gated.label_values(l).map(|v| (l.as_str(), v)))
            .collect::<Vec<_>>();
        let mut w = create_in_dir(&self.gated_data_path())?;
        let mut header = gated
            .table
            .columns
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>();
        header.push(PREDICTIONS_COLUMN);
        header.push(UNCERTAINTIES_COLUMN);
        header.extend(label_columns.iter().map(|(l, _)| *l));
        writeln!(w, "{}", header.join("\t"))?;

        for row in 0..gated.table.n_rows {
            let mut fields = gated
                .table
                .columns
                .iter()
                .map(|c| c.data.render(row))
                .collect::<Vec<_>>();
            fields.push(gated.predictions[row].clone());
            fields.push(gated.uncertainties[row].to_string());
            for (_, values) in &label_columns {
                fields.push(values[row].clone());
            }
            writeln!(w, "{}", fields.join("\t"))?;
        }
        w.flush()?;
        tracing::info!(
            path = %self.gated_data_path().display(),
            labels = ?gated.labels,
            "wrote gated data"
        );
        Ok(())
    }

    fn write_heterogeneity(&mut self, row: &GroupHeterogeneity) -> Result<(), PipelineError> {
        if self.heterogeneity.is_none() {
            let mut w = create_in_dir(&self.heterogeneity_path())?;
            writeln!(w, "{}", HETEROGENEITY_HEADER)?;
            self.heterogeneity = Some(w);
        }
        let Some(w) = self.heterogeneity.as_mut() else {
            return Err(PipelineError::Output(
                "heterogeneity table is not open".to_string(),
            ));
        };
        writeln!(
            w,
            "{}\t{}\t{}",
            row.group,
            format_f64_6(row.value.simple),
            format_f64_6(row.value.medoid)
        )?;
        w.flush()?;
        Ok(())
    }

    fn write_summary(&mut self, summary: &RunSummary) -> Result<(), PipelineError> {
        let json = render_summary_json(summary)?;
        write_text(&self.summary_path(), &json)
    }

    fn plot_scatter(&mut self, request: &ScatterRequest<'_>) -> Result<(), PipelineError> {
        let mut columns = Vec::with_capacity(3);
        for axis in request.axes {
            let values = request.table.numeric(axis).ok_or_else(|| {
                PipelineError::Output(format!("plot axis {} is not a numeric column", axis))
            })?;
            columns.push(values);
        }

        if let Some((name, values)) = request.values {
            if values.len() != request.table.n_rows {
                return Err(PipelineError::Output(format!(
                    "plot column {} has {} values for {} rows",
                    name,
                    values.len(),
                    request.table.n_rows
                )));
            }
        }

        let mut w = create_in_dir(&self.plot_path(&request.name))?;
        write!(
            w,
            "{}\t{}\t{}\tlabel\tcolour",
            request.axes[0], request.axes[1], request.axes[2]
        )?;
        match request.values {
            Some((name, _)) => writeln!(w, "\t{}", name)?,
            None => writeln!(w)?,
        }
        for row in 0..request.table.n_rows {
            let label = &request.labels[row];
            write!(
                w,
                "{}\t{}\t{}\t{}\t{}",
                format_f64_6(columns[0][row]),
                format_f64_6(columns[1][row]),
                format_f64_6(columns[2][row]),
                label,
                request.colours.colour_for(label)
            )?;
            match request.values {
                Some((_, values)) => writeln!(w, "\t{}", values[row])?,
                None => writeln!(w)?,
            }
        }
        w.flush()?;
        Ok(())
    }

    fn plot_heterogeneity(&mut self, rows: &[GroupHeterogeneity]) -> Result<(), PipelineError> {
        let mut w = create_in_dir(&self.plot_path("heterogeneity"))?;
        writeln!(w, "group\tn_cells\tsimple\tmedoid")?;
        for r in rows {
            writeln!(
                w,
                "{}\t{}\t{}\t{}",
                r.group,
                r.n_cells,
                format_f64_6(r.value.simple),
                format_f64_6(r.value.medoid)
            )?;
        }
        w.flush()?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage6_output.rs"]
mod tests;

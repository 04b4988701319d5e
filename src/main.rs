mod input;
mod logging;
mod model;
mod pipeline;
mod report;
mod simd;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::input::{SampleTable, default_sample_id, load_sample_table};
use crate::model::bundle::{ModelBundle, load_bundle};
use crate::model::stain::StainSpec;
use crate::model::thresholds::{
    AUTO_THRESHOLD_SENTINEL, ClusteringProfile, DEFAULT_SCALING_CONSTANT, MedoidMeasure,
};
use crate::pipeline::stage4_gating::GateConfig;
use crate::pipeline::stage6_output::FileSink;
use crate::pipeline::{PipelineError, RunConfig, resolve_axes, run_pipeline};
use crate::report::merge::{MergeKind, merge_counts};

#[derive(Debug, Parser)]
#[command(
    name = "kira-coculture",
    version,
    about = "Species prediction, viability gating and heterogeneity for co-culture flow cytometry"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Predict, filter, gate and measure one sample.
    Run(RunArgs),
    /// Merge per-sample count tables of a directory.
    Merge(MergeArgs),
}

#[derive(Debug, Clone, Args)]
struct RunArgs {
    /// Event table (.csv, .tsv, .txt, optionally .gz).
    #[arg(long)]
    input: PathBuf,
    /// Classifier bundle (JSON).
    #[arg(long)]
    model: PathBuf,
    #[arg(long)]
    out: PathBuf,
    /// Sample id used in output file names; defaults to the input file stem.
    #[arg(long)]
    sample: Option<String>,
    #[arg(long)]
    x_axis: Option<String>,
    #[arg(long)]
    y_axis: Option<String>,
    #[arg(long)]
    z_axis: Option<String>,
    /// Cofactor of asinh(x / c); overrides the bundle's value.
    #[arg(long)]
    scaling_constant: Option<f64>,
    #[arg(long)]
    filter_uncertain: bool,
    /// Entropy threshold; -1 selects half the maximum entropy.
    #[arg(long, default_value_t = AUTO_THRESHOLD_SENTINEL, allow_negative_numbers = true)]
    uncertainty_threshold: f64,
    #[arg(long)]
    gating: bool,
    /// Viability stain, CHANNEL:REL:THRESHOLD.
    #[arg(long, value_parser = StainSpec::parse_primary, allow_hyphen_values = true)]
    stain1: Option<StainSpec>,
    /// Cell marker stain, CHANNEL:REL:THRESHOLD.
    #[arg(long, value_parser = StainSpec::parse_primary, allow_hyphen_values = true)]
    stain2: Option<StainSpec>,
    /// Additional stain, CHANNEL:REL:THRESHOLD:LABEL; repeatable.
    #[arg(long, value_parser = StainSpec::parse_extra, allow_hyphen_values = true)]
    extra_stain: Vec<StainSpec>,
    /// Column removed before analysis; repeatable.
    #[arg(long, default_value = "Time")]
    drop_column: Vec<String>,
    #[arg(long, value_enum, default_value_t = MedoidMeasure::Mean)]
    medoid_measure: MedoidMeasure,
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

#[derive(Debug, Clone, Args)]
struct MergeArgs {
    #[arg(long)]
    dir: PathBuf,
    #[arg(long, value_enum)]
    kind: MergeKind,
}

fn main() {
    logging::init();
    tracing::info!(simd_backend = simd::backend_name(), "starting");
    let cli = Cli::parse();
    let result = match &cli.command {
        Command::Run(args) => run(args),
        Command::Merge(args) => merge_counts(&args.dir, args.kind).map(|_| ()),
    };
    if let Err(err) = result {
        tracing::error!("{err}");
        std::process::exit(1);
    }
}

fn run(args: &RunArgs) -> Result<(), PipelineError> {
    let table = load_sample_table(&args.input, &args.drop_column)?;
    let bundle = load_bundle(&args.model)?;
    let config = build_run_config(args, &table, &bundle)?;

    let mut sink = FileSink::new(&args.out, &config.sample)?;
    let outcome = run_pipeline(&config, &table, &bundle, &mut sink)?;
    tracing::info!(
        sample = %config.sample,
        n_cells = outcome.summary.n_cells,
        threshold = ?outcome.threshold,
        n_unknown = outcome.n_unknown(),
        live_cells = ?outcome.live_cells(),
        n_groups = outcome.heterogeneity.len(),
        out = %args.out.display(),
        "run complete"
    );
    Ok(())
}

fn build_run_config(
    args: &RunArgs,
    table: &SampleTable,
    bundle: &ModelBundle,
) -> Result<RunConfig, PipelineError> {
    let sample = args
        .sample
        .clone()
        .unwrap_or_else(|| default_sample_id(&args.input));
    let axes = resolve_axes(
        table,
        [args.x_axis.clone(), args.y_axis.clone(), args.z_axis.clone()],
    )?;
    let scaling_constant = args
        .scaling_constant
        .or(bundle.scaling_constant)
        .unwrap_or(DEFAULT_SCALING_CONSTANT);

    let gating = if args.gating {
        Some(GateConfig {
            viability: args.stain1.clone(),
            cell_marker: args.stain2.clone(),
            extra: args.extra_stain.clone(),
        })
    } else {
        if args.stain1.is_some() || args.stain2.is_some() || !args.extra_stain.is_empty() {
            tracing::warn!("stains were given without --gating; gating is skipped");
        }
        None
    };

    Ok(RunConfig {
        sample,
        axes,
        scaling_constant,
        filter_uncertain: args.filter_uncertain,
        uncertainty_threshold: args.uncertainty_threshold,
        gating,
        drop_columns: args.drop_column.clone(),
        clustering: ClusteringProfile::default_v1()
            .with_seed(args.seed)
            .with_measure(args.medoid_measure),
    })
}

#[cfg(test)]
#[path = "../tests/src_inline/main_inline.rs"]
mod tests;

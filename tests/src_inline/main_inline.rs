use clap::Parser;

use super::*;
use crate::model::stain::Relation;
use crate::pipeline::fixtures::{sign_bundle, table_from};

fn parse_run(extra: &[&str]) -> RunArgs {
    let mut argv = vec![
        "kira-coculture",
        "run",
        "--input",
        "data/co_01.csv.gz",
        "--model",
        "bundle.json",
        "--out",
        "out",
    ];
    argv.extend_from_slice(extra);
    match Cli::try_parse_from(argv).unwrap().command {
        Command::Run(args) => args,
        other => panic!("unexpected command {other:?}"),
    }
}

#[test]
fn test_parse_run_defaults() {
    let args = parse_run(&[]);
    assert_eq!(args.uncertainty_threshold, -1.0);
    assert_eq!(args.drop_column, vec!["Time"]);
    assert_eq!(args.medoid_measure, MedoidMeasure::Mean);
    assert!(!args.gating);
    assert!(args.extra_stain.is_empty());
}

#[test]
fn test_parse_run_stains() {
    let args = parse_run(&[
        "--gating",
        "--stain1",
        "PI-A:>:1.5",
        "--stain2",
        "SYTO-A:gt:0.8",
        "--extra-stain",
        "GFP-A:<:-0.5:gfp_low",
        "--uncertainty-threshold",
        "0.4",
        "--medoid-measure",
        "max",
    ]);
    let s1 = args.stain1.unwrap();
    assert_eq!(s1.channel, "PI-A");
    assert_eq!(s1.relation, Relation::GreaterThan);
    assert_eq!(s1.threshold, 1.5);
    assert_eq!(args.extra_stain[0].label.as_deref(), Some("gfp_low"));
    assert_eq!(args.extra_stain[0].threshold, -0.5);
    assert_eq!(args.uncertainty_threshold, 0.4);
    assert_eq!(args.medoid_measure, MedoidMeasure::Max);
}

#[test]
fn test_parse_rejects_bad_stain() {
    let argv = [
        "kira-coculture",
        "run",
        "--input",
        "a.csv",
        "--model",
        "b.json",
        "--out",
        "o",
        "--stain1",
        "PI-A:>=:1",
    ];
    assert!(Cli::try_parse_from(argv).is_err());
}

#[test]
fn test_parse_merge() {
    let cli = Cli::try_parse_from([
        "kira-coculture",
        "merge",
        "--dir",
        "out",
        "--kind",
        "uncertainty",
    ])
    .unwrap();
    match cli.command {
        Command::Merge(args) => assert_eq!(args.kind, MergeKind::Uncertainty),
        other => panic!("unexpected command {other:?}"),
    }
}

#[test]
fn test_build_run_config() {
    let table = table_from(&[("FSC", vec![1.0]), ("SSC", vec![2.0]), ("FL1", vec![3.0])]);
    let bundle = sign_bundle(3);

    let args = parse_run(&["--stain1", "FSC:>:1"]);
    let config = build_run_config(&args, &table, &bundle).unwrap();
    assert_eq!(config.sample, "co_01");
    assert_eq!(config.axes, ["FSC", "SSC", "FL1"].map(String::from));
    assert_eq!(config.scaling_constant, DEFAULT_SCALING_CONSTANT);
    assert!(config.gating.is_none());

    let args = parse_run(&[
        "--gating",
        "--stain1",
        "FSC:>:1",
        "--scaling-constant",
        "5",
        "--sample",
        "named",
        "--seed",
        "7",
    ]);
    let config = build_run_config(&args, &table, &bundle).unwrap();
    assert_eq!(config.sample, "named");
    assert_eq!(config.scaling_constant, 5.0);
    assert_eq!(config.clustering.seed, 7);
    let gating = config.gating.unwrap();
    assert!(gating.viability.is_some());
    assert!(gating.cell_marker.is_none());
}

use super::*;
use crate::model::stain::Relation;
use crate::pipeline::fixtures::table_from;
use crate::pipeline::stage1_transform::arcsinh;

fn prediction_table(columns: &[(&str, Vec<f64>)]) -> PredictionTable {
    let table = table_from(columns);
    let n = table.n_rows;
    PredictionTable {
        table,
        predictions: (0..n)
            .map(|i| if i % 2 == 0 { "A".to_string() } else { "B".to_string() })
            .collect(),
        uncertainties: vec![0.1; n],
    }
}

#[test]
fn test_all_false_gate_is_rejected() {
    let table = table_from(&[("viability", vec![1.0, 2.0, 3.0, 4.0, 5.0])]);
    let spec = StainSpec::new("viability", Relation::GreaterThan, 10.0);
    let err = evaluate_stain(&table, &spec, DEAD_LABEL).unwrap_err();
    match err {
        PipelineError::GatingConfiguration {
            channel,
            min,
            max,
            threshold,
            relation,
            ..
        } => {
            assert_eq!(channel, "viability");
            assert_eq!(min, 1.0);
            assert_eq!(max, 5.0);
            assert_eq!(threshold, 10.0);
            assert_eq!(relation, Relation::GreaterThan);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_all_true_gate_is_rejected() {
    let table = table_from(&[("marker", vec![1.0, 2.0, 3.0])]);
    let spec = StainSpec::new("marker", Relation::LessThan, 10.0);
    assert!(matches!(
        evaluate_stain(&table, &spec, CELL_LABEL).unwrap_err(),
        PipelineError::GatingConfiguration { .. }
    ));
}

#[test]
fn test_missing_channel_is_invalid_input() {
    let table = table_from(&[("marker", vec![1.0, 2.0])]);
    let spec = StainSpec::new("PI", Relation::LessThan, 10.0);
    assert!(matches!(
        evaluate_stain(&table, &spec, DEAD_LABEL).unwrap_err(),
        PipelineError::InvalidInput(_)
    ));
}

#[test]
fn test_state_truth_table_literal_rows() {
    // viability < 50 marks dead, marker > 100 marks cell
    let table = table_from(&[
        ("viability", vec![10.0, 80.0, 10.0, 80.0]),
        ("marker", vec![200.0, 200.0, 20.0, 20.0]),
    ]);
    let dead = evaluate_stain(
        &table,
        &StainSpec::new("viability", Relation::LessThan, 50.0),
        DEAD_LABEL,
    )
    .unwrap();
    let cell = evaluate_stain(
        &table,
        &StainSpec::new("marker", Relation::GreaterThan, 100.0),
        CELL_LABEL,
    )
    .unwrap();
    assert_eq!(dead.values, vec![true, false, true, false]);
    assert_eq!(cell.values, vec![true, true, false, false]);

    let states = derive_states(&dead.values, &cell.values);
    assert_eq!(
        states,
        vec![
            CellState::Inactive,
            CellState::Live,
            CellState::Debris,
            CellState::Debris,
        ]
    );
}

#[test]
fn test_run_stage4_thresholds_live_in_transformed_space() {
    let preds = prediction_table(&[
        ("viability", vec![10.0, 1500.0, 10.0, 1500.0]),
        ("marker", vec![3000.0, 3000.0, 15.0, 15.0]),
    ]);
    let config = GateConfig {
        viability: Some(StainSpec::new("viability", Relation::GreaterThan, 1.0)),
        cell_marker: Some(StainSpec::new("marker", Relation::GreaterThan, 1.0)),
        extra: Vec::new(),
    };
    let gated = run_stage4(&preds, &config, 150.0).unwrap();

    assert_eq!(gated.labels, vec![STATE_LABEL.to_string()]);
    assert_eq!(
        gated.state.as_deref().unwrap(),
        &[
            CellState::Live,
            CellState::Inactive,
            CellState::Debris,
            CellState::Debris
        ]
    );
    assert_eq!(gated.live_rows(), Some(vec![0]));
    let v = gated.table.numeric("viability").unwrap();
    assert!((v[1] - arcsinh(1500.0, 150.0)).abs() < 1e-15);
    // raw gates stay available even though the label list hides them
    assert_eq!(gated.gate(DEAD_LABEL).unwrap(), &[false, true, false, true]);
    assert_eq!(gated.predictions, preds.predictions);
}

#[test]
fn test_single_primary_keeps_its_label() {
    let preds = prediction_table(&[("viability", vec![10.0, 1500.0])]);
    let config = GateConfig {
        viability: Some(StainSpec::new("viability", Relation::GreaterThan, 1.0)),
        ..GateConfig::default()
    };
    let gated = run_stage4(&preds, &config, 150.0).unwrap();
    assert_eq!(gated.labels, vec![DEAD_LABEL.to_string()]);
    assert!(gated.state.is_none());
    assert!(gated.live_rows().is_none());
    assert_eq!(
        gated.label_values(DEAD_LABEL).unwrap(),
        vec!["not_dead".to_string(), "dead".to_string()]
    );
}

#[test]
fn test_extra_stains_follow_state() {
    let preds = prediction_table(&[
        ("viability", vec![10.0, 1500.0, 10.0]),
        ("marker", vec![3000.0, 3000.0, 15.0]),
        ("GFP", vec![5000.0, 1.0, 1.0]),
    ]);
    let config = GateConfig {
        viability: Some(StainSpec::new("viability", Relation::GreaterThan, 1.0)),
        cell_marker: Some(StainSpec::new("marker", Relation::GreaterThan, 1.0)),
        extra: vec![StainSpec::new("GFP", Relation::GreaterThan, 2.0).with_label("gfp_pos")],
    };
    let gated = run_stage4(&preds, &config, 150.0).unwrap();
    assert_eq!(gated.labels, vec!["state".to_string(), "gfp_pos".to_string()]);
    assert_eq!(gated.gate("gfp_pos").unwrap(), &[true, false, false]);
    assert_eq!(
        gated.label_values("state").unwrap(),
        vec!["live", "inactive", "debris"]
    );
}

#[test]
fn test_extra_stain_fails_like_primary() {
    let preds = prediction_table(&[("GFP", vec![1.0, 2.0, 3.0])]);
    let config = GateConfig {
        extra: vec![StainSpec::new("GFP", Relation::GreaterThan, 5.0).with_label("gfp_pos")],
        ..GateConfig::default()
    };
    let err = run_stage4(&preds, &config, 150.0).unwrap_err();
    match err {
        PipelineError::GatingConfiguration { label, .. } => assert_eq!(label, "gfp_pos"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_extra_label_validation() {
    let preds = prediction_table(&[("GFP", vec![1.0, 2000.0])]);
    for label in ["state", "GFP", "predictions"] {
        let config = GateConfig {
            extra: vec![StainSpec::new("GFP", Relation::GreaterThan, 1.0).with_label(label)],
            ..GateConfig::default()
        };
        assert!(matches!(
            run_stage4(&preds, &config, 150.0).unwrap_err(),
            PipelineError::InvalidInput(_)
        ));
    }
    let unlabeled = GateConfig {
        extra: vec![StainSpec::new("GFP", Relation::GreaterThan, 1.0)],
        ..GateConfig::default()
    };
    assert!(run_stage4(&preds, &unlabeled, 150.0).is_err());
}

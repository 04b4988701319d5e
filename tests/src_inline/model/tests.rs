use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::bundle::{ModelBundle, load_bundle};
use super::classifier::{Activation, Classifier, DenseLayer, DenseNetwork};
use super::encoder::LabelEncoder;
use super::scaler::StandardScaler;
use super::state::CellState;
use super::thresholds::UncertaintyThreshold;
use super::*;

static DIR_COUNTER: AtomicUsize = AtomicUsize::new(0);

fn make_temp_dir() -> PathBuf {
    let mut dir = std::env::temp_dir();
    let id = DIR_COUNTER.fetch_add(1, Ordering::SeqCst);
    dir.push(format!("kira_coculture_model_{}_{}", std::process::id(), id));
    fs::create_dir_all(&dir).unwrap();
    dir
}

const BUNDLE_JSON: &str = r#"{
  "classifier": {
    "layers": [
      {"weights": [[1.0, -1.0], [0.0, 0.0]], "bias": [0.0, 0.0], "activation": "softmax"}
    ]
  },
  "scaler": {"mean": [1.0, 2.0], "scale": [2.0, 0.0]},
  "label_encoder": {"classes": ["E. coli", "P. putida"]},
  "scaling_constant": 150.0
}"#;

fn species(names: &[&str]) -> LabelEncoder {
    LabelEncoder::new(names.iter().map(|s| s.to_string()).collect()).unwrap()
}

#[test]
fn test_load_bundle_from_json() {
    let dir = make_temp_dir();
    let path = dir.join("bundle.json");
    fs::write(&path, BUNDLE_JSON).unwrap();

    let bundle = load_bundle(&path).unwrap();
    assert_eq!(bundle.n_classes(), 2);
    assert_eq!(bundle.scaler.n_features(), 2);
    assert_eq!(bundle.scaling_constant, Some(150.0));
    assert_eq!(bundle.label_encoder.decode(1), Some("P. putida"));
}

#[test]
fn test_load_bundle_rejects_width_mismatch() {
    let dir = make_temp_dir();
    let path = dir.join("bundle.json");
    let bad = BUNDLE_JSON.replace(r#""mean": [1.0, 2.0], "scale": [2.0, 0.0]"#, r#""mean": [1.0], "scale": [2.0]"#);
    fs::write(&path, bad).unwrap();

    let err = load_bundle(&path).unwrap_err();
    assert!(matches!(err, ModelError::Invalid(_)));
}

#[test]
fn test_load_bundle_malformed_json() {
    let dir = make_temp_dir();
    let path = dir.join("bundle.json");
    fs::write(&path, "{not json").unwrap();
    assert!(matches!(load_bundle(&path).unwrap_err(), ModelError::Json(_)));
}

#[test]
fn test_label_encoder_round_trip_is_bijective() {
    let enc = species(&["A", "B", "C"]);
    for idx in 0..enc.len() {
        let name = enc.decode(idx).unwrap();
        assert_eq!(enc.encode(name), Some(idx));
    }
    let decoded = (0..enc.len())
        .map(|i| enc.decode(i).unwrap().to_string())
        .collect::<std::collections::BTreeSet<_>>();
    let original = enc
        .classes()
        .iter()
        .cloned()
        .collect::<std::collections::BTreeSet<_>>();
    assert_eq!(decoded, original);
    assert_eq!(enc.decode(3), None);
}

#[test]
fn test_label_encoder_rejects_duplicates_and_empty() {
    assert!(LabelEncoder::new(vec![]).is_err());
    assert!(LabelEncoder::new(vec!["A".into(), "A".into()]).is_err());
}

#[test]
fn test_scaler_transform_handles_zero_scale() {
    let scaler = StandardScaler {
        mean: vec![1.0, 2.0],
        scale: vec![2.0, 0.0],
    };
    let out = scaler.transform(&[vec![5.0, 3.0]]);
    assert_eq!(out, vec![vec![2.0, 1.0]]);
}

#[test]
fn test_dense_network_softmax_rows_sum_to_one() {
    let net = DenseNetwork {
        layers: vec![
            DenseLayer {
                weights: vec![vec![1.0, -1.0, 0.5], vec![0.2, 0.3, -0.4]],
                bias: vec![0.0, 0.1, -0.1],
                activation: Activation::Relu,
            },
            DenseLayer {
                weights: vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.5, 0.5]],
                bias: vec![0.0, 0.0],
                activation: Activation::Softmax,
            },
        ],
    };
    net.validate().unwrap();
    assert_eq!(net.n_features(), 2);
    assert_eq!(net.n_classes(), 2);
    let probs = net.predict(&[vec![1.0, 2.0], vec![-3.0, 0.5]]);
    for row in probs {
        let sum: f64 = row.iter().sum();
        assert!((sum - 1.0).abs() < 1e-12);
        assert!(row.iter().all(|&p| p >= 0.0));
    }
}

#[test]
fn test_dense_network_rejects_broken_chain() {
    let net = DenseNetwork {
        layers: vec![
            DenseLayer {
                weights: vec![vec![1.0, 1.0]],
                bias: vec![0.0, 0.0],
                activation: Activation::Tanh,
            },
            DenseLayer {
                weights: vec![vec![1.0]],
                bias: vec![0.0],
                activation: Activation::Sigmoid,
            },
        ],
    };
    assert!(net.validate().is_err());
}

#[test]
fn test_bundle_rejects_class_count_mismatch() {
    let net = DenseNetwork {
        layers: vec![DenseLayer {
            weights: vec![vec![1.0, 0.0]],
            bias: vec![0.0, 0.0],
            activation: Activation::Softmax,
        }],
    };
    let scaler = StandardScaler {
        mean: vec![0.0],
        scale: vec![1.0],
    };
    let err = ModelBundle::new(Box::new(net), scaler, species(&["A", "B", "C"]), None);
    assert!(err.is_err());
}

#[test]
fn test_state_truth_table() {
    assert_eq!(CellState::from_gates(false, true), CellState::Live);
    assert_eq!(CellState::from_gates(true, true), CellState::Inactive);
    assert_eq!(CellState::from_gates(true, false), CellState::Debris);
    assert_eq!(CellState::from_gates(false, false), CellState::Debris);
}

#[test]
fn test_threshold_sentinel() {
    assert_eq!(UncertaintyThreshold::from_raw(-1.0), UncertaintyThreshold::Auto);
    assert_eq!(
        UncertaintyThreshold::from_raw(0.3),
        UncertaintyThreshold::Fixed(0.3)
    );
    assert_eq!(
        UncertaintyThreshold::from_raw(-0.5),
        UncertaintyThreshold::Fixed(-0.5)
    );
}

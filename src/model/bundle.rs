use std::fs::File;
use std::path::Path;

use memmap2::Mmap;
use serde::Deserialize;

use crate::model::ModelError;
use crate::model::classifier::{Classifier, DenseNetwork};
use crate::model::encoder::LabelEncoder;
use crate::model::scaler::StandardScaler;

/// Pre-trained classifier, scaler and label encoder, checked against each other.
pub struct ModelBundle {
    pub classifier: Box<dyn Classifier>,
    pub scaler: StandardScaler,
    pub label_encoder: LabelEncoder,
    pub scaling_constant: Option<f64>,
}

impl std::fmt::Debug for ModelBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelBundle")
            .field("n_features", &self.classifier.n_features())
            .field("n_classes", &self.classifier.n_classes())
            .field("classes", &self.label_encoder.classes())
            .field("scaling_constant", &self.scaling_constant)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct BundleFile {
    classifier: DenseNetwork,
    scaler: StandardScaler,
    label_encoder: LabelEncoder,
    #[serde(default)]
    scaling_constant: Option<f64>,
}

impl ModelBundle {
    pub fn new(
        classifier: Box<dyn Classifier>,
        scaler: StandardScaler,
        label_encoder: LabelEncoder,
        scaling_constant: Option<f64>,
    ) -> Result<Self, ModelError> {
        let bundle = Self {
            classifier,
            scaler,
            label_encoder,
            scaling_constant,
        };
        bundle.validate()?;
        Ok(bundle)
    }

    pub fn n_classes(&self) -> usize {
        self.label_encoder.len()
    }

    fn validate(&self) -> Result<(), ModelError> {
        self.scaler.validate()?;
        self.label_encoder.validate()?;
        if self.classifier.n_features() != self.scaler.n_features() {
            return Err(ModelError::Invalid(format!(
                "classifier expects {} features but scaler was fit on {}",
                self.classifier.n_features(),
                self.scaler.n_features()
            )));
        }
        if self.classifier.n_classes() != self.label_encoder.len() {
            return Err(ModelError::Invalid(format!(
                "classifier emits {} classes but label encoder knows {}",
                self.classifier.n_classes(),
                self.label_encoder.len()
            )));
        }
        if let Some(c) = self.scaling_constant {
            if !(c.is_finite() && c > 0.0) {
                return Err(ModelError::Invalid(format!(
                    "bundle scaling constant must be positive, got {}",
                    c
                )));
            }
        }
        Ok(())
    }
}

pub fn load_bundle(path: &Path) -> Result<ModelBundle, ModelError> {
    let file = File::open(path)?;
    let mmap = unsafe { Mmap::map(&file)? };
    let parsed: BundleFile = serde_json::from_slice(&mmap[..])?;
    parsed.classifier.validate()?;
    let bundle = ModelBundle::new(
        Box::new(parsed.classifier),
        parsed.scaler,
        parsed.label_encoder,
        parsed.scaling_constant,
    )?;
    tracing::info!(
        path = %path.display(),
        n_features = bundle.scaler.n_features(),
        classes = ?bundle.label_encoder.classes(),
        "loaded model bundle"
    );
    Ok(bundle)
}

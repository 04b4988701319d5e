use serde::{Deserialize, Serialize};

use crate::model::ModelError;

/// Per-feature standardisation fitted upstream: `(x - mean) / scale`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if self.mean.is_empty() {
            return Err(ModelError::Invalid("scaler has no features".to_string()));
        }
        if self.mean.len() != self.scale.len() {
            return Err(ModelError::Invalid(format!(
                "scaler mean has {} entries but scale has {}",
                self.mean.len(),
                self.scale.len()
            )));
        }
        if self
            .mean
            .iter()
            .chain(self.scale.iter())
            .any(|v| !v.is_finite())
        {
            return Err(ModelError::Invalid(
                "scaler contains non-finite values".to_string(),
            ));
        }
        Ok(())
    }

    /// Rows must already have `n_features()` columns. A zero scale leaves the centred value as is.
    pub fn transform(&self, rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
        rows.iter()
            .map(|row| {
                row.iter()
                    .zip(self.mean.iter().zip(self.scale.iter()))
                    .map(|(&x, (&m, &s))| {
                        let s = if s == 0.0 { 1.0 } else { s };
                        (x - m) / s
                    })
                    .collect()
            })
            .collect()
    }
}

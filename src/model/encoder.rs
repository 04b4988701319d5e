use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::model::ModelError;

/// Ordered species names; the position of a name is its class index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    #[cfg(test)]
    pub fn new(classes: Vec<String>) -> Result<Self, ModelError> {
        let encoder = Self { classes };
        encoder.validate()?;
        Ok(encoder)
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if self.classes.is_empty() {
            return Err(ModelError::Invalid(
                "label encoder has no classes".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for name in &self.classes {
            if name.trim().is_empty() {
                return Err(ModelError::Invalid(
                    "label encoder contains an empty class name".to_string(),
                ));
            }
            if !seen.insert(name.as_str()) {
                return Err(ModelError::Invalid(format!(
                    "label encoder class '{}' is duplicated",
                    name
                )));
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn decode(&self, index: usize) -> Option<&str> {
        self.classes.get(index).map(|s| s.as_str())
    }

    #[cfg(test)]
    pub fn encode(&self, name: &str) -> Option<usize> {
        self.classes.iter().position(|c| c == name)
    }
}

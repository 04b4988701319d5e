use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Relation {
    GreaterThan,
    LessThan,
}

impl Relation {
    pub fn holds(self, value: f64, threshold: f64) -> bool {
        match self {
            Relation::GreaterThan => value > threshold,
            Relation::LessThan => value < threshold,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Relation::GreaterThan => ">",
            Relation::LessThan => "<",
        }
    }
}

impl FromStr for Relation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            ">" | "gt" | "greater" | "greater_than" => Ok(Relation::GreaterThan),
            "<" | "lt" | "less" | "less_than" => Ok(Relation::LessThan),
            other => Err(format!("invalid relation '{}' (use > or <)", other)),
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StainSpec {
    pub channel: String,
    pub relation: Relation,
    pub threshold: f64,
    pub label: Option<String>,
}

impl StainSpec {
    pub fn new(channel: &str, relation: Relation, threshold: f64) -> Self {
        Self {
            channel: channel.to_string(),
            relation,
            threshold,
            label: None,
        }
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    pub fn label_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.label.as_deref().unwrap_or(default)
    }

    /// Parses `CHANNEL:REL:THRESHOLD`. Splits from the right so channel names may contain `:`.
    pub fn parse_primary(s: &str) -> Result<Self, String> {
        let mut parts = s.rsplitn(3, ':');
        let threshold = parts.next();
        let relation = parts.next();
        let channel = parts.next();
        match (channel, relation, threshold) {
            (Some(channel), Some(relation), Some(threshold)) => {
                build(channel, relation, threshold, None)
            }
            _ => Err(format!(
                "invalid stain '{}' (expected CHANNEL:REL:THRESHOLD)",
                s
            )),
        }
    }

    /// Parses `CHANNEL:REL:THRESHOLD:LABEL`.
    pub fn parse_extra(s: &str) -> Result<Self, String> {
        let mut parts = s.rsplitn(4, ':');
        let label = parts.next();
        let threshold = parts.next();
        let relation = parts.next();
        let channel = parts.next();
        match (channel, relation, threshold, label) {
            (Some(channel), Some(relation), Some(threshold), Some(label)) => {
                build(channel, relation, threshold, Some(label))
            }
            _ => Err(format!(
                "invalid extra stain '{}' (expected CHANNEL:REL:THRESHOLD:LABEL)",
                s
            )),
        }
    }
}

fn build(
    channel: &str,
    relation: &str,
    threshold: &str,
    label: Option<&str>,
) -> Result<StainSpec, String> {
    let channel = channel.trim();
    if channel.is_empty() {
        return Err("stain channel is empty".to_string());
    }
    let relation = relation.parse::<Relation>()?;
    let threshold = threshold
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("invalid stain threshold '{}'", threshold))?;
    if !threshold.is_finite() {
        return Err(format!("stain threshold must be finite, got {}", threshold));
    }
    let mut spec = StainSpec::new(channel, relation, threshold);
    if let Some(label) = label {
        let label = label.trim();
        if label.is_empty() {
            return Err("extra stain label is empty".to_string());
        }
        spec = spec.with_label(label);
    }
    Ok(spec)
}

#[cfg(test)]
#[path = "../../tests/src_inline/model/stain.rs"]
mod tests;

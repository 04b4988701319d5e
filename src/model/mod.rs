use thiserror::Error;

pub mod bundle;
pub mod classifier;
pub mod encoder;
pub mod scaler;
pub mod stain;
pub mod state;
pub mod thresholds;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed model bundle: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid model bundle: {0}")]
    Invalid(String),
}

#[cfg(test)]
#[path = "../../tests/src_inline/model/tests.rs"]
mod tests;

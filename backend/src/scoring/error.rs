use thiserror::Error;

/// Failures surfaced by [`crate::scoring::ScoringAdapter::score`].
#[derive(Debug, Error, PartialEq)]
pub enum ScoringError {
    /// Required features absent from the input, in declared order.
    #[error("Missing required features: {0:?}")]
    MissingFeatures(Vec<String>),
    #[error("Malformed input: {0}")]
    MalformedInput(String),
    /// The classifier rejected the input or produced an invalid outcome.
    #[error("Model failed to process data: {0}")]
    Adaptation(String),
    /// The inference task panicked or was cancelled.
    #[error("Inference task failed: {0}")]
    Inference(String),
}

/// Raised by a [`crate::scoring::Classifier`] during inference.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{0}")]
pub struct ModelError(pub String);

impl ModelError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

#[derive(Debug, Error)]
pub enum FeatureConfigError {
    #[error("failed to read feature configuration: {0}")]
    Read(#[from] config::ConfigError),
    #[error("feature list is empty")]
    Empty,
    #[error("feature `{0}` is declared more than once")]
    Duplicate(String),
}

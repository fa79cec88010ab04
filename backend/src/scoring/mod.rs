//! Scoring adapter around the pre-trained fraud classifier.

pub mod adapter;
pub mod error;
pub mod features;
pub mod model;

pub use adapter::ScoringAdapter;
pub use error::{FeatureConfigError, ModelError, ScoringError};
pub use features::FeatureConfig;
pub use model::{Classifier, LogisticModel, Prediction};

//! Classifier abstraction and the logistic model shipped with the service.

use anyhow::Context;
use serde::Deserialize;
use serde_json::Value;
use std::{collections::HashMap, fs, path::Path};

use super::{error::ModelError, features::FeatureConfig};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub label: u8,
    pub probability: f64,
}

/// A trained binary classifier. Inputs arrive in declared feature order.
pub trait Classifier: Send + Sync {
    fn predict(&self, row: &[Value]) -> Result<Prediction, ModelError>;

    fn version(&self) -> &str;
}

#[derive(Debug, Deserialize)]
struct LogisticArtifact {
    version: String,
    intercept: f64,
    weights: HashMap<String, f64>,
    #[serde(default = "default_threshold")]
    threshold: f64,
}

fn default_threshold() -> f64 {
    0.5
}

/// Logistic regression over numeric features.
#[derive(Debug, Clone)]
pub struct LogisticModel {
    version: String,
    intercept: f64,
    feature_names: Vec<String>,
    weights: Vec<f64>,
    threshold: f64,
}

impl LogisticModel {
    /// Loads a JSON artifact and aligns its weights to the declared feature
    /// order.
    pub fn load(path: impl AsRef<Path>, features: &FeatureConfig) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read model artifact {}", path.display()))?;
        let artifact: LogisticArtifact = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid model artifact {}", path.display()))?;
        Self::from_parts(
            artifact.version,
            artifact.intercept,
            &artifact.weights,
            artifact.threshold,
            features,
        )
    }

    pub fn from_parts(
        version: impl Into<String>,
        intercept: f64,
        weights: &HashMap<String, f64>,
        threshold: f64,
        features: &FeatureConfig,
    ) -> anyhow::Result<Self> {
        if !(0.0..=1.0).contains(&threshold) {
            anyhow::bail!("Model threshold {} is outside [0, 1]", threshold);
        }
        let missing: Vec<&str> = features
            .names()
            .iter()
            .filter(|name| !weights.contains_key(name.as_str()))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            anyhow::bail!("Model artifact has no weights for {:?}", missing);
        }
        let aligned = features
            .names()
            .iter()
            .filter_map(|name| weights.get(name).copied())
            .collect();
        Ok(Self {
            version: version.into(),
            intercept,
            feature_names: features.names().to_vec(),
            weights: aligned,
            threshold,
        })
    }
}

impl Classifier for LogisticModel {
    fn predict(&self, row: &[Value]) -> Result<Prediction, ModelError> {
        if row.len() != self.weights.len() {
            return Err(ModelError::new(format!(
                "expected {} features, got {}",
                self.weights.len(),
                row.len()
            )));
        }
        let mut logit = self.intercept;
        for ((value, weight), name) in row.iter().zip(&self.weights).zip(&self.feature_names) {
            let x = numeric_value(value)
                .ok_or_else(|| ModelError::new(format!("feature `{}` is not numeric", name)))?;
            logit += weight * x;
        }
        let probability = 1.0 / (1.0 + (-logit).exp());
        if !probability.is_finite() {
            return Err(ModelError::new("model produced a non-finite score"));
        }
        let label = u8::from(probability >= self.threshold);
        Ok(Prediction { label, probability })
    }

    fn version(&self) -> &str {
        &self.version
    }
}

fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64().filter(|x| x.is_finite()),
        Value::Bool(flag) => Some(if *flag { 1.0 } else { 0.0 }),
        Value::String(raw) => raw.trim().parse::<f64>().ok().filter(|x| x.is_finite()),
        _ => None,
    }
}

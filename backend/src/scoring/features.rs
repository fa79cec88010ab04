//! Declared model inputs and the validator that checks requests against them.

use serde::Deserialize;
use serde_json::Value;
use std::{collections::HashSet, path::Path};

use super::error::{FeatureConfigError, ScoringError};

#[derive(Debug, Deserialize)]
struct FeatureFile {
    #[serde(rename = "FINAL_FEATURES", alias = "final_features")]
    final_features: Vec<String>,
}

/// Ordered, de-duplicated feature names the active model expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureConfig {
    names: Vec<String>,
}

impl FeatureConfig {
    pub fn new<I, S>(names: I) -> Result<Self, FeatureConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(FeatureConfigError::Empty);
        }
        let mut seen = HashSet::with_capacity(names.len());
        for name in &names {
            if !seen.insert(name.as_str()) {
                return Err(FeatureConfigError::Duplicate(name.clone()));
            }
        }
        Ok(Self { names })
    }

    /// Loads the `FINAL_FEATURES` list from a YAML (or any format the
    /// `config` crate recognizes by extension) file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, FeatureConfigError> {
        let file: FeatureFile = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .build()?
            .try_deserialize()?;
        Self::new(file.final_features)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Checks `data` against the declared features and returns the values in
    /// declared order. Keys that are not declared are ignored.
    pub fn validate<'a>(&self, data: &'a Value) -> Result<Vec<&'a Value>, ScoringError> {
        let map = match data {
            Value::Object(map) if !map.is_empty() => map,
            Value::Object(_) => {
                return Err(ScoringError::MalformedInput(
                    "`data` must contain feature values".into(),
                ))
            }
            _ => {
                return Err(ScoringError::MalformedInput(
                    "`data` must be an object of feature values".into(),
                ))
            }
        };

        let missing: Vec<String> = self
            .names
            .iter()
            .filter(|name| !map.contains_key(name.as_str()))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(ScoringError::MissingFeatures(missing));
        }

        Ok(self
            .names
            .iter()
            .filter_map(|name| map.get(name.as_str()))
            .collect())
    }
}

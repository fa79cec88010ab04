use serde_json::Value;
use std::sync::Arc;

use super::{
    error::ScoringError,
    features::FeatureConfig,
    model::{Classifier, Prediction},
};

/// Validates feature mappings and runs the classifier off the async workers.
#[derive(Clone)]
pub struct ScoringAdapter {
    features: Arc<FeatureConfig>,
    classifier: Arc<dyn Classifier>,
}

impl ScoringAdapter {
    pub fn new(features: FeatureConfig, classifier: Arc<dyn Classifier>) -> Self {
        Self {
            features: Arc::new(features),
            classifier,
        }
    }

    pub fn features(&self) -> &FeatureConfig {
        &self.features
    }

    pub fn model_version(&self) -> &str {
        self.classifier.version()
    }

    /// Scores one feature mapping.
    ///
    /// Validation errors return before the classifier is touched.
    pub async fn score(&self, data: &Value) -> Result<Prediction, ScoringError> {
        let row: Vec<Value> = self
            .features
            .validate(data)?
            .into_iter()
            .cloned()
            .collect();

        let classifier = Arc::clone(&self.classifier);
        let outcome = tokio::task::spawn_blocking(move || classifier.predict(&row))
            .await
            .map_err(|err| ScoringError::Inference(err.to_string()))?;

        outcome
            .map_err(|err| ScoringError::Adaptation(err.to_string()))
            .and_then(check_prediction)
    }
}

fn check_prediction(prediction: Prediction) -> Result<Prediction, ScoringError> {
    if prediction.label > 1 {
        return Err(ScoringError::Adaptation(format!(
            "model returned label {} outside {{0, 1}}",
            prediction.label
        )));
    }
    if !(prediction.probability.is_finite() && (0.0..=1.0).contains(&prediction.probability)) {
        return Err(ScoringError::Adaptation(format!(
            "model returned probability {} outside [0, 1]",
            prediction.probability
        )));
    }
    Ok(prediction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::error::ModelError;
    use serde_json::json;
    use std::sync::Mutex;

    /// Records the row it was called with and returns a fixed outcome.
    struct RecordingClassifier {
        seen: Mutex<Vec<Vec<Value>>>,
        outcome: Result<Prediction, ModelError>,
    }

    impl RecordingClassifier {
        fn returning(outcome: Result<Prediction, ModelError>) -> Arc<Self> {
            Arc::new(Self {
                seen: Mutex::new(Vec::new()),
                outcome,
            })
        }
    }

    impl Classifier for RecordingClassifier {
        fn predict(&self, row: &[Value]) -> Result<Prediction, ModelError> {
            self.seen.lock().unwrap().push(row.to_vec());
            self.outcome.clone()
        }

        fn version(&self) -> &str {
            "test"
        }
    }

    fn adapter(classifier: Arc<RecordingClassifier>) -> ScoringAdapter {
        ScoringAdapter::new(FeatureConfig::new(["A", "B", "C"]).unwrap(), classifier)
    }

    fn fixed(label: u8, probability: f64) -> Result<Prediction, ModelError> {
        Ok(Prediction { label, probability })
    }

    #[tokio::test]
    async fn score_presents_features_in_declared_order() {
        let classifier = RecordingClassifier::returning(fixed(1, 0.87));
        let adapter = adapter(Arc::clone(&classifier));

        let first = adapter
            .score(&json!({ "C": 3, "A": 1, "B": 2 }))
            .await
            .unwrap();
        let second = adapter
            .score(&json!({ "B": 2, "C": 3, "A": 1 }))
            .await
            .unwrap();

        assert_eq!(first, second);
        let seen = classifier.seen.lock().unwrap();
        assert_eq!(seen[0], vec![json!(1), json!(2), json!(3)]);
        assert_eq!(seen[0], seen[1]);
    }

    #[tokio::test]
    async fn score_skips_model_when_features_missing() {
        let classifier = RecordingClassifier::returning(fixed(1, 0.87));
        let adapter = adapter(Arc::clone(&classifier));

        let err = adapter
            .score(&json!({ "B": 2 }))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ScoringError::MissingFeatures(vec!["A".into(), "C".into()])
        );
        assert!(classifier.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn score_wraps_model_errors() {
        let classifier = RecordingClassifier::returning(Err(ModelError::new("bad input")));
        let err = adapter(classifier)
            .score(&json!({ "A": 1, "B": 2, "C": 3 }))
            .await
            .unwrap_err();
        assert_eq!(err, ScoringError::Adaptation("bad input".into()));
    }

    #[tokio::test]
    async fn score_rejects_out_of_range_outputs() {
        let data = json!({ "A": 1, "B": 2, "C": 3 });

        let err = adapter(RecordingClassifier::returning(fixed(2, 0.5)))
            .score(&data)
            .await
            .unwrap_err();
        assert!(matches!(err, ScoringError::Adaptation(_)));

        let err = adapter(RecordingClassifier::returning(fixed(0, f64::NAN)))
            .score(&data)
            .await
            .unwrap_err();
        assert!(matches!(err, ScoringError::Adaptation(_)));
    }
}

//! Risk prediction on top of a loaded classifier

use crate::config::ModelConfig;
use crate::feature_extractor::FeatureExtractor;
use crate::metrics::DashboardMetrics;
use crate::models::importance::FeatureImportances;
use crate::models::loader::ModelLoader;
use crate::types::patient::PatientRecord;
use crate::types::prediction::{Prediction, RiskLabel};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Class id and risk-class probability exactly as the model reported them
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawClassification {
    pub class: i64,
    pub probability: f64,
}

/// A binary classifier over the 8-feature input vector.
///
/// Implementations provide both the predicted class and the probability of
/// class 1 from a single call.
pub trait Classifier: Send + Sync {
    /// Model name for logs
    fn name(&self) -> &str;

    /// Run inference on one feature vector
    fn classify(&self, features: &[f32]) -> Result<RawClassification>;
}

/// Predictor: the classifier plus its optional importance capability,
/// resolved once when the model is loaded.
pub struct Predictor {
    classifier: Box<dyn Classifier>,
    importances: Option<FeatureImportances>,
    extractor: FeatureExtractor,
    metrics: Option<Arc<DashboardMetrics>>,
}

impl Predictor {
    /// Wrap a classifier, probing it once with the default patient record.
    ///
    /// A classifier that cannot answer the probe is rejected here rather
    /// than on the first user request.
    pub fn new(
        classifier: Box<dyn Classifier>,
        importances: Option<FeatureImportances>,
    ) -> Result<Self> {
        let predictor = Self {
            classifier,
            importances,
            extractor: FeatureExtractor::new(),
            metrics: None,
        };

        let probe = predictor
            .predict(&PatientRecord::default())
            .context(format!(
                "Model {} failed the startup probe",
                predictor.classifier.name()
            ))?;

        info!(
            model = %predictor.classifier.name(),
            probe_label = %probe.label,
            probe_probability = probe.probability,
            has_importances = predictor.importances.is_some(),
            "Predictor ready"
        );

        Ok(predictor)
    }

    /// Load the ONNX model and its optional importances from configuration
    pub fn from_config(config: &ModelConfig) -> Result<Self> {
        let loader = ModelLoader::with_threads(config.intra_threads);
        let model = loader.load_model(&config.path, &config.name)?;

        let importances = match &config.importances_path {
            Some(path) => FeatureImportances::load(path)?,
            None => None,
        };

        Self::new(Box::new(model), importances)
    }

    /// Record inference latency and outcomes into `metrics`
    pub fn with_metrics(mut self, metrics: Arc<DashboardMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Predict the risk label and probability for one patient
    pub fn predict(&self, record: &PatientRecord) -> Result<Prediction> {
        let start = Instant::now();
        let features = self.extractor.extract(record);

        let raw = self
            .classifier
            .classify(&features)
            .context(format!("Inference failed for model {}", self.classifier.name()))?;

        let label = RiskLabel::from_class(raw.class).with_context(|| {
            format!("Model returned unexpected class {}", raw.class)
        })?;

        if !(0.0..=1.0).contains(&raw.probability) {
            anyhow::bail!(
                "Model returned probability {} outside [0, 1]",
                raw.probability
            );
        }

        let prediction = Prediction {
            label,
            probability: raw.probability,
        };

        if let Some(metrics) = &self.metrics {
            metrics.record_prediction(start.elapsed(), &prediction);
        }

        debug!(
            model = %self.classifier.name(),
            label = %prediction.label,
            probability = prediction.probability,
            latency_us = start.elapsed().as_micros() as u64,
            "Prediction complete"
        );

        Ok(prediction)
    }

    /// Importance weights, if the model has them
    pub fn feature_importances(&self) -> Option<&FeatureImportances> {
        self.importances.as_ref()
    }

    pub fn model_name(&self) -> &str {
        self.classifier.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::patient::FIELDS;

    /// Logistic stand-in for the real model, driven by glucose and BMI
    struct GlucoseModel;

    impl Classifier for GlucoseModel {
        fn name(&self) -> &str {
            "glucose"
        }

        fn classify(&self, features: &[f32]) -> Result<RawClassification> {
            assert_eq!(features.len(), 8);
            let z = 0.05 * (features[1] as f64 - 125.0) + 0.1 * (features[5] as f64 - 30.0);
            let probability = 1.0 / (1.0 + (-z).exp());
            Ok(RawClassification {
                class: i64::from(probability >= 0.5),
                probability,
            })
        }
    }

    struct BrokenModel {
        class: i64,
        probability: f64,
    }

    impl Classifier for BrokenModel {
        fn name(&self) -> &str {
            "broken"
        }

        fn classify(&self, _features: &[f32]) -> Result<RawClassification> {
            Ok(RawClassification {
                class: self.class,
                probability: self.probability,
            })
        }
    }

    #[test]
    fn test_predict_within_bounds() {
        let predictor = Predictor::new(Box::new(GlucoseModel), None).unwrap();

        // Corners and defaults of the input space
        let lows = FIELDS.map(|f| f.min);
        let highs = FIELDS.map(|f| f.max);
        for values in [lows, highs, FIELDS.map(|f| f.default)] {
            let prediction = predictor.predict(&PatientRecord::from_values(values)).unwrap();
            assert!((0.0..=1.0).contains(&prediction.probability));
            assert!(prediction.label.class() <= 1);
        }
    }

    #[test]
    fn test_high_glucose_is_risk() {
        let predictor = Predictor::new(Box::new(GlucoseModel), None).unwrap();
        let record = PatientRecord {
            glucose: 199,
            bmi: 45.0,
            ..PatientRecord::default()
        };
        let prediction = predictor.predict(&record).unwrap();
        assert_eq!(prediction.label, RiskLabel::Risk);
        assert!(prediction.probability > 0.5);
    }

    #[test]
    fn test_probe_rejects_bad_class() {
        let model = BrokenModel {
            class: 3,
            probability: 0.5,
        };
        assert!(Predictor::new(Box::new(model), None).is_err());
    }

    #[test]
    fn test_probe_rejects_bad_probability() {
        let model = BrokenModel {
            class: 1,
            probability: 1.5,
        };
        assert!(Predictor::new(Box::new(model), None).is_err());
    }

    #[test]
    fn test_metrics_are_recorded() {
        let metrics = Arc::new(DashboardMetrics::new());
        let predictor = Predictor::new(Box::new(GlucoseModel), None)
            .unwrap()
            .with_metrics(metrics.clone());

        predictor.predict(&PatientRecord::default()).unwrap();
        predictor.predict(&PatientRecord::default()).unwrap();

        assert_eq!(metrics.predictions(), 2);
    }
}

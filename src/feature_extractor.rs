//! Feature extraction for diabetes risk model inference.
//!
//! Turns a patient record into the input vector the classifier was
//! trained on.

use crate::types::patient::{PatientRecord, FIELDS};

/// Number of model inputs
pub const FEATURE_COUNT: usize = 8;

/// Short feature names as shown on the importance chart, in model order.
pub const DISPLAY_NAMES: [&str; FEATURE_COUNT] = [
    "Pregnancies",
    "Glucose",
    "BloodPressure",
    "SkinThickness",
    "Insulin",
    "BMI",
    "DPF",
    "Age",
];

/// Feature extractor that transforms patient records into model input features.
///
/// Features are extracted in the exact order expected by the ONNX model.
pub struct FeatureExtractor;

impl FeatureExtractor {
    /// Create a new feature extractor.
    pub fn new() -> Self {
        Self
    }

    /// Extract the 8-feature input vector from a record.
    pub fn extract(&self, record: &PatientRecord) -> Vec<f32> {
        record.values().iter().map(|&v| v as f32).collect()
    }

    /// Get the number of features produced.
    pub fn feature_count(&self) -> usize {
        FEATURE_COUNT
    }

    /// Get canonical feature names (matching the dataset columns).
    pub fn feature_names(&self) -> Vec<&'static str> {
        FIELDS.iter().map(|f| f.name).collect()
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}

//! Per-feature importance weights shipped alongside the model

use crate::feature_extractor::{FeatureExtractor, DISPLAY_NAMES, FEATURE_COUNT};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

/// On-disk layout of the importances sidecar
#[derive(Debug, Deserialize)]
struct ImportanceFile {
    /// Optional feature names, checked against the model input order
    #[serde(default)]
    feature_names: Option<Vec<String>>,
    importances: Vec<f64>,
}

/// Validated importance weights, one per model input, in model order
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureImportances {
    weights: [f64; FEATURE_COUNT],
}

impl FeatureImportances {
    /// Validate raw weights: exactly one finite, non-negative value per feature
    pub fn new(weights: &[f64]) -> Result<Self> {
        if weights.len() != FEATURE_COUNT {
            anyhow::bail!(
                "Expected {} feature importances, got {}",
                FEATURE_COUNT,
                weights.len()
            );
        }
        if let Some(bad) = weights.iter().find(|w| !w.is_finite() || **w < 0.0) {
            anyhow::bail!("Invalid feature importance value: {}", bad);
        }

        let mut fixed = [0.0; FEATURE_COUNT];
        fixed.copy_from_slice(weights);
        Ok(Self { weights: fixed })
    }

    /// Load the sidecar file. A missing file means the model has no
    /// importance capability and yields `Ok(None)`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Option<Self>> {
        let path = path.as_ref();
        if !path.exists() {
            info!(path = %path.display(), "No feature importances found, chart disabled");
            return Ok(None);
        }

        let raw = std::fs::read_to_string(path)
            .context(format!("Failed to read feature importances from {:?}", path))?;
        let file: ImportanceFile = serde_json::from_str(&raw)
            .context(format!("Failed to parse feature importances in {:?}", path))?;

        if let Some(names) = &file.feature_names {
            check_names(names)?;
        }

        let importances = Self::new(&file.importances)?;
        info!(path = %path.display(), "Feature importances loaded");
        Ok(Some(importances))
    }

    /// Weights in model-declared order
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// (chart label, weight) pairs in model-declared order
    pub fn labelled(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        DISPLAY_NAMES.iter().copied().zip(self.weights.iter().copied())
    }

    pub fn max(&self) -> f64 {
        self.weights.iter().copied().fold(0.0, f64::max)
    }
}

/// Names may use either the dataset column names or the short chart labels
fn check_names(names: &[String]) -> Result<()> {
    let extractor = FeatureExtractor::new();
    if names.len() != extractor.feature_count() {
        anyhow::bail!(
            "Importance file declares {} feature names, expected {}",
            names.len(),
            extractor.feature_count()
        );
    }
    let expected = extractor.feature_names();
    for (i, name) in names.iter().enumerate() {
        if name != expected[i] && name != DISPLAY_NAMES[i] {
            anyhow::bail!(
                "Importance feature {} is {:?}, expected {:?}",
                i,
                name,
                expected[i]
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const WEIGHTS: [f64; 8] = [0.08, 0.26, 0.09, 0.07, 0.08, 0.17, 0.12, 0.13];

    fn write_temp(contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("importances-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_valid_weights() {
        let importances = FeatureImportances::new(&WEIGHTS).unwrap();
        assert_eq!(importances.weights(), &WEIGHTS);
        assert_eq!(importances.max(), 0.26);

        let labels: Vec<&str> = importances.labelled().map(|(name, _)| name).collect();
        assert_eq!(labels, DISPLAY_NAMES.to_vec());
    }

    #[test]
    fn test_rejects_wrong_length_and_negative() {
        assert!(FeatureImportances::new(&WEIGHTS[..7]).is_err());
        let mut bad = WEIGHTS;
        bad[3] = -0.1;
        assert!(FeatureImportances::new(&bad).is_err());
        bad[3] = f64::NAN;
        assert!(FeatureImportances::new(&bad).is_err());
    }

    #[test]
    fn test_missing_file_is_not_an_error() {
        let path = std::env::temp_dir().join("definitely-missing-importances.json");
        assert!(FeatureImportances::load(path).unwrap().is_none());
    }

    #[test]
    fn test_load_from_file() {
        let path = write_temp(
            r#"{"feature_names": ["Pregnancies","Glucose","BloodPressure","SkinThickness","Insulin","BMI","DPF","Age"],
                "importances": [0.08, 0.26, 0.09, 0.07, 0.08, 0.17, 0.12, 0.13]}"#,
        );
        let importances = FeatureImportances::load(&path).unwrap().unwrap();
        assert_eq!(importances.weights()[1], 0.26);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_names_match_model_inputs() {
        let columns: Vec<String> = FeatureExtractor::new()
            .feature_names()
            .into_iter()
            .map(String::from)
            .collect();
        assert!(check_names(&columns).is_ok());
        assert!(check_names(&columns[..7]).is_err());

        let mut renamed = columns.clone();
        renamed[6] = "Pedigree".to_string();
        assert!(check_names(&renamed).is_err());
    }

    #[test]
    fn test_load_rejects_misordered_names() {
        let path = write_temp(
            r#"{"feature_names": ["Glucose","Pregnancies","BloodPressure","SkinThickness","Insulin","BMI","DPF","Age"],
                "importances": [0.08, 0.26, 0.09, 0.07, 0.08, 0.17, 0.12, 0.13]}"#,
        );
        assert!(FeatureImportances::load(&path).is_err());
        std::fs::remove_file(path).ok();
    }
}

//! ONNX model loader

use crate::models::inference::{Classifier, RawClassification};
use anyhow::{Context, Result};
use ort::memory::Allocator;
use ort::session::{builder::GraphOptimizationLevel, Session, SessionOutputs};
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType, DynValue, Tensor};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// Loaded ONNX classifier with the names of its relevant inputs and outputs
pub struct LoadedModel {
    /// Model name
    pub name: String,
    /// ONNX Runtime session; inference needs exclusive access
    session: Mutex<Session>,
    /// Input name for the feature tensor
    pub input_name: String,
    /// Output name for class probabilities
    pub probability_output: String,
    /// Output name for the predicted label, if the export has one
    pub label_output: Option<String>,
}

/// Loader for ONNX models
pub struct ModelLoader {
    /// Number of threads for ONNX inference
    intra_threads: usize,
}

impl ModelLoader {
    /// Create a new model loader with default settings (1 thread)
    pub fn new() -> Self {
        Self::with_threads(1)
    }

    /// Create a new model loader with specified number of threads
    pub fn with_threads(intra_threads: usize) -> Self {
        Self {
            intra_threads: intra_threads.max(1),
        }
    }

    /// Load a classifier from an ONNX file.
    ///
    /// Fails if the file is missing, cannot be parsed by ONNX Runtime, or
    /// exposes no outputs to read probabilities from.
    pub fn load_model<P: AsRef<Path>>(&self, path: P, name: &str) -> Result<LoadedModel> {
        let path = path.as_ref();

        if !path.exists() {
            anyhow::bail!("Model file not found: {}", path.display());
        }

        info!(model = %name, path = %path.display(), threads = self.intra_threads, "Loading ONNX model");

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(self.intra_threads)?
            .commit_from_file(path)
            .context(format!("Failed to load model from {:?}", path))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .context("Model declares no inputs")?;

        if session.outputs.is_empty() {
            anyhow::bail!("Model declares no outputs");
        }

        let label_output = session
            .outputs
            .iter()
            .find(|o| o.name.contains("label"))
            .map(|o| o.name.clone());

        let probability_output = session
            .outputs
            .iter()
            .find(|o| o.name.contains("prob"))
            .or_else(|| {
                session
                    .outputs
                    .iter()
                    .filter(|o| !o.name.contains("label"))
                    .last()
            })
            .map(|o| o.name.clone())
            .context("Model declares no probability output")?;

        info!(
            model = %name,
            input = %input_name,
            probabilities = %probability_output,
            label = ?label_output,
            "Model loaded successfully"
        );

        Ok(LoadedModel {
            name: name.to_string(),
            session: Mutex::new(session),
            input_name,
            probability_output,
            label_output,
        })
    }
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier for LoadedModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn classify(&self, features: &[f32]) -> Result<RawClassification> {
        // Prepare input tensor - shape [1, num_features]
        let shape = vec![1_i64, features.len() as i64];
        let input_tensor =
            Tensor::from_array((shape, features.to_vec())).context("Failed to create input tensor")?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;

        let outputs = session.run(ort::inputs![self.input_name.as_str() => input_tensor])?;

        let probability = self.extract_probability(&outputs)?;
        let class = match &self.label_output {
            Some(label_output) => self.extract_label(&outputs, label_output)?,
            None => label_from_probability(probability),
        };

        Ok(RawClassification { class, probability })
    }
}

impl LoadedModel {
    /// Read the predicted class from an int64 label tensor
    fn extract_label(&self, outputs: &SessionOutputs, label_output: &str) -> Result<i64> {
        let output = outputs
            .get(label_output)
            .context(format!("Missing label output {}", label_output))?;
        let (_, data) = output
            .try_extract_tensor::<i64>()
            .context("Label output is not an int64 tensor")?;
        data.first().copied().context("Empty label output")
    }

    /// Extract the risk-class probability from model output.
    /// Handles both tensor outputs and seq(map) outputs (ZipMap exports).
    fn extract_probability(&self, outputs: &SessionOutputs) -> Result<f64> {
        let output = outputs
            .get(&self.probability_output)
            .context(format!("Missing probability output {}", self.probability_output))?;

        if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
            let dims: Vec<i64> = shape.iter().copied().collect();
            let prob = risk_prob_from_tensor(&dims, data)?;
            debug!(model = %self.name, prob = prob, "Extracted from tensor");
            return Ok(prob);
        }

        if DynSequenceValueType::can_downcast(output.dtype()) {
            return self.extract_from_sequence_map(output);
        }

        warn!(model = %self.name, dtype = ?output.dtype(), "Unsupported probability output");
        anyhow::bail!(
            "Probability output {} has unsupported type",
            self.probability_output
        )
    }

    /// Extract probability from seq(map(int64, float)) format
    fn extract_from_sequence_map(&self, output: &DynValue) -> Result<f64> {
        let allocator = Allocator::default();

        let sequence = output
            .downcast_ref::<DynSequenceValueType>()
            .map_err(|e| anyhow::anyhow!("Failed to downcast to sequence: {}", e))?;

        let maps = sequence.try_extract_sequence::<DynMapValueType>(&allocator)?;
        let map_value = maps.first().context("Empty probability sequence")?;

        let kv_pairs = map_value.try_extract_key_values::<i64, f32>()?;
        let pairs: Vec<(i64, f32)> = kv_pairs.into_iter().collect();

        let prob = risk_prob_from_pairs(&pairs)?;
        debug!(model = %self.name, prob = prob, "Extracted from seq(map)");
        Ok(prob)
    }
}

/// Pick the class-1 probability from a `[batch, classes]`, `[classes]` or
/// single-value tensor, reading only the first batch row.
fn risk_prob_from_tensor(dims: &[i64], data: &[f32]) -> Result<f64> {
    let num_classes = match dims {
        [_, classes] => *classes,
        [classes] => *classes,
        _ => data.len() as i64,
    };

    match num_classes {
        n if n >= 2 => data
            .get(1)
            .map(|&p| p as f64)
            .context("Probability tensor too short"),
        1 => data
            .first()
            .map(|&p| p as f64)
            .context("Probability tensor is empty"),
        _ => anyhow::bail!("Probability tensor has no classes (shape {:?})", dims),
    }
}

/// Class-1 probability from {class -> probability} pairs
fn risk_prob_from_pairs(pairs: &[(i64, f32)]) -> Result<f64> {
    if let Some((_, prob)) = pairs.iter().find(|(class, _)| *class == 1) {
        return Ok(*prob as f64);
    }
    // Binary model that only reported the negative class
    if let Some((_, prob)) = pairs.iter().find(|(class, _)| *class == 0) {
        return Ok(1.0 - *prob as f64);
    }
    anyhow::bail!("No probability found in map")
}

/// Class for a model without a label output. An exact tie goes to class 0,
/// as an argmax over `[p0, p1]` would pick.
fn label_from_probability(probability: f64) -> i64 {
    i64::from(probability > 0.5)
}

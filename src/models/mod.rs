//! ML model inference components

pub mod importance;
pub mod inference;
pub mod loader;

pub use importance::FeatureImportances;
pub use inference::{Classifier, Predictor, RawClassification};
pub use loader::ModelLoader;

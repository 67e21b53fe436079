//! Diabetes Risk Dashboard Library
//!
//! Serves a pre-trained ONNX classifier behind a small server-rendered
//! dashboard: dataset statistics, a distribution chart, risk predictions
//! with feature importances, and a per-session prediction history.

pub mod config;
pub mod dashboard;
pub mod dataset;
pub mod feature_extractor;
pub mod histogram;
pub mod history;
pub mod metrics;
pub mod models;
pub mod server;
pub mod session;
pub mod types;
pub mod views;

pub use config::AppConfig;
pub use dashboard::{Dashboard, Event, RenderInstruction};
pub use dataset::Dataset;
pub use history::{HistoryEntry, HistoryStore};
pub use models::inference::{Classifier, Predictor};
pub use session::{SessionContext, SessionStore};
pub use types::{patient::PatientRecord, prediction::Prediction};

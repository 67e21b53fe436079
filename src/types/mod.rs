//! Type definitions for the risk dashboard

pub mod patient;
pub mod prediction;

pub use patient::{FieldSpec, PatientForm, PatientRecord, FIELDS};
pub use prediction::{Prediction, RiskLabel};

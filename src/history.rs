//! Session-scoped prediction history and its CSV export

use crate::types::patient::PatientRecord;
use crate::types::prediction::{Prediction, RiskLabel};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// File name offered for the history download
pub const EXPORT_FILE_NAME: &str = "riwayat_prediksi.csv";

/// Column headers of the exported file, in order
pub const EXPORT_HEADERS: [&str; 6] = ["Glukosa", "BMI", "Insulin", "Usia", "Hasil", "Probabilitas"];

/// One recorded prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(rename = "Glukosa")]
    pub glucose: u32,
    #[serde(rename = "BMI")]
    pub bmi: f64,
    #[serde(rename = "Insulin")]
    pub insulin: u32,
    #[serde(rename = "Usia")]
    pub age: u32,
    #[serde(rename = "Hasil")]
    pub result: RiskLabel,
    /// Risk probability as a percentage string, e.g. `64.00%`
    #[serde(rename = "Probabilitas")]
    pub probability: String,
}

impl HistoryEntry {
    /// Snapshot the fields shown in the history table
    pub fn new(record: &PatientRecord, prediction: &Prediction) -> Self {
        Self {
            glucose: record.glucose,
            bmi: record.bmi,
            insulin: record.insulin,
            age: record.age,
            result: prediction.label,
            probability: prediction.formatted_probability(),
        }
    }
}

/// Append-only list of predictions made in one session.
///
/// Growth is unbounded; a session only lives as long as its browser tab.
#[derive(Debug, Clone, Default)]
pub struct HistoryStore {
    entries: Vec<HistoryEntry>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, entry: HistoryEntry) {
        self.entries.push(entry);
    }

    /// All entries in insertion order
    pub fn all(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Export as comma-separated text with a header row and no index column
    pub fn to_csv(&self) -> Result<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        if self.entries.is_empty() {
            writer
                .write_record(EXPORT_HEADERS)
                .context("Failed to write history header")?;
        }
        for entry in &self.entries {
            writer
                .serialize(entry)
                .context("Failed to serialize history entry")?;
        }
        writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("Failed to flush history export: {}", e))
    }

    /// Parse a previously exported file back into a store
    pub fn from_csv(data: &[u8]) -> Result<Self> {
        let mut reader = csv::Reader::from_reader(data);

        let headers = reader
            .headers()
            .context("Failed to read history header")?
            .clone();
        if headers.iter().ne(EXPORT_HEADERS.iter().copied()) {
            anyhow::bail!("Unexpected history header: {:?}", headers);
        }

        let entries = reader
            .deserialize()
            .collect::<Result<Vec<HistoryEntry>, _>>()
            .context("Failed to parse history entry")?;

        Ok(Self { entries })
    }
}

//! Static reference dataset and its descriptive statistics

use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

/// Canonical column names, assigned positionally regardless of the file header
pub const COLUMNS: [&str; 9] = [
    "Pregnancies",
    "Glucose",
    "BloodPressure",
    "SkinThickness",
    "Insulin",
    "BMI",
    "DiabetesPedigreeFunction",
    "Age",
    "Outcome",
];

/// Columns a histogram may be drawn for (everything except the outcome)
pub fn feature_columns() -> &'static [&'static str] {
    &COLUMNS[..COLUMNS.len() - 1]
}

/// Read-only, column-oriented copy of the dataset
#[derive(Debug, Clone)]
pub struct Dataset {
    columns: Vec<Vec<f64>>,
    rows: usize,
}

impl Dataset {
    /// Load a CSV file with a header row and exactly nine numeric columns
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            anyhow::bail!("Dataset file not found: {}", path.display());
        }

        let reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(path)
            .context(format!("Failed to open dataset {:?}", path))?;

        let dataset = Self::from_reader(reader)
            .context(format!("Failed to read dataset {:?}", path))?;

        info!(
            path = %path.display(),
            rows = dataset.len(),
            "Dataset loaded"
        );
        Ok(dataset)
    }

    /// Build a dataset from any CSV reader (header row expected)
    pub fn from_reader<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<Self> {
        let width = reader.headers().context("Failed to read header")?.len();
        if width != COLUMNS.len() {
            anyhow::bail!(
                "Dataset has {} columns, expected {}",
                width,
                COLUMNS.len()
            );
        }

        let mut columns = vec![Vec::new(); COLUMNS.len()];
        for (line, record) in reader.records().enumerate() {
            let record = record.context(format!("Malformed row {}", line + 1))?;
            if record.len() != COLUMNS.len() {
                anyhow::bail!(
                    "Row {} has {} columns, expected {}",
                    line + 1,
                    record.len(),
                    COLUMNS.len()
                );
            }
            for (i, field) in record.iter().enumerate() {
                let value = field.trim().parse::<f64>().with_context(|| {
                    format!("Row {}, column {}: {:?} is not a number", line + 1, COLUMNS[i], field)
                })?;
                columns[i].push(value);
            }
        }

        let rows = columns[0].len();
        Ok(Self { columns, rows })
    }

    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Values of a column by canonical name
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        COLUMNS
            .iter()
            .position(|c| *c == name)
            .map(|i| self.columns[i].as_slice())
    }

    /// Compute the summary shown at the top of the prediction page
    pub fn summary(&self) -> DatasetSummary {
        let means = COLUMNS
            .iter()
            .zip(&self.columns)
            .map(|(name, values)| (*name, mean(values)))
            .collect();

        DatasetSummary {
            rows: self.rows,
            means,
        }
    }
}

/// Column means and row count
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetSummary {
    pub rows: usize,
    means: Vec<(&'static str, Option<f64>)>,
}

impl DatasetSummary {
    /// Mean of a column; `None` for an empty dataset or unknown column
    pub fn mean(&self, column: &str) -> Option<f64> {
        self.means
            .iter()
            .find(|(name, _)| *name == column)
            .and_then(|(_, mean)| *mean)
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

//! Dashboard state and the event handlers behind each interactive control

use crate::config::AppConfig;
use crate::dataset::{Dataset, DatasetSummary};
use crate::history::{HistoryEntry, EXPORT_FILE_NAME};
use crate::metrics::DashboardMetrics;
use crate::models::inference::Predictor;
use crate::session::{Page, SessionContext, Theme};
use crate::types::patient::PatientRecord;
use crate::types::prediction::Prediction;
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info};

/// One user interaction, carrying the current control value
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Theme dropdown changed
    SetTheme(Theme),
    /// Navigation radio changed
    Navigate(Page),
    /// Histogram column dropdown changed
    SelectFeature(String),
    /// Predict button pressed with the current form values
    Predict(PatientRecord),
    /// Download link clicked
    ExportHistory,
}

/// The prediction shown in response to a predict action
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionOutcome {
    pub record: PatientRecord,
    pub prediction: Prediction,
}

/// A file the browser should download
#[derive(Debug, Clone, PartialEq)]
pub struct Download {
    pub file_name: &'static str,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

/// What the view layer should produce for an event
#[derive(Debug, Clone, PartialEq)]
pub enum RenderInstruction {
    /// Prediction page; the result section only appears with an outcome
    PredictionPage { outcome: Option<PredictionOutcome> },
    AboutPage,
    Download(Download),
    /// Export requested with an empty history
    NothingToExport,
}

/// Shared, read-only application state: the model, the dataset and the
/// statistics derived from it once at startup.
pub struct Dashboard {
    predictor: Predictor,
    dataset: Dataset,
    summary: DatasetSummary,
    metrics: Arc<DashboardMetrics>,
}

impl Dashboard {
    pub fn new(predictor: Predictor, dataset: Dataset, metrics: Arc<DashboardMetrics>) -> Self {
        let summary = dataset.summary();
        Self {
            predictor,
            dataset,
            summary,
            metrics,
        }
    }

    /// Load dataset and model as configured. Either one failing is fatal.
    pub fn load(config: &AppConfig, metrics: Arc<DashboardMetrics>) -> Result<Self> {
        let dataset = Dataset::load(&config.dataset.path)?;
        let predictor = Predictor::from_config(&config.model)?.with_metrics(metrics.clone());

        info!(
            model = %predictor.model_name(),
            rows = dataset.len(),
            importances = predictor.feature_importances().is_some(),
            "Dashboard loaded"
        );
        Ok(Self::new(predictor, dataset, metrics))
    }

    pub fn predictor(&self) -> &Predictor {
        &self.predictor
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn summary(&self) -> &DatasetSummary {
        &self.summary
    }

    pub fn metrics(&self) -> &Arc<DashboardMetrics> {
        &self.metrics
    }

    /// Apply one event to a session and say what to render next
    pub fn handle(&self, session: &mut SessionContext, event: Event) -> Result<RenderInstruction> {
        debug!(session = %session.id, event = ?event, "Handling event");

        match event {
            Event::SetTheme(theme) => {
                session.theme = theme;
                Ok(self.current_page(session))
            }
            Event::Navigate(page) => {
                session.page = page;
                Ok(self.current_page(session))
            }
            Event::SelectFeature(name) => {
                session.page = Page::Prediction;
                if !session.select_feature(&name) {
                    debug!(session = %session.id, feature = %name, "Ignoring unknown histogram feature");
                }
                Ok(RenderInstruction::PredictionPage { outcome: None })
            }
            Event::Predict(record) => {
                session.page = Page::Prediction;
                session.form = record;

                let prediction = self.predictor.predict(&record)?;
                session.history.append(HistoryEntry::new(&record, &prediction));

                info!(
                    session = %session.id,
                    label = %prediction.label,
                    probability = prediction.probability,
                    history_len = session.history.len(),
                    "Prediction recorded"
                );

                Ok(RenderInstruction::PredictionPage {
                    outcome: Some(PredictionOutcome { record, prediction }),
                })
            }
            Event::ExportHistory => {
                if session.history.is_empty() {
                    return Ok(RenderInstruction::NothingToExport);
                }
                let body = session.history.to_csv()?;
                self.metrics.record_export();
                Ok(RenderInstruction::Download(Download {
                    file_name: EXPORT_FILE_NAME,
                    content_type: "text/csv",
                    body,
                }))
            }
        }
    }

    fn current_page(&self, session: &SessionContext) -> RenderInstruction {
        match session.page {
            Page::Prediction => RenderInstruction::PredictionPage { outcome: None },
            Page::About => RenderInstruction::AboutPage,
        }
    }
}

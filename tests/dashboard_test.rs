use anyhow::Result;
use diabetes_risk_dashboard::config::AppConfig;
use diabetes_risk_dashboard::dashboard::{Dashboard, Event, RenderInstruction};
use diabetes_risk_dashboard::dataset::Dataset;
use diabetes_risk_dashboard::feature_extractor::DISPLAY_NAMES;
use diabetes_risk_dashboard::history::HistoryStore;
use diabetes_risk_dashboard::metrics::DashboardMetrics;
use diabetes_risk_dashboard::models::{Classifier, FeatureImportances, Predictor, RawClassification};
use diabetes_risk_dashboard::session::SessionContext;
use diabetes_risk_dashboard::types::{PatientRecord, RiskLabel};
use diabetes_risk_dashboard::views::render_page;
use std::sync::Arc;
use uuid::Uuid;

fn fixture_path() -> String {
    format!(
        "{}/tests/fixtures/diabetes_sample.csv",
        env!("CARGO_MANIFEST_DIR")
    )
}

/// Scores patients on glucose alone so tests can steer the outcome
struct GlucoseThreshold;

impl Classifier for GlucoseThreshold {
    fn name(&self) -> &str {
        "glucose_threshold"
    }

    fn classify(&self, features: &[f32]) -> Result<RawClassification> {
        let probability = (features[1] as f64 / 200.0).clamp(0.0, 1.0);
        Ok(RawClassification {
            class: i64::from(probability >= 0.7),
            probability,
        })
    }
}

fn dashboard(with_importances: bool) -> Dashboard {
    let importances = with_importances.then(|| {
        FeatureImportances::new(&[0.08, 0.26, 0.09, 0.07, 0.08, 0.17, 0.12, 0.13]).unwrap()
    });
    let predictor = Predictor::new(Box::new(GlucoseThreshold), importances).unwrap();
    let dataset = Dataset::load(fixture_path()).unwrap();
    Dashboard::new(predictor, dataset, Arc::new(DashboardMetrics::new()))
}

#[test]
fn test_default_input_scenario() {
    let dashboard = dashboard(false);
    let mut session = SessionContext::new(Uuid::new_v4());

    let instruction = dashboard
        .handle(&mut session, Event::Predict(PatientRecord::default()))
        .unwrap();

    let outcome = match instruction {
        RenderInstruction::PredictionPage { outcome: Some(outcome) } => outcome,
        other => panic!("unexpected instruction: {:?}", other),
    };
    assert!((0.0..=1.0).contains(&outcome.prediction.probability));

    let entry = &session.history.all()[0];
    let expected = if outcome.prediction.label == RiskLabel::Risk {
        "Risiko"
    } else {
        "Tidak Risiko"
    };
    assert_eq!(entry.result.as_str(), expected);

    // Percentage with exactly two decimals
    let pct = entry.probability.strip_suffix('%').unwrap();
    let (_, decimals) = pct.split_once('.').unwrap();
    assert_eq!(decimals.len(), 2);
    assert_eq!(entry.probability, "60.00%");
}

#[test]
fn test_history_preserves_insertion_order() {
    let dashboard = dashboard(false);
    let mut session = SessionContext::new(Uuid::new_v4());

    let glucose = [90, 180, 120, 150, 60];
    for g in glucose {
        let record = PatientRecord {
            glucose: g,
            ..PatientRecord::default()
        };
        dashboard.handle(&mut session, Event::Predict(record)).unwrap();
    }

    let recorded: Vec<u32> = session.history.all().iter().map(|e| e.glucose).collect();
    assert_eq!(recorded, glucose.to_vec());
    assert_eq!(session.history.all()[1].result, RiskLabel::Risk);
    assert_eq!(session.history.all()[0].result, RiskLabel::NoRisk);
}

#[test]
fn test_export_round_trip() {
    let dashboard = dashboard(false);
    let mut session = SessionContext::new(Uuid::new_v4());
    for g in [100, 170] {
        let record = PatientRecord {
            glucose: g,
            bmi: 31.7,
            ..PatientRecord::default()
        };
        dashboard.handle(&mut session, Event::Predict(record)).unwrap();
    }

    let body = match dashboard.handle(&mut session, Event::ExportHistory).unwrap() {
        RenderInstruction::Download(download) => download.body,
        other => panic!("unexpected instruction: {:?}", other),
    };

    let parsed = HistoryStore::from_csv(&body).unwrap();
    assert_eq!(parsed.all(), session.history.all());
}

#[test]
fn test_statistics_are_stable() {
    let dashboard = dashboard(false);
    let session = SessionContext::new(Uuid::new_v4());
    let instruction = RenderInstruction::PredictionPage { outcome: None };

    let first = render_page(&dashboard, &session, &instruction);
    let second = render_page(&dashboard, &session, &instruction);
    assert_eq!(first, second);

    assert_eq!(dashboard.summary().rows, 10);
    assert_eq!(dashboard.summary().mean("Glucose"), Some(127.3));
    assert!(first.contains("<strong>127.3</strong>"));
    assert!(first.contains("<strong>10</strong>"));
}

#[test]
fn test_importance_chart_rendered_after_prediction() {
    let dashboard = dashboard(true);
    let mut session = SessionContext::new(Uuid::new_v4());

    let instruction = dashboard
        .handle(&mut session, Event::Predict(PatientRecord::default()))
        .unwrap();
    let html = render_page(&dashboard, &session, &instruction);

    assert_eq!(html.matches(r#"<rect class="bar""#).count(), 8);
    let chart_start = html.find("Tingkat Pengaruh Setiap Fitur").unwrap();
    let chart = &html[chart_start..];
    let positions: Vec<usize> = DISPLAY_NAMES
        .iter()
        .map(|name| {
            chart
                .find(&format!(">{}</text>", name))
                .unwrap_or_else(|| panic!("missing bar label {}", name))
        })
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_no_importance_chart_without_capability() {
    let dashboard = dashboard(false);
    let mut session = SessionContext::new(Uuid::new_v4());

    let instruction = dashboard
        .handle(&mut session, Event::Predict(PatientRecord::default()))
        .unwrap();
    let html = render_page(&dashboard, &session, &instruction);

    assert!(!html.contains(r#"<rect class="bar""#));
    assert!(html.contains("Riwayat Prediksi"));
}

#[test]
fn test_result_section_only_after_prediction() {
    let dashboard = dashboard(false);
    let mut session = SessionContext::new(Uuid::new_v4());

    let instruction = dashboard
        .handle(&mut session, Event::SelectFeature("BMI".to_string()))
        .unwrap();
    let html = render_page(&dashboard, &session, &instruction);

    assert!(html.contains("Distribusi Nilai BMI"));
    assert!(!html.contains("Riwayat Prediksi"));
}

#[test]
fn test_missing_model_fails_startup() {
    let mut config = AppConfig::default();
    config.dataset.path = fixture_path();
    config.model.path = "no/such/model_diabetes.onnx".to_string();

    let err = Dashboard::load(&config, Arc::new(DashboardMetrics::new()))
        .err()
        .expect("startup must fail without a model");
    assert!(format!("{:#}", err).contains("Model file not found"));
}

#[test]
fn test_missing_dataset_fails_startup() {
    let mut config = AppConfig::default();
    config.dataset.path = "no/such/diabetes.csv".to_string();

    assert!(Dashboard::load(&config, Arc::new(DashboardMetrics::new())).is_err());
}

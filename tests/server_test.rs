use anyhow::Result;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use diabetes_risk_dashboard::dashboard::Dashboard;
use diabetes_risk_dashboard::dataset::Dataset;
use diabetes_risk_dashboard::metrics::DashboardMetrics;
use diabetes_risk_dashboard::models::{Classifier, Predictor, RawClassification};
use diabetes_risk_dashboard::server::{router, AppState};
use diabetes_risk_dashboard::session::SessionStore;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower::ServiceExt;

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

/// Same scores, but takes its time on very high glucose
struct SlowOnHighGlucose;

impl Classifier for SlowOnHighGlucose {
    fn name(&self) -> &str {
        "slow_on_high_glucose"
    }

    fn classify(&self, features: &[f32]) -> Result<RawClassification> {
        if features[1] >= 190.0 {
            std::thread::sleep(Duration::from_millis(800));
        }
        GlucoseThreshold.classify(features)
    }
}

fn app() -> (Router, Arc<DashboardMetrics>) {
    app_with(Box::new(GlucoseThreshold))
}

fn app_with(classifier: Box<dyn Classifier>) -> (Router, Arc<DashboardMetrics>) {
    let metrics = Arc::new(DashboardMetrics::new());
    let dataset = Dataset::load(format!(
        "{}/tests/fixtures/diabetes_sample.csv",
        env!("CARGO_MANIFEST_DIR")
    ))
    .unwrap();
    let predictor = Predictor::new(classifier, None).unwrap();
    let dashboard = Arc::new(Dashboard::new(predictor, dataset, metrics.clone()));
    let sessions = Arc::new(SessionStore::new(3600, metrics.clone()));
    (router(AppState::new(dashboard, sessions)), metrics)
}

fn session_cookie(response: &Response) -> String {
    let value = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("session cookie")
        .to_str()
        .unwrap();
    value.split(';').next().unwrap().to_string()
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn predict_request(cookie: &str, body: &'static str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/predict")
        .header(header::COOKIE, cookie)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_index_starts_session() {
    let (app, metrics) = app();

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(session_cookie(&response).starts_with("session_id="));
    let html = body_text(response).await;
    assert!(html.contains("Statistik Ringkas Dataset"));
    assert!(html.contains("id=\"patient-form\""));
    assert_eq!(metrics.sessions_started(), 1);
}

#[tokio::test]
async fn test_predict_then_export() {
    let (app, _) = app();

    let first = app
        .clone()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let cookie = session_cookie(&first);

    let predicted = app
        .clone()
        .oneshot(predict_request(
            &cookie,
            "Pregnancies=2&Glucose=180&BloodPressure=70&SkinThickness=20&Insulin=79&BMI=33.5&DiabetesPedigreeFunction=0.5&Age=45",
        ))
        .await
        .unwrap();
    assert_eq!(predicted.status(), StatusCode::OK);
    assert_eq!(session_cookie(&predicted), cookie);
    let html = body_text(predicted).await;
    assert!(html.contains("Pasien berisiko diabetes"));
    assert!(html.contains("<code>90.00%</code>"));
    assert!(html.contains("/history.csv"));

    let export = app
        .oneshot(
            Request::builder()
                .uri("/history.csv")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(export.status(), StatusCode::OK);
    assert_eq!(export.headers()[header::CONTENT_TYPE], "text/csv");
    assert_eq!(
        export.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"riwayat_prediksi.csv\""
    );
    assert_eq!(
        body_text(export).await,
        "Glukosa,BMI,Insulin,Usia,Hasil,Probabilitas\n180,33.5,79,45,Risiko,90.00%\n"
    );
}

#[tokio::test]
async fn test_blank_form_fields_fall_back_to_defaults() {
    let (app, _) = app();

    let response = app
        .oneshot(predict_request("", "Glucose=&BMI=abc"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Pasien tidak berisiko diabetes"));
    assert!(html.contains("<code>60.00%</code>"));
}

#[tokio::test]
async fn test_export_without_history_is_not_found() {
    let (app, metrics) = app();

    let response = app
        .oneshot(Request::builder().uri("/history.csv").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let html = body_text(response).await;
    assert!(html.contains("Belum ada riwayat prediksi untuk diunduh."));
    assert_eq!(metrics.exports(), 0);
}

#[tokio::test]
async fn test_theme_change_redirects_to_current_page() {
    let (app, _) = app();

    let about = app
        .clone()
        .oneshot(Request::builder().uri("/about").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let cookie = session_cookie(&about);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/theme")
                .header(header::COOKIE, &cookie)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("theme=dark"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(response.status().is_redirection());
    assert_eq!(response.headers()[header::LOCATION], "/about");

    let page = app
        .oneshot(
            Request::builder()
                .uri("/about")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let html = body_text(page).await;
    assert!(html.contains("<option value=\"dark\" selected>"));
}

#[tokio::test]
async fn test_end_session_discards_history() {
    let (app, metrics) = app();

    let predicted = app
        .clone()
        .oneshot(predict_request("", "Glucose=150"))
        .await
        .unwrap();
    let cookie = session_cookie(&predicted);

    let ended = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/session/end")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(ended.status().is_redirection());
    assert_eq!(metrics.sessions_ended(), 1);

    let export = app
        .oneshot(
            Request::builder()
                .uri("/history.csv")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(export.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health() {
    let (app, _) = app();

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "ok");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_slow_prediction_does_not_delay_other_sessions() {
    let (app, _) = app_with(Box::new(SlowOnHighGlucose));

    let slow = tokio::spawn(app.clone().oneshot(predict_request("", "Glucose=195")));
    tokio::time::sleep(Duration::from_millis(100)).await;

    let start = Instant::now();
    let about = app
        .oneshot(Request::builder().uri("/about").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let elapsed = start.elapsed();

    assert_eq!(about.status(), StatusCode::OK);
    assert!(
        elapsed < Duration::from_millis(500),
        "about page waited {:?} behind another session",
        elapsed
    );

    let predicted = slow.await.unwrap().unwrap();
    assert_eq!(predicted.status(), StatusCode::OK);
    assert!(body_text(predicted).await.contains("<code>97.50%</code>"));
}

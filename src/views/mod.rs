//! Server-side HTML rendering for the dashboard pages

pub mod charts;

use crate::dashboard::{Dashboard, PredictionOutcome, RenderInstruction};
use crate::dataset::feature_columns;
use crate::histogram::{density_curve, Histogram};
use crate::history::{HistoryStore, EXPORT_HEADERS};
use crate::session::{Page, SessionContext, Theme};
use crate::types::patient::FIELDS;
use std::fmt::Write;

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; margin: 0; display: flex; min-height: 100vh; }
aside { width: 280px; padding: 1.25rem; background: #f0f2f6; }
main { flex: 1; max-width: 760px; margin: 0 auto; padding: 1.5rem; }
label { display: block; margin-top: .6rem; font-size: .9rem; }
input[type=number], select { width: 100%; padding: .3rem; box-sizing: border-box; }
.metrics { display: grid; grid-template-columns: 1fr 1fr; gap: .75rem 2rem; }
.metric span { display: block; font-size: .85rem; opacity: .75; }
.metric strong { font-size: 1.6rem; }
.msg { padding: 1rem; border-radius: .5rem; margin: 1rem 0; white-space: pre-line; }
.msg.success { background: #e6f4ea; color: #1e6b34; }
.msg.error { background: #fdecea; color: #8a1c1c; }
.msg.info { background: #e8f0fe; color: #1a4d8f; }
table { border-collapse: collapse; width: 100%; }
th, td { border: 1px solid #ccc; padding: .3rem .5rem; text-align: left; }
nav a { display: block; margin: .3rem 0; color: inherit; text-decoration: none; }
footer { text-align: center; font-style: italic; margin-top: 2rem; }
button { margin-top: .75rem; padding: .5rem 1rem; }
"#;

const DARK_STYLE: &str = r#"
body, main { background-color: #121212; color: white; }
aside { background: #1e1e1e; }
th, td { border-color: #444; }
"#;

const ADVICE: &str = "💡 Saran:\n- Jaga pola makan sehat\n- Periksa kadar gula darah secara rutin\n- Konsultasikan ke dokter untuk diagnosa lanjutan";

/// Escape text for inclusion in HTML or SVG
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Render the page a render instruction asks for.
///
/// Downloads are not pages; callers serve them directly.
pub fn render_page(
    dashboard: &Dashboard,
    session: &SessionContext,
    instruction: &RenderInstruction,
) -> String {
    let main = match instruction {
        RenderInstruction::AboutPage => about_page(),
        RenderInstruction::PredictionPage { outcome } => {
            prediction_page(dashboard, session, outcome.as_ref(), None)
        }
        RenderInstruction::NothingToExport => prediction_page(
            dashboard,
            session,
            None,
            Some("Belum ada riwayat prediksi untuk diunduh."),
        ),
        RenderInstruction::Download(_) => String::new(),
    };
    layout(session, &main)
}

/// Minimal page for failures that reach the user
pub fn error_page(message: &str) -> String {
    format!(
        "<!DOCTYPE html><html lang=\"id\"><head><meta charset=\"utf-8\"><title>Kesalahan</title></head>\
         <body><main><h1>Terjadi kesalahan</h1><pre>{}</pre><p><a href=\"/\">Kembali</a></p></main></body></html>",
        escape(message)
    )
}

fn layout(session: &SessionContext, main: &str) -> String {
    let mut html = String::new();
    let dark = session.theme == Theme::Dark;
    let _ = write!(
        html,
        "<!DOCTYPE html><html lang=\"id\"><head><meta charset=\"utf-8\">\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\
         <title>Deteksi Risiko Diabetes</title><style>{}{}</style></head><body>",
        STYLE,
        if dark { DARK_STYLE } else { "" }
    );

    html.push_str("<aside>");
    let _ = write!(
        html,
        "<form method=\"post\" action=\"/theme\"><label for=\"theme\">🎨 Mode Tampilan</label>\
         <select id=\"theme\" name=\"theme\" onchange=\"this.form.submit()\">\
         <option value=\"light\"{}>Terang</option><option value=\"dark\"{}>Gelap</option></select>\
         <noscript><button type=\"submit\">Terapkan</button></noscript></form>",
        selected(!dark),
        selected(dark)
    );

    let on_prediction = session.page == Page::Prediction;
    let _ = write!(
        html,
        "<h3>Navigasi</h3><nav>\
         <a href=\"/\">{} 🏠 Prediksi</a><a href=\"/about\">{} ℹ️ Tentang Aplikasi</a></nav>",
        radio(on_prediction),
        radio(!on_prediction)
    );

    if on_prediction {
        html.push_str(&input_form(session));
    }
    let _ = write!(
        html,
        "<form method=\"post\" action=\"/session/end\"><button type=\"submit\">Akhiri Sesi</button></form>"
    );
    html.push_str("</aside><main>");
    html.push_str(main);
    html.push_str(
        "<hr><footer>Dikembangkan oleh Bagas Syifa Pratama · 2025</footer></main></body></html>",
    );
    html
}

fn input_form(session: &SessionContext) -> String {
    let mut html = String::from(
        "<h3>📋 Form Input Data Pasien</h3><form id=\"patient-form\" method=\"post\" action=\"/predict\">",
    );
    for (spec, value) in FIELDS.iter().zip(session.form.values()) {
        let value = if spec.integer {
            format!("{:.0}", value)
        } else {
            format!("{:.2}", value)
        };
        let _ = write!(
            html,
            "<label for=\"{name}\">{label}</label>\
             <input type=\"number\" id=\"{name}\" name=\"{name}\" min=\"{min}\" max=\"{max}\" step=\"{step}\" value=\"{value}\">",
            name = spec.name,
            label = escape(spec.label),
            min = spec.min,
            max = spec.max,
            step = spec.step(),
            value = value
        );
    }
    html.push_str("</form>");
    html
}

fn prediction_page(
    dashboard: &Dashboard,
    session: &SessionContext,
    outcome: Option<&PredictionOutcome>,
    notice: Option<&str>,
) -> String {
    let mut html = String::from(
        "<h1>🩺 Aplikasi Deteksi Risiko Diabetes</h1>\
         <p>Masukkan data pasien di sidebar untuk memprediksi risiko terkena diabetes \
         berdasarkan data medis menggunakan algoritma <b>Random Forest</b>.</p><hr>",
    );

    if let Some(notice) = notice {
        let _ = write!(html, "<div class=\"msg info\">{}</div>", escape(notice));
    }

    html.push_str(&statistics(dashboard));
    html.push_str(&distribution(dashboard, session));
    html.push_str("<hr><h2>📈 Hasil Prediksi Risiko Diabetes</h2>");
    html.push_str(
        "<button type=\"submit\" form=\"patient-form\">🔍 Prediksi</button>",
    );

    if let Some(outcome) = outcome {
        html.push_str(&result(outcome));
        if let Some(importances) = dashboard.predictor().feature_importances() {
            html.push_str("<h2>🔬 Pengaruh Fitur terhadap Prediksi</h2>");
            html.push_str(&charts::importance_svg(importances));
        }
        html.push_str(&history_table(&session.history));
    }
    html
}

fn statistics(dashboard: &Dashboard) -> String {
    let summary = dashboard.summary();
    let metric = |label: &str, column: &str, decimals: usize| -> String {
        let value = summary
            .mean(column)
            .map(|m| format!("{:.*}", decimals, m))
            .unwrap_or_else(|| "–".to_string());
        format!(
            "<div class=\"metric\"><span>{}</span><strong>{}</strong></div>",
            label, value
        )
    };

    let cells = [
        metric("🔌 Glukosa (Rata-rata)", "Glucose", 1),
        metric("👩 Kehamilan (Rata-rata)", "Pregnancies", 1),
        metric("🩸 Tekanan Darah (Rata-rata)", "BloodPressure", 1),
        metric("📈 Usia (Rata-rata)", "Age", 1),
        metric("📏 BMI (Rata-rata)", "BMI", 1),
        metric("📊 DPF (Rata-rata)", "DiabetesPedigreeFunction", 2),
        metric("💉 Insulin (Rata-rata)", "Insulin", 1),
        format!(
            "<div class=\"metric\"><span>📋 Total Data</span><strong>{}</strong></div>",
            summary.rows
        ),
    ];

    format!(
        "<h2>📌 Statistik Ringkas Dataset</h2><div class=\"metrics\">{}</div>",
        cells.concat()
    )
}

fn distribution(dashboard: &Dashboard, session: &SessionContext) -> String {
    let mut html = String::from(
        "<h2>📊 Distribusi Nilai Medis (Histogram)</h2>\
         <form method=\"get\" action=\"/\"><label for=\"feature\">Pilih fitur:</label>\
         <select id=\"feature\" name=\"feature\" onchange=\"this.form.submit()\">",
    );
    for column in feature_columns() {
        let _ = write!(
            html,
            "<option value=\"{c}\"{s}>{c}</option>",
            c = column,
            s = selected(*column == session.histogram_feature)
        );
    }
    html.push_str("</select><noscript><button type=\"submit\">Tampilkan</button></noscript></form>");

    let values = dashboard
        .dataset()
        .column(session.histogram_feature)
        .unwrap_or(&[]);
    match Histogram::auto(values) {
        Some(hist) => {
            let curve = density_curve(values, hist.bin_width());
            html.push_str(&charts::histogram_svg(
                session.histogram_feature,
                &hist,
                curve.as_deref(),
            ));
        }
        None => html.push_str("<p>Dataset kosong.</p>"),
    }
    html
}

fn result(outcome: &PredictionOutcome) -> String {
    let prediction = &outcome.prediction;
    let (class, text) = if prediction.label.is_risk() {
        ("error", "⚠️ Hasil: Pasien berisiko diabetes.")
    } else {
        ("success", "✅ Hasil: Pasien tidak berisiko diabetes.")
    };
    format!(
        "<div class=\"msg {}\"><strong>{}</strong>\n\nProbabilitas: <code>{}</code></div>\
         <div class=\"msg info\">{}</div>",
        class,
        text,
        prediction.formatted_probability(),
        escape(ADVICE)
    )
}

fn history_table(history: &HistoryStore) -> String {
    let mut html = String::from("<h2>📓 Riwayat Prediksi</h2><table><thead><tr>");
    for header in EXPORT_HEADERS {
        let _ = write!(html, "<th>{}</th>", header);
    }
    html.push_str("</tr></thead><tbody>");
    for entry in history.all() {
        let _ = write!(
            html,
            "<tr><td>{}</td><td>{:?}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            entry.glucose,
            entry.bmi,
            entry.insulin,
            entry.age,
            entry.result,
            escape(&entry.probability)
        );
    }
    html.push_str("</tbody></table>");
    if !history.is_empty() {
        html.push_str("<p><a href=\"/history.csv\" download>📅 Unduh Hasil Prediksi</a></p>");
    }
    html
}

fn about_page() -> String {
    String::from(
        "<h1>ℹ️ Tentang Aplikasi</h1>\
         <p>Aplikasi ini digunakan untuk memprediksi risiko diabetes berdasarkan data medis pasien \
         menggunakan algoritma <b>Random Forest</b>.</p>\
         <p><b>Fitur yang digunakan:</b></p><ul>\
         <li>Jumlah Kehamilan</li><li>Glukosa</li><li>Tekanan Darah</li><li>Tebal Lipatan Kulit</li>\
         <li>Insulin</li><li>BMI</li><li>Diabetes Pedigree Function</li><li>Usia</li></ul>\
         <p><b>Dataset</b>: Pima Indian Diabetes Dataset<br>\
         <b>Model</b>: Random Forest Classifier<br>\
         <b>Akurasi</b>: Sekitar 75%</p>\
         <p>Dikembangkan oleh: <b>Bagas Syifa Pratama (2025)</b></p>",
    )
}

fn selected(on: bool) -> &'static str {
    if on {
        " selected"
    } else {
        ""
    }
}

fn radio(on: bool) -> &'static str {
    if on {
        "◉"
    } else {
        "○"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(escape("a<b>&\"c'"), "a&lt;b&gt;&amp;&quot;c&#39;");
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn test_history_table_download_link_only_when_not_empty() {
        let empty = history_table(&HistoryStore::new());
        assert!(!empty.contains("/history.csv"));
        assert!(empty.contains("<th>Probabilitas</th>"));
    }

    #[test]
    fn test_history_table_bmi_matches_export() {
        use crate::history::HistoryEntry;
        use crate::types::patient::PatientRecord;
        use crate::types::prediction::{Prediction, RiskLabel};

        let mut history = HistoryStore::new();
        let prediction = Prediction {
            label: RiskLabel::NoRisk,
            probability: 0.25,
        };
        history.append(HistoryEntry::new(&PatientRecord::default(), &prediction));

        let table = history_table(&history);
        assert!(table.contains("<td>120</td><td>25.0</td><td>80</td><td>30</td>"));

        let csv = String::from_utf8(history.to_csv().unwrap()).unwrap();
        assert!(csv.contains("120,25.0,80,30,"));
    }
}

//! Inline SVG charts: column distribution and feature importance

use super::escape;
use crate::histogram::Histogram;
use crate::models::importance::FeatureImportances;
use std::fmt::Write;

const WIDTH: f64 = 640.0;
const HEIGHT: f64 = 320.0;

/// Plot margins: left, right, top, bottom
const MARGIN: (f64, f64, f64, f64) = (56.0, 20.0, 36.0, 40.0);
const IMPORTANCE_MARGIN_LEFT: f64 = 110.0;

/// Histogram bars with an optional density line, titled `Distribusi Nilai <column>`
pub fn histogram_svg(column: &str, hist: &Histogram, curve: Option<&[(f64, f64)]>) -> String {
    let (ml, mr, mt, mb) = MARGIN;
    let plot_w = WIDTH - ml - mr;
    let plot_h = HEIGHT - mt - mb;

    let x_min = hist.edges[0];
    let x_max = hist.edges[hist.edges.len() - 1];
    let curve_max = curve
        .map(|c| c.iter().map(|(_, y)| *y).fold(0.0, f64::max))
        .unwrap_or(0.0);
    let y_max = (hist.max_count() as f64).max(curve_max).max(1.0) * 1.05;

    let sx = |x: f64| ml + (x - x_min) / (x_max - x_min) * plot_w;
    let sy = |y: f64| mt + plot_h - y / y_max * plot_h;

    let mut svg = open_svg("histogram");
    let _ = write!(
        svg,
        r#"<text class="title" x="{:.1}" y="22" text-anchor="middle">Distribusi Nilai {}</text>"#,
        WIDTH / 2.0,
        escape(column)
    );

    for (i, &count) in hist.counts.iter().enumerate() {
        let x0 = sx(hist.edges[i]);
        let x1 = sx(hist.edges[i + 1]);
        let y = sy(count as f64);
        let _ = write!(
            svg,
            r#"<rect class="bin" x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="skyblue" stroke="white"><title>{:.2} – {:.2}: {}</title></rect>"#,
            x0,
            y,
            (x1 - x0).max(0.0),
            mt + plot_h - y,
            hist.edges[i],
            hist.edges[i + 1],
            count
        );
    }

    if let Some(curve) = curve {
        let points: Vec<String> = curve
            .iter()
            .map(|(x, y)| format!("{:.2},{:.2}", sx(*x), sy(*y)))
            .collect();
        let _ = write!(
            svg,
            r#"<polyline class="kde" fill="none" stroke="steelblue" stroke-width="2" points="{}"/>"#,
            points.join(" ")
        );
    }

    axes(&mut svg, ml, mt, plot_w, plot_h);
    let _ = write!(
        svg,
        r#"<text class="tick" x="{:.1}" y="{:.1}" text-anchor="start">{}</text><text class="tick" x="{:.1}" y="{:.1}" text-anchor="end">{}</text>"#,
        ml,
        HEIGHT - mb + 16.0,
        tick(x_min),
        ml + plot_w,
        HEIGHT - mb + 16.0,
        tick(x_max)
    );
    let _ = write!(
        svg,
        r#"<text class="tick" x="{:.1}" y="{:.1}" text-anchor="end">{}</text><text class="axis-label" x="{:.1}" y="{:.1}" text-anchor="middle">{}</text><text class="axis-label" x="14" y="{:.1}" transform="rotate(-90 14 {:.1})" text-anchor="middle">Count</text>"#,
        ml - 6.0,
        mt + 4.0,
        tick(y_max),
        ml + plot_w / 2.0,
        HEIGHT - 8.0,
        escape(column),
        mt + plot_h / 2.0,
        mt + plot_h / 2.0
    );

    svg.push_str("</svg>");
    svg
}

/// Horizontal bars in model-declared order, each annotated with its value
pub fn importance_svg(importances: &FeatureImportances) -> String {
    let (_, mr, mt, mb) = MARGIN;
    let ml = IMPORTANCE_MARGIN_LEFT;
    let plot_w = WIDTH - ml - mr;
    let plot_h = HEIGHT - mt - mb;

    let x_max = importances.max() + 0.05;
    let slot = plot_h / importances.weights().len() as f64;
    let bar_h = slot * 0.8;

    let mut svg = open_svg("importance");
    let _ = write!(
        svg,
        r#"<text class="title" x="{:.1}" y="22" text-anchor="middle">Tingkat Pengaruh Setiap Fitur</text>"#,
        WIDTH / 2.0
    );

    for (i, (name, weight)) in importances.labelled().enumerate() {
        let y = mt + slot * i as f64 + (slot - bar_h) / 2.0;
        let w = weight / x_max * plot_w;
        let _ = write!(
            svg,
            r#"<rect class="bar" x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="{}"/>"#,
            ml,
            y,
            w,
            bar_h,
            palette(i)
        );
        let _ = write!(
            svg,
            r#"<text class="bar-label" x="{:.2}" y="{:.2}" text-anchor="end" dominant-baseline="middle">{}</text>"#,
            ml - 6.0,
            y + bar_h / 2.0,
            name
        );
        let _ = write!(
            svg,
            r#"<text class="bar-value" x="{:.2}" y="{:.2}" dominant-baseline="middle">{:.2}</text>"#,
            ml + w + 0.005 / x_max * plot_w,
            y + bar_h / 2.0,
            weight
        );
    }

    axes(&mut svg, ml, mt, plot_w, plot_h);
    let _ = write!(
        svg,
        r#"<text class="tick" x="{:.1}" y="{:.1}" text-anchor="middle">0</text><text class="tick" x="{:.1}" y="{:.1}" text-anchor="middle">{:.2}</text><text class="axis-label" x="{:.1}" y="{:.1}" text-anchor="middle">Importance</text>"#,
        ml,
        HEIGHT - mb + 16.0,
        ml + plot_w,
        HEIGHT - mb + 16.0,
        x_max,
        ml + plot_w / 2.0,
        HEIGHT - 8.0
    );

    svg.push_str("</svg>");
    svg
}

fn open_svg(class: &str) -> String {
    format!(
        r#"<svg class="chart {}" xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {} {}" width="100%" role="img">"#,
        class, WIDTH, HEIGHT
    )
}

fn axes(svg: &mut String, ml: f64, mt: f64, plot_w: f64, plot_h: f64) {
    let _ = write!(
        svg,
        r#"<line class="axis" x1="{ml:.1}" y1="{y0:.1}" x2="{x1:.1}" y2="{y0:.1}" stroke="currentColor"/><line class="axis" x1="{ml:.1}" y1="{mt:.1}" x2="{ml:.1}" y2="{y0:.1}" stroke="currentColor"/>"#,
        ml = ml,
        mt = mt,
        x1 = ml + plot_w,
        y0 = mt + plot_h
    );
}

fn tick(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.1}", value)
    }
}

/// Dark-to-light ramp for the importance bars
fn palette(i: usize) -> &'static str {
    const COLORS: [&str; 8] = [
        "#35193e", "#5b1e51", "#841e5a", "#ad1759", "#d6204c", "#ef4b3b", "#f47a59", "#f6a47c",
    ];
    COLORS[i % COLORS.len()]
}

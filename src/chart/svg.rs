//! SVG charts built with `maud`, delivered as base64 data URIs.

use std::fmt::Write;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use maud::{Markup, html};

use super::ChartRenderer;
use crate::domain::Bucket;

const WIDTH: f64 = 640.0;
const HEIGHT: f64 = 320.0;
const MARGIN_LEFT: f64 = 50.0;
const MARGIN_RIGHT: f64 = 20.0;
const MARGIN_TOP: f64 = 30.0;
const MARGIN_BOTTOM: f64 = 50.0;

const TEXT_STYLE: &str = "fill: #334155; font-family: sans-serif";
const BAR_FILL: &str = "#4f81bd";
const LINE_STROKE: &str = "#c0504d";

/// [`ChartRenderer`] producing `data:image/svg+xml;base64,...` URIs.
#[derive(Debug, Clone, Copy, Default)]
pub struct SvgChartRenderer;

impl ChartRenderer for SvgChartRenderer {
    fn bar_chart(&self, title: &str, buckets: &[Bucket]) -> String {
        data_uri(&render_bar_chart(title, buckets))
    }

    fn line_chart(&self, title: &str, buckets: &[Bucket]) -> String {
        data_uri(&render_line_chart(title, buckets))
    }
}

fn data_uri(markup: &Markup) -> String {
    format!(
        "data:image/svg+xml;base64,{}",
        STANDARD.encode(markup.0.as_bytes())
    )
}

#[allow(clippy::cast_precision_loss)]
fn max_value(buckets: &[Bucket]) -> f64 {
    let max = buckets.iter().map(|b| b.value).max().unwrap_or(0);
    if max == 0 { 1.0 } else { max as f64 }
}

fn chart_area() -> (f64, f64) {
    (
        WIDTH - MARGIN_LEFT - MARGIN_RIGHT,
        HEIGHT - MARGIN_TOP - MARGIN_BOTTOM,
    )
}

#[allow(clippy::cast_precision_loss)]
fn render_bar_chart(title: &str, buckets: &[Bucket]) -> Markup {
    if buckets.is_empty() {
        return empty_chart(title);
    }
    let max_val = max_value(buckets);
    let (chart_w, chart_h) = chart_area();
    let bar_w = chart_w / buckets.len() as f64;

    html! {
        svg viewBox=(format!("0 0 {WIDTH} {HEIGHT}")) xmlns="http://www.w3.org/2000/svg" {
            rect width=(WIDTH) height=(HEIGHT) fill="#ffffff" {}
            (header(title, max_val, chart_h))
            @for (i, bucket) in buckets.iter().enumerate() {
                @let bar_h = (bucket.value as f64 / max_val) * chart_h;
                @let x = MARGIN_LEFT + i as f64 * bar_w;
                @let y = MARGIN_TOP + chart_h - bar_h;
                rect x=(x) y=(y) width=((bar_w - 4.0).max(1.0)) height=(bar_h) fill=(BAR_FILL) {
                    title { (bucket.key) ": " (bucket.value) }
                }
                text x=(x + bar_w / 2.0) y=(HEIGHT - MARGIN_BOTTOM + 16.0) font-size="11" text-anchor="middle" style=(TEXT_STYLE) {
                    (short_label(&bucket.key))
                }
            }
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn render_line_chart(title: &str, buckets: &[Bucket]) -> Markup {
    if buckets.is_empty() {
        return empty_chart(title);
    }
    let max_val = max_value(buckets);
    let (chart_w, chart_h) = chart_area();
    let step = chart_w / (buckets.len().saturating_sub(1)).max(1) as f64;
    let point = |i: usize, value: u64| {
        (
            MARGIN_LEFT + i as f64 * step,
            MARGIN_TOP + chart_h - (value as f64 / max_val) * chart_h,
        )
    };

    let mut points = String::new();
    for (i, bucket) in buckets.iter().enumerate() {
        let (x, y) = point(i, bucket.value);
        if !points.is_empty() {
            points.push(' ');
        }
        let _ = write!(points, "{x},{y}");
    }

    html! {
        svg viewBox=(format!("0 0 {WIDTH} {HEIGHT}")) xmlns="http://www.w3.org/2000/svg" {
            rect width=(WIDTH) height=(HEIGHT) fill="#ffffff" {}
            (header(title, max_val, chart_h))
            polyline points=(points) fill="none" stroke-width="2" stroke=(LINE_STROKE) {}
            @for (i, bucket) in buckets.iter().enumerate() {
                @let (x, y) = point(i, bucket.value);
                circle cx=(x) cy=(y) r="4" fill=(LINE_STROKE) {
                    title { (bucket.key) ": " (bucket.value) }
                }
                text x=(x) y=(HEIGHT - MARGIN_BOTTOM + 16.0) font-size="11" text-anchor="middle" style=(TEXT_STYLE) {
                    (short_label(&bucket.key))
                }
            }
        }
    }
}

fn header(title: &str, max_val: f64, chart_h: f64) -> Markup {
    html! {
        text x=(WIDTH / 2.0) y="20" font-size="14" text-anchor="middle" style=(TEXT_STYLE) { (title) }
        line x1=(MARGIN_LEFT) y1=(MARGIN_TOP + chart_h) x2=(WIDTH - MARGIN_RIGHT) y2=(MARGIN_TOP + chart_h) stroke="#94a3b8" {}
        text x=(MARGIN_LEFT - 6.0) y=(MARGIN_TOP + 10.0) font-size="10" text-anchor="end" style=(TEXT_STYLE) {
            (format!("{max_val:.0}"))
        }
        text x=(MARGIN_LEFT - 6.0) y=(MARGIN_TOP + chart_h) font-size="10" text-anchor="end" style=(TEXT_STYLE) { "0" }
    }
}

/// Trims ISO-8601 keys to their date part; other labels pass through.
fn short_label(key: &str) -> &str {
    match key.find('T') {
        Some(pos) if key.starts_with(|c: char| c.is_ascii_digit()) => key.get(..pos).unwrap_or(key),
        _ => key,
    }
}

fn empty_chart(title: &str) -> Markup {
    html! {
        svg viewBox=(format!("0 0 {WIDTH} {HEIGHT}")) xmlns="http://www.w3.org/2000/svg" {
            rect width=(WIDTH) height=(HEIGHT) fill="#ffffff" {}
            text x=(WIDTH / 2.0) y=(HEIGHT / 2.0) font-size="14" text-anchor="middle" style=(TEXT_STYLE) {
                (title) ": no data"
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn decode(uri: &str) -> String {
        let Some(payload) = uri.strip_prefix("data:image/svg+xml;base64,") else {
            panic!("not an svg data uri: {uri}");
        };
        let Ok(bytes) = STANDARD.decode(payload) else {
            panic!("invalid base64");
        };
        let Ok(text) = String::from_utf8(bytes) else {
            panic!("invalid utf-8");
        };
        text
    }

    #[test]
    fn bar_chart_has_one_bar_per_bucket() {
        let buckets = vec![Bucket::new("臺北", 5), Bucket::new("高雄", 2)];
        let svg = decode(&SvgChartRenderer.bar_chart("Cities", &buckets));
        assert!(svg.starts_with("<svg"));
        assert_eq!(svg.matches(BAR_FILL).count(), 2);
        assert!(svg.contains("臺北: 5"));
    }

    #[test]
    fn line_chart_trims_iso_keys() {
        let buckets = vec![
            Bucket::new("2024-05-01T00:00:00+08:00", 1),
            Bucket::new("2024-06-01T00:00:00+08:00", 3),
        ];
        let svg = decode(&SvgChartRenderer.line_chart("Trend", &buckets));
        assert!(svg.contains("<polyline"));
        assert!(svg.contains(">2024-06-01<"));
    }

    #[test]
    fn empty_series_renders_placeholder() {
        let svg = decode(&SvgChartRenderer.bar_chart("Cities", &[]));
        assert!(svg.contains("Cities: no data"));
    }
}

//! Combined trend + geographic report.

use chrono_tz::Tz;
use serde::Serialize;
use utoipa::ToSchema;

use super::histogram::{GroupField, SortKey, histogram};
use super::trend::{TrendSummary, TrendWindow, monthly_trend};
use crate::domain::bucket::total;
use crate::domain::{Bucket, Event};
use crate::error::GatewayError;

/// Cities listed in the geographic part of a report.
pub const REPORT_TOP_CITIES: i64 = 10;

/// Text and numeric payload of an analysis report.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Report {
    /// Human-readable summary.
    pub summary_text: String,
    /// Six-month trend.
    pub monthly: TrendSummary,
    /// Top cities by event count, busiest first.
    pub geographic: Vec<Bucket>,
}

/// Composes the six-month trend and the city histogram into one report.
///
/// Both halves count the same events: those starting inside the trend
/// window. Events that only run into the window are ignored by both.
/// Sub-component failures propagate unchanged; no partial report is built.
///
/// # Errors
///
/// Whatever [`monthly_trend`] or [`histogram`] return.
pub fn compose_report(
    events: &[Event],
    reference_ms: i64,
    timezone: Tz,
) -> Result<Report, GatewayError> {
    let window = TrendWindow::ending_at(reference_ms, timezone)?;
    let in_window: Vec<Event> = events
        .iter()
        .filter(|e| (window.from_ms()..=window.to_ms()).contains(&e.start_time))
        .cloned()
        .collect();

    let monthly = monthly_trend(&in_window, reference_ms, timezone)?;
    let geographic = histogram(
        &in_window,
        GroupField::City,
        SortKey::Value,
        false,
        REPORT_TOP_CITIES,
    )?;

    let summary_text = summarize(&monthly, &geographic);
    Ok(Report {
        summary_text,
        monthly,
        geographic,
    })
}

fn summarize(monthly: &TrendSummary, geographic: &[Bucket]) -> String {
    let mut lines = vec![monthly.describe("")];
    match geographic.first() {
        Some(top) => {
            let listed = geographic
                .iter()
                .map(|b| format!("{} ({})", b.key, b.value))
                .collect::<Vec<_>>()
                .join(", ");
            lines.push(format!(
                "{} events across the top {} cities; {} leads with {}. Cities: {listed}.",
                total(geographic),
                geographic.len(),
                top.key,
                top.value
            ));
        }
        None => lines.push("No geographic data available.".to_string()),
    }
    lines.join("\n")
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    const TAIPEI: Tz = chrono_tz::Asia::Taipei;
    // 2024-06-15T04:00:00Z
    const REFERENCE: i64 = 1_718_424_000_000;

    fn event(id: &str, city: &str, start: i64) -> Event {
        Event {
            id: id.to_string(),
            location: Some(city.to_string()),
            start_time: start,
            ..Event::default()
        }
    }

    #[test]
    fn report_combines_trend_and_cities() {
        let day = 86_400_000;
        let events = vec![
            event("1", "臺北", REFERENCE - day),
            event("2", "臺北", REFERENCE - 40 * day),
            event("3", "高雄", REFERENCE - 2 * day),
        ];
        let Ok(report) = compose_report(&events, REFERENCE, TAIPEI) else {
            panic!("report failed");
        };
        assert_eq!(report.monthly.monthly.len(), 6);
        assert_eq!(report.monthly.total_events, 3);
        assert_eq!(
            report.geographic,
            vec![Bucket::new("臺北", 2), Bucket::new("高雄", 1)]
        );
        assert!(report.summary_text.contains("臺北 leads with 2"));
    }

    #[test]
    fn events_starting_before_the_window_are_left_out_of_both_halves() {
        let day = 86_400_000;
        // Starts in November 2023, ends in February 2024; the window opens in January.
        let mut straddling = event("1", "臺中", REFERENCE - 210 * day);
        straddling.end_time = Some(REFERENCE - 130 * day);
        let events = vec![straddling, event("2", "臺北", REFERENCE - day)];
        let Ok(report) = compose_report(&events, REFERENCE, TAIPEI) else {
            panic!("report failed");
        };
        assert_eq!(report.monthly.total_events, 1);
        assert_eq!(total(&report.geographic), report.monthly.total_events);
        assert_eq!(report.geographic, vec![Bucket::new("臺北", 1)]);
    }

    #[test]
    fn empty_report_is_still_complete() {
        let Ok(report) = compose_report(&[], REFERENCE, TAIPEI) else {
            panic!("report failed");
        };
        assert_eq!(report.monthly.monthly.len(), 6);
        assert!(report.geographic.is_empty());
        assert!(report.summary_text.contains("No geographic data"));
    }
}

//! Rule-based parameter extraction used when the LLM path fails.

use chrono_tz::Tz;

use super::extract::{TAIWAN_CITIES, fold_city};
use crate::analytics::Interval;
use crate::analytics::interval::{local_time, resolve_local};
use crate::domain::RawFilterParams;
use crate::error::GatewayError;

/// Extracts a time range and the first mentioned city from `message`.
///
/// Relative time words are anchored at `now_ms` in `timezone`; ranges are
/// closed and aligned to local midnights.
///
/// # Errors
///
/// Returns [`GatewayError::Internal`] if `now_ms` lies outside the
/// representable calendar.
pub fn extract_by_rules(
    message: &str,
    now_ms: i64,
    timezone: Tz,
) -> Result<RawFilterParams, GatewayError> {
    let range = time_range(message, now_ms, timezone)?;
    Ok(RawFilterParams {
        from: range.map(|(from, _)| from.to_string()),
        to: range.map(|(_, to)| to.to_string()),
        city: first_city(message).map(ToString::to_string),
        ..RawFilterParams::default()
    })
}

fn time_range(message: &str, now_ms: i64, tz: Tz) -> Result<Option<(i64, i64)>, GatewayError> {
    let local_now = local_time(&tz, now_ms)?;
    let today = Interval::Day.ordinal(local_now);
    let month = Interval::Month.ordinal(local_now);
    let mentions = |words: &[&str]| words.iter().any(|w| message.contains(w));

    // (interval, first ordinal, ordinal after the last)
    let span = if mentions(&["下個月", "下月"]) {
        Some((Interval::Month, month + 1, month + 2))
    } else if mentions(&["這個月", "本月"]) {
        return Ok(Some((
            start_ms(Interval::Month, month, &tz)?,
            start_ms(Interval::Day, today + 1, &tz)? - 1,
        )));
    } else if mentions(&["今天"]) {
        Some((Interval::Day, today, today + 1))
    } else if mentions(&["明天"]) {
        Some((Interval::Day, today + 1, today + 2))
    } else if mentions(&["這週", "本週"]) {
        Some((Interval::Day, today, today + 7))
    } else if mentions(&["下週"]) {
        Some((Interval::Day, today + 7, today + 14))
    } else {
        None
    };

    span.map(|(interval, first, after_last)| {
        Ok((
            start_ms(interval, first, &tz)?,
            start_ms(interval, after_last, &tz)? - 1,
        ))
    })
    .transpose()
}

fn start_ms(interval: Interval, ordinal: i64, tz: &Tz) -> Result<i64, GatewayError> {
    interval
        .local_start(ordinal)
        .and_then(|local| resolve_local(tz, local))
        .map(|dt| dt.timestamp_millis())
        .ok_or_else(|| GatewayError::Internal(format!("{interval} {ordinal} out of range")))
}

/// City mentioned earliest in the message, in either spelling.
fn first_city(message: &str) -> Option<&'static str> {
    let folded = fold_city(message);
    TAIWAN_CITIES
        .iter()
        .filter_map(|city| folded.find(city).map(|pos| (pos, *city)))
        .min_by_key(|(pos, _)| *pos)
        .map(|(_, city)| city)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    const TAIPEI: Tz = chrono_tz::Asia::Taipei;
    // 2024-06-15T12:00:00+08:00
    const NOW: i64 = 1_718_424_000_000;
    // 2024-06-15T00:00:00+08:00
    const TODAY: i64 = 1_718_380_800_000;
    const DAY: i64 = 86_400_000;

    fn rules(message: &str) -> RawFilterParams {
        let Ok(params) = extract_by_rules(message, NOW, TAIPEI) else {
            panic!("extraction failed");
        };
        params
    }

    fn range(params: &RawFilterParams) -> (String, String) {
        let (Some(from), Some(to)) = (params.from.clone(), params.to.clone()) else {
            panic!("expected a range");
        };
        (from, to)
    }

    #[test]
    fn day_words() {
        assert_eq!(
            range(&rules("今天有什麼活動")),
            (TODAY.to_string(), (TODAY + DAY - 1).to_string())
        );
        assert_eq!(
            range(&rules("明天的展覽")),
            ((TODAY + DAY).to_string(), (TODAY + 2 * DAY - 1).to_string())
        );
        assert_eq!(
            range(&rules("下週末")),
            ((TODAY + 7 * DAY).to_string(), (TODAY + 14 * DAY - 1).to_string())
        );
    }

    #[test]
    fn month_words() {
        assert_eq!(
            range(&rules("下個月的音樂會")),
            (
                "1719763200000".to_string(),
                "1722441599999".to_string()
            )
        );
        // 2024-06-01T00:00:00+08:00 through the end of today
        assert_eq!(
            range(&rules("本月活動")),
            ("1717171200000".to_string(), (TODAY + DAY - 1).to_string())
        );
    }

    #[test]
    fn no_time_word_leaves_range_open() {
        let params = rules("找展覽");
        assert!(params.from.is_none());
        assert!(params.to.is_none());
    }

    #[test]
    fn earliest_city_in_either_spelling() {
        assert_eq!(rules("高雄或台北的活動").city.as_deref(), Some("高雄"));
        assert_eq!(rules("台中有什麼").city.as_deref(), Some("臺中"));
        assert!(rules("東京的活動").city.is_none());
    }
}

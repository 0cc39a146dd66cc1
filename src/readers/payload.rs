use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

use crate::error::{EtlError, Result};
use crate::models::{DailySeries, HourlySeries, MetricSeries, TimeSeries};
use crate::utils::constants::{DAILY_DATE_FORMAT, HOURLY_TIME_FORMAT};

#[derive(Debug, Deserialize)]
struct ForecastPayload {
    latitude: Option<f64>,
    longitude: Option<f64>,
    hourly: Option<SeriesBlock>,
    daily: Option<SeriesBlock>,
}

#[derive(Debug, Deserialize)]
struct SeriesBlock {
    time: Option<Vec<String>>,
    #[serde(flatten)]
    columns: HashMap<String, Value>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    error: bool,
    reason: Option<String>,
}

/// `reason` from an Open-Meteo error body (`{"error": true, "reason": "..."}`).
pub fn api_error_reason(body: &str) -> Option<String> {
    serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .filter(|b| b.error)
        .and_then(|b| b.reason)
}

/// Parse the `hourly` block of a forecast response.
pub fn parse_hourly(body: &str, variables: &[&str]) -> Result<HourlySeries> {
    parse_series(body, "hourly", variables, |raw| {
        NaiveDateTime::parse_from_str(raw, HOURLY_TIME_FORMAT)
    })
}

/// Parse the `daily` block of a forecast response.
pub fn parse_daily(body: &str, variables: &[&str]) -> Result<DailySeries> {
    parse_series(body, "daily", variables, |raw| {
        NaiveDate::parse_from_str(raw, DAILY_DATE_FORMAT)
    })
}

fn parse_series<T, F>(
    body: &str,
    block_name: &str,
    variables: &[&str],
    parse_time: F,
) -> Result<TimeSeries<T>>
where
    F: Fn(&str) -> std::result::Result<T, chrono::ParseError>,
{
    let payload: ForecastPayload = serde_json::from_str(body)?;

    let latitude = payload
        .latitude
        .ok_or_else(|| EtlError::MissingField("latitude".to_string()))?;
    let longitude = payload
        .longitude
        .ok_or_else(|| EtlError::MissingField("longitude".to_string()))?;

    let block = match block_name {
        "hourly" => payload.hourly,
        _ => payload.daily,
    };
    let mut block = block.ok_or_else(|| EtlError::MissingField(block_name.to_string()))?;

    let raw_times = block
        .time
        .take()
        .ok_or_else(|| EtlError::MissingField(format!("{}.time", block_name)))?;

    let timestamps = raw_times
        .iter()
        .map(|raw| {
            parse_time(raw).map_err(|source| EtlError::TimestampParse {
                value: raw.clone(),
                source,
            })
        })
        .collect::<Result<Vec<T>>>()?;

    let mut series = TimeSeries::new(latitude, longitude, timestamps);

    for variable in variables {
        if series.metric(variable).is_some() {
            continue;
        }
        let raw = block
            .columns
            .remove(*variable)
            .ok_or_else(|| EtlError::MissingField(format!("{}.{}", block_name, variable)))?;
        let values: Vec<Option<f64>> = serde_json::from_value(raw)?;

        if values.len() != series.len() {
            return Err(EtlError::MisalignedSeries {
                variable: variable.to_string(),
                expected: series.len(),
                actual: values.len(),
            });
        }

        series.metrics.push(MetricSeries::new(*variable, values));
    }

    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const HOURLY_BODY: &str = r#"{
        "latitude": 27.75,
        "longitude": 85.375,
        "generationtime_ms": 0.05,
        "utc_offset_seconds": 0,
        "hourly_units": {"time": "iso8601", "temperature_2m": "°C", "precipitation": "mm"},
        "hourly": {
            "time": ["2025-12-01T00:00", "2025-12-01T01:00"],
            "temperature_2m": [5.0, 4.5],
            "precipitation": [0.0, null]
        }
    }"#;

    #[test]
    fn test_parse_hourly_payload() {
        let series = parse_hourly(HOURLY_BODY, &["temperature_2m", "precipitation"]).unwrap();

        assert_eq!(series.latitude, 27.75);
        assert_eq!(series.longitude, 85.375);
        assert_eq!(series.len(), 2);
        assert_eq!(
            series.timestamps[1],
            NaiveDate::from_ymd_opt(2025, 12, 1)
                .unwrap()
                .and_hms_opt(1, 0, 0)
                .unwrap()
        );
        assert_eq!(
            series.metric("temperature_2m").unwrap().values,
            vec![Some(5.0), Some(4.5)]
        );
        assert_eq!(
            series.metric("precipitation").unwrap().values,
            vec![Some(0.0), None]
        );
    }

    #[test]
    fn test_parse_daily_payload() {
        let body = r#"{
            "latitude": 27.7, "longitude": 85.3, "timezone": "Asia/Kathmandu",
            "daily": {
                "time": ["2025-12-01", "2025-12-02"],
                "temperature_2m_max": [19.1, 18.4],
                "temperature_2m_min": [4.2, 3.9],
                "precipitation_sum": [0.0, 1.2]
            }
        }"#;
        let series = parse_daily(
            body,
            &["temperature_2m_max", "temperature_2m_min", "precipitation_sum"],
        )
        .unwrap();

        assert_eq!(series.timestamps[0], NaiveDate::from_ymd_opt(2025, 12, 1).unwrap());
        assert_eq!(series.metrics.len(), 3);
        assert_eq!(series.value("precipitation_sum", 1), Some(1.2));
    }

    #[test]
    fn test_repeated_variable_is_parsed_once() {
        let series =
            parse_hourly(HOURLY_BODY, &["temperature_2m", "temperature_2m", "precipitation"])
                .unwrap();

        assert_eq!(series.metrics.len(), 2);
        assert_eq!(series.value("temperature_2m", 0), Some(5.0));
    }

    #[test]
    fn test_missing_block_is_structural_error() {
        let body = r#"{"latitude": 27.7, "longitude": 85.3}"#;
        let err = parse_hourly(body, &["temperature_2m"]).unwrap_err();
        assert!(matches!(err, EtlError::MissingField(f) if f == "hourly"));
    }

    #[test]
    fn test_missing_variable_is_structural_error() {
        let err = parse_hourly(HOURLY_BODY, &["temperature_2m", "wind_speed_10m"]).unwrap_err();
        assert!(matches!(err, EtlError::MissingField(f) if f == "hourly.wind_speed_10m"));
    }

    #[test]
    fn test_unequal_lengths_rejected() {
        let body = r#"{"latitude": 1.0, "longitude": 2.0, "hourly": {
            "time": ["2025-12-01T00:00", "2025-12-01T01:00"],
            "temperature_2m": [5.0]
        }}"#;
        let err = parse_hourly(body, &["temperature_2m"]).unwrap_err();
        assert!(matches!(
            err,
            EtlError::MisalignedSeries { expected: 2, actual: 1, .. }
        ));
    }

    #[test]
    fn test_bad_timestamp_rejected() {
        let body = r#"{"latitude": 1.0, "longitude": 2.0, "hourly": {
            "time": ["yesterday"], "temperature_2m": [5.0]
        }}"#;
        let err = parse_hourly(body, &["temperature_2m"]).unwrap_err();
        assert!(matches!(err, EtlError::TimestampParse { value, .. } if value == "yesterday"));
    }

    #[test]
    fn test_malformed_json_rejected() {
        assert!(matches!(
            parse_hourly("{not json", &[]),
            Err(EtlError::Json(_))
        ));
    }

    #[test]
    fn test_api_error_reason() {
        let body = r#"{"error": true, "reason": "Latitude must be in range of -90 to 90°."}"#;
        assert_eq!(
            api_error_reason(body).as_deref(),
            Some("Latitude must be in range of -90 to 90°.")
        );
        assert_eq!(api_error_reason(HOURLY_BODY), None);
    }
}

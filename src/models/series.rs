use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Values of one requested forecast variable, index-aligned with the timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSeries {
    pub variable: String,
    pub values: Vec<Option<f64>>,
}

impl MetricSeries {
    pub fn new(variable: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self {
            variable: variable.into(),
            values,
        }
    }
}

/// Parallel-array time series as returned by the forecast API.
///
/// `latitude`/`longitude` are the grid coordinates echoed back by the API,
/// which may differ slightly from the requested ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries<T> {
    pub latitude: f64,
    pub longitude: f64,
    pub timestamps: Vec<T>,
    pub metrics: Vec<MetricSeries>,
}

pub type HourlySeries = TimeSeries<NaiveDateTime>;
pub type DailySeries = TimeSeries<NaiveDate>;

impl<T> TimeSeries<T> {
    pub fn new(latitude: f64, longitude: f64, timestamps: Vec<T>) -> Self {
        Self {
            latitude,
            longitude,
            timestamps,
            metrics: Vec::new(),
        }
    }

    pub fn with_metric(mut self, variable: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        self.metrics.push(MetricSeries::new(variable, values));
        self
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn metric(&self, variable: &str) -> Option<&MetricSeries> {
        self.metrics.iter().find(|m| m.variable == variable)
    }

    /// Value of `variable` at `index`; `None` for a null reading or an unknown variable.
    pub fn value(&self, variable: &str, index: usize) -> Option<f64> {
        self.metric(variable)
            .and_then(|m| m.values.get(index).copied().flatten())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_series_lookup() {
        let date = NaiveDate::from_ymd_opt(2025, 12, 1).unwrap();
        let series = DailySeries::new(27.7, 85.3, vec![date, date.succ_opt().unwrap()])
            .with_metric("temperature_2m_max", vec![Some(18.2), None]);

        assert_eq!(series.len(), 2);
        assert!(!series.is_empty());
        assert_eq!(series.value("temperature_2m_max", 0), Some(18.2));
        assert_eq!(series.value("temperature_2m_max", 1), None);
        assert_eq!(series.value("precipitation_sum", 0), None);
        assert!(series.metric("precipitation_sum").is_none());
    }
}

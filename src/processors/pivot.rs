use crate::error::Result;
use crate::models::{
    FactRow, HourlySeries, MetricBinding, MetricCatalog, StagingColumn, StagingRow, SurrogateKey,
};

/// Which wide staging column feeds a catalog metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PivotColumn {
    Mapped(StagingColumn),
    /// Catalog metric with no staging column: loaded as a NULL-valued fact row.
    Unmapped,
}

/// Metric name -> staging column mapping used by the wide-to-long transform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PivotMapping {
    entries: Vec<(String, StagingColumn)>,
}

impl PivotMapping {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn with(mut self, metric_name: impl Into<String>, column: StagingColumn) -> Self {
        self.entries.push((metric_name.into(), column));
        self
    }

    /// Each staging column under the metric name of the same spelling.
    pub fn daily() -> Self {
        StagingColumn::ALL
            .iter()
            .fold(Self::new(), |mapping, column| {
                mapping.with(column.column_name(), *column)
            })
    }

    pub fn column_for(&self, metric_name: &str) -> PivotColumn {
        self.entries
            .iter()
            .find(|(name, _)| name == metric_name)
            .map(|(_, column)| PivotColumn::Mapped(*column))
            .unwrap_or(PivotColumn::Unmapped)
    }

    pub fn value_for(&self, metric_name: &str, row: &StagingRow) -> Option<f64> {
        match self.column_for(metric_name) {
            PivotColumn::Mapped(column) => row.value(column),
            PivotColumn::Unmapped => None,
        }
    }

    pub fn entries(&self) -> &[(String, StagingColumn)] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for PivotMapping {
    fn default() -> Self {
        Self::daily()
    }
}

/// A configured API variable with its resolved `dim_metric` key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundMetric {
    pub variable: String,
    pub metric_key: SurrogateKey,
}

/// Resolve every binding against the catalog, failing on the first unknown metric.
pub fn bind_metrics(
    bindings: &[MetricBinding],
    catalog: &MetricCatalog,
) -> Result<Vec<BoundMetric>> {
    bindings
        .iter()
        .map(|binding| {
            Ok(BoundMetric {
                variable: binding.variable.clone(),
                metric_key: catalog.key_for(&binding.metric)?,
            })
        })
        .collect()
}

/// Wide-to-long for the hourly series: one row per (timestamp, metric), time-major.
///
/// `time_keys[i]` is the resolved key of `series.timestamps[i]`.
pub fn build_fact_rows(
    series: &HourlySeries,
    location_key: SurrogateKey,
    time_keys: &[SurrogateKey],
    metrics: &[BoundMetric],
) -> Vec<FactRow> {
    let mut rows = Vec::with_capacity(time_keys.len() * metrics.len());

    for (index, time_key) in time_keys.iter().enumerate() {
        for metric in metrics {
            rows.push(FactRow::new(
                *time_key,
                location_key,
                metric.metric_key,
                series.value(&metric.variable, index),
            ));
        }
    }

    rows
}

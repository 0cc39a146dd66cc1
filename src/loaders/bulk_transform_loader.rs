use async_trait::async_trait;
use tracing::info;

use crate::error::Result;
use crate::loaders::{finish_session, LoadReport, Loader, RunStage};
use crate::models::{DailySeries, StagingRow};
use crate::processors::PivotMapping;
use crate::settings::DailyConfig;
use crate::utils::constants::DEFAULT_BATCH_SIZE;
use crate::warehouse::{Warehouse, WarehouseSession};

/// Daily pipeline: land wide rows in staging, then rebuild the star schema set-based.
#[derive(Debug, Clone)]
pub struct BulkTransformLoader {
    location_name: String,
    pivot: PivotMapping,
    batch_size: usize,
}

impl BulkTransformLoader {
    pub fn new(location_name: impl Into<String>) -> Self {
        Self {
            location_name: location_name.into(),
            pivot: PivotMapping::daily(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn from_config(config: &DailyConfig) -> Self {
        Self::new(config.location_name.clone()).with_batch_size(config.batch_size)
    }

    pub fn with_pivot(mut self, pivot: PivotMapping) -> Self {
        self.pivot = pivot;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    async fn transform<S: WarehouseSession>(
        &self,
        session: &mut S,
        mut report: LoadReport,
    ) -> Result<LoadReport> {
        session.register_staged_dimensions().await?;
        report.stage = RunStage::DimensionsResolved;

        session.truncate_facts().await?;
        report.facts_inserted = session.pivot_staged_facts(&self.pivot).await?;
        report.stage = RunStage::FactsLoaded;
        info!(facts = report.facts_inserted, "Fact table rebuilt from staging");

        Ok(report)
    }
}

#[async_trait]
impl Loader for BulkTransformLoader {
    type Input = DailySeries;

    fn name(&self) -> &'static str {
        "bulk-transform"
    }

    async fn load<W: Warehouse>(&self, warehouse: &W, series: &DailySeries) -> Result<LoadReport> {
        let rows = StagingRow::from_daily_series(&self.location_name, series)?;

        // Committed on its own; survives a failure in the transform below
        let staged_rows = warehouse.replace_staging(&rows, self.batch_size).await?;

        let report = LoadReport {
            stage: RunStage::Extracted,
            source_records: series.len(),
            staged_rows,
            ..LoadReport::default()
        };

        let mut session = warehouse.begin().await?;
        let outcome = self.transform(&mut session, report).await;
        finish_session(session, outcome).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MetricCatalog, StagingColumn};
    use crate::warehouse::MemoryWarehouse;
    use chrono::NaiveDate;

    fn series() -> DailySeries {
        let d1 = NaiveDate::from_ymd_opt(2025, 12, 1).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2025, 12, 2).unwrap();
        DailySeries::new(27.7, 85.3, vec![d1, d2])
            .with_metric("temperature_2m_max", vec![Some(19.1), Some(18.4)])
            .with_metric("temperature_2m_min", vec![Some(4.2), Some(3.9)])
            .with_metric("precipitation_sum", vec![Some(0.0), Some(1.2)])
    }

    #[tokio::test]
    async fn test_custom_pivot_leaves_other_metrics_null() {
        let catalog: MetricCatalog = [("tmax", 1), ("rain", 2)].into_iter().collect();
        let warehouse = MemoryWarehouse::with_catalog(catalog);
        let loader = BulkTransformLoader::new("Kathmandu")
            .with_pivot(PivotMapping::new().with("tmax", StagingColumn::TempMax));

        let report = loader.load(&warehouse, &series()).await.unwrap();

        assert_eq!(report.facts_inserted, 4);
        let facts = warehouse.snapshot().facts;
        let rain: Vec<_> = facts.iter().filter(|f| f.metric_key == 2).collect();
        assert_eq!(rain.len(), 2);
        assert!(rain.iter().all(|f| f.value.is_none()));
    }

    #[tokio::test]
    async fn test_report_tracks_staging_and_stage() {
        let catalog: MetricCatalog = StagingColumn::ALL
            .iter()
            .enumerate()
            .map(|(i, c)| (c.column_name(), i as i32 + 1))
            .collect();
        let warehouse = MemoryWarehouse::with_catalog(catalog);

        let report = BulkTransformLoader::new("Kathmandu")
            .load(&warehouse, &series())
            .await
            .unwrap();

        assert_eq!(report.stage, RunStage::Committed);
        assert_eq!(report.staged_rows, 2);
        assert_eq!(report.facts_inserted, 6);
    }
}

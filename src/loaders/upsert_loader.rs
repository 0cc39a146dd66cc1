use async_trait::async_trait;
use tracing::info;

use crate::error::Result;
use crate::loaders::{finish_session, LoadReport, Loader, RunStage};
use crate::models::{FactWritePolicy, HourlySeries, LocationKey, MetricBinding, TimeKey};
use crate::processors::{bind_metrics, build_fact_rows, TimeKeyCache};
use crate::settings::HourlyConfig;
use crate::utils::constants::DEFAULT_BATCH_SIZE;
use crate::warehouse::{Warehouse, WarehouseSession};

/// Hourly pipeline: resolve each dimension key with an upsert, then insert long fact rows.
#[derive(Debug, Clone)]
pub struct UpsertLoader {
    metrics: Vec<MetricBinding>,
    policy: FactWritePolicy,
    batch_size: usize,
}

impl UpsertLoader {
    pub fn new(metrics: Vec<MetricBinding>) -> Self {
        Self {
            metrics,
            policy: FactWritePolicy::default(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn from_config(config: &HourlyConfig) -> Self {
        Self::new(config.metrics.clone())
            .with_policy(config.fact_policy)
            .with_batch_size(config.batch_size)
    }

    pub fn with_policy(mut self, policy: FactWritePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn policy(&self) -> FactWritePolicy {
        self.policy
    }

    async fn load_in<S: WarehouseSession>(
        &self,
        session: &mut S,
        series: &HourlySeries,
    ) -> Result<LoadReport> {
        let mut report = LoadReport {
            stage: RunStage::Extracted,
            source_records: series.len(),
            ..LoadReport::default()
        };

        // Every configured metric must be in the catalog before anything is written
        let catalog = session.read_metric_catalog().await?;
        let metrics = bind_metrics(&self.metrics, &catalog)?;

        let location = LocationKey::coordinates(series.latitude, series.longitude);
        let location_key = session.resolve_location(&location).await?;

        let mut cache = TimeKeyCache::new();
        let mut time_keys = Vec::with_capacity(series.len());
        for timestamp in &series.timestamps {
            time_keys.push(cache.resolve(session, TimeKey::hour_of(*timestamp)).await?);
        }
        report.time_keys = cache.len();
        report.stage = RunStage::DimensionsResolved;
        info!(
            time_keys = cache.len(),
            cache_hits = cache.hits(),
            "Dimensions resolved"
        );

        let rows = build_fact_rows(series, location_key, &time_keys, &metrics);
        for batch in rows.chunks(self.batch_size) {
            if self.policy == FactWritePolicy::ReplaceByKey {
                report.facts_deleted += session.delete_facts(batch).await?;
            }
            report.facts_inserted += session.insert_facts(batch).await?;
        }
        report.stage = RunStage::FactsLoaded;
        info!(
            policy = %self.policy,
            inserted = report.facts_inserted,
            deleted = report.facts_deleted,
            "Facts loaded"
        );

        Ok(report)
    }
}

#[async_trait]
impl Loader for UpsertLoader {
    type Input = HourlySeries;

    fn name(&self) -> &'static str {
        "upsert"
    }

    async fn load<W: Warehouse>(&self, warehouse: &W, series: &HourlySeries) -> Result<LoadReport> {
        let mut session = warehouse.begin().await?;
        let outcome = self.load_in(&mut session, series).await;
        finish_session(session, outcome).await
    }
}

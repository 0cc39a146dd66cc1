pub mod bulk_transform_loader;
pub mod upsert_loader;

pub use bulk_transform_loader::BulkTransformLoader;
pub use upsert_loader::UpsertLoader;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::Result;
use crate::warehouse::{Warehouse, WarehouseSession};

/// Linear progress of one run. Any failure aborts at the current stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum RunStage {
    #[default]
    Start,
    Connected,
    Extracted,
    DimensionsResolved,
    FactsLoaded,
    Committed,
}

impl std::fmt::Display for RunStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RunStage::Start => "start",
            RunStage::Connected => "connected",
            RunStage::Extracted => "extracted",
            RunStage::DimensionsResolved => "dimensions-resolved",
            RunStage::FactsLoaded => "facts-loaded",
            RunStage::Committed => "committed",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub stage: RunStage,
    /// Timestamps or days received from the extractor.
    pub source_records: usize,
    pub staged_rows: u64,
    /// Distinct time keys resolved by the upsert pipeline.
    pub time_keys: usize,
    pub facts_deleted: u64,
    pub facts_inserted: u64,
}

impl LoadReport {
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "Stage: {}\nSource records: {}\n",
            self.stage, self.source_records
        );
        if self.staged_rows > 0 {
            summary.push_str(&format!("Staged rows: {}\n", self.staged_rows));
        }
        if self.time_keys > 0 {
            summary.push_str(&format!("Time keys: {}\n", self.time_keys));
        }
        if self.facts_deleted > 0 {
            summary.push_str(&format!("Facts replaced: {}\n", self.facts_deleted));
        }
        summary.push_str(&format!("Facts inserted: {}", self.facts_inserted));
        summary
    }
}

/// A pipeline shape that moves one extracted input into the warehouse.
#[async_trait]
pub trait Loader: Send + Sync {
    type Input: Sync;

    fn name(&self) -> &'static str;

    async fn load<W: Warehouse>(&self, warehouse: &W, input: &Self::Input) -> Result<LoadReport>;
}

/// Commit on success; on failure roll back and return the original error.
pub(crate) async fn finish_session<S: WarehouseSession>(
    session: S,
    outcome: Result<LoadReport>,
) -> Result<LoadReport> {
    match outcome {
        Ok(mut report) => {
            session.commit().await?;
            report.stage = RunStage::Committed;
            info!(
                facts = report.facts_inserted,
                deleted = report.facts_deleted,
                "Transaction committed"
            );
            Ok(report)
        }
        Err(err) => {
            if let Err(rollback_err) = session.rollback().await {
                warn!(error = %rollback_err, "Rollback failed");
            }
            Err(err)
        }
    }
}

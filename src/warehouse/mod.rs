pub mod connector;
pub mod memory;
pub mod postgres;
pub mod schema;

pub use connector::{connect_with_retry, is_unavailable};
pub use memory::{MemorySession, MemoryState, MemoryWarehouse};
pub use postgres::{PgSession, PgWarehouse};
pub use schema::StarSchema;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{FactRow, LocationKey, MetricCatalog, StagingRow, SurrogateKey, TimeKey};
use crate::processors::PivotMapping;

/// Idempotent natural key -> surrogate key resolution.
#[async_trait]
pub trait DimensionResolver: Send {
    async fn resolve_location(&mut self, key: &LocationKey) -> Result<SurrogateKey>;

    async fn resolve_time(&mut self, key: &TimeKey) -> Result<SurrogateKey>;
}

#[async_trait]
pub trait CatalogReader: Send {
    /// Bulk read of the pre-seeded `dim_metric` table.
    async fn read_metric_catalog(&mut self) -> Result<MetricCatalog>;
}

#[async_trait]
pub trait FactWriter: Send {
    async fn insert_facts(&mut self, rows: &[FactRow]) -> Result<u64>;

    /// Remove existing facts sharing a composite key with any of `rows`.
    async fn delete_facts(&mut self, rows: &[FactRow]) -> Result<u64>;

    async fn truncate_facts(&mut self) -> Result<()>;
}

/// Set-based transform of the staging table into the star schema.
#[async_trait]
pub trait StagedTransform: Send {
    /// Insert staged locations and dates missing from their dimensions; keys are not returned.
    async fn register_staged_dimensions(&mut self) -> Result<()>;

    /// Cross staged rows with the metric catalog, one fact row per pair.
    async fn pivot_staged_facts(&mut self, pivot: &PivotMapping) -> Result<u64>;
}

/// One transaction against the warehouse. Dropping without commit discards the work.
#[async_trait]
pub trait WarehouseSession:
    DimensionResolver + CatalogReader + FactWriter + StagedTransform
{
    async fn commit(self) -> Result<()>;

    async fn rollback(self) -> Result<()>;
}

#[async_trait]
pub trait Warehouse: Send + Sync {
    type Session: WarehouseSession;

    async fn begin(&self) -> Result<Self::Session>;

    /// Replace the staging table contents, committed on its own.
    async fn replace_staging(&self, rows: &[StagingRow], batch_size: usize) -> Result<u64>;
}

pub mod dimension;
pub mod fact;
pub mod metric;
pub mod series;
pub mod staging;

pub use dimension::{LocationKey, SurrogateKey, TimeKey};
pub use fact::{FactRow, FactWritePolicy};
pub use metric::{MetricBinding, MetricCatalog};
pub use series::{DailySeries, HourlySeries, MetricSeries, TimeSeries};
pub use staging::{StagingColumn, StagingRow};

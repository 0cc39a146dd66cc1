pub mod key_cache;
pub mod pivot;

pub use key_cache::TimeKeyCache;
pub use pivot::{bind_metrics, build_fact_rows, BoundMetric, PivotColumn, PivotMapping};

use serde::{Deserialize, Serialize};

use crate::models::SurrogateKey;

/// One long-format measurement: a fully keyed (time, location, metric) value.
///
/// `value` is passed through from the source untouched, nulls included.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FactRow {
    pub time_key: SurrogateKey,
    pub location_key: SurrogateKey,
    pub metric_key: SurrogateKey,
    pub value: Option<f64>,
}

impl FactRow {
    pub fn new(
        time_key: SurrogateKey,
        location_key: SurrogateKey,
        metric_key: SurrogateKey,
        value: Option<f64>,
    ) -> Self {
        Self {
            time_key,
            location_key,
            metric_key,
            value,
        }
    }

    pub fn composite_key(&self) -> (SurrogateKey, SurrogateKey, SurrogateKey) {
        (self.time_key, self.location_key, self.metric_key)
    }
}

/// How the upsert pipeline treats facts already loaded by an earlier run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum FactWritePolicy {
    /// Insert every row; re-running a window duplicates its facts.
    #[default]
    Append,
    /// Delete facts sharing a (time, location, metric) key with this run before inserting.
    ReplaceByKey,
}

impl std::fmt::Display for FactWritePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FactWritePolicy::Append => write!(f, "append"),
            FactWritePolicy::ReplaceByKey => write!(f, "replace-by-key"),
        }
    }
}

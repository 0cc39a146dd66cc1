use std::collections::HashMap;
use tracing::debug;

use crate::error::Result;
use crate::models::{SurrogateKey, TimeKey};
use crate::warehouse::DimensionResolver;

/// Per-run memo of resolved time keys so each distinct key hits the warehouse once.
#[derive(Debug, Default)]
pub struct TimeKeyCache {
    keys: HashMap<TimeKey, SurrogateKey>,
    hits: usize,
}

impl TimeKeyCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn resolve<R>(&mut self, resolver: &mut R, key: TimeKey) -> Result<SurrogateKey>
    where
        R: DimensionResolver + ?Sized,
    {
        if let Some(existing) = self.keys.get(&key) {
            self.hits += 1;
            return Ok(*existing);
        }

        let surrogate = resolver.resolve_time(&key).await?;
        debug!(time = %key, key = surrogate, "Resolved time dimension");
        self.keys.insert(key, surrogate);
        Ok(surrogate)
    }

    /// Distinct keys resolved so far.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn hits(&self) -> usize {
        self.hits
    }
}

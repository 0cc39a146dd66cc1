use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::Result;
use crate::models::{FactRow, LocationKey, MetricCatalog, StagingRow, SurrogateKey, TimeKey};
use crate::processors::PivotMapping;
use crate::warehouse::{
    CatalogReader, DimensionResolver, FactWriter, StagedTransform, Warehouse, WarehouseSession,
};

/// Full contents of an in-memory warehouse.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryState {
    pub locations: Vec<(LocationKey, SurrogateKey)>,
    pub times: BTreeMap<TimeKey, SurrogateKey>,
    pub metrics: MetricCatalog,
    pub facts: Vec<FactRow>,
    pub staging: Vec<StagingRow>,
    next_location: SurrogateKey,
    next_time: SurrogateKey,
}

impl MemoryState {
    fn location_key(&self, key: &LocationKey) -> Option<SurrogateKey> {
        self.locations
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, surrogate)| *surrogate)
    }

    fn upsert_location(&mut self, key: &LocationKey) -> SurrogateKey {
        if let Some(existing) = self.location_key(key) {
            return existing;
        }
        self.next_location += 1;
        self.locations.push((key.clone(), self.next_location));
        self.next_location
    }

    fn upsert_time(&mut self, key: &TimeKey) -> SurrogateKey {
        if let Some(existing) = self.times.get(key) {
            return *existing;
        }
        self.next_time += 1;
        self.times.insert(*key, self.next_time);
        self.next_time
    }
}

/// Warehouse held in process memory, used for dry runs and tests.
///
/// A session works on a snapshot that replaces the shared state only on commit.
#[derive(Debug, Clone, Default)]
pub struct MemoryWarehouse {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryWarehouse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a pre-seeded `dim_metric`.
    pub fn with_catalog(metrics: MetricCatalog) -> Self {
        let state = MemoryState {
            metrics,
            ..MemoryState::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn snapshot(&self) -> MemoryState {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        lock_state(&self.state)
    }
}

fn lock_state(state: &Mutex<MemoryState>) -> MutexGuard<'_, MemoryState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct MemorySession {
    shared: Arc<Mutex<MemoryState>>,
    working: MemoryState,
}

#[async_trait]
impl Warehouse for MemoryWarehouse {
    type Session = MemorySession;

    async fn begin(&self) -> Result<MemorySession> {
        Ok(MemorySession {
            shared: Arc::clone(&self.state),
            working: self.snapshot(),
        })
    }

    async fn replace_staging(&self, rows: &[StagingRow], _batch_size: usize) -> Result<u64> {
        let mut state = self.lock();
        state.staging = rows.to_vec();
        Ok(rows.len() as u64)
    }
}

#[async_trait]
impl DimensionResolver for MemorySession {
    async fn resolve_location(&mut self, key: &LocationKey) -> Result<SurrogateKey> {
        Ok(self.working.upsert_location(key))
    }

    async fn resolve_time(&mut self, key: &TimeKey) -> Result<SurrogateKey> {
        Ok(self.working.upsert_time(key))
    }
}

#[async_trait]
impl CatalogReader for MemorySession {
    async fn read_metric_catalog(&mut self) -> Result<MetricCatalog> {
        Ok(self.working.metrics.clone())
    }
}

#[async_trait]
impl FactWriter for MemorySession {
    async fn insert_facts(&mut self, rows: &[FactRow]) -> Result<u64> {
        self.working.facts.extend_from_slice(rows);
        Ok(rows.len() as u64)
    }

    async fn delete_facts(&mut self, rows: &[FactRow]) -> Result<u64> {
        let before = self.working.facts.len();
        self.working.facts.retain(|fact| {
            !rows
                .iter()
                .any(|row| row.composite_key() == fact.composite_key())
        });
        Ok((before - self.working.facts.len()) as u64)
    }

    async fn truncate_facts(&mut self) -> Result<()> {
        self.working.facts.clear();
        Ok(())
    }
}

#[async_trait]
impl StagedTransform for MemorySession {
    async fn register_staged_dimensions(&mut self) -> Result<()> {
        let staged: Vec<(LocationKey, TimeKey)> = self
            .working
            .staging
            .iter()
            .map(|row| {
                (
                    LocationKey::named(row.location.clone()),
                    TimeKey::Day(row.weather_date),
                )
            })
            .collect();

        for (location, date) in &staged {
            self.working.upsert_location(location);
            self.working.upsert_time(date);
        }
        Ok(())
    }

    async fn pivot_staged_facts(&mut self, pivot: &PivotMapping) -> Result<u64> {
        let mut facts = Vec::new();

        for row in &self.working.staging {
            let location = self
                .working
                .location_key(&LocationKey::named(row.location.clone()));
            let date = self.working.times.get(&TimeKey::Day(row.weather_date));

            // Inner join: unregistered rows produce nothing
            let (Some(location_key), Some(time_key)) = (location, date) else {
                continue;
            };

            for (metric_name, metric_key) in self.working.metrics.iter() {
                facts.push(FactRow::new(
                    *time_key,
                    location_key,
                    metric_key,
                    pivot.value_for(metric_name, row),
                ));
            }
        }

        let inserted = facts.len() as u64;
        self.working.facts.extend(facts);
        Ok(inserted)
    }
}

#[async_trait]
impl WarehouseSession for MemorySession {
    async fn commit(self) -> Result<()> {
        let mut shared = lock_state(&self.shared);
        // Keep staging written by an independent commit since this session began
        let staging = std::mem::take(&mut shared.staging);
        *shared = MemoryState {
            staging,
            ..self.working
        };
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn catalog() -> MetricCatalog {
        [("temperature", 1), ("precipitation", 2)].into_iter().collect()
    }

    #[tokio::test]
    async fn test_resolution_is_idempotent_across_sessions() {
        let warehouse = MemoryWarehouse::with_catalog(catalog());
        let key = LocationKey::coordinates(27.7, 85.32);

        let mut first = warehouse.begin().await.unwrap();
        let a = first.resolve_location(&key).await.unwrap();
        first.commit().await.unwrap();

        let mut second = warehouse.begin().await.unwrap();
        let b = second.resolve_location(&key).await.unwrap();
        second.commit().await.unwrap();

        assert_eq!(a, b);
        assert_eq!(warehouse.snapshot().locations.len(), 1);
    }

    #[tokio::test]
    async fn test_rollback_discards_session_writes() {
        let warehouse = MemoryWarehouse::with_catalog(catalog());

        let mut session = warehouse.begin().await.unwrap();
        let location = session
            .resolve_location(&LocationKey::named("Kathmandu"))
            .await
            .unwrap();
        session
            .insert_facts(&[FactRow::new(1, location, 1, Some(2.0))])
            .await
            .unwrap();
        session.rollback().await.unwrap();

        let state = warehouse.snapshot();
        assert!(state.locations.is_empty());
        assert!(state.facts.is_empty());
    }

    #[tokio::test]
    async fn test_staging_survives_transform_commit() {
        let warehouse = MemoryWarehouse::with_catalog(catalog());
        let row = StagingRow {
            location: "Kathmandu".to_string(),
            weather_date: NaiveDate::from_ymd_opt(2025, 12, 1).unwrap(),
            temp_max: Some(19.0),
            temp_min: Some(4.0),
            precipitation: None,
        };

        warehouse.replace_staging(&[row], 100).await.unwrap();
        let session = warehouse.begin().await.unwrap();
        session.commit().await.unwrap();

        assert_eq!(warehouse.snapshot().staging.len(), 1);
    }
}

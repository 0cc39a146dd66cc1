use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

use crate::error::{EtlError, Result};
use crate::models::SurrogateKey;

/// Pairs a forecast API variable with the `dim_metric` name it is loaded as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct MetricBinding {
    #[validate(length(min = 1))]
    pub variable: String,

    #[validate(length(min = 1))]
    pub metric: String,
}

impl MetricBinding {
    pub fn new(variable: impl Into<String>, metric: impl Into<String>) -> Self {
        Self {
            variable: variable.into(),
            metric: metric.into(),
        }
    }
}

/// Read-only `metric_name -> metric_key` mapping, loaded once per run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricCatalog {
    keys: BTreeMap<String, SurrogateKey>,
}

impl MetricCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, key: SurrogateKey) {
        self.keys.insert(name.into(), key);
    }

    pub fn get(&self, name: &str) -> Option<SurrogateKey> {
        self.keys.get(name).copied()
    }

    /// Key for `name`, failing the run when the metric was never registered.
    pub fn key_for(&self, name: &str) -> Result<SurrogateKey> {
        self.get(name).ok_or_else(|| EtlError::MetricKey {
            name: name.to_string(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, SurrogateKey)> {
        self.keys.iter().map(|(name, key)| (name.as_str(), *key))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, SurrogateKey)> for MetricCatalog {
    fn from_iter<I: IntoIterator<Item = (S, SurrogateKey)>>(iter: I) -> Self {
        Self {
            keys: iter
                .into_iter()
                .map(|(name, key)| (name.into(), key))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_lookup() {
        let catalog: MetricCatalog = [("temperature", 1), ("precipitation", 2)]
            .into_iter()
            .collect();

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.key_for("precipitation").unwrap(), 2);
        assert!(matches!(
            catalog.key_for("wind_speed"),
            Err(EtlError::MetricKey { name }) if name == "wind_speed"
        ));
    }

    #[test]
    fn test_binding_validation() {
        assert!(MetricBinding::new("temperature_2m", "temperature")
            .validate()
            .is_ok());
        assert!(MetricBinding::new("", "temperature").validate().is_err());
    }
}

use chrono::NaiveDateTime;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgConnectOptions;
use std::env;
use std::path::Path;
use std::time::Duration;
use validator::{Validate, ValidationError};

use crate::error::Result;
use crate::models::{FactWritePolicy, MetricBinding, StagingColumn};
use crate::utils::constants::*;
use crate::utils::RetryPolicy;

/// Runtime configuration, built once at start-up and handed to every component.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct EtlConfig {
    #[validate(nested)]
    pub retry: RetryConfig,

    #[validate(nested)]
    pub http: HttpConfig,

    #[validate(nested)]
    pub hourly: HourlyConfig,

    #[validate(nested)]
    pub daily: DailyConfig,
}

impl EtlConfig {
    /// Layer built-in defaults, a TOML file and `WEATHER_ETL__*` environment variables.
    ///
    /// An explicit `path` must exist; otherwise `weather-etl.toml` in the working
    /// directory is read when present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => File::from(p).required(true),
            None => File::from(Path::new(DEFAULT_CONFIG_FILE)).required(false),
        };

        let settings = Config::builder()
            .add_source(Config::try_from(&EtlConfig::default())?)
            .add_source(file)
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: EtlConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Copy safe to print: database passwords are masked.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        copy.hourly.database.password = "********".to_string();
        copy.daily.database.password = "********".to_string();
        copy
    }

    pub fn to_pretty_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RetryConfig {
    #[validate(range(min = 1))]
    pub max_attempts: u32,

    pub delay_secs: u64,
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_secs(self.delay_secs))
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_CONNECT_ATTEMPTS,
            delay_secs: DEFAULT_CONNECT_DELAY_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct HttpConfig {
    #[validate(length(min = 1))]
    pub base_url: String,

    #[validate(range(min = 1))]
    pub timeout_secs: u64,
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: OPEN_METEO_FORECAST_URL.to_string(),
            timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Validate)]
pub struct DatabaseConfig {
    #[validate(length(min = 1))]
    pub host: String,

    pub port: u16,

    #[validate(length(min = 1))]
    pub user: String,

    pub password: String,

    #[validate(length(min = 1))]
    pub dbname: String,

    #[validate(range(min = 1))]
    pub acquire_timeout_secs: u64,

    #[validate(range(min = 1))]
    pub statement_timeout_secs: u64,
}

impl DatabaseConfig {
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.dbname)
            .application_name("weather-etl")
            .options([(
                "statement_timeout",
                format!("{}s", self.statement_timeout_secs),
            )])
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    fn with_defaults(host: &str, user: String, password: String, dbname: String) -> Self {
        Self {
            host: host.to_string(),
            port: 5432,
            user,
            password,
            dbname,
            acquire_timeout_secs: DEFAULT_ACQUIRE_TIMEOUT_SECS,
            statement_timeout_secs: DEFAULT_STATEMENT_TIMEOUT_SECS,
        }
    }
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"********")
            .field("dbname", &self.dbname)
            .field("acquire_timeout_secs", &self.acquire_timeout_secs)
            .field("statement_timeout_secs", &self.statement_timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_window"))]
pub struct HourlyApiConfig {
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,

    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,

    /// UTC start of the requested window
    pub start: NaiveDateTime,

    /// UTC end of the requested window
    pub end: NaiveDateTime,
}

fn validate_window(api: &HourlyApiConfig) -> std::result::Result<(), ValidationError> {
    if api.start > api.end {
        return Err(ValidationError::new("start_after_end"));
    }
    Ok(())
}

impl Default for HourlyApiConfig {
    fn default() -> Self {
        Self {
            latitude: HOURLY_LATITUDE,
            longitude: HOURLY_LONGITUDE,
            start: parse_window_bound(HOURLY_WINDOW_START),
            end: parse_window_bound(HOURLY_WINDOW_END),
        }
    }
}

fn parse_window_bound(value: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S").unwrap_or_default()
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct HourlyConfig {
    #[validate(nested)]
    pub database: DatabaseConfig,

    #[validate(nested)]
    pub api: HourlyApiConfig,

    /// API variable to `dim_metric` name, in fact-row order
    #[validate(length(min = 1), nested)]
    pub metrics: Vec<MetricBinding>,

    pub fact_policy: FactWritePolicy,

    #[validate(range(min = 1, max = 10000))]
    pub batch_size: usize,
}

impl HourlyConfig {
    /// Distinct API variables in binding order. One variable may feed several metrics.
    pub fn variables(&self) -> Vec<&str> {
        let mut variables: Vec<&str> = Vec::with_capacity(self.metrics.len());
        for binding in &self.metrics {
            if !variables.contains(&binding.variable.as_str()) {
                variables.push(binding.variable.as_str());
            }
        }
        variables
    }
}

impl Default for HourlyConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::with_defaults(
                "postgres",
                "myuser".to_string(),
                "mypassword".to_string(),
                "mydb".to_string(),
            ),
            api: HourlyApiConfig::default(),
            metrics: vec![
                MetricBinding::new("temperature_2m", "temperature"),
                MetricBinding::new("precipitation", "precipitation"),
            ],
            fact_policy: FactWritePolicy::Append,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DailyApiConfig {
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,

    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,

    #[validate(length(min = 1))]
    pub timezone: String,
}

impl DailyApiConfig {
    pub fn variables(&self) -> Vec<&'static str> {
        StagingColumn::ALL
            .iter()
            .map(|c| c.source_variable())
            .collect()
    }
}

impl Default for DailyApiConfig {
    fn default() -> Self {
        Self {
            latitude: DAILY_LATITUDE,
            longitude: DAILY_LONGITUDE,
            timezone: DAILY_TIMEZONE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DailyConfig {
    #[validate(nested)]
    pub database: DatabaseConfig,

    #[validate(nested)]
    pub api: DailyApiConfig,

    /// Symbolic name stored in `ods_weather.location` and `dim_location.location`
    #[validate(length(min = 1))]
    pub location_name: String,

    #[validate(range(min = 1, max = 10000))] // 5 binds per staging row stay under 65535
    pub batch_size: usize,
}

impl Default for DailyConfig {
    fn default() -> Self {
        // The warehouse deployment exports its credentials as DW_*
        Self {
            database: DatabaseConfig::with_defaults(
                "dw_postgres",
                env::var("DW_USER").unwrap_or_else(|_| "dw_user".to_string()),
                env::var("DW_PASSWORD").unwrap_or_default(),
                env::var("DW_DB").unwrap_or_else(|_| "dw".to_string()),
            ),
            api: DailyApiConfig::default(),
            location_name: DAILY_LOCATION_NAME.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EtlError;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn toml_file() -> std::io::Result<NamedTempFile> {
        tempfile::Builder::new().suffix(".toml").tempfile()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = EtlConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.retry.policy().max_attempts, 10);
        assert_eq!(config.retry.policy().delay, Duration::from_secs(3));
        assert_eq!(config.hourly.variables(), vec!["temperature_2m", "precipitation"]);
        assert_eq!(
            config.daily.api.variables(),
            vec!["temperature_2m_max", "temperature_2m_min", "precipitation_sum"]
        );
    }

    #[test]
    fn test_shared_variable_is_requested_once() {
        let mut config = HourlyConfig::default();
        config
            .metrics
            .push(MetricBinding::new("temperature_2m", "apparent_temperature"));

        assert_eq!(config.variables(), vec!["temperature_2m", "precipitation"]);
        assert_eq!(config.metrics.len(), 3);
    }

    #[test]
    fn test_load_overrides_from_file() -> Result<()> {
        let mut file = toml_file()?;
        writeln!(file, "[hourly]")?;
        writeln!(file, "fact_policy = \"replace-by-key\"")?;
        writeln!(file, "batch_size = 250")?;
        writeln!(file, "[hourly.api]")?;
        writeln!(file, "latitude = 51.5")?;
        writeln!(file, "[retry]")?;
        writeln!(file, "max_attempts = 3")?;

        let config = EtlConfig::load(Some(file.path()))?;

        assert_eq!(config.hourly.fact_policy, FactWritePolicy::ReplaceByKey);
        assert_eq!(config.hourly.batch_size, 250);
        assert_eq!(config.hourly.api.latitude, 51.5);
        assert_eq!(config.hourly.api.longitude, HOURLY_LONGITUDE);
        assert_eq!(config.retry.max_attempts, 3);
        Ok(())
    }

    #[test]
    fn test_load_rejects_out_of_range_values() -> Result<()> {
        let mut file = toml_file()?;
        writeln!(file, "[daily.api]")?;
        writeln!(file, "latitude = 123.0")?;

        let err = EtlConfig::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, EtlError::Validation(_)));
        Ok(())
    }

    #[test]
    fn test_window_must_be_ordered() {
        let mut api = HourlyApiConfig::default();
        std::mem::swap(&mut api.start, &mut api.end);
        assert!(api.validate().is_err());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let err = EtlConfig::load(Some(Path::new("/nonexistent/weather-etl.toml"))).unwrap_err();
        assert!(matches!(err, EtlError::ConfigLoad(_)));
    }

    #[test]
    fn test_password_never_printed() {
        let config = EtlConfig::default();
        let debug = format!("{:?}", config.hourly.database);
        assert!(!debug.contains("mypassword"));

        let printed = config.redacted().to_pretty_json().unwrap();
        assert!(!printed.contains("mypassword"));
        assert!(printed.contains("********"));
    }
}

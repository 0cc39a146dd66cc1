/// Forecast API endpoint
pub const OPEN_METEO_FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";

/// Hourly pipeline source location and window
pub const HOURLY_LATITUDE: f64 = 27.70;
pub const HOURLY_LONGITUDE: f64 = 85.32;
pub const HOURLY_WINDOW_START: &str = "2025-12-01T00:00:00";
pub const HOURLY_WINDOW_END: &str = "2025-12-02T00:00:00";

/// Daily pipeline source location
pub const DAILY_LATITUDE: f64 = 27.7;
pub const DAILY_LONGITUDE: f64 = 85.3;
pub const DAILY_TIMEZONE: &str = "Asia/Kathmandu";
pub const DAILY_LOCATION_NAME: &str = "Kathmandu";

/// Timestamp formats used by the forecast API
pub const HOURLY_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";
pub const DAILY_DATE_FORMAT: &str = "%Y-%m-%d";

/// Connector defaults
pub const DEFAULT_CONNECT_ATTEMPTS: u32 = 10;
pub const DEFAULT_CONNECT_DELAY_SECS: u64 = 3;
pub const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_STATEMENT_TIMEOUT_SECS: u64 = 60;

/// HTTP defaults
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const USER_AGENT: &str = concat!("weather-etl/", env!("CARGO_PKG_VERSION"));

/// Processing defaults
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Postgres SQLSTATE raised while the server is still starting up
pub const PG_CANNOT_CONNECT_NOW: &str = "57P03";

/// Configuration sources
pub const CONFIG_ENV_PREFIX: &str = "WEATHER_ETL";
pub const DEFAULT_CONFIG_FILE: &str = "weather-etl.toml";

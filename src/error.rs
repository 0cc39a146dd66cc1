use thiserror::Error;

pub type Result<T> = std::result::Result<T, EtlError>;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Could not connect to the warehouse after {attempts} attempt(s): {source}")]
    Connection {
        attempts: u32,
        #[source]
        source: sqlx::Error,
    },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Forecast API returned {status}: {reason}")]
    Api { status: u16, reason: String },

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing field in forecast payload: {0}")]
    MissingField(String),

    #[error("Series '{variable}' has {actual} values but 'time' has {expected}")]
    MisalignedSeries {
        variable: String,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid timestamp '{value}': {source}")]
    TimestampParse {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("Metric '{name}' is not registered in dim_metric")]
    MetricKey { name: String },

    #[error("Configuration load error: {0}")]
    ConfigLoad(#[from] config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

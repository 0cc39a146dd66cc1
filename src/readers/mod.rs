pub mod forecast_reader;
pub mod payload;

pub use forecast_reader::ForecastReader;
pub use payload::{api_error_reason, parse_daily, parse_hourly};

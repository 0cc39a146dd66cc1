use tracing::{debug, info};

use crate::error::{EtlError, Result};
use crate::models::{DailySeries, HourlySeries};
use crate::readers::payload::{api_error_reason, parse_daily, parse_hourly};
use crate::settings::{DailyApiConfig, DailyConfig, HourlyApiConfig, HourlyConfig, HttpConfig};
use crate::utils::constants::{HOURLY_TIME_FORMAT, USER_AGENT};

/// Issues the single forecast request of a run. Network failures are not retried here.
pub struct ForecastReader {
    client: reqwest::Client,
    base_url: String,
}

impl ForecastReader {
    pub fn new(http: &HttpConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(http.timeout())
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: http.base_url.clone(),
        })
    }

    pub fn hourly_query(api: &HourlyApiConfig, variables: &[&str]) -> Vec<(&'static str, String)> {
        vec![
            ("latitude", api.latitude.to_string()),
            ("longitude", api.longitude.to_string()),
            ("hourly", variables.join(",")),
            ("start_hour", api.start.format(HOURLY_TIME_FORMAT).to_string()),
            ("end_hour", api.end.format(HOURLY_TIME_FORMAT).to_string()),
        ]
    }

    pub fn daily_query(api: &DailyApiConfig) -> Vec<(&'static str, String)> {
        vec![
            ("latitude", api.latitude.to_string()),
            ("longitude", api.longitude.to_string()),
            ("daily", api.variables().join(",")),
            ("timezone", api.timezone.clone()),
        ]
    }

    pub async fn fetch_hourly(&self, config: &HourlyConfig) -> Result<HourlySeries> {
        let variables = config.variables();
        let body = self
            .get(&Self::hourly_query(&config.api, &variables))
            .await?;
        let series = parse_hourly(&body, &variables)?;

        info!(
            timestamps = series.len(),
            latitude = series.latitude,
            longitude = series.longitude,
            "Fetched hourly forecast"
        );
        Ok(series)
    }

    pub async fn fetch_daily(&self, config: &DailyConfig) -> Result<DailySeries> {
        let variables = config.api.variables();
        let body = self.get(&Self::daily_query(&config.api)).await?;
        let series = parse_daily(&body, &variables)?;

        info!(days = series.len(), timezone = %config.api.timezone, "Fetched daily forecast");
        Ok(series)
    }

    async fn get(&self, query: &[(&'static str, String)]) -> Result<String> {
        debug!(url = %self.base_url, ?query, "Requesting forecast");

        let response = self.client.get(&self.base_url).query(query).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let reason =
                api_error_reason(&body).unwrap_or_else(|| body.chars().take(200).collect());
            return Err(EtlError::Api {
                status: status.as_u16(),
                reason,
            });
        }

        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::EtlConfig;

    #[test]
    fn test_hourly_query_parameters() {
        let config = EtlConfig::default();
        let query =
            ForecastReader::hourly_query(&config.hourly.api, &config.hourly.variables());

        assert_eq!(query[0], ("latitude", "27.7".to_string()));
        assert_eq!(query[1], ("longitude", "85.32".to_string()));
        assert_eq!(query[2], ("hourly", "temperature_2m,precipitation".to_string()));
        assert_eq!(query[3], ("start_hour", "2025-12-01T00:00".to_string()));
        assert_eq!(query[4], ("end_hour", "2025-12-02T00:00".to_string()));
    }

    #[test]
    fn test_daily_query_parameters() {
        let config = EtlConfig::default();
        let query = ForecastReader::daily_query(&config.daily.api);

        assert_eq!(
            query[2],
            (
                "daily",
                "temperature_2m_max,temperature_2m_min,precipitation_sum".to_string()
            )
        );
        assert_eq!(query[3], ("timezone", "Asia/Kathmandu".to_string()));
    }

    #[test]
    fn test_reader_builds_with_timeout() {
        assert!(ForecastReader::new(&HttpConfig::default()).is_ok());
    }
}

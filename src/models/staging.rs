use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{EtlError, Result};
use crate::models::DailySeries;

/// Wide columns of the `ods_weather` staging table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StagingColumn {
    TempMax,
    TempMin,
    Precipitation,
}

impl StagingColumn {
    pub const ALL: [StagingColumn; 3] = [
        StagingColumn::TempMax,
        StagingColumn::TempMin,
        StagingColumn::Precipitation,
    ];

    /// Column name in `ods_weather`, also the default metric name in `dim_metric`.
    pub fn column_name(&self) -> &'static str {
        match self {
            StagingColumn::TempMax => "temp_max",
            StagingColumn::TempMin => "temp_min",
            StagingColumn::Precipitation => "precipitation",
        }
    }

    /// Daily forecast variable that feeds this column.
    pub fn source_variable(&self) -> &'static str {
        match self {
            StagingColumn::TempMax => "temperature_2m_max",
            StagingColumn::TempMin => "temperature_2m_min",
            StagingColumn::Precipitation => "precipitation_sum",
        }
    }
}

impl std::fmt::Display for StagingColumn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.column_name())
    }
}

/// One raw day of weather in wide format, no surrogate keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagingRow {
    pub location: String,
    pub weather_date: NaiveDate,
    pub temp_max: Option<f64>,
    pub temp_min: Option<f64>,
    pub precipitation: Option<f64>,
}

impl StagingRow {
    pub fn value(&self, column: StagingColumn) -> Option<f64> {
        match column {
            StagingColumn::TempMax => self.temp_max,
            StagingColumn::TempMin => self.temp_min,
            StagingColumn::Precipitation => self.precipitation,
        }
    }

    /// Build one staging row per day of `series`, all tagged with `location`.
    pub fn from_daily_series(location: &str, series: &DailySeries) -> Result<Vec<StagingRow>> {
        // Every wide column must be present in the payload
        for column in StagingColumn::ALL {
            if series.metric(column.source_variable()).is_none() {
                return Err(EtlError::MissingField(format!(
                    "daily.{}",
                    column.source_variable()
                )));
            }
        }

        let rows = series
            .timestamps
            .iter()
            .enumerate()
            .map(|(i, date)| StagingRow {
                location: location.to_string(),
                weather_date: *date,
                temp_max: series.value(StagingColumn::TempMax.source_variable(), i),
                temp_min: series.value(StagingColumn::TempMin.source_variable(), i),
                precipitation: series.value(StagingColumn::Precipitation.source_variable(), i),
            })
            .collect();

        Ok(rows)
    }
}

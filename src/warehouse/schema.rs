//! Table and column names of the two star schemas, and the SQL built from them.

use crate::models::{LocationKey, TimeKey};
use crate::processors::PivotMapping;

pub const STAGING_TABLE: &str = "ods_weather";

pub const STAGING_CREATE: &str = "CREATE TABLE IF NOT EXISTS ods_weather (
    location TEXT NOT NULL,
    weather_date DATE NOT NULL,
    temp_max DOUBLE PRECISION,
    temp_min DOUBLE PRECISION,
    precipitation DOUBLE PRECISION
)";

pub const STAGING_TRUNCATE: &str = "TRUNCATE TABLE ods_weather";

pub const STAGING_INSERT_PREFIX: &str =
    "INSERT INTO ods_weather (location, weather_date, temp_max, temp_min, precipitation) ";

/// Key column names differ between the hourly and daily warehouses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StarSchema {
    pub location_key: &'static str,
    pub time_table: &'static str,
    pub time_key: &'static str,
    pub metric_key: &'static str,
}

impl StarSchema {
    pub const HOURLY: StarSchema = StarSchema {
        location_key: "location_id",
        time_table: "dim_time",
        time_key: "time_id",
        metric_key: "metric_id",
    };

    pub const DAILY: StarSchema = StarSchema {
        location_key: "location_key",
        time_table: "dim_date",
        time_key: "date_key",
        metric_key: "metric_key",
    };

    /// Upsert returning the surrogate key whether the row was inserted or already present.
    pub fn location_upsert_sql(&self, key: &LocationKey) -> String {
        match key {
            LocationKey::Coordinates { .. } => format!(
                "INSERT INTO dim_location (latitude, longitude) VALUES ($1, $2) \
                 ON CONFLICT (latitude, longitude) DO UPDATE SET latitude = EXCLUDED.latitude \
                 RETURNING {}",
                self.location_key
            ),
            LocationKey::Named(_) => format!(
                "INSERT INTO dim_location (location) VALUES ($1) \
                 ON CONFLICT (location) DO UPDATE SET location = EXCLUDED.location \
                 RETURNING {}",
                self.location_key
            ),
        }
    }

    pub fn time_upsert_sql(&self, key: &TimeKey) -> String {
        match key {
            TimeKey::Hour { .. } => format!(
                "INSERT INTO {table} (date, hour) VALUES ($1, $2) \
                 ON CONFLICT (date, hour) DO UPDATE SET date = EXCLUDED.date \
                 RETURNING {key}",
                table = self.time_table,
                key = self.time_key
            ),
            TimeKey::Day(_) => format!(
                "INSERT INTO {table} (date, year, month, day) VALUES ($1, $2, $3, $4) \
                 ON CONFLICT (date) DO UPDATE SET date = EXCLUDED.date \
                 RETURNING {key}",
                table = self.time_table,
                key = self.time_key
            ),
        }
    }

    pub fn metric_catalog_sql(&self) -> String {
        format!("SELECT metric_name, {} FROM dim_metric", self.metric_key)
    }

    pub fn fact_insert_prefix(&self) -> String {
        format!(
            "INSERT INTO fact_weather ({}, {}, {}, value) ",
            self.time_key, self.location_key, self.metric_key
        )
    }

    /// Delete by composite key; binds three parallel `int4[]` arrays.
    pub fn fact_delete_sql(&self) -> String {
        format!(
            "DELETE FROM fact_weather f \
             USING UNNEST($1::int4[], $2::int4[], $3::int4[]) \
             AS k(time_key, location_key, metric_key) \
             WHERE f.{} = k.time_key AND f.{} = k.location_key AND f.{} = k.metric_key",
            self.time_key, self.location_key, self.metric_key
        )
    }

    pub fn fact_truncate_sql(&self) -> &'static str {
        "TRUNCATE TABLE fact_weather"
    }

    pub fn staged_locations_sql(&self) -> String {
        format!(
            "INSERT INTO dim_location (location) \
             SELECT DISTINCT location FROM {STAGING_TABLE} \
             ON CONFLICT (location) DO NOTHING"
        )
    }

    pub fn staged_dates_sql(&self) -> String {
        format!(
            "INSERT INTO {table} (date, year, month, day) \
             SELECT DISTINCT weather_date, \
                    EXTRACT(YEAR FROM weather_date)::int, \
                    EXTRACT(MONTH FROM weather_date)::int, \
                    EXTRACT(DAY FROM weather_date)::int \
             FROM {STAGING_TABLE} \
             ON CONFLICT (date) DO NOTHING",
            table = self.time_table
        )
    }

    /// Staging x catalog cross join. Returns the SQL and the metric names to bind, in order.
    pub fn pivot_sql(&self, pivot: &PivotMapping) -> (String, Vec<String>) {
        let mut binds = Vec::with_capacity(pivot.entries().len());
        let value = if pivot.is_empty() {
            "NULL::double precision".to_string()
        } else {
            let mut case = String::from("CASE m.metric_name");
            for (name, column) in pivot.entries() {
                binds.push(name.clone());
                case.push_str(&format!(" WHEN ${} THEN o.{}", binds.len(), column.column_name()));
            }
            case.push_str(" END");
            case
        };

        let sql = format!(
            "INSERT INTO fact_weather ({time_key}, {location_key}, {metric_key}, value) \
             SELECT d.{time_key}, l.{location_key}, m.{metric_key}, {value} \
             FROM {STAGING_TABLE} o \
             JOIN {time_table} d ON o.weather_date = d.date \
             JOIN dim_location l ON o.location = l.location \
             CROSS JOIN dim_metric m",
            time_key = self.time_key,
            location_key = self.location_key,
            metric_key = self.metric_key,
            time_table = self.time_table,
        );

        (sql, binds)
    }
}

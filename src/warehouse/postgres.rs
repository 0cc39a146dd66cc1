use async_trait::async_trait;
use sqlx::postgres::{PgPool, Postgres};
use sqlx::{QueryBuilder, Transaction};
use tracing::{debug, info};

use crate::error::Result;
use crate::models::{FactRow, LocationKey, MetricCatalog, StagingRow, SurrogateKey, TimeKey};
use crate::processors::PivotMapping;
use crate::warehouse::schema::{
    StarSchema, STAGING_CREATE, STAGING_INSERT_PREFIX, STAGING_TRUNCATE,
};
use crate::warehouse::{
    CatalogReader, DimensionResolver, FactWriter, StagedTransform, Warehouse, WarehouseSession,
};

/// PostgreSQL star schema behind a connection pool.
#[derive(Debug, Clone)]
pub struct PgWarehouse {
    pool: PgPool,
    schema: StarSchema,
}

impl PgWarehouse {
    pub fn new(pool: PgPool, schema: StarSchema) -> Self {
        Self { pool, schema }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// One open transaction. Rolled back by sqlx when dropped uncommitted.
pub struct PgSession {
    tx: Transaction<'static, Postgres>,
    schema: StarSchema,
}

#[async_trait]
impl Warehouse for PgWarehouse {
    type Session = PgSession;

    async fn begin(&self) -> Result<PgSession> {
        let tx = self.pool.begin().await?;
        Ok(PgSession {
            tx,
            schema: self.schema,
        })
    }

    async fn replace_staging(&self, rows: &[StagingRow], batch_size: usize) -> Result<u64> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(STAGING_CREATE).execute(&mut *tx).await?;
        sqlx::query(STAGING_TRUNCATE).execute(&mut *tx).await?;

        let mut inserted = 0;
        for chunk in rows.chunks(batch_size.max(1)) {
            let mut builder = QueryBuilder::<Postgres>::new(STAGING_INSERT_PREFIX);
            builder.push_values(chunk, |mut b, row| {
                b.push_bind(row.location.clone())
                    .push_bind(row.weather_date)
                    .push_bind(row.temp_max)
                    .push_bind(row.temp_min)
                    .push_bind(row.precipitation);
            });
            inserted += builder.build().execute(&mut *tx).await?.rows_affected();
        }

        tx.commit().await?;
        info!(rows = inserted, "Replaced staging table contents");
        Ok(inserted)
    }
}

#[async_trait]
impl DimensionResolver for PgSession {
    async fn resolve_location(&mut self, key: &LocationKey) -> Result<SurrogateKey> {
        let sql = self.schema.location_upsert_sql(key);
        let surrogate = match key {
            LocationKey::Coordinates {
                latitude,
                longitude,
            } => {
                sqlx::query_scalar::<_, SurrogateKey>(&sql)
                    .bind(*latitude)
                    .bind(*longitude)
                    .fetch_one(&mut *self.tx)
                    .await?
            }
            LocationKey::Named(name) => {
                sqlx::query_scalar::<_, SurrogateKey>(&sql)
                    .bind(name.as_str())
                    .fetch_one(&mut *self.tx)
                    .await?
            }
        };

        debug!(location = %key, key = surrogate, "Resolved location dimension");
        Ok(surrogate)
    }

    async fn resolve_time(&mut self, key: &TimeKey) -> Result<SurrogateKey> {
        let sql = self.schema.time_upsert_sql(key);
        let surrogate = match key {
            TimeKey::Hour { date, hour } => {
                sqlx::query_scalar::<_, SurrogateKey>(&sql)
                    .bind(*date)
                    .bind(*hour as i32)
                    .fetch_one(&mut *self.tx)
                    .await?
            }
            TimeKey::Day(date) => {
                sqlx::query_scalar::<_, SurrogateKey>(&sql)
                    .bind(*date)
                    .bind(key.year())
                    .bind(key.month() as i32)
                    .bind(key.day() as i32)
                    .fetch_one(&mut *self.tx)
                    .await?
            }
        };

        Ok(surrogate)
    }
}

#[async_trait]
impl CatalogReader for PgSession {
    async fn read_metric_catalog(&mut self) -> Result<MetricCatalog> {
        let sql = self.schema.metric_catalog_sql();
        let rows = sqlx::query_as::<_, (String, SurrogateKey)>(&sql)
            .fetch_all(&mut *self.tx)
            .await?;

        debug!(metrics = rows.len(), "Loaded metric catalog");
        Ok(rows.into_iter().collect())
    }
}

#[async_trait]
impl FactWriter for PgSession {
    async fn insert_facts(&mut self, rows: &[FactRow]) -> Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }

        let mut builder = QueryBuilder::<Postgres>::new(self.schema.fact_insert_prefix());
        builder.push_values(rows, |mut b, row| {
            b.push_bind(row.time_key)
                .push_bind(row.location_key)
                .push_bind(row.metric_key)
                .push_bind(row.value);
        });

        let result = builder.build().execute(&mut *self.tx).await?;
        Ok(result.rows_affected())
    }

    async fn delete_facts(&mut self, rows: &[FactRow]) -> Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }

        let time_keys: Vec<SurrogateKey> = rows.iter().map(|r| r.time_key).collect();
        let location_keys: Vec<SurrogateKey> = rows.iter().map(|r| r.location_key).collect();
        let metric_keys: Vec<SurrogateKey> = rows.iter().map(|r| r.metric_key).collect();

        let sql = self.schema.fact_delete_sql();
        let result = sqlx::query(&sql)
            .bind(time_keys)
            .bind(location_keys)
            .bind(metric_keys)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn truncate_facts(&mut self) -> Result<()> {
        sqlx::query(self.schema.fact_truncate_sql())
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl StagedTransform for PgSession {
    async fn register_staged_dimensions(&mut self) -> Result<()> {
        let locations = self.schema.staged_locations_sql();
        let dates = self.schema.staged_dates_sql();

        let new_locations = sqlx::query(&locations)
            .execute(&mut *self.tx)
            .await?
            .rows_affected();
        let new_dates = sqlx::query(&dates)
            .execute(&mut *self.tx)
            .await?
            .rows_affected();

        debug!(new_locations, new_dates, "Registered staged dimensions");
        Ok(())
    }

    async fn pivot_staged_facts(&mut self, pivot: &PivotMapping) -> Result<u64> {
        let (sql, names) = self.schema.pivot_sql(pivot);
        let mut query = sqlx::query(&sql);
        for name in names {
            query = query.bind(name);
        }

        let result = query.execute(&mut *self.tx).await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl WarehouseSession for PgSession {
    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Connection, PgConnection};
use std::io;
use tracing::{debug, info};

use crate::error::{EtlError, Result};
use crate::settings::DatabaseConfig;
use crate::utils::constants::PG_CANNOT_CONNECT_NOW;
use crate::utils::retry::{retry, RetryPolicy, Sleeper};

/// Transient availability failures worth another connection attempt.
///
/// Authentication and configuration errors are not retried.
pub fn is_unavailable(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Io(_) => true,
        sqlx::Error::Database(db) => db.code().as_deref() == Some(PG_CANNOT_CONNECT_NOW),
        _ => false,
    }
}

/// One connection attempt. A timeout surfaces as `TimedOut` IO.
async fn try_connect(database: &DatabaseConfig, attempt: u32) -> sqlx::Result<PgConnection> {
    debug!(attempt, host = %database.host, "Connecting to warehouse");
    let options = database.connect_options();

    match tokio::time::timeout(database.acquire_timeout(), PgConnection::connect_with(&options))
        .await
    {
        Ok(connected) => connected,
        Err(_) => Err(sqlx::Error::Io(io::Error::new(
            io::ErrorKind::TimedOut,
            format!("connect timed out after {:?}", database.acquire_timeout()),
        ))),
    }
}

/// Open the warehouse pool, retrying while the database is not yet accepting connections.
///
/// Each attempt is a single direct connection so the driver error reaches the
/// retry predicate unchanged. The pool is built lazily once one attempt succeeds.
pub async fn connect_with_retry(
    database: &DatabaseConfig,
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
) -> Result<PgPool> {
    let connection = retry(policy, sleeper, is_unavailable, |attempt| {
        try_connect(database, attempt)
    })
    .await
    .map_err(|failure| EtlError::Connection {
        attempts: failure.attempts,
        source: failure.error,
    })?;

    if let Err(e) = connection.close().await {
        debug!(error = %e, "Closing verification connection failed");
    }

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(database.acquire_timeout())
        .connect_lazy_with(database.connect_options());

    info!(host = %database.host, dbname = %database.dbname, "Connected to warehouse");
    Ok(pool)
}

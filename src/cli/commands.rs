use std::future::Future;
use std::path::Path;
use std::sync::Mutex;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::cli::args::{Cli, Commands};
use crate::error::{EtlError, Result};
use crate::loaders::{BulkTransformLoader, LoadReport, Loader, RunStage, UpsertLoader};
use crate::models::{MetricCatalog, StagingColumn};
use crate::readers::ForecastReader;
use crate::settings::{DatabaseConfig, EtlConfig};
use crate::utils::progress::ProgressReporter;
use crate::utils::retry::TokioSleeper;
use crate::warehouse::{connect_with_retry, MemoryWarehouse, PgWarehouse, StarSchema, Warehouse};

pub async fn run(cli: Cli) -> Result<()> {
    init_logging(cli.verbose, cli.log_file.as_deref())?;

    let mut config = EtlConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Hourly {
            dry_run,
            fact_policy,
        } => {
            if let Some(policy) = fact_policy {
                config.hourly.fact_policy = policy;
            }

            let progress = ProgressReporter::new_spinner("hourly", cli.quiet);
            let reader = ForecastReader::new(&config.http)?;
            let loader = UpsertLoader::from_config(&config.hourly);
            let extract = reader.fetch_hourly(&config.hourly);

            let outcome = if dry_run {
                let warehouse = MemoryWarehouse::with_catalog(seed_catalog(
                    config.hourly.metrics.iter().map(|m| m.metric.as_str()),
                ));
                execute(&loader, &warehouse, extract, &progress).await
            } else {
                match connect(&config, &config.hourly.database, StarSchema::HOURLY, &progress)
                    .await
                {
                    Ok(warehouse) => {
                        let outcome = execute(&loader, &warehouse, extract, &progress).await;
                        warehouse.close().await;
                        outcome
                    }
                    Err(err) => Err(err),
                }
            };

            report_outcome(outcome, &progress)
        }

        Commands::Daily { dry_run } => {
            let progress = ProgressReporter::new_spinner("daily", cli.quiet);
            let reader = ForecastReader::new(&config.http)?;
            let loader = BulkTransformLoader::from_config(&config.daily);
            let extract = reader.fetch_daily(&config.daily);

            let outcome = if dry_run {
                let warehouse = MemoryWarehouse::with_catalog(seed_catalog(
                    StagingColumn::ALL.iter().map(|c| c.column_name()),
                ));
                execute(&loader, &warehouse, extract, &progress).await
            } else {
                match connect(&config, &config.daily.database, StarSchema::DAILY, &progress).await
                {
                    Ok(warehouse) => {
                        let outcome = execute(&loader, &warehouse, extract, &progress).await;
                        warehouse.close().await;
                        outcome
                    }
                    Err(err) => Err(err),
                }
            };

            report_outcome(outcome, &progress)
        }

        Commands::ShowConfig => {
            println!("{}", config.redacted().to_pretty_json()?);
            Ok(())
        }
    }
}

fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false);

    let installed = match log_file {
        Some(path) => {
            let file = std::fs::File::create(path)?;
            let subscriber = builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .finish();
            tracing::subscriber::set_global_default(subscriber)
        }
        None => {
            let subscriber = builder.with_writer(std::io::stderr).finish();
            tracing::subscriber::set_global_default(subscriber)
        }
    };

    installed.map_err(|e| EtlError::Config(format!("Failed to install logger: {}", e)))
}

async fn connect(
    config: &EtlConfig,
    database: &DatabaseConfig,
    schema: StarSchema,
    progress: &ProgressReporter,
) -> Result<PgWarehouse> {
    progress.stage(RunStage::Start, &format!("Connecting to {}", database.host));
    let pool = connect_with_retry(database, &config.retry.policy(), &TokioSleeper).await?;
    Ok(PgWarehouse::new(pool, schema))
}

/// Extract once the warehouse is reachable, then hand the input to the loader.
async fn execute<L, W, F>(
    loader: &L,
    warehouse: &W,
    extract: F,
    progress: &ProgressReporter,
) -> Result<LoadReport>
where
    L: Loader,
    W: Warehouse,
    F: Future<Output = Result<L::Input>>,
{
    info!(stage = %RunStage::Connected, loader = loader.name(), "Warehouse ready");

    progress.stage(RunStage::Connected, "Fetching forecast");
    let input = extract.await?;
    info!(stage = %RunStage::Extracted, "Forecast extracted");

    progress.stage(RunStage::Extracted, &format!("Loading through {}", loader.name()));
    loader.load(warehouse, &input).await
}

fn report_outcome(outcome: Result<LoadReport>, progress: &ProgressReporter) -> Result<()> {
    match outcome {
        Ok(report) => {
            progress.println(&report.summary());
            progress.finish(report.stage);
            Ok(())
        }
        Err(err) => {
            progress.fail();
            Err(err)
        }
    }
}

/// Catalog for dry runs: each distinct name gets the next key from 1.
fn seed_catalog<'a>(names: impl Iterator<Item = &'a str>) -> MetricCatalog {
    let mut catalog = MetricCatalog::new();
    for name in names {
        if catalog.get(name).is_none() {
            let key = catalog.len() as i32 + 1;
            catalog.insert(name, key);
        }
    }
    catalog
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_catalog_skips_duplicates() {
        let catalog = seed_catalog(["temperature", "precipitation", "temperature"].into_iter());

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get("temperature"), Some(1));
        assert_eq!(catalog.get("precipitation"), Some(2));
    }
}

use clap::Parser;
use weather_warehouse::cli::{run, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    run(cli).await?;
    Ok(())
}

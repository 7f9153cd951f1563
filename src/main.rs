//! GMPrice - one-shot GM market token price snapshot
//!
//! Exits non-zero without touching the output files if any market cannot be
//! priced.

use anyhow::{Context, Result};
use ethers::providers::{Http, Provider};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use gmprice::config::AppConfig;
use gmprice::oracle::OracleRestClient;
use gmprice::persistence::SnapshotWriter;
use gmprice::valuation::ReaderValuator;
use gmprice::PriceAggregator;

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(config: &AppConfig) -> Result<()> {
    config.validate()?;
    info!(config = %config, "🚀 Starting GM price snapshot");

    let provider = Provider::<Http>::try_from(config.chain.rpc_url.as_str())
        .with_context(|| format!("Invalid chain.rpc_url '{}'", config.chain.rpc_url))?;
    let valuator = ReaderValuator::new(
        Arc::new(provider),
        config.reader_address()?,
        config.data_store_address()?,
        &config.markets.pnl_factor_key,
    );
    info!(
        pnl_factor_type = %format!("0x{}", hex::encode(valuator.pnl_factor_type())),
        "Reader valuator ready"
    );

    let oracle = OracleRestClient::new(&config.oracle.base_url, config.oracle_timeout())?;
    let aggregator = PriceAggregator::new(config.pipeline()?, oracle, valuator);

    let snapshot = aggregator.run().await?;

    let writer = SnapshotWriter::new(
        &config.output.dir,
        &config.output.json_file,
        &config.output.csv_file,
    );
    writer.write(&snapshot)?;

    info!(
        markets = snapshot.markets.len(),
        timestamp = %snapshot.timestamp.to_rfc3339(),
        "✅ Snapshot complete"
    );
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    init_tracing(config.log.json);

    if let Err(e) = run(&config).await {
        error!(error = %format!("{:#}", e), "❌ Snapshot failed, no output written");
        return Err(e);
    }
    Ok(())
}

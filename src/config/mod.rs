//! Configuration management for GMPrice
//!
//! Loads defaults, optional `config/default` and `config/local` files, then
//! `GMPRICE__*` environment variables (after reading `.env`).

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use ethers::types::Address;
use serde::Deserialize;
use std::time::Duration;

use crate::aggregator::PipelineConfig;
use crate::types::parse_address;
use crate::valuation::MAX_PNL_FACTOR_FOR_TRADERS;

/// GMX v2 Arbitrum markets priced by default
pub const DEFAULT_TARGET_MARKETS: [&str; 4] = [
    // ETH/USD [WETH-USDC]
    "0x70d95587d40A2caf56bd97485aB3Eec10Bee6336",
    // BTC/USD [WBTC.b-USDC]
    "0x47c031236e19d024b42f8AE6780E44A573170703",
    // SOL/USD [SOL-USDC]
    "0x09400D9DB990D5ed3f35D7be61DfAEB900Af03C9",
    // ARB/USD [ARB-USDC]
    "0xC25cEf6061Cf5dE5eb761b50E4743c1F5D7E5407",
];

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub chain: ChainConfig,
    pub oracle: OracleConfig,
    pub markets: MarketsConfig,
    pub output: OutputConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    /// JSON-RPC endpoint of the chain node
    pub rpc_url: String,
    /// Synthetics reader contract
    pub reader_address: String,
    /// Data store contract passed to the reader
    pub data_store_address: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OracleConfig {
    /// Oracle service base URL
    pub base_url: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarketsConfig {
    /// Market token addresses to price
    pub targets: Vec<String>,
    /// Data-store key name for the PnL factor
    pub pnl_factor_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    pub dir: String,
    pub json_file: String,
    pub csv_file: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Emit JSON log lines instead of human-readable ones
    pub json: bool,
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::build(
            Config::builder()
                .add_source(File::with_name("config/default").required(false))
                .add_source(File::with_name("config/local").required(false))
                .add_source(
                    Environment::with_prefix("GMPRICE")
                        .separator("__")
                        .list_separator(",")
                        .with_list_parse_key("markets.targets")
                        .try_parsing(true),
                ),
        )
    }

    /// Apply defaults underneath whatever sources the builder already has
    pub fn build(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self> {
        let config = builder
            // Chain defaults (Arbitrum One)
            .set_default("chain.rpc_url", "https://arb1.arbitrum.io/rpc")?
            .set_default(
                "chain.reader_address",
                "0xf60becbba223EEA9495Da3f606753867eC10d139",
            )?
            .set_default(
                "chain.data_store_address",
                "0xFD70de6b91282D8017aA4E741e9Ae325CAb992d8",
            )?
            // Oracle defaults
            .set_default("oracle.base_url", "https://arbitrum-api.gmxinfra.io")?
            .set_default("oracle.timeout_secs", 30)?
            // Market defaults
            .set_default("markets.targets", DEFAULT_TARGET_MARKETS.to_vec())?
            .set_default("markets.pnl_factor_key", MAX_PNL_FACTOR_FOR_TRADERS)?
            // Output defaults
            .set_default("output.dir", "./data")?
            .set_default("output.json_file", "gm_prices.json")?
            .set_default("output.csv_file", "gm_prices.csv")?
            // Logging defaults
            .set_default("log.json", false)?
            .build()
            .context("Failed to build configuration")?;

        let app_config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        Ok(app_config)
    }

    /// Reject configurations that cannot produce a snapshot
    pub fn validate(&self) -> Result<()> {
        if self.markets.targets.is_empty() {
            bail!("markets.targets must list at least one market token");
        }
        if self.chain.rpc_url.trim().is_empty() {
            bail!("chain.rpc_url must not be empty");
        }
        if self.markets.pnl_factor_key.trim().is_empty() {
            bail!("markets.pnl_factor_key must not be empty");
        }
        self.reader_address()?;
        self.data_store_address()?;
        self.target_markets()?;
        Ok(())
    }

    pub fn reader_address(&self) -> Result<Address> {
        parse_address(&self.chain.reader_address).context("Invalid chain.reader_address")
    }

    pub fn data_store_address(&self) -> Result<Address> {
        parse_address(&self.chain.data_store_address)
            .context("Invalid chain.data_store_address")
    }

    pub fn target_markets(&self) -> Result<Vec<Address>> {
        self.markets
            .targets
            .iter()
            .map(|raw| {
                parse_address(raw).with_context(|| format!("Invalid target market '{}'", raw))
            })
            .collect()
    }

    pub fn oracle_timeout(&self) -> Duration {
        Duration::from_secs(self.oracle.timeout_secs)
    }

    /// Values injected into the aggregator
    pub fn pipeline(&self) -> Result<PipelineConfig> {
        Ok(PipelineConfig {
            targets: self.target_markets()?,
        })
    }

    /// Generate a digest of the config for logging
    pub fn digest(&self) -> String {
        format!(
            "rpc={} oracle={} targets={} pnl_factor={} output={}",
            self.chain.rpc_url,
            self.oracle.base_url,
            self.markets.targets.len(),
            self.markets.pnl_factor_key,
            self.output.dir
        )
    }
}

impl std::fmt::Display for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.digest())
    }
}

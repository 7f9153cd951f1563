//! Price Aggregator - Runs the full pricing pipeline once
//!
//! Oracle fetch -> market matching -> concurrent on-chain valuation ->
//! fixed-point conversion -> named, timestamped snapshot.

use chrono::Utc;
use ethers::types::Address;
use futures_util::future::try_join_all;
use tracing::info;

use crate::error::Result;
use crate::fixed_point::from_usd_fixed;
use crate::oracle::{fetch_oracle_data, match_markets, OracleSource, SymbolBook};
use crate::types::{MarketResult, PriceSnapshot, ResolvedMarketBundle};
use crate::valuation::Valuator;

/// Inputs that vary per deployment
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    /// Market tokens to price
    pub targets: Vec<Address>,
}

/// One-shot aggregator over an oracle source and a valuation backend
pub struct PriceAggregator<S, V> {
    config: PipelineConfig,
    source: S,
    valuator: V,
}

impl<S: OracleSource, V: Valuator> PriceAggregator<S, V> {
    pub fn new(config: PipelineConfig, source: S, valuator: V) -> Self {
        Self {
            config,
            source,
            valuator,
        }
    }

    /// Produce a snapshot for every target market, or fail as a whole.
    pub async fn run(&self) -> Result<PriceSnapshot> {
        let data = fetch_oracle_data(&self.source).await?;
        let bundles = match_markets(&data, &self.config.targets)?;
        let symbols = SymbolBook::new(&data.tokens);

        info!(markets = bundles.len(), "Valuing target markets");

        let markets = try_join_all(
            bundles
                .iter()
                .map(|bundle| self.price_market(bundle, &symbols)),
        )
        .await?;

        let snapshot = PriceSnapshot {
            timestamp: Utc::now(),
            markets,
        };

        for market in &snapshot.markets {
            info!(
                market = %market.address_checksummed(),
                name = %market.name,
                price = %market.price,
                pool_value = %market.pool_value,
                "Market token priced"
            );
        }

        Ok(snapshot)
    }

    async fn price_market(
        &self,
        bundle: &ResolvedMarketBundle,
        symbols: &SymbolBook,
    ) -> Result<MarketResult> {
        let valuation = self.valuator.value_market(bundle).await?;

        Ok(MarketResult {
            address: bundle.market.market_token,
            name: symbols.market_name(&bundle.market),
            price: from_usd_fixed(valuation.price)?,
            pool_value: from_usd_fixed(valuation.pool_info.pool_value)?,
        })
    }
}

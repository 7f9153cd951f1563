//! Oracle module - Market, ticker and token data from the GMX oracle service
//!
//! Fetches the three independent collections concurrently and joins them
//! into per-market bundles ready for on-chain valuation.

pub mod matcher;
pub mod rest;

pub use matcher::{match_markets, SymbolBook};
pub use rest::OracleRestClient;

use async_trait::async_trait;
use tracing::info;

use crate::error::Result;
use crate::types::{MarketDescriptor, OracleData, PriceTicker, TokenMetadata};

/// Trait for oracle data sources
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OracleSource: Send + Sync {
    /// Get the source name
    fn name(&self) -> &'static str;

    /// Every market the oracle currently lists
    async fn fetch_markets(&self) -> Result<Vec<MarketDescriptor>>;

    /// Latest min/max price per token
    async fn fetch_tickers(&self) -> Result<Vec<PriceTicker>>;

    /// Symbol and decimals per token
    async fn fetch_tokens(&self) -> Result<Vec<TokenMetadata>>;
}

/// Fetch markets, tickers and tokens concurrently.
///
/// The first failure aborts the other two; no partial data is returned.
pub async fn fetch_oracle_data<S: OracleSource + ?Sized>(source: &S) -> Result<OracleData> {
    let (markets, tickers, tokens) = tokio::try_join!(
        source.fetch_markets(),
        source.fetch_tickers(),
        source.fetch_tokens()
    )?;

    info!(
        source = source.name(),
        markets = markets.len(),
        tickers = tickers.len(),
        tokens = tokens.len(),
        "Oracle data fetched"
    );

    Ok(OracleData {
        markets,
        tickers,
        tokens,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::types::parse_address;
    use ethers::types::U256;

    #[tokio::test]
    async fn test_fetch_collects_all_three() {
        let token = parse_address("0x82af49447d8a07e3bd95bd0d56f35241523fbab1").unwrap();

        let mut source = MockOracleSource::new();
        source.expect_name().return_const("mock");
        source.expect_fetch_markets().returning(|| Ok(vec![]));
        source.expect_fetch_tickers().returning(move || {
            Ok(vec![PriceTicker {
                token_address: token,
                min_price: U256::from(1u64),
                max_price: U256::from(2u64),
            }])
        });
        source.expect_fetch_tokens().returning(|| Ok(vec![]));

        let data = fetch_oracle_data(&source).await.unwrap();
        assert!(data.markets.is_empty());
        assert_eq!(data.tickers.len(), 1);
        assert!(data.tokens.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_fails_if_any_endpoint_fails() {
        let mut source = MockOracleSource::new();
        source.expect_name().return_const("mock");
        source.expect_fetch_markets().returning(|| Ok(vec![]));
        source.expect_fetch_tickers().returning(|| {
            Err(PipelineError::OracleRequest {
                endpoint: "/prices/tickers".to_string(),
                reason: "HTTP 503".to_string(),
            })
        });
        source.expect_fetch_tokens().returning(|| Ok(vec![]));

        let err = fetch_oracle_data(&source).await.unwrap_err();
        assert!(matches!(err, PipelineError::OracleRequest { .. }));
    }
}

//! GMX synthetics reader binding
//!
//! `getMarketTokenPrice` is a view function; it is only ever invoked through
//! `eth_call`, never sent as a transaction.

use async_trait::async_trait;
use ethers::abi::Tokenizable;
use ethers::contract::abigen;
use ethers::providers::Middleware;
use ethers::types::Address;
use std::sync::Arc;
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::types::{PoolValueInfo, PriceTicker, ResolvedMarketBundle, ValuationResult};
use crate::valuation::{data_store_key, Valuator};

abigen!(
    SyntheticsReader,
    r#"[
        struct MarketProps { address marketToken; address indexToken; address longToken; address shortToken; }
        struct PriceProps { uint256 min; uint256 max; }
        struct MarketPoolValueInfoProps { int256 poolValue; int256 longPnl; int256 shortPnl; int256 netPnl; uint256 longTokenAmount; uint256 shortTokenAmount; uint256 longTokenUsd; uint256 shortTokenUsd; uint256 totalBorrowingFees; uint256 borrowingFeePoolFactor; uint256 impactPoolAmount; }
        function getMarketTokenPrice(address dataStore, MarketProps market, PriceProps indexTokenPrice, PriceProps longTokenPrice, PriceProps shortTokenPrice, bytes32 pnlFactorType, bool maximize) external view returns (int256, MarketPoolValueInfoProps)
    ]"#
);

impl From<&PriceTicker> for PriceProps {
    fn from(ticker: &PriceTicker) -> Self {
        Self {
            min: ticker.min_price,
            max: ticker.max_price,
        }
    }
}

impl From<MarketPoolValueInfoProps> for PoolValueInfo {
    fn from(p: MarketPoolValueInfoProps) -> Self {
        Self {
            pool_value: p.pool_value,
            long_pnl: p.long_pnl,
            short_pnl: p.short_pnl,
            net_pnl: p.net_pnl,
            long_token_amount: p.long_token_amount,
            short_token_amount: p.short_token_amount,
            long_token_usd: p.long_token_usd,
            short_token_usd: p.short_token_usd,
            total_borrowing_fees: p.total_borrowing_fees,
            borrowing_fee_pool_factor: p.borrowing_fee_pool_factor,
            impact_pool_amount: p.impact_pool_amount,
        }
    }
}

/// Values markets through the deployed reader contract
pub struct ReaderValuator<M> {
    reader: SyntheticsReader<M>,
    data_store: Address,
    pnl_factor_type: [u8; 32],
}

impl<M: Middleware + 'static> ReaderValuator<M> {
    /// `pnl_factor_key` is the data-store key name hashed into the selector
    pub fn new(
        client: Arc<M>,
        reader: Address,
        data_store: Address,
        pnl_factor_key: &str,
    ) -> Self {
        Self {
            reader: SyntheticsReader::new(reader, client),
            data_store,
            pnl_factor_type: data_store_key(pnl_factor_key),
        }
    }

    pub fn pnl_factor_type(&self) -> [u8; 32] {
        self.pnl_factor_type
    }
}

#[async_trait]
impl<M: Middleware + 'static> Valuator for ReaderValuator<M> {
    async fn value_market(&self, bundle: &ResolvedMarketBundle) -> Result<ValuationResult> {
        let market = bundle.market;
        let props = MarketProps {
            market_token: market.market_token,
            index_token: market.index_token,
            long_token: market.long_token,
            short_token: market.short_token,
        };

        debug!(
            market = %format!("{:#x}", market.market_token),
            "Calling getMarketTokenPrice"
        );

        let (price, info) = self
            .reader
            .get_market_token_price(
                self.data_store,
                props,
                (&bundle.index_price).into(),
                (&bundle.long_price).into(),
                (&bundle.short_price).into(),
                self.pnl_factor_type,
                false,
            )
            .call()
            .await
            .map_err(|e| PipelineError::ValuationCallFailed {
                market: market.market_token,
                reason: e.to_string(),
            })?;

        Ok(ValuationResult {
            price,
            pool_info: MarketPoolValueInfoProps::from_token(info.into_token())
                .map_err(|e| PipelineError::ValuationCallFailed {
                    market: market.market_token,
                    reason: e.to_string(),
                })?
                .into(),
        })
    }
}

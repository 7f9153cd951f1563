//! Valuation module - On-chain market token pricing
//!
//! Each resolved market is priced with one read-only call to the GMX
//! synthetics reader. The call is parameterized with the oracle's min/max
//! price pairs, the trader PnL factor selector and `maximize = false`.

pub mod reader;

pub use reader::{ReaderValuator, SyntheticsReader};

use async_trait::async_trait;
use ethers::abi::{encode, Token};
use ethers::utils::keccak256;
use std::sync::Arc;

use crate::error::Result;
use crate::types::{ResolvedMarketBundle, ValuationResult};

/// Data-store key naming the PnL cap applied to trader profits
pub const MAX_PNL_FACTOR_FOR_TRADERS: &str = "MAX_PNL_FACTOR_FOR_TRADERS";

/// `keccak256(abi.encode(name))`, the way GMX derives data-store keys
pub fn data_store_key(name: &str) -> [u8; 32] {
    keccak256(encode(&[Token::String(name.to_string())]))
}

/// Trait for market token valuation backends
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Valuator: Send + Sync {
    /// Price one market token. Any transport or revert error is fatal.
    async fn value_market(&self, bundle: &ResolvedMarketBundle) -> Result<ValuationResult>;
}

#[async_trait]
impl<T: Valuator + ?Sized> Valuator for Arc<T> {
    async fn value_market(&self, bundle: &ResolvedMarketBundle) -> Result<ValuationResult> {
        (**self).value_market(bundle).await
    }
}

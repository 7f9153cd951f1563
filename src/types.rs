//! Core types used throughout GMPrice
//!
//! Oracle records, resolved per-market bundles, raw valuation output and the
//! final decimal snapshot handed to persistence.

use chrono::{DateTime, Utc};
use ethers::types::{Address, I256, U256};
use ethers::utils::to_checksum;
use rust_decimal::Decimal;
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};
use std::fmt;

use crate::error::PipelineError;

/// Placeholder used when a token symbol cannot be resolved
pub const UNKNOWN_SYMBOL: &str = "?";

/// Parse an address in any letter-casing into its canonical 20-byte form.
///
/// This is the single canonicalization point for every address coming from
/// the oracle service or from configuration.
pub fn parse_address(raw: &str) -> Result<Address, PipelineError> {
    let trimmed = raw.trim();
    let normalized = match trimmed.strip_prefix("0X") {
        Some(rest) => format!("0x{}", rest),
        None => trimmed.to_string(),
    };
    normalized.parse::<Address>().map_err(|e| {
        PipelineError::MalformedOracleData(format!("address '{}' is invalid: {}", raw, e))
    })
}

/// Role of a token inside a market
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenRole {
    Index,
    Long,
    Short,
}

impl fmt::Display for TokenRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenRole::Index => write!(f, "index"),
            TokenRole::Long => write!(f, "long"),
            TokenRole::Short => write!(f, "short"),
        }
    }
}

/// One liquidity pool share as listed by the oracle service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketDescriptor {
    pub market_token: Address,
    pub index_token: Address,
    pub long_token: Address,
    pub short_token: Address,
}

impl MarketDescriptor {
    /// Token address for a given role
    pub fn token(&self, role: TokenRole) -> Address {
        match role {
            TokenRole::Index => self.index_token,
            TokenRole::Long => self.long_token,
            TokenRole::Short => self.short_token,
        }
    }
}

/// Min/max price bound for one token, oracle-scaled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceTicker {
    pub token_address: Address,
    pub min_price: U256,
    pub max_price: U256,
}

/// Display metadata for a token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenMetadata {
    pub address: Address,
    pub symbol: String,
    pub decimals: u8,
}

/// Everything the oracle service returned for one run
#[derive(Debug, Clone, Default)]
pub struct OracleData {
    pub markets: Vec<MarketDescriptor>,
    pub tickers: Vec<PriceTicker>,
    pub tokens: Vec<TokenMetadata>,
}

/// A market joined with its three required tickers.
///
/// Only `oracle::matcher` builds these, and only when all three tickers exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedMarketBundle {
    pub market: MarketDescriptor,
    pub index_price: PriceTicker,
    pub long_price: PriceTicker,
    pub short_price: PriceTicker,
}

/// Pool accounting returned alongside the market token price.
///
/// All values are 30-decimal scaled. Only `pool_value` is interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolValueInfo {
    pub pool_value: I256,
    pub long_pnl: I256,
    pub short_pnl: I256,
    pub net_pnl: I256,
    pub long_token_amount: U256,
    pub short_token_amount: U256,
    pub long_token_usd: U256,
    pub short_token_usd: U256,
    pub total_borrowing_fees: U256,
    pub borrowing_fee_pool_factor: U256,
    pub impact_pool_amount: U256,
}

/// Raw output of the on-chain valuation call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValuationResult {
    pub price: I256,
    pub pool_info: PoolValueInfo,
}

/// Final per-market record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketResult {
    pub address: Address,
    pub name: String,
    pub price: Decimal,
    pub pool_value: Decimal,
}

impl MarketResult {
    /// EIP-55 checksummed market address
    pub fn address_checksummed(&self) -> String {
        to_checksum(&self.address, None)
    }
}

/// One run's output, stamped once after every market resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceSnapshot {
    pub timestamp: DateTime<Utc>,
    pub markets: Vec<MarketResult>,
}

/// Build the display name `"<index>/USD [<long>-<short>]"`
pub fn market_name(index: Option<&str>, long: Option<&str>, short: Option<&str>) -> String {
    format!(
        "{}/USD [{}-{}]",
        index.unwrap_or(UNKNOWN_SYMBOL),
        long.unwrap_or(UNKNOWN_SYMBOL),
        short.unwrap_or(UNKNOWN_SYMBOL)
    )
}

struct MarketEntry<'a>(&'a MarketResult);

impl Serialize for MarketEntry<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("MarketEntry", 3)?;
        s.serialize_field("name", &self.0.name)?;
        s.serialize_field("price", &self.0.price)?;
        s.serialize_field("poolValue", &self.0.pool_value)?;
        s.end()
    }
}

struct MarketMap<'a>(&'a [MarketResult]);

impl Serialize for MarketMap<'_> {
    // Entries are emitted in result order, not key order
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for market in self.0 {
            map.serialize_entry(&market.address_checksummed(), &MarketEntry(market))?;
        }
        map.end()
    }
}

impl Serialize for PriceSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("PriceSnapshot", 2)?;
        s.serialize_field("timestamp", &self.timestamp.to_rfc3339())?;
        s.serialize_field("markets", &MarketMap(&self.markets))?;
        s.end()
    }
}

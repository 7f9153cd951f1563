//! GMX oracle REST client
//!
//! Endpoints: `/markets`, `/prices/tickers`, `/tokens` under the configured
//! base URL (e.g. https://arbitrum-api.gmxinfra.io). Non-2xx responses and
//! malformed JSON are hard errors.

use async_trait::async_trait;
use ethers::types::U256;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{PipelineError, Result};
use crate::oracle::OracleSource;
use crate::types::{parse_address, MarketDescriptor, PriceTicker, TokenMetadata};

const MARKETS_PATH: &str = "/markets";
const TICKERS_PATH: &str = "/prices/tickers";
const TOKENS_PATH: &str = "/tokens";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MarketDto {
    market_token: String,
    index_token: String,
    long_token: String,
    short_token: String,
}

#[derive(Debug, Deserialize)]
struct MarketsResponse {
    markets: Vec<MarketDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TickerDto {
    token_address: String,
    #[serde(default)]
    token_symbol: Option<String>,
    min_price: serde_json::Value,
    max_price: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct TokenDto {
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default)]
    decimals: u8,
}

#[derive(Debug, Deserialize)]
struct TokensResponse {
    tokens: Vec<TokenDto>,
}

/// Parse an oracle-scaled integer price. Strings and JSON integers are
/// accepted; fractional or negative values are rejected.
fn parse_price(value: &serde_json::Value, field: &str) -> Result<U256> {
    let raw = match value {
        serde_json::Value::String(s) => s.trim().to_string(),
        serde_json::Value::Number(n) if n.is_u64() => n.to_string(),
        other => {
            return Err(PipelineError::MalformedOracleData(format!(
                "{} is not an unsigned integer: {}",
                field, other
            )))
        }
    };
    U256::from_dec_str(&raw).map_err(|e| {
        PipelineError::MalformedOracleData(format!("{} '{}' is invalid: {}", field, raw, e))
    })
}

impl TryFrom<MarketDto> for MarketDescriptor {
    type Error = PipelineError;

    fn try_from(dto: MarketDto) -> Result<Self> {
        Ok(Self {
            market_token: parse_address(&dto.market_token)?,
            index_token: parse_address(&dto.index_token)?,
            long_token: parse_address(&dto.long_token)?,
            short_token: parse_address(&dto.short_token)?,
        })
    }
}

impl TryFrom<TickerDto> for PriceTicker {
    type Error = PipelineError;

    fn try_from(dto: TickerDto) -> Result<Self> {
        Ok(Self {
            token_address: parse_address(&dto.token_address)?,
            min_price: parse_price(&dto.min_price, "minPrice")?,
            max_price: parse_price(&dto.max_price, "maxPrice")?,
        })
    }
}

impl TryFrom<TokenDto> for TokenMetadata {
    type Error = PipelineError;

    fn try_from(dto: TokenDto) -> Result<Self> {
        let address = dto
            .address
            .as_deref()
            .ok_or_else(|| PipelineError::MalformedOracleData("token without address".into()))?;
        let symbol = dto.symbol.filter(|s| !s.trim().is_empty()).ok_or_else(|| {
            PipelineError::MalformedOracleData(format!("token {} has no symbol", address))
        })?;
        Ok(Self {
            address: parse_address(address)?,
            symbol,
            decimals: dto.decimals,
        })
    }
}

/// REST client for the GMX oracle service
#[derive(Debug, Clone)]
pub struct OracleRestClient {
    client: Client,
    base_url: String,
}

impl OracleRestClient {
    /// Create a new REST client
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PipelineError::OracleRequest {
                endpoint: base_url.to_string(),
                reason: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let fail = |reason: String| PipelineError::OracleRequest {
            endpoint: path.to_string(),
            reason,
        };

        debug!(url = %url, "GET oracle endpoint");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| fail(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fail(format!("HTTP {}", status)));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| fail(format!("invalid JSON: {}", e)))
    }
}

#[async_trait]
impl OracleSource for OracleRestClient {
    fn name(&self) -> &'static str {
        "gmx-oracle"
    }

    async fn fetch_markets(&self) -> Result<Vec<MarketDescriptor>> {
        let response: MarketsResponse = self.get_json(MARKETS_PATH).await?;
        response
            .markets
            .into_iter()
            .map(MarketDescriptor::try_from)
            .collect()
    }

    async fn fetch_tickers(&self) -> Result<Vec<PriceTicker>> {
        let response: Vec<TickerDto> = self.get_json(TICKERS_PATH).await?;

        let mut seen = HashSet::new();
        let mut tickers = Vec::with_capacity(response.len());
        for dto in response {
            let symbol = dto.token_symbol.clone().unwrap_or_default();
            let ticker = PriceTicker::try_from(dto)?;
            if !seen.insert(ticker.token_address) {
                warn!(
                    token = %format!("{:#x}", ticker.token_address),
                    symbol = %symbol,
                    "Duplicate oracle ticker, later entry wins"
                );
            }
            tickers.push(ticker);
        }
        Ok(tickers)
    }

    /// Token records are only used for display names, so unusable entries
    /// are skipped and their markets fall back to `?`.
    async fn fetch_tokens(&self) -> Result<Vec<TokenMetadata>> {
        let response: TokensResponse = self.get_json(TOKENS_PATH).await?;
        let tokens = response
            .tokens
            .into_iter()
            .filter_map(|dto| match TokenMetadata::try_from(dto) {
                Ok(token) => Some(token),
                Err(e) => {
                    warn!(error = %e, "Skipping unusable token record");
                    None
                }
            })
            .collect();
        Ok(tokens)
    }
}

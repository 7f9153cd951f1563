//! Oracle data matcher
//!
//! Joins markets, tickers and token metadata by address. Addresses are
//! already canonical `Address` values, so plain equality is case-insensitive.

use ethers::types::Address;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

use crate::error::{PipelineError, Result};
use crate::types::{
    market_name, MarketDescriptor, OracleData, PriceTicker, ResolvedMarketBundle, TokenMetadata,
    TokenRole,
};

/// Resolve every target market listed by the oracle into a bundle.
///
/// Output follows the oracle's market order. Fails with
/// [`PipelineError::NoTargetMarketsFound`] when none of the targets are
/// listed, and with [`PipelineError::MissingOraclePrice`] as soon as any
/// selected market lacks one of its three tickers.
pub fn match_markets(data: &OracleData, targets: &[Address]) -> Result<Vec<ResolvedMarketBundle>> {
    let targets: HashSet<Address> = targets.iter().copied().collect();

    // First listing of a market wins
    let mut seen = HashSet::new();
    let selected: Vec<&MarketDescriptor> = data
        .markets
        .iter()
        .filter(|m| targets.contains(&m.market_token))
        .filter(|m| {
            let first = seen.insert(m.market_token);
            if !first {
                warn!(
                    market = %m.market_token,
                    "Oracle lists market more than once, skipping duplicate"
                );
            }
            first
        })
        .collect();

    if selected.is_empty() {
        return Err(PipelineError::NoTargetMarketsFound);
    }

    // Later duplicates overwrite earlier ones
    let tickers: HashMap<Address, &PriceTicker> = data
        .tickers
        .iter()
        .map(|t| (t.token_address, t))
        .collect();

    let lookup = |market: &MarketDescriptor, role: TokenRole| -> Result<PriceTicker> {
        let token = market.token(role);
        tickers
            .get(&token)
            .map(|t| **t)
            .ok_or(PipelineError::MissingOraclePrice {
                market: market.market_token,
                token,
                role,
            })
    };

    let bundles = selected
        .into_iter()
        .map(|market| {
            Ok(ResolvedMarketBundle {
                market: *market,
                index_price: lookup(market, TokenRole::Index)?,
                long_price: lookup(market, TokenRole::Long)?,
                short_price: lookup(market, TokenRole::Short)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    debug!(
        targets = targets.len(),
        resolved = bundles.len(),
        "Target markets matched against oracle data"
    );

    Ok(bundles)
}

/// Token symbols keyed by address, for display names only
#[derive(Debug, Clone, Default)]
pub struct SymbolBook {
    symbols: HashMap<Address, String>,
}

impl SymbolBook {
    pub fn new(tokens: &[TokenMetadata]) -> Self {
        Self {
            symbols: tokens
                .iter()
                .map(|t| (t.address, t.symbol.clone()))
                .collect(),
        }
    }

    pub fn symbol(&self, address: &Address) -> Option<&str> {
        self.symbols.get(address).map(String::as_str)
    }

    /// `"<index>/USD [<long>-<short>]"`, with `?` for unknown tokens
    pub fn market_name(&self, market: &MarketDescriptor) -> String {
        market_name(
            self.symbol(&market.index_token),
            self.symbol(&market.long_token),
            self.symbol(&market.short_token),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::parse_address;
    use ethers::types::U256;

    fn addr(s: &str) -> Address {
        parse_address(s).unwrap()
    }

    const ETH_MARKET: &str = "0x70d95587d40a2caf56bd97485ab3eec10bee6336";
    const BTC_MARKET: &str = "0x47c031236e19d024b42f8ae6780e44a573170703";
    const WETH: &str = "0x82af49447d8a07e3bd95bd0d56f35241523fbab1";
    const WBTC: &str = "0x47904963fc8b2340414262125af798b9655e58cd";
    const USDC: &str = "0xaf88d065e77c8cc2239327c5edb3a432268e5831";

    fn market(market: &str, index: &str, long: &str, short: &str) -> MarketDescriptor {
        MarketDescriptor {
            market_token: addr(market),
            index_token: addr(index),
            long_token: addr(long),
            short_token: addr(short),
        }
    }

    fn ticker(token: &str, min: u64, max: u64) -> PriceTicker {
        PriceTicker {
            token_address: addr(token),
            min_price: U256::from(min),
            max_price: U256::from(max),
        }
    }

    fn sample_data() -> OracleData {
        OracleData {
            markets: vec![
                market(BTC_MARKET, WBTC, WBTC, USDC),
                market(ETH_MARKET, WETH, WETH, USDC),
            ],
            tickers: vec![
                ticker(WETH, 3500, 3501),
                ticker(WBTC, 60000, 60010),
                ticker(USDC, 1, 1),
            ],
            tokens: vec![],
        }
    }

    #[test]
    fn test_resolves_bundles_with_paired_prices() {
        let bundles = match_markets(&sample_data(), &[addr(ETH_MARKET)]).unwrap();
        assert_eq!(bundles.len(), 1);
        let bundle = &bundles[0];
        assert_eq!(bundle.market.market_token, addr(ETH_MARKET));
        assert_eq!(bundle.index_price.min_price, U256::from(3500u64));
        assert_eq!(bundle.index_price.max_price, U256::from(3501u64));
        assert_eq!(bundle.long_price, bundle.index_price);
        assert_eq!(bundle.short_price.token_address, addr(USDC));
    }

    #[test]
    fn test_order_follows_oracle_not_targets() {
        let targets = [addr(ETH_MARKET), addr(BTC_MARKET)];
        let bundles = match_markets(&sample_data(), &targets).unwrap();
        let order: Vec<Address> = bundles.iter().map(|b| b.market.market_token).collect();
        assert_eq!(order, vec![addr(BTC_MARKET), addr(ETH_MARKET)]);
    }

    #[test]
    fn test_casing_does_not_change_result() {
        let lower = sample_data();
        let upper = OracleData {
            markets: vec![
                market(
                    &BTC_MARKET.to_uppercase().replace("0X", "0x"),
                    &WBTC.to_uppercase(),
                    WBTC,
                    &USDC.to_uppercase(),
                ),
                market(ETH_MARKET, &WETH.to_uppercase(), WETH, USDC),
            ],
            tickers: vec![
                ticker(&WETH.to_uppercase(), 3500, 3501),
                ticker(WBTC, 60000, 60010),
                ticker(&USDC.to_uppercase(), 1, 1),
            ],
            tokens: vec![],
        };
        let targets = [addr(&ETH_MARKET.to_uppercase()), addr(BTC_MARKET)];

        assert_eq!(
            match_markets(&lower, &targets).unwrap(),
            match_markets(&upper, &targets).unwrap()
        );
    }

    #[test]
    fn test_no_target_markets_found() {
        let unknown = addr("0x0000000000000000000000000000000000000001");
        let err = match_markets(&sample_data(), &[unknown]).unwrap_err();
        assert!(matches!(err, PipelineError::NoTargetMarketsFound));
    }

    #[test]
    fn test_missing_ticker_aborts_everything() {
        let mut data = sample_data();
        data.tickers.retain(|t| t.token_address != addr(WBTC));

        let err = match_markets(&data, &[addr(ETH_MARKET), addr(BTC_MARKET)]).unwrap_err();
        match err {
            PipelineError::MissingOraclePrice {
                market,
                token,
                role,
            } => {
                assert_eq!(market, addr(BTC_MARKET));
                assert_eq!(token, addr(WBTC));
                assert_eq!(role, TokenRole::Index);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_short_ticker_reports_short_role() {
        let mut data = sample_data();
        data.tickers.retain(|t| t.token_address != addr(USDC));

        let err = match_markets(&data, &[addr(ETH_MARKET)]).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::MissingOraclePrice {
                role: TokenRole::Short,
                ..
            }
        ));
    }

    #[test]
    fn test_duplicate_ticker_last_wins() {
        let mut data = sample_data();
        data.tickers.push(ticker(WETH, 3600, 3601));

        let bundles = match_markets(&data, &[addr(ETH_MARKET)]).unwrap();
        assert_eq!(bundles[0].index_price.min_price, U256::from(3600u64));
    }

    #[test]
    fn test_duplicate_market_listed_once() {
        let mut data = sample_data();
        let mut repeat = market(ETH_MARKET, WETH, WETH, USDC);
        repeat.short_token = addr(WBTC);
        data.markets.push(repeat);

        let bundles = match_markets(&data, &[addr(ETH_MARKET), addr(ETH_MARKET)]).unwrap();
        assert_eq!(bundles.len(), 1);
        assert_eq!(bundles[0].market.short_token, addr(USDC));
    }

    #[test]
    fn test_symbol_book_names_markets() {
        let book = SymbolBook::new(&[
            TokenMetadata {
                address: addr(WETH),
                symbol: "WETH".to_string(),
                decimals: 18,
            },
            TokenMetadata {
                address: addr(USDC),
                symbol: "USDC".to_string(),
                decimals: 6,
            },
        ]);
        let eth = market(ETH_MARKET, WETH, WETH, USDC);
        let btc = market(BTC_MARKET, WBTC, WBTC, USDC);
        assert_eq!(book.market_name(&eth), "WETH/USD [WETH-USDC]");
        assert_eq!(book.market_name(&btc), "?/USD [?-USDC]");
    }
}

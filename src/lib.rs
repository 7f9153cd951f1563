//! GMPrice Library
//!
//! Prices GMX v2 market tokens from oracle tickers and the on-chain reader

pub mod aggregator;
pub mod config;
pub mod error;
pub mod fixed_point;
pub mod oracle;
pub mod persistence;
pub mod types;
pub mod valuation;

pub use aggregator::{PipelineConfig, PriceAggregator};
pub use error::PipelineError;

//! Pipeline error taxonomy
//!
//! Every variant is fatal to the run. Nothing in the library recovers from
//! these; the binary logs the error and exits non-zero without writing output.

use thiserror::Error;

use crate::types::TokenRole;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("none of the target markets are listed by the oracle")]
    NoTargetMarketsFound,

    #[error("market {market:#x} has no oracle price for its {role} token {token:#x}")]
    MissingOraclePrice {
        market: ethers::types::Address,
        token: ethers::types::Address,
        role: TokenRole,
    },

    #[error("valuation call failed for market {market:#x}: {reason}")]
    ValuationCallFailed {
        market: ethers::types::Address,
        reason: String,
    },

    #[error("oracle request to {endpoint} failed: {reason}")]
    OracleRequest { endpoint: String, reason: String },

    #[error("malformed oracle data: {0}")]
    MalformedOracleData(String),

    #[error("fixed-point value {0} does not fit a 4-decimal USD amount")]
    DecimalOverflow(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

use thiserror::Error;

/// Per-bet settlement failures. None of these abort a batch.
///
/// A bet that is already settled is not an error: settling it again is a no-op.
#[derive(Debug, Error)]
pub enum SettlementError {
    #[error("bet not found: {0}")]
    BetNotFound(String),

    #[error("fixture not found: {0}")]
    MissingFixture(String),

    #[error("unsupported market {market_id} with outcome {outcome_id}")]
    UnsupportedMarket { market_id: String, outcome_id: String },

    #[error("invalid {field} on bet {bet_id}: {value:?}")]
    InvalidAmount {
        bet_id: String,
        field: &'static str,
        value: String,
    },

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

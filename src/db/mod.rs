pub mod models;
pub mod store;

use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;

pub use models::{BetRecord, BetResult, Fixture, NewBet, Score, ScoreUpdate, TimeWindow};
pub use store::Store;

/// Storage the matcher and reconciler read from and write through.
///
/// Fixtures and scores are read-only from the engine's side; the only write
/// the engine performs on its own is [`MatchStore::settle_bet_record`].
#[async_trait]
pub trait MatchStore: Send + Sync {
    /// All fixtures, or only those kicking off inside `window`, ordered by kickoff.
    async fn get_fixtures(&self, window: Option<TimeWindow>) -> Result<Vec<Fixture>>;

    async fn get_fixture_by_id(&self, fixture_id: &str) -> Result<Option<Fixture>>;

    /// All scores, or the (at most one) score keyed under `fixture_id`.
    async fn get_scores(&self, fixture_id: Option<&str>) -> Result<Vec<Score>>;

    async fn get_bet(&self, bet_id: &str) -> Result<Option<BetRecord>>;

    async fn get_pending_bets(&self) -> Result<Vec<BetRecord>>;

    /// Move a bet from pending to `result`. Returns `false` without writing if
    /// the bet is not pending any more.
    async fn settle_bet_record(&self, bet_id: &str, result: BetResult, payout: Decimal) -> Result<bool>;

    /// Insert or replace the score stored under `key`.
    async fn insert_score(&self, key: &str, score: &ScoreUpdate) -> Result<()>;
}

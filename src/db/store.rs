use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

use crate::db::models::{BetRecord, BetResult, Fixture, NewBet, Score, ScoreUpdate, TimeWindow};
use crate::db::MatchStore;
use crate::matching::dates::parse_timestamp;

const FIXTURE_COLUMNS: &str = "fixture_id, home_team_name, away_team_name, start_time, status";
const SCORE_COLUMNS: &str = "fixture_id, home_score, away_score, status";
const BET_COLUMNS: &str =
    "id, fixture_id, market_id, outcome_id, odds, stake, result, payout, placed_at, settled_at";

pub struct Store {
    pool: SqlitePool,
}

impl Store {
    pub async fn new(database_path: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{database_path}"))
            .context("Invalid database path")?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .context("Failed to connect to SQLite database")?;

        let store = Self { pool };
        store.migrate().await?;

        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        let migration_sql = include_str!("../../migrations/001_init.sql");
        // Execute each statement separately (sqlx doesn't support multiple statements in one call)
        for statement in migration_sql.split(';') {
            let trimmed = statement.trim();
            if !trimmed.is_empty() {
                sqlx::query(trimmed)
                    .execute(&self.pool)
                    .await
                    .with_context(|| format!("Failed to execute migration: {trimmed}"))?;
            }
        }
        Ok(())
    }

    // --- Fixture operations ---

    /// Insert or replace a fixture. `start_time` must parse as a timestamp or date.
    pub async fn insert_fixture(&self, fixture: &Fixture) -> Result<()> {
        let start = parse_timestamp(&fixture.start_time).with_context(|| {
            format!(
                "Unparseable start_time for fixture {}: {}",
                fixture.fixture_id, fixture.start_time
            )
        })?;

        sqlx::query(
            "INSERT INTO fixtures (fixture_id, home_team_name, away_team_name, start_time, start_ts, status)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(fixture_id) DO UPDATE SET
                home_team_name = excluded.home_team_name,
                away_team_name = excluded.away_team_name,
                start_time = excluded.start_time,
                start_ts = excluded.start_ts,
                status = excluded.status",
        )
        .bind(&fixture.fixture_id)
        .bind(&fixture.home_team_name)
        .bind(&fixture.away_team_name)
        .bind(&fixture.start_time)
        .bind(start.timestamp())
        .bind(&fixture.status)
        .execute(&self.pool)
        .await
        .context("Failed to insert fixture")?;

        Ok(())
    }

    // --- Bet operations ---

    /// Record a newly placed bet as pending. Returns the generated bet id.
    pub async fn insert_bet(&self, bet: &NewBet) -> Result<String> {
        let id = uuid::Uuid::new_v4().to_string();

        sqlx::query(
            "INSERT INTO bets (id, fixture_id, market_id, outcome_id, odds, stake, result)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&bet.fixture_id)
        .bind(&bet.market_id)
        .bind(&bet.outcome_id)
        .bind(bet.odds.to_string())
        .bind(bet.stake.to_string())
        .bind(BetResult::Pending.as_str())
        .execute(&self.pool)
        .await
        .context("Failed to insert bet")?;

        Ok(id)
    }

    /// Get all bets regardless of result.
    pub async fn get_all_bets(&self) -> Result<Vec<BetRecord>> {
        let bets = sqlx::query_as::<_, BetRecord>(&format!(
            "SELECT {BET_COLUMNS} FROM bets ORDER BY placed_at, id"
        ))
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch all bets")?;
        Ok(bets)
    }
}

#[async_trait]
impl MatchStore for Store {
    async fn get_fixtures(&self, window: Option<TimeWindow>) -> Result<Vec<Fixture>> {
        let fixtures = match window {
            Some(window) => sqlx::query_as::<_, Fixture>(&format!(
                "SELECT {FIXTURE_COLUMNS} FROM fixtures WHERE start_ts BETWEEN ? AND ? ORDER BY start_ts, fixture_id"
            ))
            .bind(window.start.timestamp())
            .bind(window.end.timestamp())
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch fixtures in window")?,
            None => sqlx::query_as::<_, Fixture>(&format!(
                "SELECT {FIXTURE_COLUMNS} FROM fixtures ORDER BY start_ts, fixture_id"
            ))
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch fixtures")?,
        };
        Ok(fixtures)
    }

    async fn get_fixture_by_id(&self, fixture_id: &str) -> Result<Option<Fixture>> {
        let fixture = sqlx::query_as::<_, Fixture>(&format!(
            "SELECT {FIXTURE_COLUMNS} FROM fixtures WHERE fixture_id = ?"
        ))
        .bind(fixture_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch fixture")?;
        Ok(fixture)
    }

    async fn get_scores(&self, fixture_id: Option<&str>) -> Result<Vec<Score>> {
        let scores = match fixture_id {
            Some(id) => sqlx::query_as::<_, Score>(&format!(
                "SELECT {SCORE_COLUMNS} FROM scores WHERE fixture_id = ?"
            ))
            .bind(id)
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch score")?,
            None => sqlx::query_as::<_, Score>(&format!(
                "SELECT {SCORE_COLUMNS} FROM scores ORDER BY fixture_id"
            ))
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch scores")?,
        };
        Ok(scores)
    }

    async fn get_bet(&self, bet_id: &str) -> Result<Option<BetRecord>> {
        let bet = sqlx::query_as::<_, BetRecord>(&format!("SELECT {BET_COLUMNS} FROM bets WHERE id = ?"))
            .bind(bet_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch bet")?;
        Ok(bet)
    }

    async fn get_pending_bets(&self) -> Result<Vec<BetRecord>> {
        let bets = sqlx::query_as::<_, BetRecord>(&format!(
            "SELECT {BET_COLUMNS} FROM bets WHERE result = 'pending' ORDER BY placed_at, id"
        ))
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch pending bets")?;
        Ok(bets)
    }

    async fn settle_bet_record(&self, bet_id: &str, result: BetResult, payout: Decimal) -> Result<bool> {
        if result == BetResult::Pending {
            anyhow::bail!("Cannot settle bet {bet_id} back to pending");
        }

        // Conditional write: a concurrent settler that got here first leaves zero rows to update
        let outcome = sqlx::query(
            "UPDATE bets SET result = ?, payout = ?, settled_at = ? WHERE id = ? AND result = 'pending'",
        )
        .bind(result.as_str())
        .bind(payout.to_string())
        .bind(Utc::now().to_rfc3339())
        .bind(bet_id)
        .execute(&self.pool)
        .await
        .context("Failed to settle bet")?;

        Ok(outcome.rows_affected() == 1)
    }

    async fn insert_score(&self, key: &str, score: &ScoreUpdate) -> Result<()> {
        sqlx::query(
            "INSERT INTO scores (fixture_id, home_score, away_score, status, updated_at)
             VALUES (?, ?, ?, ?, CURRENT_TIMESTAMP)
             ON CONFLICT(fixture_id) DO UPDATE SET
                home_score = excluded.home_score,
                away_score = excluded.away_score,
                status = excluded.status,
                updated_at = CURRENT_TIMESTAMP",
        )
        .bind(key)
        .bind(i64::from(score.home_score))
        .bind(i64::from(score.away_score))
        .bind(&score.status)
        .execute(&self.pool)
        .await
        .context("Failed to insert score")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn fixture(id: &str, home: &str, away: &str, start: &str) -> Fixture {
        Fixture {
            fixture_id: id.to_string(),
            home_team_name: home.to_string(),
            away_team_name: away.to_string(),
            start_time: start.to_string(),
            status: "scheduled".to_string(),
        }
    }

    fn bet(fixture_id: &str) -> NewBet {
        NewBet {
            fixture_id: fixture_id.to_string(),
            market_id: "1x2".to_string(),
            outcome_id: "home".to_string(),
            odds: dec!(2.0),
            stake: dec!(10.0),
        }
    }

    #[tokio::test]
    async fn test_store_create_and_migrate() {
        let store = Store::new(":memory:").await.expect("should create store");
        assert!(store.get_fixtures(None).await.unwrap().is_empty());
        assert!(store.get_scores(None).await.unwrap().is_empty());
        assert!(store.get_pending_bets().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fixture_window_query() {
        let store = Store::new(":memory:").await.unwrap();
        store
            .insert_fixture(&fixture("f1", "Spezia", "Sampdoria", "2025-11-30T14:00:00Z"))
            .await
            .unwrap();
        store
            .insert_fixture(&fixture("f2", "Lecce", "Torino", "2025-11-30T19:45:00+01:00"))
            .await
            .unwrap();
        store
            .insert_fixture(&fixture("f3", "Como", "Genoa", "2025-12-01"))
            .await
            .unwrap();

        let center = Utc.with_ymd_and_hms(2025, 11, 30, 15, 0, 0).unwrap();
        let found = store
            .get_fixtures(Some(TimeWindow::around(center, Duration::hours(2))))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].fixture_id, "f1");

        // 19:45+01:00 is 18:45 UTC
        let found = store
            .get_fixtures(Some(TimeWindow::around(center, Duration::hours(4))))
            .await
            .unwrap();
        assert_eq!(found.iter().map(|f| f.fixture_id.as_str()).collect::<Vec<_>>(), vec!["f1", "f2"]);

        assert_eq!(store.get_fixtures(None).await.unwrap().len(), 3);
        assert!(store.get_fixture_by_id("f3").await.unwrap().is_some());
        assert!(store.get_fixture_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_fixture_rejects_bad_time() {
        let store = Store::new(":memory:").await.unwrap();
        let result = store.insert_fixture(&fixture("f1", "A", "B", "whenever")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_score_upsert_keeps_one_row_per_key() {
        let store = Store::new(":memory:").await.unwrap();
        let key = "flashscore_Spezia_Sampdoria_2025-11-30";
        let live = ScoreUpdate {
            home_score: 1,
            away_score: 1,
            status: "live".to_string(),
        };
        let final_score = ScoreUpdate {
            home_score: 2,
            away_score: 1,
            status: "finished".to_string(),
        };
        store.insert_score(key, &live).await.unwrap();
        store.insert_score(key, &final_score).await.unwrap();

        let scores = store.get_scores(Some(key)).await.unwrap();
        assert_eq!(scores.len(), 1);
        assert_eq!(scores[0].home_score, 2);
        assert!(scores[0].is_final());
        assert_eq!(store.get_scores(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_settle_bet_record_is_conditional() {
        let store = Store::new(":memory:").await.unwrap();
        let id = store.insert_bet(&bet("79560484")).await.unwrap();

        let pending = store.get_pending_bets().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, id);
        assert!(pending[0].is_pending());

        assert!(store.settle_bet_record(&id, BetResult::Win, dec!(20.0)).await.unwrap());
        // Second settle attempt finds nothing pending
        assert!(!store.settle_bet_record(&id, BetResult::Loss, Decimal::ZERO).await.unwrap());

        let stored = store.get_bet(&id).await.unwrap().expect("bet should exist");
        assert_eq!(stored.result, "win");
        assert_eq!(stored.payout.as_deref(), Some("20.0"));
        assert!(stored.settled_at.is_some());
        assert!(store.get_pending_bets().await.unwrap().is_empty());
        assert_eq!(store.get_all_bets().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_settle_to_pending_is_rejected() {
        let store = Store::new(":memory:").await.unwrap();
        let id = store.insert_bet(&bet("x")).await.unwrap();
        assert!(store.settle_bet_record(&id, BetResult::Pending, Decimal::ZERO).await.is_err());
    }
}

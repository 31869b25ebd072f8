use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::matching::dates::date_string;
use crate::matching::decision::FixtureKey;

/// Statuses (lowercase) that mark a score as final.
const FINAL_STATUSES: &[&str] = &["finished", "ft", "final", "completed", "aet", "pen", "ended"];

/// A scheduled or completed match, owned by ingestion.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Fixture {
    pub fixture_id: String,
    pub home_team_name: String,
    pub away_team_name: String,
    /// ISO-8601, possibly date-only.
    pub start_time: String,
    pub status: String,
}

impl Fixture {
    pub fn key(&self) -> FixtureKey<'_> {
        FixtureKey::new(&self.home_team_name, &self.away_team_name, &self.start_time)
    }

    /// Kickoff date as `YYYY-MM-DD`.
    pub fn date(&self) -> Option<String> {
        date_string(&self.start_time)
    }
}

/// A final-result record keyed by whatever id its source used.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Score {
    pub fixture_id: String,
    pub home_score: i64,
    pub away_score: i64,
    pub status: String,
}

impl Score {
    pub fn is_final(&self) -> bool {
        let status = self.status.trim().to_lowercase();
        FINAL_STATUSES.contains(&status.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreUpdate {
    pub home_score: u32,
    pub away_score: u32,
    pub status: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetResult {
    Pending,
    Win,
    Loss,
}

impl BetResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Win => "win",
            Self::Loss => "loss",
        }
    }
}

impl fmt::Display for BetResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BetResult {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "win" => Ok(Self::Win),
            "loss" => Ok(Self::Loss),
            other => anyhow::bail!("Unknown bet result: {other}"),
        }
    }
}

/// A placed wager as stored. Money columns are decimal strings.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BetRecord {
    pub id: String,
    pub fixture_id: String,
    pub market_id: String,
    pub outcome_id: String,
    pub odds: String,
    pub stake: String,
    pub result: String,
    pub payout: Option<String>,
    pub placed_at: Option<String>,
    pub settled_at: Option<String>,
}

impl BetRecord {
    pub fn is_pending(&self) -> bool {
        self.result == BetResult::Pending.as_str()
    }
}

#[derive(Debug, Clone)]
pub struct NewBet {
    pub fixture_id: String,
    pub market_id: String,
    pub outcome_id: String,
    pub odds: Decimal,
    pub stake: Decimal,
}

/// Inclusive kickoff window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn around(center: DateTime<Utc>, tolerance: Duration) -> Self {
        Self {
            start: center - tolerance,
            end: center + tolerance,
        }
    }
}

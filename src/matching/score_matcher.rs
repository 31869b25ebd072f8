//! Attach incoming final scores to known fixtures.
//!
//! A score arrives as (home, away, kickoff) with no id we can trust. The
//! matcher searches fixtures kicking off within the configured tolerance,
//! scores every candidate, and either returns the best fixture id or records
//! an [`UnmatchedRecord`] explaining why not. One shot per record: retries
//! belong to whoever schedules ingestion.

use std::fmt;

use anyhow::Result;
use chrono::Duration;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::db::{MatchStore, ScoreUpdate, TimeWindow};
use crate::matching::dates::{date_string, parse_timestamp};
use crate::matching::decision::{combined_similarity, FixtureKey, MatchingRules};
use crate::matching::synthetic_id::{encode, KNOWN_SOURCES};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmatchedReason {
    NoFixturesInWindow,
    BelowThreshold,
    InvalidMatchTime,
}

impl fmt::Display for UnmatchedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoFixturesInWindow => write!(f, "no fixtures in window"),
            Self::BelowThreshold => write!(f, "below threshold"),
            Self::InvalidMatchTime => write!(f, "unparseable match time"),
        }
    }
}

/// Audit entry for a score that could not be attached to a fixture.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnmatchedRecord {
    pub home: String,
    pub away: String,
    pub match_time: String,
    pub date: Option<String>,
    /// Best fixture considered, if any candidates existed.
    pub best_candidate: Option<String>,
    pub best_score: Option<f64>,
    pub reason: UnmatchedReason,
}

/// A final score as reported by a scraper.
#[derive(Debug, Clone)]
pub struct ScoreReport {
    pub source: String,
    pub home: String,
    pub away: String,
    pub match_time: String,
    pub home_score: u32,
    pub away_score: u32,
    pub status: String,
}

/// One matching session. The unmatched log lives as long as the matcher.
pub struct ScoreMatcher<'a> {
    store: &'a dyn MatchStore,
    rules: &'a MatchingRules,
    tolerance: Duration,
    unmatched: Vec<UnmatchedRecord>,
}

impl<'a> ScoreMatcher<'a> {
    /// `tolerance` is the half-width of the kickoff window searched for candidates.
    pub fn new(store: &'a dyn MatchStore, rules: &'a MatchingRules, tolerance: Duration) -> Self {
        Self {
            store,
            rules,
            tolerance,
            unmatched: Vec::new(),
        }
    }

    /// Find the fixture an incoming score belongs to.
    ///
    /// `Ok(None)` is a normal outcome and always leaves one entry in
    /// [`ScoreMatcher::unmatched`]. Only storage failures are errors.
    pub async fn match_score(&mut self, home: &str, away: &str, match_time: &str) -> Result<Option<String>> {
        let Some(kickoff) = parse_timestamp(match_time) else {
            self.record_unmatched(home, away, match_time, None, UnmatchedReason::InvalidMatchTime);
            return Ok(None);
        };

        let window = TimeWindow::around(kickoff, self.tolerance);
        let candidates = self.store.get_fixtures(Some(window)).await?;
        if candidates.is_empty() {
            self.record_unmatched(home, away, match_time, None, UnmatchedReason::NoFixturesInWindow);
            return Ok(None);
        }

        let incoming = FixtureKey::new(home, away, match_time);
        let mut best: Option<(&str, f64)> = None;
        for fixture in &candidates {
            let score = combined_similarity(&incoming, &fixture.key(), self.rules);
            debug!(
                fixture_id = %fixture.fixture_id,
                home = %fixture.home_team_name,
                away = %fixture.away_team_name,
                score,
                "Scored fixture candidate"
            );
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((fixture.fixture_id.as_str(), score));
            }
        }

        let Some((fixture_id, score)) = best else {
            return Ok(None);
        };

        if score >= f64::from(self.rules.min_score()) {
            info!(home, away, fixture_id, score, "Score matched to fixture");
            return Ok(Some(fixture_id.to_string()));
        }

        let best = Some((fixture_id.to_string(), score));
        self.record_unmatched(home, away, match_time, best, UnmatchedReason::BelowThreshold);
        Ok(None)
    }

    /// Match a reported score and store it under the matched fixture id, or
    /// under its synthetic id when no fixture matches so settlement can find
    /// it later. Returns the key used, or `None` if the report has no usable
    /// date or its source is not one synthetic ids can be decoded for.
    pub async fn record_score(&mut self, report: &ScoreReport) -> Result<Option<String>> {
        let key = match self.match_score(&report.home, &report.away, &report.match_time).await? {
            Some(fixture_id) => fixture_id,
            None => {
                let source = report.source.trim().to_lowercase();
                if !KNOWN_SOURCES.contains(&source.as_str()) {
                    warn!(
                        source = %report.source,
                        home = %report.home,
                        away = %report.away,
                        "Dropping unmatched score from unknown source"
                    );
                    return Ok(None);
                }
                let synthetic = encode(&source, &report.home, &report.away, &report.match_time);
                if synthetic.is_empty() {
                    warn!(
                        source = %report.source,
                        home = %report.home,
                        away = %report.away,
                        match_time = %report.match_time,
                        "Dropping score with no usable date"
                    );
                    return Ok(None);
                }
                synthetic
            }
        };

        let update = ScoreUpdate {
            home_score: report.home_score,
            away_score: report.away_score,
            status: report.status.clone(),
        };
        self.store.insert_score(&key, &update).await?;

        Ok(Some(key))
    }

    /// Unmatched records from this session, oldest first.
    pub fn unmatched(&self) -> &[UnmatchedRecord] {
        &self.unmatched
    }

    pub fn take_unmatched(&mut self) -> Vec<UnmatchedRecord> {
        std::mem::take(&mut self.unmatched)
    }

    fn record_unmatched(
        &mut self,
        home: &str,
        away: &str,
        match_time: &str,
        best: Option<(String, f64)>,
        reason: UnmatchedReason,
    ) {
        let (best_candidate, best_score) = match best {
            Some((id, score)) => (Some(id), Some(score)),
            None => (None, None),
        };

        warn!(
            home,
            away,
            match_time,
            best_candidate = best_candidate.as_deref().unwrap_or("-"),
            best_score = best_score.unwrap_or_default(),
            reason = %reason,
            "Score not matched to any fixture"
        );

        self.unmatched.push(UnmatchedRecord {
            home: home.to_string(),
            away: away.to_string(),
            match_time: match_time.to_string(),
            date: date_string(match_time),
            best_candidate,
            best_score,
            reason,
        });
    }
}

//! Bet settlement.
//!
//! Resolves pending bets against final scores. A bet carries the fixture id it
//! was placed on, but the score may have been recorded under a synthetic id
//! from another source. Lookup order:
//! 1. Score stored directly under the bet's fixture id.
//! 2. Otherwise, every final score whose synthetic id decodes to the fixture's
//!    date is tried against the fixture's teams under every home/away split.
//!    The highest combined similarity wins; ties keep the first key in id order.
//!
//! Settling writes through [`MatchStore::settle_bet_record`] exactly once per
//! bet. Re-running on a settled bet returns the stored result without writing.

use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::db::{BetRecord, BetResult, MatchStore, Score};
use crate::matching::decision::MatchingRules;
use crate::matching::synthetic_id::{best_split, decode};
use crate::settlement::error::SettlementError;
use crate::settlement::markets::bet_wins;

/// How the score behind a settlement was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementPath {
    /// Score keyed by the bet's own fixture id.
    Direct,
    /// Score keyed by a synthetic id that matched the fixture.
    Fallback,
    /// Bet was already settled; stored result returned unchanged.
    AlreadySettled,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SettlementOutcome {
    pub bet_id: String,
    pub result: BetResult,
    pub payout: Decimal,
    /// Key of the score used. `None` for already-settled bets.
    pub score_key: Option<String>,
    pub path: SettlementPath,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    Settled,
    AlreadySettled,
    Unresolved,
    Failed,
}

/// Per-bet line of a batch run.
#[derive(Debug, Clone, Serialize)]
pub struct BetAudit {
    pub bet_id: String,
    pub fixture_id: String,
    pub status: AuditStatus,
    pub result: Option<BetResult>,
    pub payout: Option<Decimal>,
    pub score_key: Option<String>,
    pub path: Option<SettlementPath>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchSettlementResult {
    pub total_pending: usize,
    pub settled: usize,
    pub wins: usize,
    pub losses: usize,
    pub total_payout: Decimal,
    pub results: Vec<BetAudit>,
}

impl BatchSettlementResult {
    pub fn count(&self, status: AuditStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }
}

impl fmt::Display for BatchSettlementResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "=== Settlement Run ===\n\
             Pending: {} | Settled: {} ({}W / {}L)\n\
             Total payout: {}\n\
             Unresolved: {} | Failed: {}",
            self.total_pending,
            self.settled,
            self.wins,
            self.losses,
            self.total_payout,
            self.count(AuditStatus::Unresolved),
            self.count(AuditStatus::Failed),
        )
    }
}

pub struct Reconciler<'a> {
    store: &'a dyn MatchStore,
    rules: &'a MatchingRules,
}

impl<'a> Reconciler<'a> {
    pub fn new(store: &'a dyn MatchStore, rules: &'a MatchingRules) -> Self {
        Self { store, rules }
    }

    /// Settle one bet against the score for `fixture_id`.
    ///
    /// `Ok(None)` means no final score is available yet and the bet stays pending.
    pub async fn settle_bet(
        &self,
        bet_id: &str,
        fixture_id: &str,
    ) -> Result<Option<SettlementOutcome>, SettlementError> {
        let bet = self
            .store
            .get_bet(bet_id)
            .await?
            .ok_or_else(|| SettlementError::BetNotFound(bet_id.to_string()))?;

        if !bet.is_pending() {
            debug!(bet_id, result = %bet.result, "Bet already settled");
            return stored_outcome(&bet).map(Some);
        }

        let Some((score, path)) = self.find_score(fixture_id).await? else {
            debug!(bet_id, fixture_id, "No final score yet");
            return Ok(None);
        };

        let won = bet_wins(&bet.market_id, &bet.outcome_id, score.home_score, score.away_score)?;
        let odds = parse_amount(&bet, "odds", &bet.odds)?;
        let stake = parse_amount(&bet, "stake", &bet.stake)?;
        let (result, payout) = if won {
            let payout = stake.checked_mul(odds).ok_or_else(|| SettlementError::InvalidAmount {
                bet_id: bet_id.to_string(),
                field: "payout",
                value: format!("{stake} * {odds}"),
            })?;
            (BetResult::Win, payout)
        } else {
            (BetResult::Loss, Decimal::ZERO)
        };

        let written = self.store.settle_bet_record(bet_id, result, payout).await?;
        if !written {
            // Another settler claimed the bet between our read and write
            let current = self
                .store
                .get_bet(bet_id)
                .await?
                .ok_or_else(|| SettlementError::BetNotFound(bet_id.to_string()))?;
            return stored_outcome(&current).map(Some);
        }

        info!(
            bet_id,
            fixture_id,
            score_key = %score.fixture_id,
            path = ?path,
            home_score = score.home_score,
            away_score = score.away_score,
            market = %bet.market_id,
            outcome = %bet.outcome_id,
            result = %result,
            payout = %payout,
            "Bet settled"
        );

        Ok(Some(SettlementOutcome {
            bet_id: bet_id.to_string(),
            result,
            payout,
            score_key: Some(score.fixture_id),
            path,
        }))
    }

    /// Settle every pending bet independently. Only a failure to list pending
    /// bets is returned as an error; per-bet failures land in the audit trail.
    pub async fn settle_pending_bets(&self) -> Result<BatchSettlementResult> {
        let pending = self
            .store
            .get_pending_bets()
            .await
            .context("Failed to load pending bets")?;

        let mut batch = BatchSettlementResult {
            total_pending: pending.len(),
            settled: 0,
            wins: 0,
            losses: 0,
            total_payout: Decimal::ZERO,
            results: Vec::with_capacity(pending.len()),
        };

        for bet in &pending {
            let audit = match self.settle_bet(&bet.id, &bet.fixture_id).await {
                Ok(Some(outcome)) => {
                    let status = if outcome.path == SettlementPath::AlreadySettled {
                        AuditStatus::AlreadySettled
                    } else {
                        batch.settled += 1;
                        match outcome.result {
                            BetResult::Win => batch.wins += 1,
                            BetResult::Loss => batch.losses += 1,
                            BetResult::Pending => {}
                        }
                        batch.total_payout = match batch.total_payout.checked_add(outcome.payout) {
                            Some(total) => total,
                            None => {
                                warn!(bet_id = %bet.id, "Total payout overflowed; capping at maximum");
                                Decimal::MAX
                            }
                        };
                        AuditStatus::Settled
                    };
                    BetAudit {
                        bet_id: bet.id.clone(),
                        fixture_id: bet.fixture_id.clone(),
                        status,
                        result: Some(outcome.result),
                        payout: Some(outcome.payout),
                        score_key: outcome.score_key,
                        path: Some(outcome.path),
                        reason: None,
                    }
                }
                Ok(None) => BetAudit {
                    bet_id: bet.id.clone(),
                    fixture_id: bet.fixture_id.clone(),
                    status: AuditStatus::Unresolved,
                    result: None,
                    payout: None,
                    score_key: None,
                    path: None,
                    reason: Some("no final score found".to_string()),
                },
                Err(e) => {
                    warn!(bet_id = %bet.id, fixture_id = %bet.fixture_id, error = %e, "Failed to settle bet");
                    BetAudit {
                        bet_id: bet.id.clone(),
                        fixture_id: bet.fixture_id.clone(),
                        status: AuditStatus::Failed,
                        result: None,
                        payout: None,
                        score_key: None,
                        path: None,
                        reason: Some(e.to_string()),
                    }
                }
            };
            batch.results.push(audit);
        }

        info!(
            total_pending = batch.total_pending,
            settled = batch.settled,
            wins = batch.wins,
            losses = batch.losses,
            total_payout = %batch.total_payout,
            unresolved = batch.count(AuditStatus::Unresolved),
            failed = batch.count(AuditStatus::Failed),
            "Settlement run complete"
        );

        Ok(batch)
    }

    async fn find_score(&self, fixture_id: &str) -> Result<Option<(Score, SettlementPath)>, SettlementError> {
        if let Some(score) = self.store.get_scores(Some(fixture_id)).await?.into_iter().next() {
            if score.is_final() {
                return Ok(Some((score, SettlementPath::Direct)));
            }
            debug!(fixture_id, status = %score.status, "Score present but not final");
            return Ok(None);
        }

        let fixture = self
            .store
            .get_fixture_by_id(fixture_id)
            .await?
            .ok_or_else(|| SettlementError::MissingFixture(fixture_id.to_string()))?;

        let Some(date) = fixture.date() else {
            warn!(fixture_id, start_time = %fixture.start_time, "Fixture has no usable date");
            return Ok(None);
        };

        let mut best: Option<(Score, f64)> = None;
        for score in self.store.get_scores(None).await? {
            if !score.is_final() {
                continue;
            }
            let same_day = decode(&score.fixture_id).is_some_and(|decoded| decoded.date_string() == date);
            if !same_day {
                continue;
            }
            let Some(split) = best_split(&score.fixture_id, fixture.key(), self.rules) else {
                continue;
            };
            debug!(
                fixture_id,
                score_key = %score.fixture_id,
                home = %split.home,
                away = %split.away,
                combined = split.combined,
                is_match = split.is_match,
                "Fallback candidate"
            );
            if !split.is_match {
                continue;
            }
            if best.as_ref().map_or(true, |(_, combined)| split.combined > *combined) {
                best = Some((score, split.combined));
            }
        }

        Ok(best.map(|(score, _)| (score, SettlementPath::Fallback)))
    }
}

fn parse_amount(bet: &BetRecord, field: &'static str, value: &str) -> Result<Decimal, SettlementError> {
    Decimal::from_str(value).map_err(|_| SettlementError::InvalidAmount {
        bet_id: bet.id.clone(),
        field,
        value: value.to_string(),
    })
}

fn stored_outcome(bet: &BetRecord) -> Result<SettlementOutcome, SettlementError> {
    let result = BetResult::from_str(&bet.result)?;
    let payout = match bet.payout.as_deref() {
        Some(p) => parse_amount(bet, "payout", p)?,
        None => Decimal::ZERO,
    };
    Ok(SettlementOutcome {
        bet_id: bet.id.clone(),
        result,
        payout,
        score_key: None,
        path: SettlementPath::AlreadySettled,
    })
}

//! "Same fixture" verdicts.
//!
//! The kickoff date is a hard filter: two dated records on different days are
//! never the same fixture, however similar the names. Otherwise the verdict is
//! the average of the home and away similarities compared to a threshold.

use std::sync::Arc;

use serde::Serialize;

use crate::matching::dates::normalize_date;
use crate::matching::normalize::TeamAliases;
use crate::matching::similarity::{similarity, NameScorer, ScorerKind};

pub const DEFAULT_MIN_MATCH_SCORE: u8 = 75;

/// Explicit matching parameters passed to every matcher call.
#[derive(Debug, Clone)]
pub struct MatchingRules {
    aliases: TeamAliases,
    scorer: Arc<dyn NameScorer>,
    min_score: u8,
}

impl MatchingRules {
    pub fn new(aliases: TeamAliases, kind: ScorerKind, min_score: u8) -> Self {
        Self {
            aliases,
            scorer: kind.build(),
            min_score,
        }
    }

    /// Use a custom scorer implementation instead of a built-in backend.
    pub fn with_scorer(aliases: TeamAliases, scorer: Arc<dyn NameScorer>, min_score: u8) -> Self {
        Self {
            aliases,
            scorer,
            min_score,
        }
    }

    pub fn aliases(&self) -> &TeamAliases {
        &self.aliases
    }

    pub fn scorer(&self) -> &dyn NameScorer {
        self.scorer.as_ref()
    }

    pub fn min_score(&self) -> u8 {
        self.min_score
    }

    /// Same aliases and scorer with a different threshold.
    pub fn with_min_score(&self, min_score: u8) -> Self {
        Self {
            min_score,
            ..self.clone()
        }
    }

    pub fn similarity(&self, a: &str, b: &str) -> u8 {
        similarity(a, b, &self.aliases, self.scorer())
    }
}

impl Default for MatchingRules {
    fn default() -> Self {
        Self::new(TeamAliases::empty(), ScorerKind::default(), DEFAULT_MIN_MATCH_SCORE)
    }
}

/// One side of a comparison: who played and when.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FixtureKey<'a> {
    pub home: &'a str,
    pub away: &'a str,
    pub date: &'a str,
}

impl<'a> FixtureKey<'a> {
    pub fn new(home: &'a str, away: &'a str, date: &'a str) -> Self {
        Self { home, away, date }
    }
}

/// Outcome of comparing two fixture keys. Never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct MatchDecision<'a> {
    pub left: FixtureKey<'a>,
    pub right: FixtureKey<'a>,
    pub home_score: u8,
    pub away_score: u8,
    pub combined: f64,
    /// Both dates parsed and differ; names were not scored.
    pub date_conflict: bool,
    pub is_match: bool,
}

/// Average of the home and away similarities.
pub fn combined_similarity(left: &FixtureKey<'_>, right: &FixtureKey<'_>, rules: &MatchingRules) -> f64 {
    name_scores(left, right, rules).2
}

/// `(home, away, combined)` name similarities, dates ignored.
fn name_scores(left: &FixtureKey<'_>, right: &FixtureKey<'_>, rules: &MatchingRules) -> (u8, u8, f64) {
    let home = rules.similarity(left.home, right.home);
    let away = rules.similarity(left.away, right.away);
    (home, away, (f64::from(home) + f64::from(away)) / 2.0)
}

/// Compare two fixture keys under `rules`.
pub fn decide<'a>(
    left: FixtureKey<'a>,
    right: FixtureKey<'a>,
    rules: &MatchingRules,
) -> MatchDecision<'a> {
    if let (Some(l), Some(r)) = (normalize_date(left.date), normalize_date(right.date)) {
        if l != r {
            return MatchDecision {
                left,
                right,
                home_score: 0,
                away_score: 0,
                combined: 0.0,
                date_conflict: true,
                is_match: false,
            };
        }
    }

    let (home_score, away_score, combined) = name_scores(&left, &right, rules);

    MatchDecision {
        left,
        right,
        home_score,
        away_score,
        combined,
        date_conflict: false,
        is_match: combined >= f64::from(rules.min_score()),
    }
}

/// True when both keys denote the same fixture under `rules`.
pub fn same_match(left: FixtureKey<'_>, right: FixtureKey<'_>, rules: &MatchingRules) -> bool {
    decide(left, right, rules).is_match
}

//! Team name similarity scoring.
//!
//! Two backends implement [`NameScorer`]:
//! - [`FuzzyScorer`]: max of edit-distance ratio, best-window partial ratio and
//!   token-sorted ratio (strsim). Handles truncation, word reordering and
//!   spelling drift at the same time.
//! - [`TokenScorer`]: lower-fidelity fallback using substring containment and
//!   shared-token overlap only. It under-scores spelling drift ("Utd" vs
//!   "United") and should only be selected when the fuzzy backend is unwanted.
//!
//! The backend is picked once from configuration via [`ScorerKind`].

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use strsim::normalized_levenshtein;

use crate::matching::normalize::{normalize, TeamAliases};

/// Score returned when one normalized name contains the other (token backend).
const CONTAINMENT_SCORE: u8 = 85;

/// Similarity backend over already-normalized names. Returns 0..=100.
pub trait NameScorer: Send + Sync + fmt::Debug {
    fn score(&self, a: &str, b: &str) -> u8;

    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScorerKind {
    #[default]
    Fuzzy,
    Token,
}

impl ScorerKind {
    pub fn build(self) -> Arc<dyn NameScorer> {
        match self {
            Self::Fuzzy => Arc::new(FuzzyScorer),
            Self::Token => Arc::new(TokenScorer),
        }
    }
}

impl fmt::Display for ScorerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fuzzy => write!(f, "fuzzy"),
            Self::Token => write!(f, "token"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FuzzyScorer;

impl NameScorer for FuzzyScorer {
    fn score(&self, a: &str, b: &str) -> u8 {
        let best = ratio(a, b)
            .max(partial_ratio(a, b))
            .max(token_sort_ratio(a, b));
        to_percent(best)
    }

    fn name(&self) -> &'static str {
        "fuzzy"
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokenScorer;

impl NameScorer for TokenScorer {
    fn score(&self, a: &str, b: &str) -> u8 {
        if a.is_empty() || b.is_empty() {
            return 0;
        }
        if a.contains(b) || b.contains(a) {
            return CONTAINMENT_SCORE;
        }

        let a_tokens: HashSet<&str> = a.split_whitespace().collect();
        let b_tokens: HashSet<&str> = b.split_whitespace().collect();
        let union = a_tokens.union(&b_tokens).count();
        if union == 0 {
            return 0;
        }
        let shared = a_tokens.intersection(&b_tokens).count();
        to_percent(shared as f64 / union as f64)
    }

    fn name(&self) -> &'static str {
        "token"
    }
}

/// Plain edit-distance ratio (0.0 - 1.0).
fn ratio(a: &str, b: &str) -> f64 {
    normalized_levenshtein(a, b)
}

/// Best ratio of the shorter string against every same-length window of the longer one.
fn partial_ratio(a: &str, b: &str) -> f64 {
    let (short, long) = if a.chars().count() <= b.chars().count() {
        (a, b)
    } else {
        (b, a)
    };

    let short_len = short.chars().count();
    if short_len == 0 {
        return 0.0;
    }

    let long_chars: Vec<char> = long.chars().collect();
    if short_len == long_chars.len() {
        return ratio(short, long);
    }

    let mut best: f64 = 0.0;
    for window in long_chars.windows(short_len) {
        let candidate: String = window.iter().collect();
        best = best.max(ratio(short, &candidate));
        if best >= 1.0 {
            break;
        }
    }
    best
}

/// Ratio after sorting whitespace-separated tokens, so word order is ignored.
fn token_sort_ratio(a: &str, b: &str) -> f64 {
    ratio(&sorted_tokens(a), &sorted_tokens(b))
}

fn sorted_tokens(s: &str) -> String {
    let mut tokens: Vec<&str> = s.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

fn to_percent(score: f64) -> u8 {
    (score.clamp(0.0, 1.0) * 100.0).round() as u8
}

/// Confidence (0-100) that two raw team names denote the same team.
///
/// Both names are normalized first; identical normalized names score 100 and an
/// empty name never matches anything.
pub fn similarity(a: &str, b: &str, aliases: &TeamAliases, scorer: &dyn NameScorer) -> u8 {
    let a = normalize(a, aliases);
    let b = normalize(b, aliases);

    if a.is_empty() || b.is_empty() {
        return 0;
    }
    if a == b {
        return 100;
    }
    scorer.score(&a, &b).min(100)
}

//! Team-name and fixture matching across data sources.

pub mod dates;
pub mod decision;
pub mod normalize;
pub mod score_matcher;
pub mod similarity;
pub mod synthetic_id;

pub use decision::{combined_similarity, decide, same_match, FixtureKey, MatchDecision, MatchingRules};
pub use normalize::{normalize, TeamAliases};
pub use score_matcher::{ScoreMatcher, ScoreReport, UnmatchedReason, UnmatchedRecord};
pub use similarity::{similarity, FuzzyScorer, NameScorer, ScorerKind, TokenScorer};

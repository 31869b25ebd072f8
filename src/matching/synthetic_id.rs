//! Synthetic fixture identifiers.
//!
//! Sources without a stable fixture id are keyed as
//! `source_Home_Team_Away_Team_YYYY-MM-DD`. Nothing separates the home tokens
//! from the away tokens, so a multi-word pair cannot be split reliably.
//! [`DecodedId::home`]/[`DecodedId::away`] give a single best-effort split for
//! display only. Matching always goes through [`matches_fixture`], which tries
//! every split point.

use chrono::NaiveDate;
use serde::Serialize;

use crate::matching::dates::{date_string, is_date_token};
use crate::matching::decision::{decide, FixtureKey, MatchingRules};

/// Source prefixes recognized by [`decode`].
pub const KNOWN_SOURCES: &[&str] = &[
    "flashscore",
    "sofascore",
    "oddsportal",
    "betexplorer",
    "fotmob",
    "espn",
];

const HOME_PLACEHOLDER: &str = "Home";
const AWAY_PLACEHOLDER: &str = "Away";

/// Build a synthetic id. Returns an empty string when `date` cannot be parsed.
pub fn encode(source: &str, home: &str, away: &str, date: &str) -> String {
    let Some(date) = date_string(date) else {
        return String::new();
    };
    format!(
        "{}_{}_{}_{}",
        source.trim(),
        id_component(home, HOME_PLACEHOLDER),
        id_component(away, AWAY_PLACEHOLDER),
        date
    )
}

fn id_component(name: &str, placeholder: &str) -> String {
    let joined = name.split_whitespace().collect::<Vec<_>>().join("_");
    if joined.is_empty() {
        placeholder.to_string()
    } else {
        joined
    }
}

/// A parsed synthetic id: source, the undivided team-token run, and the date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedId {
    source: String,
    /// At least two tokens; `decode` is the only constructor.
    tokens: Vec<String>,
    date: NaiveDate,
}

impl DecodedId {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Heuristic home name: every team token but the last. Wrong for multi-word away names.
    pub fn home(&self) -> String {
        match self.tokens.split_last() {
            Some((_, rest)) => rest.join(" "),
            None => String::new(),
        }
    }

    /// Heuristic away name: the last team token.
    pub fn away(&self) -> String {
        self.tokens.last().cloned().unwrap_or_default()
    }

    pub fn date_string(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }

    /// Every `(home, away)` split of the team tokens, first split point first.
    pub fn splits(&self) -> impl Iterator<Item = (String, String)> + '_ {
        (1..self.tokens.len()).map(move |i| (self.tokens[..i].join(" "), self.tokens[i..].join(" ")))
    }
}

/// Parse a synthetic id. `None` for unknown sources or ids without a date or
/// without at least two team tokens before it.
pub fn decode(id: &str) -> Option<DecodedId> {
    let (source, rest) = KNOWN_SOURCES.iter().find_map(|source| {
        id.strip_prefix(source)
            .and_then(|rest| rest.strip_prefix('_'))
            .map(|rest| (*source, rest))
    })?;

    let parts: Vec<&str> = rest.split('_').collect();
    let date_idx = parts.iter().rposition(|part| is_date_token(part))?;
    let date = NaiveDate::parse_from_str(parts[date_idx], "%Y-%m-%d").ok()?;

    let tokens: Vec<String> = parts[..date_idx]
        .iter()
        .filter(|part| !part.is_empty())
        .map(|part| part.to_string())
        .collect();
    if tokens.len() < 2 {
        return None;
    }

    Some(DecodedId {
        source: source.to_string(),
        tokens,
        date,
    })
}

/// Best split of a synthetic id against a fixture.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SplitMatch {
    pub home: String,
    pub away: String,
    pub combined: f64,
    pub is_match: bool,
}

/// Score every split of `id` against `fixture` and keep the highest combined
/// similarity (earliest split on ties). `None` if `id` does not decode.
pub fn best_split(id: &str, fixture: FixtureKey<'_>, rules: &MatchingRules) -> Option<SplitMatch> {
    let decoded = decode(id)?;
    let date = decoded.date_string();

    let mut best: Option<SplitMatch> = None;
    for (home, away) in decoded.splits() {
        let decision = decide(FixtureKey::new(&home, &away, &date), fixture, rules);
        if decision.date_conflict {
            return Some(SplitMatch {
                home,
                away,
                combined: 0.0,
                is_match: false,
            });
        }
        let better = best.as_ref().map_or(true, |b| decision.combined > b.combined);
        if better {
            let (combined, is_match) = (decision.combined, decision.is_match);
            best = Some(SplitMatch {
                home,
                away,
                combined,
                is_match,
            });
        }
    }
    best
}

/// True if any split of `id` matches `fixture` under `rules`.
pub fn matches_fixture(id: &str, fixture: FixtureKey<'_>, rules: &MatchingRules) -> bool {
    best_split(id, fixture, rules).is_some_and(|m| m.is_match)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> MatchingRules {
        MatchingRules::default()
    }

    #[test]
    fn test_encode_basic() {
        assert_eq!(
            encode("flashscore", "Spezia", "Sampdoria", "2025-11-30T14:00:00Z"),
            "flashscore_Spezia_Sampdoria_2025-11-30"
        );
        assert_eq!(
            encode("sofascore", "Real  Madrid", "Atletico Madrid", "2025-01-15"),
            "sofascore_Real_Madrid_Atletico_Madrid_2025-01-15"
        );
    }

    #[test]
    fn test_encode_placeholders_and_bad_date() {
        assert_eq!(encode("flashscore", "", " ", "2025-01-15"), "flashscore_Home_Away_2025-01-15");
        assert_eq!(encode("flashscore", "A", "B", "not a date"), "");
    }

    #[test]
    fn test_decode_single_word_names() {
        let decoded = decode("flashscore_Spezia_Sampdoria_2025-11-30").expect("should decode");
        assert_eq!(decoded.source(), "flashscore");
        assert_eq!(decoded.home(), "Spezia");
        assert_eq!(decoded.away(), "Sampdoria");
        assert_eq!(decoded.date_string(), "2025-11-30");
        assert_eq!(decoded.date(), NaiveDate::from_ymd_opt(2025, 11, 30).unwrap());
    }

    #[test]
    fn test_decode_heuristic_is_best_effort() {
        let decoded = decode("flashscore_Real_Madrid_Atletico_Madrid_2025-01-15").expect("should decode");
        // Single split guess puts everything but the last token at home
        assert_eq!(decoded.home(), "Real Madrid Atletico");
        assert_eq!(decoded.away(), "Madrid");
        assert_eq!(decoded.splits().count(), 3);
    }

    #[test]
    fn test_decode_rejects_malformed() {
        assert_eq!(decode("79560484"), None);
        assert_eq!(decode("unknownsource_A_B_2025-01-15"), None);
        assert_eq!(decode("flashscore_A_B"), None);
        assert_eq!(decode("flashscore_OnlyOne_2025-01-15"), None);
        assert_eq!(decode("flashscoreX_A_B_2025-01-15"), None);
        assert_eq!(decode(""), None);
    }

    #[test]
    fn test_decode_ignores_trailing_tokens() {
        let decoded = decode("oddsportal_A_B_2025-01-15_extra").expect("should decode");
        assert_eq!(decoded.tokens(), ["A", "B"]);
    }

    #[test]
    fn test_round_trip_source_and_date() {
        for source in KNOWN_SOURCES {
            let id = encode(source, "Lecce", "Torino", "2025-03-02T20:45:00+01:00");
            let decoded = decode(&id).expect("should decode");
            assert_eq!(decoded.source(), *source);
            assert_eq!(decoded.date_string(), "2025-03-02");
            assert_eq!(decoded.home(), "Lecce");
            assert_eq!(decoded.away(), "Torino");
        }
    }

    #[test]
    fn test_multi_word_split_search() {
        let fixture = FixtureKey::new("Real Madrid", "Atletico Madrid", "2025-01-15T18:00:00");
        assert!(matches_fixture(
            "flashscore_Real_Madrid_Atletico_Madrid_2025-01-15",
            fixture,
            &rules()
        ));

        let unrelated = FixtureKey::new("Chelsea", "Arsenal", "2025-01-15T18:00:00");
        assert!(!matches_fixture(
            "flashscore_Real_Madrid_Atletico_Madrid_2025-01-15",
            unrelated,
            &rules()
        ));
    }

    #[test]
    fn test_encoded_multi_word_always_matches() {
        let cases = [
            ("Paris Saint Germain", "Olympique de Marseille"),
            ("Borussia Monchengladbach", "Bayern Munich"),
            ("Inter", "AC Milan"),
            ("West Ham United", "Brighton and Hove Albion"),
        ];
        for (home, away) in cases {
            let id = encode("sofascore", home, away, "2025-04-01T19:00:00Z");
            assert!(
                matches_fixture(&id, FixtureKey::new(home, away, "2025-04-01"), &rules()),
                "{id} should match {home} vs {away}"
            );
        }
    }

    #[test]
    fn test_best_split_scores_full_match() {
        let fixture = FixtureKey::new("West Ham United", "Brighton", "2025-04-01");
        let best = best_split("fotmob_West_Ham_United_Brighton_2025-04-01", fixture, &rules())
            .expect("should decode");
        assert_eq!(best.combined, 100.0);
        assert!(best.is_match);
    }

    #[test]
    fn test_best_split_skips_weaker_splits() {
        let fixture = FixtureKey::new("Napoli", "Hellas Verona", "2025-04-01");
        let best = best_split("espn_Napoli_Hellas_Verona_2025-04-01", fixture, &rules())
            .expect("should decode");
        assert_eq!(best.home, "Napoli");
        assert_eq!(best.away, "Hellas Verona");
    }

    #[test]
    fn test_date_mismatch_never_matches() {
        let fixture = FixtureKey::new("Spezia", "Sampdoria", "2025-12-01");
        assert!(!matches_fixture("flashscore_Spezia_Sampdoria_2025-11-30", fixture, &rules()));
    }

    #[test]
    fn test_malformed_id_is_no_match() {
        let fixture = FixtureKey::new("Spezia", "Sampdoria", "2025-11-30");
        assert!(!matches_fixture("garbage", fixture, &rules()));
        assert_eq!(best_split("garbage", fixture, &rules()), None);
    }
}

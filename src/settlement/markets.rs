//! Map a bet's market and outcome onto a final score.
//!
//! Supported families:
//! - 1X2 (`1x2`, `h2h`, `match_winner`, `moneyline`): `home`/`1`, `draw`/`x`, `away`/`2`
//! - Totals (`over_under`, `totals`, optionally with the line appended, e.g.
//!   `over_under_2.5`): `over_<line>` / `under_<line>`, or bare `over`/`under`
//!   when the line is on the market id. Landing exactly on the line loses.
//! - Both teams to score (`btts`, `both_teams_to_score`): `yes` / `no`

use std::str::FromStr;

use rust_decimal::Decimal;

use crate::settlement::error::SettlementError;

const MATCH_RESULT_MARKETS: &[&str] = &["1x2", "h2h", "match_winner", "moneyline"];
const TOTALS_PREFIXES: &[&str] = &["over_under", "totals"];
const BTTS_MARKETS: &[&str] = &["btts", "both_teams_to_score"];

/// Whether `outcome_id` on `market_id` wins given the final score.
pub fn bet_wins(
    market_id: &str,
    outcome_id: &str,
    home_score: i64,
    away_score: i64,
) -> Result<bool, SettlementError> {
    let market = market_id.trim().to_lowercase();
    let outcome = outcome_id.trim().to_lowercase();
    let unsupported = || SettlementError::UnsupportedMarket {
        market_id: market_id.to_string(),
        outcome_id: outcome_id.to_string(),
    };

    if MATCH_RESULT_MARKETS.contains(&market.as_str()) {
        return match outcome.as_str() {
            "home" | "1" => Ok(home_score > away_score),
            "draw" | "x" => Ok(home_score == away_score),
            "away" | "2" => Ok(away_score > home_score),
            _ => Err(unsupported()),
        };
    }

    if BTTS_MARKETS.contains(&market.as_str()) {
        let both_scored = home_score > 0 && away_score > 0;
        return match outcome.as_str() {
            "yes" => Ok(both_scored),
            "no" => Ok(!both_scored),
            _ => Err(unsupported()),
        };
    }

    if let Some(market_line) = TOTALS_PREFIXES
        .iter()
        .find_map(|prefix| market.strip_prefix(prefix))
    {
        let (side, outcome_line) = split_side_and_line(&outcome);
        let line = outcome_line
            .or_else(|| parse_line(market_line.trim_start_matches('_')))
            .ok_or_else(unsupported)?;
        let total = Decimal::from(home_score + away_score);
        return match side {
            "over" => Ok(total > line),
            "under" => Ok(total < line),
            _ => Err(unsupported()),
        };
    }

    Err(unsupported())
}

/// `"over_2.5"` / `"over 2.5"` -> `("over", Some(2.5))`; `"over"` -> `("over", None)`.
fn split_side_and_line(outcome: &str) -> (&str, Option<Decimal>) {
    match outcome.split_once(|c: char| c == '_' || c == ' ') {
        Some((side, line)) => (side, parse_line(line)),
        None => (outcome, None),
    }
}

fn parse_line(s: &str) -> Option<Decimal> {
    if s.is_empty() {
        return None;
    }
    Decimal::from_str(s.trim()).ok()
}

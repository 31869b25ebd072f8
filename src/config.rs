use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::Duration;
use serde::Deserialize;

use crate::db::MatchStore;
use crate::matching::decision::MatchingRules;
use crate::matching::normalize::TeamAliases;
use crate::matching::score_matcher::ScoreMatcher;
use crate::matching::similarity::ScorerKind;

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Upper bound for `matching_tolerance_hours` (one week).
pub const MAX_TOLERANCE_HOURS: i64 = 168;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub matching: MatchingConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub monitoring: MonitoringConfig,
    /// Raw team name -> canonical team name.
    #[serde(default)]
    pub team_aliases: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingConfig {
    #[serde(default = "default_min_match_score")]
    pub min_match_score: u8,
    #[serde(default = "default_tolerance_hours")]
    pub matching_tolerance_hours: i64,
    #[serde(default)]
    pub scorer: ScorerKind,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            min_match_score: default_min_match_score(),
            matching_tolerance_hours: default_tolerance_hours(),
            scorer: ScorerKind::default(),
        }
    }
}

impl MatchingConfig {
    /// Kickoff tolerance for the score matcher, in `0..=MAX_TOLERANCE_HOURS` hours.
    pub fn tolerance(&self) -> Result<Duration> {
        let hours = self.matching_tolerance_hours;
        if !(0..=MAX_TOLERANCE_HOURS).contains(&hours) {
            bail!("matching_tolerance_hours must be between 0 and {MAX_TOLERANCE_HOURS}, got {hours}");
        }
        Duration::try_hours(hours)
            .with_context(|| format!("matching_tolerance_hours out of range: {hours}"))
    }
}

fn default_min_match_score() -> u8 {
    75
}

fn default_tolerance_hours() -> i64 {
    2
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

impl AppConfig {
    /// Load configuration from a TOML file. `RECONCILER_DB_PATH` overrides the database path.
    pub fn load(config_path: &Path) -> Result<Self> {
        dotenvy::dotenv().ok();

        let contents = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        if let Ok(path) = std::env::var("RECONCILER_DB_PATH") {
            config.database.path = path;
        }

        config
            .matching
            .tolerance()
            .with_context(|| format!("Invalid [matching] section in {}", config_path.display()))?;

        Ok(config)
    }

    /// Score matcher using the configured kickoff tolerance.
    pub fn score_matcher<'a>(
        &self,
        store: &'a dyn MatchStore,
        rules: &'a MatchingRules,
    ) -> Result<ScoreMatcher<'a>> {
        Ok(ScoreMatcher::new(store, rules, self.matching.tolerance()?))
    }

    /// Build the explicit matching parameters threaded through every matcher call.
    pub fn matching_rules(&self) -> MatchingRules {
        MatchingRules::new(
            TeamAliases::new(&self.team_aliases),
            self.matching.scorer,
            self.matching.min_match_score,
        )
    }
}

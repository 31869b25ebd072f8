//! Team name canonicalization.
//!
//! Scrapers disagree on casing, spacing and club suffixes ("Arsenal FC" vs
//! "arsenal"). Everything that compares team names goes through [`normalize`]
//! first so the similarity scorer only sees the meaningful part of the name.

use std::collections::{HashMap, HashSet};

/// Organizational suffixes dropped from the end of a team name.
const CLUB_SUFFIXES: &[&str] = &["fc", "cf", "sc", "ac", "afc", "bc"];

/// Raw-name -> canonical-name lookup applied after suffix stripping.
///
/// Keys and targets are stored in canonical form and alias chains
/// (`a -> b`, `b -> c`) are collapsed at construction, so a resolved
/// name never resolves again.
#[derive(Debug, Clone, Default)]
pub struct TeamAliases {
    map: HashMap<String, String>,
}

impl TeamAliases {
    pub fn new(raw: &HashMap<String, String>) -> Self {
        let direct: HashMap<String, String> = raw
            .iter()
            .map(|(from, to)| (canonical_form(from), canonical_form(to)))
            .filter(|(from, to)| !from.is_empty() && !to.is_empty() && from != to)
            .collect();

        let mut map = HashMap::with_capacity(direct.len());
        for (from, to) in &direct {
            match follow_chain(&direct, from, to) {
                Some(target) => {
                    map.insert(from.clone(), target);
                }
                None => {
                    tracing::warn!(alias = %from, "Ignoring cyclic team alias");
                }
            }
        }

        Self { map }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    fn resolve(&self, canonical: &str) -> Option<&str> {
        self.map.get(canonical).map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TeamAliases {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let raw: HashMap<String, String> = iter
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self::new(&raw)
    }
}

/// Follow `from -> to -> ...` until reaching a name that is not itself an alias.
/// Returns `None` when the chain loops back on itself.
fn follow_chain(direct: &HashMap<String, String>, from: &str, to: &str) -> Option<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    seen.insert(from);
    let mut target = to;
    while let Some(next) = direct.get(target) {
        if !seen.insert(target) {
            return None;
        }
        target = next;
    }
    if seen.contains(target) {
        return None;
    }
    Some(target.to_string())
}

/// Lowercase, collapse whitespace, and strip trailing club suffixes.
///
/// A suffix is only stripped when it is a separate trailing word and not the
/// whole name, so "Arsenal FC" becomes "arsenal" but "AC" stays "ac".
fn canonical_form(name: &str) -> String {
    let lowered = name.to_lowercase();
    let mut tokens: Vec<&str> = lowered.split_whitespace().collect();
    while tokens.len() > 1 && tokens.last().is_some_and(|t| CLUB_SUFFIXES.contains(t)) {
        tokens.pop();
    }
    tokens.join(" ")
}

/// Canonicalize a raw team name into its comparable form.
///
/// Idempotent: `normalize(&normalize(x, a), a) == normalize(x, a)`.
pub fn normalize(name: &str, aliases: &TeamAliases) -> String {
    let base = canonical_form(name);
    match aliases.resolve(&base) {
        Some(target) => target.to_string(),
        None => base,
    }
}

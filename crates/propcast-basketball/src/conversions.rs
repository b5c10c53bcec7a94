// Name and team canonicalization between the odds site, the contest sites,
// and other stat sources.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("unknown team name {0:?}")]
    UnknownTeamName(String),

    #[error("unknown team abbreviation {0:?}")]
    UnknownTeamAbbrev(String),
}

/// Lookup service passed to everything that matches names across sources.
///
/// Name resolution is total (falls back to the cleaned input). Team
/// resolution covers a closed set, so an unknown team is an error.
pub trait Lookup: Send + Sync {
    /// Canonical player name for a raw scraped or contest-file name.
    fn resolve_name(&self, raw: &str) -> String;

    /// Canonical abbreviation for a raw abbreviation (`GSW` -> `GS`).
    fn resolve_team(&self, raw: &str) -> Result<String, LookupError>;

    /// Canonical abbreviation for a full team name (`Boston Celtics` -> `BOS`).
    fn team_abbrev(&self, full_name: &str) -> Result<String, LookupError>;
}

const TEAMS: [(&str, &str); 30] = [
    ("ATL", "Atlanta Hawks"),
    ("BKN", "Brooklyn Nets"),
    ("BOS", "Boston Celtics"),
    ("CHA", "Charlotte Hornets"),
    ("CHI", "Chicago Bulls"),
    ("CLE", "Cleveland Cavaliers"),
    ("DAL", "Dallas Mavericks"),
    ("DEN", "Denver Nuggets"),
    ("DET", "Detroit Pistons"),
    ("GS", "Golden State Warriors"),
    ("HOU", "Houston Rockets"),
    ("IND", "Indiana Pacers"),
    ("LAC", "Los Angeles Clippers"),
    ("LAL", "Los Angeles Lakers"),
    ("MEM", "Memphis Grizzlies"),
    ("MIA", "Miami Heat"),
    ("MIL", "Milwaukee Bucks"),
    ("MIN", "Minnesota Timberwolves"),
    ("NO", "New Orleans Pelicans"),
    ("NY", "New York Knicks"),
    ("OKC", "Oklahoma City Thunder"),
    ("ORL", "Orlando Magic"),
    ("PHI", "Philadelphia 76ers"),
    ("PHO", "Phoenix Suns"),
    ("POR", "Portland Trail Blazers"),
    ("SA", "San Antonio Spurs"),
    ("SAC", "Sacramento Kings"),
    ("TOR", "Toronto Raptors"),
    ("UTA", "Utah Jazz"),
    ("WAS", "Washington Wizards"),
];

/// Abbreviations used by contest sites and reference sites that differ from
/// the odds site's.
const TEAM_ALIASES: [(&str, &str); 8] = [
    ("BRK", "BKN"),
    ("CHO", "CHA"),
    ("GSW", "GS"),
    ("NOP", "NO"),
    ("NYK", "NY"),
    ("PHX", "PHO"),
    ("SAS", "SA"),
    ("WSH", "WAS"),
];

/// Other-source name -> contest-site name.
const NAME_ALIASES: [(&str, &str); 11] = [
    ("Alex Sarr", "Alexandre Sarr"),
    ("Carlton Carrington", "Bub Carrington"),
    ("David Jones-Garcia", "David Jones"),
    ("Devonte Graham", "Devonte' Graham"),
    ("KJ Martin", "Kenyon Martin"),
    ("Kenneth Simpson", "KJ Simpson"),
    ("Lu Dort", "Luguentz Dort"),
    ("Moe Wagner", "Moritz Wagner"),
    ("Robert Dillingham", "Rob Dillingham"),
    ("Ron Holland", "Ronald Holland"),
    ("Shaq Harrison", "Shaquille Harrison"),
];

/// Default transformation applied before any alias lookup: keep the first
/// two words and drop periods (`P.J. Washington Jr.` -> `PJ Washington`).
pub fn clean_name(raw: &str) -> String {
    raw.split_whitespace()
        .take(2)
        .collect::<Vec<_>>()
        .join(" ")
        .replace('.', "")
}

/// Table-backed `Lookup`. Built once at startup.
#[derive(Debug, Clone)]
pub struct Conversions {
    names: HashMap<String, String>,
    team_aliases: HashMap<String, String>,
    abbrev_to_team: HashMap<String, String>,
    team_to_abbrev: HashMap<String, String>,
}

impl Default for Conversions {
    fn default() -> Self {
        Self::new()
    }
}

impl Conversions {
    pub fn new() -> Self {
        let to_map = |pairs: &[(&str, &str)]| -> HashMap<String, String> {
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
        };
        Self {
            names: to_map(&NAME_ALIASES),
            team_aliases: to_map(&TEAM_ALIASES),
            abbrev_to_team: to_map(&TEAMS),
            team_to_abbrev: TEAMS
                .iter()
                .map(|(abbrev, team)| (team.to_string(), abbrev.to_string()))
                .collect(),
        }
    }

    /// Add or replace name aliases (e.g. loaded from a local overrides file).
    pub fn with_names<I, K, V>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.names
            .extend(aliases.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Apply a local `name,canonical` overrides CSV on top of the built-in
    /// aliases. Keys are matched after `clean_name`.
    pub fn with_overrides_file(self, path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("failed to open name overrides {}", path.display()))?;
        self.with_overrides_reader(file)
            .with_context(|| format!("failed to read name overrides {}", path.display()))
    }

    fn with_overrides_reader<R: Read>(self, reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut aliases = Vec::new();
        for row in rdr.deserialize() {
            let row: NameOverride = row?;
            aliases.push((clean_name(&row.name), row.canonical));
        }
        Ok(self.with_names(aliases))
    }
}

#[derive(Debug, Deserialize)]
struct NameOverride {
    name: String,
    canonical: String,
}

impl Lookup for Conversions {
    fn resolve_name(&self, raw: &str) -> String {
        let cleaned = clean_name(raw);
        match self.names.get(&cleaned) {
            Some(canonical) => canonical.clone(),
            None => cleaned,
        }
    }

    fn resolve_team(&self, raw: &str) -> Result<String, LookupError> {
        let upper = raw.trim().to_uppercase();
        let abbrev = self.team_aliases.get(&upper).cloned().unwrap_or(upper);
        if self.abbrev_to_team.contains_key(&abbrev) {
            Ok(abbrev)
        } else {
            Err(LookupError::UnknownTeamAbbrev(raw.to_string()))
        }
    }

    fn team_abbrev(&self, full_name: &str) -> Result<String, LookupError> {
        let trimmed = full_name.trim();
        // The odds site has used both spellings for the Clippers.
        let key = if trimmed == "LA Clippers" {
            "Los Angeles Clippers"
        } else {
            trimmed
        };
        self.team_to_abbrev
            .get(key)
            .cloned()
            .ok_or_else(|| LookupError::UnknownTeamName(full_name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_name_keeps_two_words_and_drops_periods() {
        assert_eq!(clean_name("P.J. Washington Jr."), "PJ Washington");
        assert_eq!(clean_name("  Jaren   Jackson Jr. "), "Jaren Jackson");
        assert_eq!(clean_name("Nene"), "Nene");
    }

    #[test]
    fn resolve_name_applies_aliases() {
        let conv = Conversions::new();
        assert_eq!(conv.resolve_name("Moe Wagner"), "Moritz Wagner");
        assert_eq!(conv.resolve_name("Lu Dort"), "Luguentz Dort");
        assert_eq!(conv.resolve_name("Robert Dillingham"), "Rob Dillingham");
    }

    #[test]
    fn resolve_name_falls_back_to_cleaned_input() {
        let conv = Conversions::new();
        assert_eq!(conv.resolve_name("Jayson Tatum"), "Jayson Tatum");
        assert_eq!(conv.resolve_name("O.G. Anunoby"), "OG Anunoby");
    }

    #[test]
    fn with_names_overrides() {
        let conv = Conversions::new().with_names([("Nic Claxton", "Nicolas Claxton")]);
        assert_eq!(conv.resolve_name("Nic Claxton"), "Nicolas Claxton");
    }

    #[test]
    fn overrides_csv_extends_and_replaces_aliases() {
        let csv = "name,canonical\nNic Claxton,Nicolas Claxton\nMoe Wagner , Moe Wagner\nP.J. Tucker Jr.,PJ Tucker\n";
        let conv = Conversions::new().with_overrides_reader(csv.as_bytes()).unwrap();
        assert_eq!(conv.resolve_name("Nic Claxton"), "Nicolas Claxton");
        assert_eq!(conv.resolve_name("Moe Wagner"), "Moe Wagner");
        assert_eq!(conv.resolve_name("PJ Tucker"), "PJ Tucker");
        assert_eq!(conv.resolve_name("Lu Dort"), "Luguentz Dort");
    }

    #[test]
    fn overrides_csv_missing_column_is_error() {
        let csv = "name\nNic Claxton\n";
        assert!(Conversions::new().with_overrides_reader(csv.as_bytes()).is_err());
    }

    #[test]
    fn missing_overrides_file_is_error() {
        let path = std::env::temp_dir().join("propcast_no_such_overrides.csv");
        let err = Conversions::new().with_overrides_file(&path).unwrap_err();
        assert!(format!("{err:#}").contains("propcast_no_such_overrides.csv"));
    }

    #[test]
    fn resolve_team_normalizes_aliases() {
        let conv = Conversions::new();
        assert_eq!(conv.resolve_team("GSW").unwrap(), "GS");
        assert_eq!(conv.resolve_team("phx").unwrap(), "PHO");
        assert_eq!(conv.resolve_team("BOS").unwrap(), "BOS");
        assert_eq!(conv.resolve_team("BRK").unwrap(), "BKN");
    }

    #[test]
    fn resolve_team_rejects_unknown() {
        let conv = Conversions::new();
        assert_eq!(
            conv.resolve_team("SEA"),
            Err(LookupError::UnknownTeamAbbrev("SEA".into()))
        );
    }

    #[test]
    fn team_abbrev_from_full_name() {
        let conv = Conversions::new();
        assert_eq!(conv.team_abbrev("Boston Celtics").unwrap(), "BOS");
        assert_eq!(conv.team_abbrev("LA Clippers").unwrap(), "LAC");
        assert!(matches!(
            conv.team_abbrev("Seattle SuperSonics"),
            Err(LookupError::UnknownTeamName(_))
        ));
    }

    #[test]
    fn every_team_round_trips() {
        let conv = Conversions::new();
        for (abbrev, name) in TEAMS {
            assert_eq!(conv.team_abbrev(name).unwrap(), abbrev);
            assert_eq!(conv.resolve_team(abbrev).unwrap(), abbrev);
        }
    }
}

// Contest slate loading from the sites' salary CSV exports.
//
// DraftKings and FanDuel export different column sets; both are normalized
// into `SlatePlayer` rows with canonical names and team abbreviations.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use propcast_core::config::ContestSite;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::conversions::{Lookup, LookupError};
use crate::scoring::SiteProfile;

/// One player available in the contest.
#[derive(Debug, Clone, PartialEq)]
pub struct SlatePlayer {
    pub name: String,
    pub team: String,
    pub pos: String,
    pub salary: u32,
    /// Site injury designation (`O`, `Q`, `GTD`, ...), FanDuel only.
    pub injury: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum SlateError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error("validation error: {0}")]
    Validation(String),
}

// ---------------------------------------------------------------------------
// Raw CSV serde structs (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawDraftKings {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Roster Position")]
    roster_position: String,
    #[serde(rename = "TeamAbbrev")]
    team: String,
    #[serde(rename = "Salary")]
    salary: u32,
    /// Absorb any extra columns.
    #[serde(flatten)]
    _extra: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RawFanDuel {
    #[serde(rename = "Nickname")]
    name: String,
    #[serde(rename = "Position")]
    position: String,
    #[serde(rename = "Team")]
    team: String,
    #[serde(rename = "Salary")]
    salary: u32,
    #[serde(rename = "Injury Indicator", default)]
    injury: String,
    #[serde(flatten)]
    _extra: HashMap<String, serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Strip DraftKings flex slots from a roster position:
/// `PG/SG/G/UTIL` -> `PG/SG`, `C/UTIL` -> `C`.
pub fn clean_position(raw: &str) -> String {
    let parts: Vec<&str> = raw
        .split('/')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    let kept: Vec<&str> = parts
        .iter()
        .copied()
        .filter(|p| !matches!(*p, "G" | "F" | "UTIL"))
        .collect();
    if kept.is_empty() {
        parts.first().copied().unwrap_or_default().to_string()
    } else {
        kept.join("/")
    }
}

// ---------------------------------------------------------------------------
// Reader-based loaders (private, enable testing without temp files)
// ---------------------------------------------------------------------------

fn csv_error(path: &str, source: csv::Error) -> SlateError {
    SlateError::Csv {
        path: path.to_string(),
        source,
    }
}

fn load_draftkings_from_reader<R: Read>(
    rdr: R,
    path: &str,
    lookup: &dyn Lookup,
) -> Result<Vec<SlatePlayer>, SlateError> {
    let mut reader = csv::Reader::from_reader(rdr);
    reader.headers().map_err(|e| csv_error(path, e))?;
    let mut players = Vec::new();
    for result in reader.deserialize::<RawDraftKings>() {
        match result {
            Ok(raw) => {
                // Single-game captain rows duplicate the flex row.
                if raw.roster_position.trim() == "CPT" {
                    continue;
                }
                players.push(SlatePlayer {
                    name: lookup.resolve_name(&raw.name),
                    team: lookup.resolve_team(&raw.team)?,
                    pos: clean_position(&raw.roster_position),
                    salary: raw.salary,
                    injury: None,
                });
            }
            Err(e) => {
                warn!("skipping malformed DraftKings slate row in {path}: {}", e);
            }
        }
    }
    Ok(players)
}

fn load_fanduel_from_reader<R: Read>(
    rdr: R,
    path: &str,
    lookup: &dyn Lookup,
) -> Result<Vec<SlatePlayer>, SlateError> {
    let mut reader = csv::Reader::from_reader(rdr);
    reader.headers().map_err(|e| csv_error(path, e))?;
    let mut players = Vec::new();
    for result in reader.deserialize::<RawFanDuel>() {
        match result {
            Ok(raw) => {
                let injury = raw.injury.trim();
                players.push(SlatePlayer {
                    name: lookup.resolve_name(&raw.name),
                    team: lookup.resolve_team(&raw.team)?,
                    pos: raw.position.trim().to_string(),
                    salary: raw.salary,
                    injury: (!injury.is_empty()).then(|| injury.to_string()),
                });
            }
            Err(e) => {
                warn!("skipping malformed FanDuel slate row in {path}: {}", e);
            }
        }
    }
    Ok(players)
}

fn load_from_reader<R: Read>(
    rdr: R,
    path: &str,
    site: &SiteProfile,
    lookup: &dyn Lookup,
    drop_minimums: bool,
) -> Result<Vec<SlatePlayer>, SlateError> {
    let mut players = match site.site {
        ContestSite::DraftKings => load_draftkings_from_reader(rdr, path, lookup)?,
        ContestSite::FanDuel => load_fanduel_from_reader(rdr, path, lookup)?,
    };

    if drop_minimums {
        let before = players.len();
        players.retain(|p| p.salary != site.minimum_salary);
        debug!(
            "dropped {} minimum-salary players from {path}",
            before - players.len()
        );
    }

    if players.is_empty() {
        return Err(SlateError::Validation(format!(
            "slate {path} produced zero valid rows"
        )));
    }

    Ok(players)
}

// ---------------------------------------------------------------------------
// Public path-based loader
// ---------------------------------------------------------------------------

/// Load the contest slate for `site` from its salary CSV.
pub fn load_slate(
    path: &Path,
    site: &SiteProfile,
    lookup: &dyn Lookup,
    drop_minimums: bool,
) -> Result<Vec<SlatePlayer>, SlateError> {
    let file = std::fs::File::open(path).map_err(|e| SlateError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    load_from_reader(file, &path.display().to_string(), site, lookup, drop_minimums)
}

/// True when the slate holds exactly two teams.
pub fn is_single_game(players: &[SlatePlayer]) -> bool {
    let mut teams: Vec<&str> = players.iter().map(|p| p.team.as_str()).collect();
    teams.sort_unstable();
    teams.dedup();
    teams.len() == 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversions::Conversions;

    const DK_CSV: &str = "\
Position,Name + ID,Name,ID,Roster Position,Salary,Game Info,TeamAbbrev,AvgPointsPerGame
PG,Stephen Curry (1001),Stephen Curry,1001,PG/G/UTIL,9800,GS@BOS 01/06/2024 07:30PM ET,GSW,45.2
C,Kristaps Porzingis (1002),Kristaps Porzingis,1002,C/UTIL,7400,GS@BOS 01/06/2024 07:30PM ET,BOS,36.1
SF,Jayson Tatum (1003),Jayson Tatum,1003,SF/PF/F/UTIL,10200,GS@BOS 01/06/2024 07:30PM ET,BOS,50.3
PF,Moe Wagner (1004),Moe Wagner,1004,PF/C/F/UTIL,3000,GS@BOS 01/06/2024 07:30PM ET,BOS,12.0";

    const FD_CSV: &str = "\
Id,Position,First Name,Nickname,Last Name,FPPG,Played,Salary,Game,Team,Opponent,Injury Indicator,Injury Details
1-1,PG,Stephen,Stephen Curry,Curry,45.1,30,9800,GS@BOS,GS,BOS,,
1-2,SF,Jayson,Jayson Tatum,Tatum,50.0,31,10200,GS@BOS,BOS,GS,Q,Ankle
1-3,C,Al,Al Horford,Horford,20.0,28,3500,GS@BOS,BOS,GS,O,Rest";

    fn dk() -> SiteProfile {
        SiteProfile::draftkings(9.5)
    }

    #[test]
    fn clean_position_strips_flex_slots() {
        assert_eq!(clean_position("PG/G/UTIL"), "PG");
        assert_eq!(clean_position("PG/SG/G/UTIL"), "PG/SG");
        assert_eq!(clean_position("C/UTIL"), "C");
        assert_eq!(clean_position("SF/PF/F/UTIL"), "SF/PF");
        assert_eq!(clean_position("UTIL"), "UTIL");
    }

    #[test]
    fn draftkings_slate_normalizes_rows() {
        let conv = Conversions::new();
        let players = load_from_reader(DK_CSV.as_bytes(), "dk.csv", &dk(), &conv, false).unwrap();
        assert_eq!(players.len(), 4);

        assert_eq!(players[0].name, "Stephen Curry");
        assert_eq!(players[0].team, "GS");
        assert_eq!(players[0].pos, "PG");
        assert_eq!(players[0].salary, 9800);
        assert!(players[0].injury.is_none());

        assert_eq!(players[3].name, "Moritz Wagner");
        assert_eq!(players[3].pos, "PF/C");
    }

    #[test]
    fn draftkings_drop_minimums() {
        let conv = Conversions::new();
        let players = load_from_reader(DK_CSV.as_bytes(), "dk.csv", &dk(), &conv, true).unwrap();
        assert_eq!(players.len(), 3);
        assert!(players.iter().all(|p| p.salary > 3000));
    }

    #[test]
    fn draftkings_captain_rows_skipped() {
        let csv = "\
Position,Name + ID,Name,ID,Roster Position,Salary,Game Info,TeamAbbrev,AvgPointsPerGame
PG,Stephen Curry (2001),Stephen Curry,2001,CPT,14700,GS@BOS,GSW,45.2
PG,Stephen Curry (2002),Stephen Curry,2002,UTIL,9800,GS@BOS,GSW,45.2";
        let conv = Conversions::new();
        let players = load_from_reader(csv.as_bytes(), "sg.csv", &dk(), &conv, false).unwrap();
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].salary, 9800);
    }

    #[test]
    fn fanduel_slate_keeps_injury_indicator() {
        let conv = Conversions::new();
        let fd = SiteProfile::fanduel();
        let players = load_from_reader(FD_CSV.as_bytes(), "fd.csv", &fd, &conv, false).unwrap();
        assert_eq!(players.len(), 3);
        assert_eq!(players[1].injury.as_deref(), Some("Q"));
        assert_eq!(players[2].injury.as_deref(), Some("O"));
        assert!(players[0].injury.is_none());
        assert!(is_single_game(&players));
    }

    #[test]
    fn unknown_team_is_fatal() {
        let csv = "\
Position,Name + ID,Name,ID,Roster Position,Salary,Game Info,TeamAbbrev,AvgPointsPerGame
PG,Somebody (1),Somebody,1,PG/G/UTIL,5000,X,SEA,10.0";
        let conv = Conversions::new();
        let err = load_from_reader(csv.as_bytes(), "dk.csv", &dk(), &conv, false).unwrap_err();
        assert!(matches!(err, SlateError::Lookup(_)));
    }

    #[test]
    fn malformed_rows_skipped() {
        let csv = "\
Position,Name + ID,Name,ID,Roster Position,Salary,Game Info,TeamAbbrev,AvgPointsPerGame
PG,A (1),Player A,1,PG/G/UTIL,not_a_number,X,BOS,10.0
PG,B (2),Player B,2,PG/G/UTIL,5000,X,BOS,10.0";
        let conv = Conversions::new();
        let players = load_from_reader(csv.as_bytes(), "dk.csv", &dk(), &conv, false).unwrap();
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].name, "Player B");
    }

    #[test]
    fn empty_slate_is_error() {
        let csv = "Position,Name + ID,Name,ID,Roster Position,Salary,Game Info,TeamAbbrev,AvgPointsPerGame";
        let conv = Conversions::new();
        let err = load_from_reader(csv.as_bytes(), "dk.csv", &dk(), &conv, false).unwrap_err();
        assert!(matches!(err, SlateError::Validation(_)));
    }
}

// Injury report: players to leave out of a cycle.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use crate::conversions::Lookup;
use crate::slate::{SlateError, SlatePlayer};

/// Availability status from an injury report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjuryStatus {
    Out,
    Doubtful,
    Questionable,
    Probable,
}

impl InjuryStatus {
    /// Parse a report or site designation. Unknown strings yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "o" | "out" | "ofs" | "inj" => Some(Self::Out),
            "d" | "doubtful" => Some(Self::Doubtful),
            "q" | "questionable" | "gtd" | "day-to-day" => Some(Self::Questionable),
            "p" | "probable" => Some(Self::Probable),
            _ => None,
        }
    }

    /// Out and doubtful players are not projected.
    pub fn excludes(self) -> bool {
        matches!(self, Self::Out | Self::Doubtful)
    }
}

#[derive(Debug, Deserialize)]
struct RawInjury {
    name: String,
    status: String,
}

/// Canonical name -> status.
#[derive(Debug, Clone, Default)]
pub struct InjuryReport {
    statuses: HashMap<String, InjuryStatus>,
}

impl InjuryReport {
    /// Seed the report from the slate's own designations (FanDuel only).
    pub fn from_slate(players: &[SlatePlayer]) -> Self {
        let statuses = players
            .iter()
            .filter_map(|p| {
                let status = InjuryStatus::parse(p.injury.as_deref()?)?;
                Some((p.name.clone(), status))
            })
            .collect();
        Self { statuses }
    }

    /// Merge a `name,status` CSV over the current entries.
    pub fn merge_file(&mut self, path: &Path, lookup: &dyn Lookup) -> Result<(), SlateError> {
        let file = std::fs::File::open(path).map_err(|e| SlateError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        self.merge_reader(file, &path.display().to_string(), lookup)
    }

    fn merge_reader<R: Read>(
        &mut self,
        rdr: R,
        path: &str,
        lookup: &dyn Lookup,
    ) -> Result<(), SlateError> {
        let mut reader = csv::Reader::from_reader(rdr);
        for result in reader.deserialize::<RawInjury>() {
            let raw = result.map_err(|e| SlateError::Csv {
                path: path.to_string(),
                source: e,
            })?;
            match InjuryStatus::parse(&raw.status) {
                Some(status) => {
                    self.statuses.insert(lookup.resolve_name(&raw.name), status);
                }
                None => warn!("unrecognized injury status {:?} for {}", raw.status, raw.name),
            }
        }
        Ok(())
    }

    pub fn status(&self, name: &str) -> Option<InjuryStatus> {
        self.statuses.get(name).copied()
    }

    /// True if `name` should be left out of projections.
    pub fn is_excluded(&self, name: &str) -> bool {
        self.status(name).is_some_and(InjuryStatus::excludes)
    }

    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversions::Conversions;

    fn slate_player(name: &str, injury: Option<&str>) -> SlatePlayer {
        SlatePlayer {
            name: name.into(),
            team: "BOS".into(),
            pos: "SF".into(),
            salary: 5000,
            injury: injury.map(String::from),
        }
    }

    #[test]
    fn status_parsing() {
        assert_eq!(InjuryStatus::parse("O"), Some(InjuryStatus::Out));
        assert_eq!(InjuryStatus::parse(" Doubtful "), Some(InjuryStatus::Doubtful));
        assert_eq!(InjuryStatus::parse("GTD"), Some(InjuryStatus::Questionable));
        assert_eq!(InjuryStatus::parse("healthy"), None);
        assert!(InjuryStatus::Out.excludes());
        assert!(InjuryStatus::Doubtful.excludes());
        assert!(!InjuryStatus::Questionable.excludes());
    }

    #[test]
    fn slate_designations_seed_report() {
        let players = vec![
            slate_player("Al Horford", Some("O")),
            slate_player("Jayson Tatum", Some("Q")),
            slate_player("Jaylen Brown", None),
        ];
        let report = InjuryReport::from_slate(&players);
        assert_eq!(report.len(), 2);
        assert!(report.is_excluded("Al Horford"));
        assert!(!report.is_excluded("Jayson Tatum"));
        assert!(!report.is_excluded("Jaylen Brown"));
    }

    #[test]
    fn file_overrides_slate() {
        let players = vec![slate_player("Jayson Tatum", Some("Q"))];
        let mut report = InjuryReport::from_slate(&players);
        let csv = "name,status\nJayson Tatum,out\nMoe Wagner,doubtful\nSomeone,unknown\n";
        report
            .merge_reader(csv.as_bytes(), "injuries.csv", &Conversions::new())
            .unwrap();
        assert!(report.is_excluded("Jayson Tatum"));
        assert!(report.is_excluded("Moritz Wagner"));
        assert!(report.status("Someone").is_none());
    }

    #[test]
    fn missing_file_is_io_error() {
        let mut report = InjuryReport::default();
        let err = report
            .merge_file(Path::new("/nonexistent/injuries.csv"), &Conversions::new())
            .unwrap_err();
        assert!(matches!(err, SlateError::Io { .. }));
        assert!(report.is_empty());
    }
}

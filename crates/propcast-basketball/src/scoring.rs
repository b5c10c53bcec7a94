// Stat categories and per-site scoring profiles.
//
// Scoring weights are data. Each site gets one profile record, selected at
// construction time; a change in a site's rules is a new revision of its
// table rather than a new code path.

use std::fmt;
use std::str::FromStr;

use propcast_core::config::{ContestSite, SiteConfig};

use crate::prop::PropError;

/// A statistical category a bookmaker may post a line on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StatCategory {
    Points,
    Rebounds,
    Assists,
    Steals,
    Blocks,
    ThreePointers,
    Turnovers,
}

impl StatCategory {
    /// Canonical shorthand order: `PRASB3T`.
    pub const CANONICAL: [StatCategory; 7] = [
        StatCategory::Points,
        StatCategory::Rebounds,
        StatCategory::Assists,
        StatCategory::Steals,
        StatCategory::Blocks,
        StatCategory::ThreePointers,
        StatCategory::Turnovers,
    ];

    /// Lowercase label as the odds site prints it.
    pub fn label(self) -> &'static str {
        match self {
            StatCategory::Points => "points",
            StatCategory::Rebounds => "rebounds",
            StatCategory::Assists => "assists",
            StatCategory::Steals => "steals",
            StatCategory::Blocks => "blocks",
            StatCategory::ThreePointers => "3 pointers",
            StatCategory::Turnovers => "turnovers",
        }
    }

    /// Uppercase first letter of the label.
    pub fn shorthand(self) -> char {
        self.label()
            .chars()
            .next()
            .map(|c| c.to_ascii_uppercase())
            .unwrap_or('?')
    }

    /// Position in `PRASB3T`.
    pub fn canonical_rank(self) -> usize {
        Self::CANONICAL
            .iter()
            .position(|s| *s == self)
            .unwrap_or(Self::CANONICAL.len())
    }
}

impl fmt::Display for StatCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for StatCategory {
    type Err = PropError;

    /// Case-insensitive match against the site labels.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::CANONICAL
            .iter()
            .copied()
            .find(|stat| stat.label() == wanted)
            .ok_or_else(|| PropError::UnknownStat {
                stat: s.trim().to_string(),
            })
    }
}

// ---------------------------------------------------------------------------
// Bonus rule
// ---------------------------------------------------------------------------

/// Flat bonus for posting several double-digit stat lines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BonusRule {
    /// Line value at or above which a category qualifies.
    pub threshold: f64,
    /// Paid for exactly two qualifying categories.
    pub double_double: f64,
    /// Paid for three or more qualifying categories.
    pub triple_double: f64,
}

impl BonusRule {
    pub fn draftkings(threshold: f64) -> Self {
        Self {
            threshold,
            double_double: 1.5,
            triple_double: 4.5,
        }
    }

    /// Flat bonus for `qualifying` categories. Four or more pay the same as three.
    pub fn flat_bonus(&self, qualifying: usize) -> f64 {
        match qualifying {
            0 | 1 => 0.0,
            2 => self.double_double,
            _ => self.triple_double,
        }
    }
}

// ---------------------------------------------------------------------------
// Site profile
// ---------------------------------------------------------------------------

const DRAFTKINGS_WEIGHTS: &[(StatCategory, f64)] = &[
    (StatCategory::Points, 1.0),
    (StatCategory::Rebounds, 1.25),
    (StatCategory::Assists, 1.5),
    (StatCategory::ThreePointers, 0.5),
    (StatCategory::Blocks, 2.0),
    (StatCategory::Steals, 2.0),
    (StatCategory::Turnovers, -0.5),
];

const FANDUEL_WEIGHTS: &[(StatCategory, f64)] = &[
    (StatCategory::Points, 1.0),
    (StatCategory::Rebounds, 1.2),
    (StatCategory::Assists, 1.5),
    (StatCategory::ThreePointers, 0.0),
    (StatCategory::Blocks, 3.0),
    (StatCategory::Steals, 3.0),
    (StatCategory::Turnovers, -1.0),
];

/// Everything site-specific the projection engine needs.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteProfile {
    pub site: ContestSite,
    /// Identifies the scoring table in use.
    pub revision: &'static str,
    weights: &'static [(StatCategory, f64)],
    pub bonus: Option<BonusRule>,
    /// Lowest salary the site lists a player at.
    pub minimum_salary: u32,
}

impl SiteProfile {
    pub fn draftkings(bonus_threshold: f64) -> Self {
        Self {
            site: ContestSite::DraftKings,
            revision: "draftkings-nba-classic-v2",
            weights: DRAFTKINGS_WEIGHTS,
            bonus: Some(BonusRule::draftkings(bonus_threshold)),
            minimum_salary: 3_000,
        }
    }

    pub fn fanduel() -> Self {
        Self {
            site: ContestSite::FanDuel,
            revision: "fanduel-nba-full-roster-v2",
            weights: FANDUEL_WEIGHTS,
            bonus: None,
            minimum_salary: 3_500,
        }
    }

    pub fn for_site(site: ContestSite, bonus_threshold: f64) -> Self {
        match site {
            ContestSite::DraftKings => Self::draftkings(bonus_threshold),
            ContestSite::FanDuel => Self::fanduel(),
        }
    }

    pub fn from_config(config: &SiteConfig) -> Self {
        Self::for_site(config.name, config.bonus_threshold)
    }

    /// Fantasy points per unit of `stat`. Errors if the table has no entry.
    pub fn weight(&self, stat: StatCategory) -> Result<f64, PropError> {
        self.weights
            .iter()
            .find(|(s, _)| *s == stat)
            .map(|(_, w)| *w)
            .ok_or_else(|| PropError::UnknownStat {
                stat: stat.label().to_string(),
            })
    }

    /// Look up a stat by its scraped label, case-insensitively.
    pub fn category(&self, label: &str) -> Result<StatCategory, PropError> {
        let stat: StatCategory = label.parse()?;
        self.weight(stat)?;
        Ok(stat)
    }

    /// Whether this site's table scores the scraped label.
    pub fn scores(&self, label: &str) -> bool {
        self.category(label).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_order_spells_prasb3t() {
        let letters: String = StatCategory::CANONICAL
            .iter()
            .map(|s| s.shorthand())
            .collect();
        assert_eq!(letters, "PRASB3T");
    }

    #[test]
    fn canonical_rank_matches_position() {
        for (i, stat) in StatCategory::CANONICAL.iter().enumerate() {
            assert_eq!(stat.canonical_rank(), i);
        }
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(
            "Points".parse::<StatCategory>().unwrap(),
            StatCategory::Points
        );
        assert_eq!(
            "3 Pointers".parse::<StatCategory>().unwrap(),
            StatCategory::ThreePointers
        );
        assert_eq!(
            " TURNOVERS ".parse::<StatCategory>().unwrap(),
            StatCategory::Turnovers
        );
    }

    #[test]
    fn unknown_label_is_error() {
        let err = "Pts + Reb + Ast".parse::<StatCategory>().unwrap_err();
        assert_eq!(
            err,
            PropError::UnknownStat {
                stat: "Pts + Reb + Ast".into()
            }
        );
    }

    #[test]
    fn draftkings_weights() {
        let dk = SiteProfile::draftkings(9.5);
        let expect = [
            (StatCategory::Points, 1.0),
            (StatCategory::Rebounds, 1.25),
            (StatCategory::Assists, 1.5),
            (StatCategory::ThreePointers, 0.5),
            (StatCategory::Blocks, 2.0),
            (StatCategory::Steals, 2.0),
            (StatCategory::Turnovers, -0.5),
        ];
        for (stat, w) in expect {
            assert_eq!(dk.weight(stat).unwrap(), w, "{stat}");
        }
        assert!(dk.bonus.is_some());
        assert_eq!(dk.minimum_salary, 3_000);
    }

    #[test]
    fn fanduel_weights() {
        let fd = SiteProfile::fanduel();
        let expect = [
            (StatCategory::Points, 1.0),
            (StatCategory::Rebounds, 1.2),
            (StatCategory::Assists, 1.5),
            (StatCategory::ThreePointers, 0.0),
            (StatCategory::Blocks, 3.0),
            (StatCategory::Steals, 3.0),
            (StatCategory::Turnovers, -1.0),
        ];
        for (stat, w) in expect {
            assert_eq!(fd.weight(stat).unwrap(), w, "{stat}");
        }
        assert!(fd.bonus.is_none());
        assert_eq!(fd.minimum_salary, 3_500);
    }

    #[test]
    fn category_lookup_by_label() {
        let dk = SiteProfile::draftkings(9.5);
        assert_eq!(dk.category("Assists").unwrap(), StatCategory::Assists);
        assert!(dk.scores("blocks"));
        assert!(!dk.scores("double double"));
    }

    #[test]
    fn flat_bonus_caps_at_triple() {
        let rule = BonusRule::draftkings(9.5);
        assert_eq!(rule.flat_bonus(0), 0.0);
        assert_eq!(rule.flat_bonus(1), 0.0);
        assert_eq!(rule.flat_bonus(2), 1.5);
        assert_eq!(rule.flat_bonus(3), 4.5);
        assert_eq!(rule.flat_bonus(4), 4.5);
    }

    #[test]
    fn for_site_selects_profile() {
        let dk = SiteProfile::for_site(ContestSite::DraftKings, 10.0);
        assert_eq!(dk.bonus.unwrap().threshold, 10.0);
        let fd = SiteProfile::for_site(ContestSite::FanDuel, 10.0);
        assert_eq!(fd.site, ContestSite::FanDuel);
    }
}

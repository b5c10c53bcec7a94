// Per-player projection: sums a player's props, imputes commonly missing
// categories, and applies the multi-category bonus.

use crate::prop::{Prop, PropError};
use crate::scoring::{SiteProfile, StatCategory};

/// Categories bookmakers often leave off, with the per-game value assumed
/// when no line is posted. Points, rebounds and assists are never imputed:
/// a missing line there means the player is unlikely to play.
pub const IMPUTED_DEFAULTS: [(StatCategory, f64); 3] = [
    (StatCategory::Steals, 0.5),
    (StatCategory::Blocks, 0.5),
    (StatCategory::Turnovers, 1.5),
];

/// Over-probability assumed for an imputed category (no odds to de-vig).
pub const IMPUTED_OVER_PROBABILITY: f64 = 0.5;

/// Shorthand for a player with no posted props.
pub const NO_PROPS: &str = "---";

/// A player's aggregated projection for one scrape cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    name: String,
    props: Vec<Prop>,
    fpts: f64,
    e_fpts: f64,
    bonus_fpts: f64,
    e_bonus_fpts: f64,
    imputed: Vec<StatCategory>,
    shorthand: String,
}

impl Player {
    /// A player with nothing posted: `(0.0, 0.0, "---")`.
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            props: Vec::new(),
            fpts: 0.0,
            e_fpts: 0.0,
            bonus_fpts: 0.0,
            e_bonus_fpts: 0.0,
            imputed: Vec::new(),
            shorthand: NO_PROPS.to_string(),
        }
    }

    /// Combine a player's props into one projection.
    ///
    /// Sums do not depend on input order; the shorthand is always built in
    /// canonical `PRASB3T` order.
    pub fn aggregate(
        name: impl Into<String>,
        props: Vec<Prop>,
        site: &SiteProfile,
    ) -> Result<Self, PropError> {
        let name = name.into();
        if props.is_empty() {
            return Ok(Self::empty(name));
        }

        let mut fpts: f64 = props.iter().map(Prop::fpts).sum();
        let mut e_fpts: f64 = props.iter().map(Prop::e_fpts).sum();

        let mut imputed = Vec::new();
        for (stat, assumed) in IMPUTED_DEFAULTS {
            if props.iter().any(|p| p.stat() == stat) {
                continue;
            }
            let value = site.weight(stat)? * assumed;
            fpts += value;
            e_fpts += IMPUTED_OVER_PROBABILITY * value;
            imputed.push(stat);
        }
        imputed.sort_by_key(|s| s.canonical_rank());

        let (bonus_fpts, e_bonus_fpts) = match &site.bonus {
            Some(rule) => {
                let qualifying: Vec<&Prop> = props
                    .iter()
                    .filter(|p| p.value() >= rule.threshold)
                    .collect();
                let flat = rule.flat_bonus(qualifying.len());
                if flat == 0.0 {
                    (0.0, 0.0)
                } else {
                    let joint: f64 = qualifying.iter().map(|p| p.true_over()).product();
                    (flat, joint * flat)
                }
            }
            None => (0.0, 0.0),
        };
        fpts += bonus_fpts;
        e_fpts += e_bonus_fpts;

        let shorthand = build_shorthand(&props, &imputed);

        Ok(Self {
            name,
            props,
            fpts,
            e_fpts,
            bonus_fpts,
            e_bonus_fpts,
            imputed,
            shorthand,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn props(&self) -> &[Prop] {
        &self.props
    }

    pub fn fpts(&self) -> f64 {
        self.fpts
    }

    pub fn e_fpts(&self) -> f64 {
        self.e_fpts
    }

    /// Flat multi-category bonus included in `fpts`.
    pub fn bonus_fpts(&self) -> f64 {
        self.bonus_fpts
    }

    /// Probability-weighted bonus included in `e_fpts`.
    pub fn e_bonus_fpts(&self) -> f64 {
        self.e_bonus_fpts
    }

    /// Categories filled in from `IMPUTED_DEFAULTS`, canonical order.
    pub fn imputed(&self) -> &[StatCategory] {
        &self.imputed
    }

    /// Categories with a posted line, canonical order.
    pub fn stat_log(&self) -> Vec<StatCategory> {
        let mut stats: Vec<StatCategory> = self.props.iter().map(Prop::stat).collect();
        stats.sort_by_key(|s| s.canonical_rank());
        stats
    }

    pub fn shorthand(&self) -> &str {
        &self.shorthand
    }

    /// Any line came from an earlier date.
    pub fn has_stale_lines(&self) -> bool {
        self.props.iter().any(Prop::past)
    }

    pub fn has_props(&self) -> bool {
        !self.props.is_empty()
    }

    /// Posted line for `stat`, if any.
    pub fn line(&self, stat: StatCategory) -> Option<f64> {
        self.props.iter().find(|p| p.stat() == stat).map(Prop::value)
    }
}

fn build_shorthand(props: &[Prop], imputed: &[StatCategory]) -> String {
    let mut posted: Vec<&Prop> = props.iter().collect();
    posted.sort_by_key(|p| p.stat().canonical_rank());

    let mut out: String = posted.iter().map(|p| p.shorthand()).collect();
    if !imputed.is_empty() {
        out.push('(');
        out.extend(imputed.iter().map(|s| s.shorthand()));
        out.push(')');
    }
    if props.iter().any(Prop::past) {
        out.push('*');
    }
    out
}

// A single scraped player prop and its fantasy-point expectation.

use serde::Serialize;
use thiserror::Error;

use crate::moneyline::{MoneyLine, MoneyLineError};
use crate::scoring::{SiteProfile, StatCategory};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PropError {
    /// A category the scoring table does not know. Usually means the odds
    /// site changed its layout, so this is never mapped to zero points.
    #[error("unknown stat category {stat:?}")]
    UnknownStat { stat: String },

    #[error(transparent)]
    MoneyLine(#[from] MoneyLineError),

    #[error("{name}: invalid {stat} line value {value}")]
    InvalidLine {
        name: String,
        stat: String,
        value: f64,
    },

    #[error("{name}: implied probabilities over={over} under={under} cannot be normalized")]
    InvalidOdds { name: String, over: f64, under: f64 },
}

/// Raw inputs for one prop, before any derived field is computed.
#[derive(Debug, Clone, PartialEq)]
pub struct PropInput {
    /// Canonical player name.
    pub name: String,
    /// Site-native `MM/DD` date of the section the line came from.
    pub date: String,
    /// Stat label as scraped.
    pub stat: String,
    pub value: f64,
    pub implied_over: f64,
    pub implied_under: f64,
}

impl PropInput {
    /// Build the input from scraped moneyline strings.
    pub fn from_moneylines(
        name: impl Into<String>,
        date: impl Into<String>,
        stat: impl Into<String>,
        value: f64,
        over: &str,
        under: &str,
    ) -> Result<Self, PropError> {
        let over = MoneyLine::parse(over)?;
        let under = MoneyLine::parse(under)?;
        Ok(Self {
            name: name.into(),
            date: date.into(),
            stat: stat.into(),
            value,
            implied_over: over.implied_probability(),
            implied_under: under.implied_probability(),
        })
    }
}

/// One stat line for one player, with every derived field filled in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prop {
    name: String,
    date: String,
    #[serde(serialize_with = "serialize_stat")]
    stat: StatCategory,
    value: f64,
    implied_over: f64,
    implied_under: f64,
    vig: f64,
    true_over: f64,
    true_under: f64,
    fpts: f64,
    e_fpts: f64,
    shorthand: char,
    past: bool,
}

impl Prop {
    /// Compute all derived fields for one scraped line.
    ///
    /// `today` is the site's `MM/DD` string for the current contest date;
    /// a line from any other date is flagged as `past`.
    pub fn build(input: PropInput, site: &SiteProfile, today: &str) -> Result<Self, PropError> {
        let stat = site.category(&input.stat)?;
        let weight = site.weight(stat)?;

        if !input.value.is_finite() || input.value < 0.0 {
            return Err(PropError::InvalidLine {
                name: input.name,
                stat: stat.label().to_string(),
                value: input.value,
            });
        }

        let (over, under) = (input.implied_over, input.implied_under);
        let total = over + under;
        if !over.is_finite() || !under.is_finite() || over < 0.0 || under < 0.0 || total <= 0.0 {
            return Err(PropError::InvalidOdds {
                name: input.name,
                over,
                under,
            });
        }

        let fpts = weight * input.value;
        let true_over = over / total;
        let true_under = under / total;
        let past = input.date != today;

        Ok(Self {
            name: input.name,
            date: input.date,
            stat,
            value: input.value,
            implied_over: over,
            implied_under: under,
            vig: total - 1.0,
            true_over,
            true_under,
            fpts,
            e_fpts: true_over * fpts,
            shorthand: stat.shorthand(),
            past,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn stat(&self) -> StatCategory {
        self.stat
    }

    /// The posted line.
    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn implied_over(&self) -> f64 {
        self.implied_over
    }

    pub fn implied_under(&self) -> f64 {
        self.implied_under
    }

    /// Bookmaker margin: `implied_over + implied_under - 1`.
    pub fn vig(&self) -> f64 {
        self.vig
    }

    pub fn true_over(&self) -> f64 {
        self.true_over
    }

    pub fn true_under(&self) -> f64 {
        self.true_under
    }

    /// Fantasy points if the player lands exactly on the line.
    pub fn fpts(&self) -> f64 {
        self.fpts
    }

    /// `true_over * fpts`. A step-payout approximation, not an expectation
    /// over the stat's distribution.
    pub fn e_fpts(&self) -> f64 {
        self.e_fpts
    }

    pub fn shorthand(&self) -> char {
        self.shorthand
    }

    /// Line was carried over from an earlier date.
    pub fn past(&self) -> bool {
        self.past
    }
}

fn serialize_stat<S: serde::Serializer>(stat: &StatCategory, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(stat.label())
}

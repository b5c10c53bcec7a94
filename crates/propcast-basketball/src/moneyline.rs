// American-odds moneylines and their implied probabilities.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyLineError {
    #[error("moneyline {raw:?} must start with '+' or '-'")]
    MissingSign { raw: String },

    #[error("moneyline {raw:?} must be a sign followed by digits")]
    NotNumeric { raw: String },

    #[error("moneyline {raw:?} is outside the American odds range (|odds| >= 100)")]
    OutOfRange { raw: String },
}

/// A parsed moneyline. Built once from the scraped string; never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct MoneyLine {
    raw: Option<String>,
    odds: i32,
    probability: f64,
}

impl Default for MoneyLine {
    /// Even money: `+100`, 50%.
    fn default() -> Self {
        Self {
            raw: None,
            odds: 100,
            probability: 0.5,
        }
    }
}

impl MoneyLine {
    /// Parse a signed American-odds string such as `+135` or `-110`.
    ///
    /// The sign comes from the first character and the magnitude from the
    /// remaining digits. `+100` is the even-money baseline and maps straight
    /// to 0.5.
    pub fn parse(raw: &str) -> Result<Self, MoneyLineError> {
        let trimmed = raw.trim();
        if trimmed == "+100" {
            return Ok(Self {
                raw: Some(trimmed.to_string()),
                ..Self::default()
            });
        }

        let negative = match trimmed.chars().next() {
            Some('+') => false,
            Some('-') => true,
            _ => {
                return Err(MoneyLineError::MissingSign {
                    raw: raw.to_string(),
                })
            }
        };

        let digits = &trimmed[1..];
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(MoneyLineError::NotNumeric {
                raw: raw.to_string(),
            });
        }

        let magnitude: i32 = digits
            .parse::<u32>()
            .ok()
            .and_then(|m| i32::try_from(m).ok())
            .filter(|m| *m >= 100)
            .ok_or_else(|| MoneyLineError::OutOfRange {
                raw: raw.to_string(),
            })?;

        let odds = if negative { -magnitude } else { magnitude };
        Ok(Self {
            raw: Some(trimmed.to_string()),
            odds,
            probability: implied_probability(odds),
        })
    }

    /// The scraped text this line was parsed from, if any.
    pub fn raw(&self) -> Option<&str> {
        self.raw.as_deref()
    }

    pub fn odds(&self) -> i32 {
        self.odds
    }

    /// Implied probability with the bookmaker margin still included.
    pub fn implied_probability(&self) -> f64 {
        self.probability
    }
}

impl FromStr for MoneyLine {
    type Err = MoneyLineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for MoneyLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:+}", self.odds)
    }
}

/// Implied probability of an American-odds price.
///
/// Positive odds: `100 / (odds + 100)`. Negative odds: `-odds / (-odds + 100)`.
pub fn implied_probability(odds: i32) -> f64 {
    let odds = f64::from(odds);
    if odds >= 0.0 {
        100.0 / (odds + 100.0)
    } else {
        -odds / (-odds + 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    #[test]
    fn even_money_short_circuit() {
        let ml = MoneyLine::parse("+100").unwrap();
        assert_eq!(ml.odds(), 100);
        assert_eq!(ml.implied_probability(), 0.5);
        assert_eq!(ml.raw(), Some("+100"));
        // The general formula agrees at the boundary.
        assert!((implied_probability(100) - 0.5).abs() < EPS);
        assert!((implied_probability(-100) - 0.5).abs() < EPS);
    }

    #[test]
    fn default_is_even_money() {
        let ml = MoneyLine::default();
        assert_eq!(ml.odds(), 100);
        assert_eq!(ml.implied_probability(), 0.5);
        assert!(ml.raw().is_none());
    }

    #[test]
    fn positive_odds() {
        let ml = MoneyLine::parse("+150").unwrap();
        assert_eq!(ml.odds(), 150);
        assert!((ml.implied_probability() - 0.4).abs() < EPS);
    }

    #[test]
    fn negative_odds() {
        let ml = MoneyLine::parse("-150").unwrap();
        assert_eq!(ml.odds(), -150);
        assert!((ml.implied_probability() - 0.6).abs() < EPS);

        let juice = MoneyLine::parse("-110").unwrap();
        assert!((juice.implied_probability() - 110.0 / 210.0).abs() < EPS);
    }

    #[test]
    fn minus_hundred_is_half() {
        let ml = MoneyLine::parse("-100").unwrap();
        assert_eq!(ml.odds(), -100);
        assert!((ml.implied_probability() - 0.5).abs() < EPS);
    }

    #[test]
    fn negative_lines_above_half_positive_below() {
        for m in [101, 105, 110, 125, 200, 350, 1000, 25000] {
            let fav = MoneyLine::parse(&format!("-{m}")).unwrap();
            let dog = MoneyLine::parse(&format!("+{m}")).unwrap();
            assert!(fav.implied_probability() > 0.5, "-{m}");
            assert!(dog.implied_probability() < 0.5, "+{m}");
        }
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        let ml = MoneyLine::parse(" -120 \n").unwrap();
        assert_eq!(ml.odds(), -120);
        assert_eq!(ml.raw(), Some("-120"));
    }

    #[test]
    fn display_keeps_sign() {
        assert_eq!(MoneyLine::parse("+135").unwrap().to_string(), "+135");
        assert_eq!(MoneyLine::parse("-135").unwrap().to_string(), "-135");
    }

    #[test]
    fn from_str_delegates_to_parse() {
        let ml: MoneyLine = "-115".parse().unwrap();
        assert_eq!(ml.odds(), -115);
    }

    // -- Malformed input --

    #[test]
    fn unsigned_is_rejected() {
        assert!(matches!(
            MoneyLine::parse("150"),
            Err(MoneyLineError::MissingSign { .. })
        ));
        assert!(matches!(
            MoneyLine::parse(""),
            Err(MoneyLineError::MissingSign { .. })
        ));
        assert!(matches!(
            MoneyLine::parse("even"),
            Err(MoneyLineError::MissingSign { .. })
        ));
    }

    #[test]
    fn non_digits_are_rejected() {
        for raw in ["+", "-", "+1a0", "-1.5", "++150", "+-150", "- 110"] {
            assert!(
                matches!(MoneyLine::parse(raw), Err(MoneyLineError::NotNumeric { .. })),
                "{raw:?}"
            );
        }
    }

    #[test]
    fn sub_hundred_magnitudes_are_rejected() {
        for raw in ["-0", "+0", "+99", "-50"] {
            assert!(
                matches!(MoneyLine::parse(raw), Err(MoneyLineError::OutOfRange { .. })),
                "{raw:?}"
            );
        }
    }

    #[test]
    fn overflowing_magnitude_is_rejected() {
        assert!(matches!(
            MoneyLine::parse("+99999999999"),
            Err(MoneyLineError::OutOfRange { .. })
        ));
    }
}

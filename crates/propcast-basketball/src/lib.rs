// Basketball projection engine: odds conversion, scoring, per-player
// aggregation, and the contest-slate inputs and outputs around them.

pub mod conversions;
pub mod export;
pub mod injuries;
pub mod moneyline;
pub mod player;
pub mod prop;
pub mod scoring;
pub mod slate;

// Projection rows joined with the contest slate, and their CSV export.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use propcast_core::config::{ContestSite, SlateMode};
use serde::Serialize;
use tracing::info;

use crate::player::Player;
use crate::scoring::StatCategory;
use crate::slate::SlatePlayer;

/// Salary points charged per $1000 in the value metric.
pub const VALUE_PER_1K: f64 = 5.0;

/// Captain slot multiplier on single-game slates (points and salary).
pub const CAPTAIN_MULTIPLIER: f64 = 1.5;

/// One exported row: a slate player with their projection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectionRecord {
    pub name: String,
    pub team: String,
    pub pos: String,
    pub salary: u32,
    pub fpts: f64,
    pub e_fpts: f64,
    pub shorthand: String,
    pub fpts_per_1k: f64,
    pub e_fpts_per_1k: f64,
    pub value: f64,
    pub points: Option<f64>,
    pub rebounds: Option<f64>,
    pub assists: Option<f64>,
    pub steals: Option<f64>,
    pub blocks: Option<f64>,
    pub threes: Option<f64>,
    pub turnovers: Option<f64>,
    /// Captain-slot projection; set on single-game slates only.
    pub cpt_fpts: Option<f64>,
    pub cpt_salary: Option<u32>,
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

impl ProjectionRecord {
    pub fn new(slate: &SlatePlayer, player: &Player) -> Self {
        let salary_k = f64::from(slate.salary) / 1000.0;
        let per_1k = |pts: f64| if salary_k > 0.0 { pts / salary_k } else { 0.0 };
        Self {
            name: slate.name.clone(),
            team: slate.team.clone(),
            pos: slate.pos.clone(),
            salary: slate.salary,
            fpts: round2(player.fpts()),
            e_fpts: round2(player.e_fpts()),
            shorthand: player.shorthand().to_string(),
            fpts_per_1k: round2(per_1k(player.fpts())),
            e_fpts_per_1k: round2(per_1k(player.e_fpts())),
            value: round2(player.fpts() - VALUE_PER_1K * salary_k),
            points: player.line(StatCategory::Points),
            rebounds: player.line(StatCategory::Rebounds),
            assists: player.line(StatCategory::Assists),
            steals: player.line(StatCategory::Steals),
            blocks: player.line(StatCategory::Blocks),
            threes: player.line(StatCategory::ThreePointers),
            turnovers: player.line(StatCategory::Turnovers),
            cpt_fpts: None,
            cpt_salary: None,
        }
    }

    /// Fill the captain columns. Captain salary truncates to whole dollars.
    pub fn with_captain(mut self) -> Self {
        self.cpt_fpts = Some(round2(self.fpts * CAPTAIN_MULTIPLIER));
        self.cpt_salary = Some((f64::from(self.salary) * CAPTAIN_MULTIPLIER) as u32);
        self
    }
}

/// Sort rows by value, best first. Ties keep slate order.
pub fn rank(records: &mut [ProjectionRecord]) {
    records.sort_by(|a, b| b.value.total_cmp(&a.value));
}

pub fn write_records<W: std::io::Write>(writer: W, records: &[ProjectionRecord]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Dated and rolling-latest output paths for one contest day. Single-game
/// slates get a `-sg` infix so they never overwrite the main slate's files.
pub fn projection_paths(
    dir: &Path,
    site: ContestSite,
    mode: SlateMode,
    date: NaiveDate,
) -> (PathBuf, PathBuf) {
    let stem = format!("{}{}", site.key(), mode.suffix());
    (
        dir.join(format!("{stem}-{}.csv", date.format("%Y-%m-%d"))),
        dir.join(format!("{stem}-latest.csv")),
    )
}

/// Write `records` to both the dated file and the rolling latest file under
/// `dir`.
pub fn export_projections(
    dir: &Path,
    site: ContestSite,
    mode: SlateMode,
    date: NaiveDate,
    records: &[ProjectionRecord],
) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create projections dir {}", dir.display()))?;

    let (dated, latest) = projection_paths(dir, site, mode, date);
    for path in [&dated, &latest] {
        let file = std::fs::File::create(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        write_records(file, records)
            .with_context(|| format!("failed to write projections to {}", path.display()))?;
    }
    info!("wrote {} projections to {}", records.len(), dated.display());
    Ok(dated)
}

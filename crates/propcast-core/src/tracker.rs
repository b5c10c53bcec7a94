// Line-movement tracking: per-day time series of each player's projection.
//
// One tracker per contest day. Opening a tracker for a day that already has a
// stored session resumes it (keeping the original open time); otherwise the
// tracker starts empty. Every `update` appends one observation per reported
// player, stamped with a single cycle timestamp, and rewrites the day's
// snapshot in the database.

use std::collections::BTreeMap;

use anyhow::Result;
use chrono::{Duration, Local, NaiveDate};
use serde::Serialize;
use tracing::info;

use crate::db::{Database, StoredSession};

/// Format used for scrape timestamps and session bounds.
pub const TIME_FORMAT: &str = "%H:%M:%S";

// ---------------------------------------------------------------------------
// Series types
// ---------------------------------------------------------------------------

/// One projection observation taken during one scrape cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    pub fpts: f64,
    pub e_fpts: f64,
    pub scrape_time: String,
}

/// A player's observations for the day, oldest first.
///
/// Stored as one list of records so the fpts, e_fpts and timestamp
/// sequences can never drift apart in length.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlayerSeries {
    observations: Vec<Observation>,
}

impl PlayerSeries {
    pub fn push(&mut self, observation: Observation) {
        self.observations.push(observation);
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn fpts(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.fpts).collect()
    }

    pub fn e_fpts(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.e_fpts).collect()
    }

    pub fn scrape_times(&self) -> Vec<&str> {
        self.observations
            .iter()
            .map(|o| o.scrape_time.as_str())
            .collect()
    }

    /// Derived open/now/movement fields. `None` for an empty series.
    pub fn summary(&self) -> Option<SeriesSummary> {
        let first = self.observations.first()?;
        let last = self.observations.last()?;
        let fpts = self.fpts();
        let e_fpts = self.e_fpts();
        Some(SeriesSummary {
            fpts_open: first.fpts,
            e_fpts_open: first.e_fpts,
            fpts_now: last.fpts,
            e_fpts_now: last.e_fpts,
            movements: movement_count(&fpts),
            e_movements: movement_count(&e_fpts),
            just_moved: just_moved(&fpts),
        })
    }
}

/// Fields derived from a player's series on every write.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesSummary {
    pub fpts_open: f64,
    pub e_fpts_open: f64,
    pub fpts_now: f64,
    pub e_fpts_now: f64,
    pub movements: usize,
    pub e_movements: usize,
    pub just_moved: bool,
}

/// One player's row in the persisted snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackerSnapshot {
    pub name: String,
    pub series: PlayerSeries,
    pub init_time: String,
    pub latest_time: String,
    pub summary: SeriesSummary,
}

/// A player's projection from the current cycle, as handed to `update`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionPoint {
    pub name: String,
    pub fpts: f64,
    pub e_fpts: f64,
}

/// Number of positions where a value differs from the one before it.
pub fn movement_count(values: &[f64]) -> usize {
    values.windows(2).filter(|w| w[0] != w[1]).count()
}

/// True when either of the last two transitions changed value. A series
/// with fewer than three observations always counts as just moved.
pub fn just_moved(values: &[f64]) -> bool {
    if values.len() <= 2 {
        return true;
    }
    values.windows(2).rev().take(2).any(|w| w[0] != w[1])
}

// ---------------------------------------------------------------------------
// Tracker
// ---------------------------------------------------------------------------

/// File-backed per-day projection tracker. Assumes a single writer per
/// database file.
pub struct PropTracker {
    db: Database,
    contest_date: String,
    init_time: String,
    latest_time: String,
    clock_offset: Duration,
    series: BTreeMap<String, PlayerSeries>,
}

impl PropTracker {
    /// Open the tracker for `contest_date`, resuming the stored session if
    /// one exists. The stored open time is never replaced.
    pub fn open(db: Database, contest_date: NaiveDate, clock_offset_minutes: i64) -> Result<Self> {
        let contest_date = contest_date.format("%Y-%m-%d").to_string();
        let clock_offset = Duration::minutes(clock_offset_minutes);
        let now = current_time(clock_offset);

        let (init_time, series) = match db.load_session(&contest_date)? {
            Some(stored) => {
                let series = db.load_series(&contest_date)?;
                info!(
                    "Resuming tracker for {contest_date}: {} players since {}",
                    series.len(),
                    stored.init_time
                );
                (stored.init_time, series)
            }
            None => {
                info!("Initializing tracker for {contest_date}");
                (now.clone(), BTreeMap::new())
            }
        };

        Ok(Self {
            db,
            contest_date,
            init_time,
            latest_time: now,
            clock_offset,
            series,
        })
    }

    /// Append this cycle's projections, stamped with the current time, and
    /// persist the full snapshot.
    pub fn update(&mut self, points: &[ProjectionPoint]) -> Result<()> {
        let at = current_time(self.clock_offset);
        self.update_at(points, &at)
    }

    /// Append this cycle's projections with an explicit cycle timestamp.
    ///
    /// Every listed player gets exactly one new observation; players not
    /// listed are left untouched. Identical consecutive values are kept,
    /// since an unchanged line is itself an observation.
    pub fn update_at(&mut self, points: &[ProjectionPoint], at: &str) -> Result<()> {
        self.latest_time = at.to_string();

        for point in points {
            self.series
                .entry(point.name.clone())
                .or_default()
                .push(Observation {
                    fpts: point.fpts,
                    e_fpts: point.e_fpts,
                    scrape_time: at.to_string(),
                });
        }

        let session = StoredSession {
            init_time: self.init_time.clone(),
            latest_time: self.latest_time.clone(),
        };
        self.db
            .replace_day(&self.contest_date, &session, &self.series)
    }

    /// Re-read the persisted snapshot for this tracker's day.
    pub fn data(&self) -> Result<Vec<TrackerSnapshot>> {
        self.db.load_snapshot(&self.contest_date)
    }

    /// In-memory series for one player.
    pub fn series(&self, name: &str) -> Option<&PlayerSeries> {
        self.series.get(name)
    }

    /// Every player with at least one observation today.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    /// Players whose latest observation changed value from the previous one.
    pub fn moved_last_cycle(&self) -> Vec<(&str, &PlayerSeries)> {
        self.series
            .iter()
            .filter(|(_, s)| {
                let obs = s.observations();
                obs.len() >= 2 && obs[obs.len() - 1].fpts != obs[obs.len() - 2].fpts
            })
            .map(|(name, s)| (name.as_str(), s))
            .collect()
    }

    pub fn contest_date(&self) -> &str {
        &self.contest_date
    }

    pub fn init_time(&self) -> &str {
        &self.init_time
    }

    pub fn latest_time(&self) -> &str {
        &self.latest_time
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

fn current_time(offset: Duration) -> String {
    (Local::now() + offset).format(TIME_FORMAT).to_string()
}

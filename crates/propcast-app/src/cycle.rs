// One scrape cycle: slate in, one projection per player, CSV and tracker out.
//
// Per-player problems (not in the directory, fetch failure, nothing posted)
// degrade that player to an empty projection. Problems that mean the odds
// site or our tables changed underneath us (malformed moneyline, unknown
// stat, unknown team) abort the cycle.

use std::collections::BTreeSet;
use std::path::PathBuf;

use chrono::NaiveDate;
use propcast_basketball::conversions::Lookup;
use propcast_basketball::export::{self, ProjectionRecord};
use propcast_basketball::injuries::InjuryReport;
use propcast_basketball::player::Player;
use propcast_basketball::prop::{Prop, PropError, PropInput};
use propcast_basketball::scoring::SiteProfile;
use propcast_basketball::slate::{self, SlateError, SlatePlayer};
use propcast_core::config::{Config, ResolvedPaths, ScrapeConfig, SlateMode};
use propcast_core::tracker::{ProjectionPoint, PropTracker};
use tracing::{debug, info, warn};

use crate::directory::Directory;
use crate::fetch::PageFetcher;
use crate::page;

#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error("odds site players index is down and no cached directory is available")]
    SiteDown,

    #[error(transparent)]
    Prop(#[from] PropError),

    #[error(transparent)]
    Slate(#[from] SlateError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// What one cycle produced.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    /// Slate players projected (excluded players not counted).
    pub projected: usize,
    /// Players with no prop coverage this cycle.
    pub uncovered: Vec<String>,
    /// Players covered this cycle that were not covered before.
    pub newly_covered: Vec<String>,
    /// Players left out by the injury report.
    pub excluded: Vec<String>,
    /// Players whose projection changed since the previous cycle.
    pub moved: Vec<String>,
    /// Slate teams with no covered player this cycle.
    pub teams_missing: Vec<String>,
    /// Distinct teams on the slate.
    pub teams: usize,
    /// Captain columns and `-sg` files were written.
    pub single_game: bool,
    /// Dated projections file written this cycle.
    pub output: PathBuf,
}

impl CycleReport {
    pub fn covered(&self) -> usize {
        self.projected - self.uncovered.len()
    }

    /// Share of slate teams without coverage, truncated to a whole percent.
    pub fn teams_missing_pct(&self) -> usize {
        100 * self.teams_missing.len() / self.teams.max(1)
    }
}

pub struct CycleHandler<F: PageFetcher> {
    fetcher: F,
    lookup: Box<dyn Lookup>,
    site: SiteProfile,
    scrape: ScrapeConfig,
    paths: ResolvedPaths,
    drop_minimums: bool,
    mode: SlateMode,
    contest_date: NaiveDate,
    tracker: PropTracker,
    directory: Directory,
    last_covered: BTreeSet<String>,
}

impl<F: PageFetcher> CycleHandler<F> {
    /// `tracker` must be open for `contest_date`.
    pub fn new(
        config: &Config,
        fetcher: F,
        lookup: Box<dyn Lookup>,
        tracker: PropTracker,
        contest_date: NaiveDate,
    ) -> Self {
        // A resumed tracker already knows who was covered earlier today.
        let last_covered = tracker.names().map(str::to_string).collect();
        Self {
            fetcher,
            lookup,
            site: SiteProfile::from_config(&config.site),
            scrape: config.scrape.clone(),
            paths: config.paths.clone(),
            drop_minimums: config.site.drop_minimums,
            mode: config.site.mode,
            contest_date,
            tracker,
            directory: Directory::default(),
            last_covered,
        }
    }

    pub fn tracker(&self) -> &PropTracker {
        &self.tracker
    }

    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    pub fn site(&self) -> &SiteProfile {
        &self.site
    }

    /// Run one full cycle.
    pub async fn run_cycle(&mut self) -> Result<CycleReport, CycleError> {
        if self.directory.is_empty() {
            self.refresh_directory().await?;
        }

        let slate = slate::load_slate(
            &self.paths.slate,
            &self.site,
            self.lookup.as_ref(),
            self.drop_minimums,
        )?;
        let injuries = self.load_injuries(&slate)?;
        // A two-team slate is a showdown even when configured as a main slate.
        let single_game = self.mode == SlateMode::SingleGame || slate::is_single_game(&slate);
        let output_mode = if single_game {
            SlateMode::SingleGame
        } else {
            SlateMode::MainSlate
        };

        let mut records = Vec::with_capacity(slate.len());
        let mut points = Vec::new();
        let mut uncovered = Vec::new();
        let mut excluded = Vec::new();

        for entry in &slate {
            if injuries.is_excluded(&entry.name) {
                excluded.push(entry.name.clone());
                continue;
            }
            let player = self.project_player(entry).await?;
            if player.has_props() {
                points.push(ProjectionPoint {
                    name: player.name().to_string(),
                    fpts: player.fpts(),
                    e_fpts: player.e_fpts(),
                });
            } else {
                uncovered.push(entry.name.clone());
            }
            let record = ProjectionRecord::new(entry, &player);
            records.push(if single_game { record.with_captain() } else { record });
        }

        export::rank(&mut records);
        let output = export::export_projections(
            &self.paths.projections_dir(),
            self.site.site,
            output_mode,
            self.contest_date,
            &records,
        )?;

        self.tracker.update(&points)?;

        let covered: BTreeSet<String> = points.into_iter().map(|p| p.name).collect();
        let newly_covered: Vec<String> = covered.difference(&self.last_covered).cloned().collect();
        self.last_covered = covered;

        let slate_teams: BTreeSet<&str> = slate.iter().map(|p| p.team.as_str()).collect();
        let covered_teams: BTreeSet<&str> = slate
            .iter()
            .filter(|p| self.last_covered.contains(&p.name))
            .map(|p| p.team.as_str())
            .collect();
        let teams_missing: Vec<String> = slate_teams
            .difference(&covered_teams)
            .map(|t| t.to_string())
            .collect();

        if !uncovered.is_empty() {
            info!(
                "{} of {} players have no props posted: {}",
                uncovered.len(),
                records.len(),
                uncovered.join(", ")
            );
        }
        if !teams_missing.is_empty() {
            info!(
                "props posted for {} of {} teams, missing {}%: {}",
                covered_teams.len(),
                slate_teams.len(),
                100 * teams_missing.len() / slate_teams.len().max(1),
                teams_missing.join(", ")
            );
        }
        if !excluded.is_empty() {
            info!("excluded by injury report: {}", excluded.join(", "));
        }
        if !newly_covered.is_empty() {
            info!("props posted for: {}", newly_covered.join(", "));
        }

        let mut moved = Vec::new();
        for (name, series) in self.tracker.moved_last_cycle() {
            // Players missing this cycle kept their last two observations.
            if !self.last_covered.contains(name) {
                continue;
            }
            let obs = series.observations();
            if let (Some(summary), [.., prev, now]) = (series.summary(), obs) {
                info!(
                    "{name}: {:.2} -> {:.2} (open {:.2}, {} moves)",
                    prev.fpts, now.fpts, summary.fpts_open, summary.movements
                );
            }
            moved.push(name.to_string());
        }

        Ok(CycleReport {
            projected: records.len(),
            uncovered,
            newly_covered,
            excluded,
            moved,
            teams_missing,
            teams: slate_teams.len(),
            single_game,
            output,
        })
    }

    /// Rebuild the directory from the live index, falling back to the cache.
    async fn refresh_directory(&mut self) -> Result<(), CycleError> {
        let url = self.scrape.directory_url.as_str();
        let live = match self.fetcher.fetch(url).await {
            Ok(html) => Directory::parse(&html, url, self.lookup.as_ref())?,
            Err(e) => {
                warn!("players index fetch failed: {e}");
                Directory::default()
            }
        };

        let cache = self.paths.directory_cache();
        if !live.is_empty() {
            live.save(&cache)?;
            info!(
                "directory built: {} players on {} teams",
                live.player_count(),
                live.team_count()
            );
            self.directory = live;
            return Ok(());
        }

        let cached = Directory::load(&cache)?;
        if cached.is_empty() {
            return Err(CycleError::SiteDown);
        }
        warn!(
            "players index is empty, using cached directory ({} players) from {}",
            cached.player_count(),
            cache.display()
        );
        self.directory = cached;
        Ok(())
    }

    fn load_injuries(&self, slate: &[SlatePlayer]) -> Result<InjuryReport, CycleError> {
        let mut report = InjuryReport::from_slate(slate);
        if let Some(path) = &self.paths.injuries {
            if path.exists() {
                report.merge_file(path, self.lookup.as_ref())?;
            } else {
                warn!("injury list {} not found, using slate designations only", path.display());
            }
        }
        Ok(report)
    }

    async fn project_player(&self, entry: &SlatePlayer) -> Result<Player, CycleError> {
        let Some(url) = self.directory.url(&entry.team, &entry.name) else {
            debug!("{} ({}) not in directory", entry.name, entry.team);
            return Ok(Player::empty(&entry.name));
        };

        let html = match self.fetcher.fetch(url).await {
            Ok(html) => html,
            Err(e) => {
                warn!("{}: {e}", entry.name);
                return Ok(Player::empty(&entry.name));
            }
        };

        let sections = match page::parse_player_page(&html) {
            Ok(sections) => sections,
            Err(e) => {
                warn!("{}: failed to parse player page: {e:#}", entry.name);
                return Ok(Player::empty(&entry.name));
            }
        };

        let Some(section) =
            page::select_section(&sections, self.contest_date, self.scrape.stale_window_days)
        else {
            return Ok(Player::empty(&entry.name));
        };

        let today = page::site_date(self.contest_date);
        let props = section
            .rows
            .iter()
            .map(|row| {
                let input = PropInput::from_moneylines(
                    &entry.name,
                    &section.date,
                    &row.category,
                    row.line,
                    &row.over,
                    &row.under,
                )?;
                Prop::build(input, &self.site, &today)
            })
            .collect::<Result<Vec<_>, PropError>>()?;

        Ok(Player::aggregate(&entry.name, props, &self.site)?)
    }
}

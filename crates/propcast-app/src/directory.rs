// Player-page directory: team -> (player name -> profile URL).
//
// Built from the odds site's players index. Every successful build is cached
// to CSV so a later cycle can fall back to it while the index is down.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use propcast_basketball::conversions::Lookup;
use reqwest::Url;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// One cached directory entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct DirectoryRow {
    team: String,
    name: String,
    url: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Directory {
    teams: BTreeMap<String, BTreeMap<String, String>>,
}

impl Directory {
    pub fn insert(&mut self, team: &str, name: &str, url: &str) {
        self.teams
            .entry(team.to_string())
            .or_default()
            .insert(name.to_string(), url.to_string());
    }

    /// Profile URL for a canonical (team, name) pair.
    pub fn url(&self, team: &str, name: &str) -> Option<&str> {
        self.teams.get(team)?.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.teams.values().all(BTreeMap::is_empty)
    }

    /// Number of teams with at least one player.
    pub fn team_count(&self) -> usize {
        self.teams.values().filter(|p| !p.is_empty()).count()
    }

    /// Total number of players across teams.
    pub fn player_count(&self) -> usize {
        self.teams.values().map(BTreeMap::len).sum()
    }

    // -----------------------------------------------------------------------
    // Parsing
    // -----------------------------------------------------------------------

    /// Parse the players index page.
    ///
    /// Each team module's `h3` heading is a full team name; an unrecognized
    /// name is an error since the team set is closed. Links are resolved
    /// against `base_url`, and player names go through `lookup`.
    pub fn parse(html: &str, base_url: &str, lookup: &dyn Lookup) -> Result<Self> {
        let base = Url::parse(base_url).with_context(|| format!("invalid directory URL {base_url}"))?;
        let document = Html::parse_document(html);
        let module_sel = Selector::parse("div.module")
            .ok()
            .context("invalid module selector")?;
        let heading_sel = Selector::parse("h3").ok().context("invalid h3 selector")?;
        let link_sel = Selector::parse("div.module-body ul a")
            .ok()
            .context("invalid link selector")?;

        let mut directory = Self::default();
        for module in document.select(&module_sel) {
            let Some(heading) = module.select(&heading_sel).next() else {
                continue;
            };
            let team_name = heading.text().collect::<String>();
            let team = lookup.team_abbrev(&team_name)?;

            for link in module.select(&link_sel) {
                let Some(href) = link.value().attr("href") else {
                    continue;
                };
                let url = match base.join(href) {
                    Ok(url) => url,
                    Err(e) => {
                        warn!("skipping directory link {href:?}: {e}");
                        continue;
                    }
                };
                let name = lookup.resolve_name(&link.text().collect::<String>());
                directory.insert(&team, &name, url.as_str());
            }
        }
        Ok(directory)
    }

    // -----------------------------------------------------------------------
    // CSV cache
    // -----------------------------------------------------------------------

    /// Write the directory as `team,name,url` rows.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let mut wtr = csv::Writer::from_path(path)
            .with_context(|| format!("failed to create directory cache {}", path.display()))?;
        for (team, players) in &self.teams {
            for (name, url) in players {
                wtr.serialize(DirectoryRow {
                    team: team.clone(),
                    name: name.clone(),
                    url: url.clone(),
                })?;
            }
        }
        wtr.flush()?;
        Ok(())
    }

    /// Load a cached directory. A missing cache file is an empty directory.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let file = std::fs::File::open(path)
            .with_context(|| format!("failed to open directory cache {}", path.display()))?;
        Self::load_from_reader(file)
            .with_context(|| format!("failed to read directory cache {}", path.display()))
    }

    fn load_from_reader<R: Read>(rdr: R) -> Result<Self> {
        let mut reader = csv::Reader::from_reader(rdr);
        let mut directory = Self::default();
        for result in reader.deserialize::<DirectoryRow>() {
            let row = result?;
            directory.insert(&row.team, &row.name, &row.url);
        }
        Ok(directory)
    }
}

// Player-page parsing.
//
// A player page carries one module per game date. Each module has a header
// with the date (`Sat 1/6`) and a props table with rows of
// `Category | Line | Over | Under`.

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use propcast_basketball::scoring::StatCategory;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

/// One `Category | Line | Over | Under` row, moneylines still unparsed.
#[derive(Debug, Clone, PartialEq)]
pub struct PropRow {
    pub category: String,
    pub line: f64,
    pub over: String,
    pub under: String,
}

/// All prop rows posted for one game date.
#[derive(Debug, Clone, PartialEq)]
pub struct PageSection {
    /// Zero-filled `MM/DD`.
    pub date: String,
    pub rows: Vec<PropRow>,
}

/// Zero-fill a site date: `1/6` -> `01/06`. Returns `None` if the text is
/// not a month/day pair.
pub fn zero_fill_date(raw: &str) -> Option<String> {
    let (month, day) = raw.trim().split_once('/')?;
    let month: u32 = month.trim().parse().ok()?;
    let day: u32 = day.trim().parse().ok()?;
    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return None;
    }
    Some(format!("{month:02}/{day:02}"))
}

/// Site-native `MM/DD` for a calendar date.
pub fn site_date(date: NaiveDate) -> String {
    date.format("%m/%d").to_string()
}

/// Resolve an `MM/DD` string to the most recent matching date on or before
/// `today` (a December date seen in January belongs to the previous year).
fn resolve_date(mm_dd: &str, today: NaiveDate) -> Option<NaiveDate> {
    let (month, day) = mm_dd.split_once('/')?;
    let (month, day): (u32, u32) = (month.parse().ok()?, day.parse().ok()?);
    let this_year = NaiveDate::from_ymd_opt(today.year(), month, day)?;
    if this_year <= today {
        Some(this_year)
    } else {
        NaiveDate::from_ymd_opt(today.year() - 1, month, day)
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css)
        .ok()
        .with_context(|| format!("invalid selector {css:?}"))
}

fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Find the first `M/D` token in a section header.
fn header_date(module: ElementRef<'_>, span: &Selector) -> Option<String> {
    module
        .select(span)
        .flat_map(|s| s.text())
        .flat_map(str::split_whitespace)
        .find_map(zero_fill_date)
}

/// Parse every dated section on a player page.
///
/// Rows whose category is not a scored stat (combo markets, double-double
/// yes/no) are skipped, as are rows without a numeric line.
pub fn parse_player_page(html: &str) -> Result<Vec<PageSection>> {
    let document = Html::parse_document(html);
    let module_sel = selector("div.module")?;
    let span_sel = selector("span")?;
    let row_sel = selector("table tbody tr")?;
    let cell_sel = selector("td")?;

    let mut sections = Vec::new();
    for module in document.select(&module_sel) {
        let Some(date) = header_date(module, &span_sel) else {
            continue;
        };

        let mut rows = Vec::new();
        for tr in module.select(&row_sel) {
            let cells: Vec<String> = tr.select(&cell_sel).map(text_of).collect();
            if cells.len() < 4 {
                continue;
            }
            if cells[0].parse::<StatCategory>().is_err() {
                debug!("skipping unscored market {:?}", cells[0]);
                continue;
            }
            let line: f64 = match cells[1].parse() {
                Ok(line) => line,
                Err(_) => {
                    warn!("skipping {} row with non-numeric line {:?}", cells[0], cells[1]);
                    continue;
                }
            };
            rows.push(PropRow {
                category: cells[0].clone(),
                line,
                over: cells[2].clone(),
                under: cells[3].clone(),
            });
        }

        if !rows.is_empty() {
            sections.push(PageSection { date, rows });
        }
    }
    Ok(sections)
}

/// Choose the section to project from: today's if posted, otherwise the
/// most recent earlier section no more than `stale_window_days` old.
pub fn select_section(
    sections: &[PageSection],
    today: NaiveDate,
    stale_window_days: i64,
) -> Option<&PageSection> {
    let today_str = site_date(today);
    if let Some(current) = sections.iter().find(|s| s.date == today_str) {
        return Some(current);
    }

    sections
        .iter()
        .filter_map(|s| {
            let age = (today - resolve_date(&s.date, today)?).num_days();
            (age > 0 && age <= stale_window_days).then_some((age, s))
        })
        .min_by_key(|(age, _)| *age)
        .map(|(_, s)| s)
}

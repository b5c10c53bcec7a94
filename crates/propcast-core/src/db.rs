// SQLite persistence layer for the prop tracker.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use crate::tracker::{Observation, PlayerSeries, SeriesSummary, TrackerSnapshot};

/// Session bounds stored once per contest date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSession {
    pub init_time: String,
    pub latest_time: String,
}

/// SQLite-backed persistence for per-day projection time series.
///
/// Every table is keyed by `contest_date` (`YYYY-MM-DD`), so a new calendar
/// day starts with no rows and therefore a fresh tracker.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a SQLite database at `path` and ensure all tables
    /// exist. Pass `":memory:"` for an ephemeral in-memory database (useful
    /// for tests).
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {}", path.display()))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS tracker_sessions (
                contest_date TEXT PRIMARY KEY,
                init_time    TEXT NOT NULL,
                latest_time  TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS tracker_points (
                contest_date TEXT NOT NULL REFERENCES tracker_sessions(contest_date),
                name         TEXT NOT NULL,
                seq          INTEGER NOT NULL,
                fpts         REAL NOT NULL,
                e_fpts       REAL NOT NULL,
                scrape_time  TEXT NOT NULL,
                PRIMARY KEY (contest_date, name, seq)
            );

            CREATE TABLE IF NOT EXISTS tracker_summary (
                contest_date TEXT NOT NULL REFERENCES tracker_sessions(contest_date),
                name         TEXT NOT NULL,
                fpts_open    REAL NOT NULL,
                e_fpts_open  REAL NOT NULL,
                fpts_now     REAL NOT NULL,
                e_fpts_now   REAL NOT NULL,
                movements    INTEGER NOT NULL,
                e_movements  INTEGER NOT NULL,
                just_moved   INTEGER NOT NULL,
                PRIMARY KEY (contest_date, name)
            );
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the database connection.
    ///
    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock). This should never happen in normal operation.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    /// Load the session bounds for `contest_date`, if a session was saved.
    pub fn load_session(&self, contest_date: &str) -> Result<Option<StoredSession>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT init_time, latest_time FROM tracker_sessions WHERE contest_date = ?1",
            )
            .context("failed to prepare load_session query")?;

        let mut rows = stmt
            .query_map(params![contest_date], |row| {
                Ok(StoredSession {
                    init_time: row.get(0)?,
                    latest_time: row.get(1)?,
                })
            })
            .context("failed to query tracker session")?;

        match rows.next() {
            Some(row) => Ok(Some(row.context("failed to read tracker session row")?)),
            None => Ok(None),
        }
    }

    /// Load every player's series for `contest_date`, entries in the order
    /// they were appended.
    pub fn load_series(&self, contest_date: &str) -> Result<BTreeMap<String, PlayerSeries>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT name, fpts, e_fpts, scrape_time FROM tracker_points
                 WHERE contest_date = ?1 ORDER BY name, seq",
            )
            .context("failed to prepare load_series query")?;

        let rows = stmt
            .query_map(params![contest_date], |row| {
                let name: String = row.get(0)?;
                Ok((
                    name,
                    Observation {
                        fpts: row.get(1)?,
                        e_fpts: row.get(2)?,
                        scrape_time: row.get(3)?,
                    },
                ))
            })
            .context("failed to query tracker points")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map tracker point rows")?;

        let mut series: BTreeMap<String, PlayerSeries> = BTreeMap::new();
        for (name, observation) in rows {
            series.entry(name).or_default().push(observation);
        }
        Ok(series)
    }

    /// Replace everything stored for `contest_date` with the given session
    /// and series in a single transaction. A failure leaves the previous
    /// snapshot intact.
    pub fn replace_day(
        &self,
        contest_date: &str,
        session: &StoredSession,
        series: &BTreeMap<String, PlayerSeries>,
    ) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin transaction")?;

        tx.execute(
            "INSERT INTO tracker_sessions (contest_date, init_time, latest_time)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(contest_date) DO UPDATE SET
                init_time   = excluded.init_time,
                latest_time = excluded.latest_time",
            params![contest_date, session.init_time, session.latest_time],
        )
        .context("failed to upsert tracker session")?;

        tx.execute(
            "DELETE FROM tracker_points WHERE contest_date = ?1",
            params![contest_date],
        )
        .context("failed to clear tracker points")?;
        tx.execute(
            "DELETE FROM tracker_summary WHERE contest_date = ?1",
            params![contest_date],
        )
        .context("failed to clear tracker summary")?;

        {
            let mut insert_point = tx
                .prepare(
                    "INSERT INTO tracker_points (contest_date, name, seq, fpts, e_fpts, scrape_time)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                )
                .context("failed to prepare tracker point insert")?;
            let mut insert_summary = tx
                .prepare(
                    "INSERT INTO tracker_summary
                        (contest_date, name, fpts_open, e_fpts_open, fpts_now, e_fpts_now,
                         movements, e_movements, just_moved)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                )
                .context("failed to prepare tracker summary insert")?;

            for (name, player) in series {
                for (seq, obs) in player.observations().iter().enumerate() {
                    insert_point
                        .execute(params![
                            contest_date,
                            name,
                            seq as i64,
                            obs.fpts,
                            obs.e_fpts,
                            obs.scrape_time,
                        ])
                        .context("failed to insert tracker point")?;
                }

                let Some(summary) = player.summary() else {
                    continue;
                };
                insert_summary
                    .execute(params![
                        contest_date,
                        name,
                        summary.fpts_open,
                        summary.e_fpts_open,
                        summary.fpts_now,
                        summary.e_fpts_now,
                        summary.movements as i64,
                        summary.e_movements as i64,
                        summary.just_moved,
                    ])
                    .context("failed to insert tracker summary")?;
            }
        }

        tx.commit().context("failed to commit tracker snapshot")?;
        Ok(())
    }

    /// Read the full persisted snapshot for `contest_date`, one entry per
    /// player ordered by name. Empty when nothing was saved for that day.
    pub fn load_snapshot(&self, contest_date: &str) -> Result<Vec<TrackerSnapshot>> {
        let Some(session) = self.load_session(contest_date)? else {
            return Ok(Vec::new());
        };
        let mut series = self.load_series(contest_date)?;

        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT name, fpts_open, e_fpts_open, fpts_now, e_fpts_now,
                        movements, e_movements, just_moved
                 FROM tracker_summary WHERE contest_date = ?1 ORDER BY name",
            )
            .context("failed to prepare load_snapshot query")?;

        let summaries = stmt
            .query_map(params![contest_date], |row| {
                let name: String = row.get(0)?;
                let movements: i64 = row.get(5)?;
                let e_movements: i64 = row.get(6)?;
                Ok((
                    name,
                    SeriesSummary {
                        fpts_open: row.get(1)?,
                        e_fpts_open: row.get(2)?,
                        fpts_now: row.get(3)?,
                        e_fpts_now: row.get(4)?,
                        movements: movements as usize,
                        e_movements: e_movements as usize,
                        just_moved: row.get(7)?,
                    },
                ))
            })
            .context("failed to query tracker summary")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map tracker summary rows")?;

        let snapshot = summaries
            .into_iter()
            .map(|(name, summary)| {
                let player = series.remove(&name).unwrap_or_default();
                TrackerSnapshot {
                    name,
                    series: player,
                    init_time: session.init_time.clone(),
                    latest_time: session.latest_time.clone(),
                    summary,
                }
            })
            .collect();

        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: &str = "2024-01-06";

    /// Helper: create a fresh in-memory database for each test.
    fn test_db() -> Database {
        Database::open(":memory:").expect("in-memory database should open")
    }

    fn obs(fpts: f64, e_fpts: f64, at: &str) -> Observation {
        Observation {
            fpts,
            e_fpts,
            scrape_time: at.to_string(),
        }
    }

    fn session(init: &str, latest: &str) -> StoredSession {
        StoredSession {
            init_time: init.to_string(),
            latest_time: latest.to_string(),
        }
    }

    #[test]
    fn open_creates_tables() {
        let db = test_db();
        let conn = db.conn();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"tracker_sessions".to_string()));
        assert!(tables.contains(&"tracker_points".to_string()));
        assert!(tables.contains(&"tracker_summary".to_string()));
    }

    #[test]
    fn load_session_none_for_unknown_day() {
        let db = test_db();
        assert!(db.load_session(DAY).unwrap().is_none());
        assert!(db.load_series(DAY).unwrap().is_empty());
        assert!(db.load_snapshot(DAY).unwrap().is_empty());
    }

    #[test]
    fn replace_day_round_trip_preserves_order() {
        let db = test_db();
        let mut series = BTreeMap::new();
        let mut tatum = PlayerSeries::default();
        tatum.push(obs(48.25, 30.1, "19:00:05"));
        tatum.push(obs(47.5, 29.9, "19:01:00"));
        tatum.push(obs(48.25, 30.1, "19:02:10"));
        series.insert("Jayson Tatum".to_string(), tatum.clone());

        db.replace_day(DAY, &session("19:00:05", "19:02:10"), &series)
            .unwrap();

        let loaded = db.load_series(DAY).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded["Jayson Tatum"], tatum);
        assert_eq!(
            db.load_session(DAY).unwrap(),
            Some(session("19:00:05", "19:02:10"))
        );
    }

    #[test]
    fn replace_day_overwrites_previous_rows() {
        let db = test_db();
        let mut series = BTreeMap::new();
        let mut a = PlayerSeries::default();
        a.push(obs(10.0, 5.0, "10:00:00"));
        series.insert("A".to_string(), a);
        db.replace_day(DAY, &session("10:00:00", "10:00:00"), &series)
            .unwrap();

        series.clear();
        let mut b = PlayerSeries::default();
        b.push(obs(20.0, 9.0, "10:01:00"));
        series.insert("B".to_string(), b);
        db.replace_day(DAY, &session("10:00:00", "10:01:00"), &series)
            .unwrap();

        let loaded = db.load_series(DAY).unwrap();
        assert_eq!(loaded.keys().collect::<Vec<_>>(), vec!["B"]);
    }

    #[test]
    fn days_are_isolated() {
        let db = test_db();
        let mut series = BTreeMap::new();
        let mut a = PlayerSeries::default();
        a.push(obs(10.0, 5.0, "10:00:00"));
        series.insert("A".to_string(), a);
        db.replace_day(DAY, &session("10:00:00", "10:00:00"), &series)
            .unwrap();

        assert!(db.load_session("2024-01-07").unwrap().is_none());
        assert!(db.load_series("2024-01-07").unwrap().is_empty());
    }

    #[test]
    fn snapshot_carries_summary_and_session() {
        let db = test_db();
        let mut series = BTreeMap::new();
        let mut a = PlayerSeries::default();
        a.push(obs(10.0, 5.0, "10:00:00"));
        a.push(obs(12.0, 6.0, "10:01:00"));
        series.insert("A".to_string(), a);
        db.replace_day(DAY, &session("10:00:00", "10:01:00"), &series)
            .unwrap();

        let snapshot = db.load_snapshot(DAY).unwrap();
        assert_eq!(snapshot.len(), 1);
        let row = &snapshot[0];
        assert_eq!(row.name, "A");
        assert_eq!(row.init_time, "10:00:00");
        assert_eq!(row.latest_time, "10:01:00");
        assert_eq!(row.series.fpts(), vec![10.0, 12.0]);
        assert_eq!(row.summary.fpts_open, 10.0);
        assert_eq!(row.summary.fpts_now, 12.0);
        assert_eq!(row.summary.movements, 1);
        assert!(row.summary.just_moved);
    }
}

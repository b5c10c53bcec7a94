// Shared infrastructure: configuration, SQLite store, and the per-day
// line-movement tracker.

pub mod config;
pub mod db;
pub mod tracker;

// propcast entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file)
// 2. Load config
// 3. Open the tracker database and resume today's session
// 4. Poll the odds site until Ctrl+C or the iteration limit

use std::time::Duration;

use anyhow::Context;
use chrono::Local;
use propcast_app::cycle::CycleHandler;
use propcast_app::fetch::HttpFetcher;
use propcast_app::runner::{self, StopReason};
use propcast_basketball::conversions::Conversions;
use propcast_core::config;
use propcast_core::db::Database;
use propcast_core::tracker::PropTracker;
use tracing::info;

fn main() -> anyhow::Result<()> {
    init_tracing()?;
    info!("propcast starting up");

    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: site={}, slate={}, data dir={}",
        config.site.name,
        config.paths.slate.display(),
        config.paths.data_dir.display()
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;

    runtime.block_on(async move {
        let offset = chrono::Duration::minutes(config.tracker.clock_offset_minutes);
        let contest_date = (Local::now() + offset).date_naive();

        let db = Database::open(&config.paths.tracker_db).context("failed to open tracker database")?;
        info!("Tracker database opened at {}", config.paths.tracker_db.display());
        let tracker = PropTracker::open(db, contest_date, config.tracker.clock_offset_minutes)
            .context("failed to open tracker")?;

        let fetcher = HttpFetcher::new(
            &config.scrape.user_agent,
            Duration::from_secs(config.scrape.request_timeout_secs),
        )?;
        let mut lookup = Conversions::new();
        if let Some(path) = &config.paths.name_overrides {
            lookup = lookup.with_overrides_file(path)?;
            info!("Name overrides loaded from {}", path.display());
        }
        let mut handler = CycleHandler::new(
            &config,
            fetcher,
            Box::new(lookup),
            tracker,
            contest_date,
        );

        let shutdown = runner::shutdown_on(tokio::signal::ctrl_c());
        let (reason, cycles) = runner::run(&mut handler, &config.polling, shutdown).await?;
        match reason {
            StopReason::IterationLimit => info!("propcast finished after {cycles} cycles"),
            StopReason::Shutdown => info!("propcast shut down cleanly after {cycles} cycles"),
        }
        Ok::<(), anyhow::Error>(())
    })
}

/// Initialize tracing to log to `logs/propcast.log`.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("propcast.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("propcast=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}

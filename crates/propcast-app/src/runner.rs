// Polling loop: run a cycle, sleep a jittered delay, repeat until stopped.

use std::future::Future;
use std::time::Duration;

use propcast_core::config::PollingConfig;
use rand::Rng;
use tracing::{error, info};

use crate::cycle::{CycleError, CycleHandler};
use crate::fetch::PageFetcher;

/// Why the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// `max_iterations` cycles completed.
    IterationLimit,
    /// The shutdown future resolved.
    Shutdown,
}

/// Pick a delay uniformly from `[min_delay_secs, max_delay_secs]`.
pub fn jittered_delay(polling: &PollingConfig) -> Duration {
    let secs = rand::thread_rng().gen_range(polling.min_delay_secs..=polling.max_delay_secs);
    Duration::from_secs(secs)
}

/// Resolve when `signal` fires. A signal that fails to register never
/// resolves, leaving the iteration limit as the only stop.
pub async fn shutdown_on<S>(signal: S)
where
    S: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = signal.await {
        error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}

/// Run cycles until `shutdown` resolves or `max_iterations` is reached.
///
/// Any cycle error ends the loop, including a site-down cycle: a broken
/// index is not polled again.
pub async fn run<F, S>(
    handler: &mut CycleHandler<F>,
    polling: &PollingConfig,
    shutdown: S,
) -> Result<(StopReason, u32), CycleError>
where
    F: PageFetcher,
    S: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut completed: u32 = 0;

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => {
                info!("shutdown requested before cycle {}", completed + 1);
                return Ok((StopReason::Shutdown, completed));
            }
            result = handler.run_cycle() => match result {
                Ok(report) => info!(
                    "cycle {}: {}/{} players covered, {} moved, wrote {}",
                    completed + 1,
                    report.covered(),
                    report.projected,
                    report.moved.len(),
                    report.output.display()
                ),
                Err(e) => {
                    error!("cycle {} failed: {e}", completed + 1);
                    return Err(e);
                }
            },
        }
        completed += 1;

        if polling.max_iterations.is_some_and(|max| completed >= max) {
            info!("stopping after {completed} cycles");
            return Ok((StopReason::IterationLimit, completed));
        }

        let delay = jittered_delay(polling);
        info!("next cycle in {}s", delay.as_secs());
        tokio::select! {
            biased;
            _ = &mut shutdown => {
                info!("shutdown requested after {completed} cycles");
                return Ok((StopReason::Shutdown, completed));
            }
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jittered_delay_stays_in_bounds() {
        let polling = PollingConfig {
            min_delay_secs: 20,
            max_delay_secs: 25,
            max_iterations: None,
        };
        for _ in 0..200 {
            let secs = jittered_delay(&polling).as_secs();
            assert!((20..=25).contains(&secs), "{secs}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_on_resolves_when_signal_fires() {
        let signal = async { std::io::Result::Ok(()) };
        let fired = tokio::time::timeout(Duration::from_secs(1), shutdown_on(signal)).await;
        assert!(fired.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_on_failed_registration_never_resolves() {
        let failed = async {
            std::io::Result::<()>::Err(std::io::Error::other("signal handler unavailable"))
        };
        let waited = tokio::time::timeout(Duration::from_secs(3600), shutdown_on(failed)).await;
        assert!(waited.is_err());
    }

    #[test]
    fn fixed_delay_when_bounds_match() {
        let polling = PollingConfig {
            min_delay_secs: 7,
            max_delay_secs: 7,
            max_iterations: Some(1),
        };
        assert_eq!(jittered_delay(&polling), Duration::from_secs(7));
    }
}

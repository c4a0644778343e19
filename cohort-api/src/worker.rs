use chrono::Utc;
use cohort_catalog::expiry::BundleExpirySweeper;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{error, info};

/// Periodically expires bundles whose validity window has passed.
pub async fn start_expiry_worker(sweeper: BundleExpirySweeper, every: Duration) {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!("Bundle expiry worker started, sweeping every {:?}", every);

    loop {
        ticker.tick().await;
        run_sweep(&sweeper).await;
    }
}

pub async fn run_sweep(sweeper: &BundleExpirySweeper) -> usize {
    match sweeper.sweep(Utc::now()).await {
        Ok(0) => 0,
        Ok(expired) => {
            info!(expired, "Expired bundles past their validity");
            expired
        }
        Err(e) => {
            error!("Bundle expiry sweep failed: {}", e);
            0
        }
    }
}

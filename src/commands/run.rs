//! Run command - the polling sync loop

use crate::config::Config;
use crate::db::Store;
use crate::error::Result;
use crate::sync::{HttpSourceFactory, SyncOrchestrator};
use std::time::Duration;
use tracing::{error, info};

/// Run the sync service until interrupted
///
/// Store pool construction happens before the loop: if the database is
/// unavailable at startup the service aborts without executing a cycle.
/// Shutdown is cooperative at the inter-cycle sleep boundary; an
/// in-progress pass runs to completion.
pub async fn cmd_run(config: &Config) -> Result<()> {
    let store = Store::connect(config).await?;
    let factory = HttpSourceFactory::new(config);
    let mut orchestrator = SyncOrchestrator::new(store, config, Box::new(factory));

    info!(
        poll_interval_secs = config.sync.poll_interval_secs,
        max_retries = config.sync.max_retries,
        "Starting sync service"
    );

    loop {
        let delay = match orchestrator.run_cycle().await {
            Ok(stats) => {
                info!(
                    tenants = stats.tenants,
                    success = stats.success,
                    error = stats.error,
                    "Cycle finished, sleeping until next pass"
                );
                Duration::from_secs(config.sync.poll_interval_secs)
            }
            Err(e) => {
                error!("Sync cycle failed: {}", e);
                Duration::from_secs(config.sync.retry_delay_secs)
            }
        };

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal");
                break;
            }
        }
    }

    info!("Sync service stopped");
    Ok(())
}

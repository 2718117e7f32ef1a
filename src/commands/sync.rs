//! Sync command - run one cycle and exit

use crate::config::Config;
use crate::db::Store;
use crate::error::{Error, Result};
use crate::sync::{CycleStats, HttpSourceFactory, SyncOrchestrator};
use crate::tenant::TenantRegistry;

/// Run exactly one sync cycle, optionally for a single tenant
pub async fn cmd_sync(config: &Config, tenant_key: Option<&str>) -> Result<CycleStats> {
    let store = Store::connect(config).await?;
    let factory = HttpSourceFactory::new(config);
    let mut orchestrator = SyncOrchestrator::new(store.clone(), config, Box::new(factory));

    match tenant_key {
        Some(key) => {
            let registry = TenantRegistry::new(store, config.default_folders.clone());
            let tenant = registry
                .get_by_key(key)
                .await?
                .ok_or_else(|| Error::TenantNotFound(key.to_string()))?;

            let stats = orchestrator.sync_tenant(&tenant).await;
            Ok(CycleStats {
                tenants: 1,
                success: stats.success,
                error: stats.error,
            })
        }
        None => orchestrator.run_cycle().await,
    }
}

/// Print cycle stats to console
pub fn print_sync_stats(stats: &CycleStats) {
    println!("\n✓ Sync cycle complete");
    println!("  Tenants synced: {}", stats.tenants);
    println!("  Folders succeeded: {}", stats.success);
    println!("  Folders failed: {}", stats.error);
}

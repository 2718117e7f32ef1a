//! Status command - service health and recent activity

use crate::config::Config;
use crate::db::{ContentRecord, Store, StatusCounts, SyncLogEntry};
use crate::error::Result;
use serde::{Deserialize, Serialize};

const RECENT_LOG_LIMIT: i64 = 20;

/// Snapshot of service state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReport {
    pub tenant_count: usize,
    pub enabled_tenant_count: usize,
    pub records: StatusCounts,
    pub stuck_records: Vec<ContentRecord>,
    pub recent_log: Vec<SyncLogEntry>,
}

/// Collect a status report from the store
pub async fn cmd_status(config: &Config) -> Result<StatusReport> {
    let store = Store::connect(config).await?;

    let all_tenants = store.list_tenants(false).await?;
    let enabled = all_tenants.iter().filter(|t| t.sync_enabled).count();

    Ok(StatusReport {
        tenant_count: all_tenants.len(),
        enabled_tenant_count: enabled,
        records: store.record_status_counts(None).await?,
        stuck_records: store.stuck_records(config.sync.max_retries).await?,
        recent_log: store.recent_log(RECENT_LOG_LIMIT).await?,
    })
}

/// Print a status report to console
pub fn print_status(report: &StatusReport) {
    println!("\nportalsync status\n");
    println!(
        "Tenants: {} ({} enabled)",
        report.tenant_count, report.enabled_tenant_count
    );
    println!(
        "Records: {} active, {} deleted, {} error",
        report.records.active, report.records.deleted, report.records.error
    );

    if !report.stuck_records.is_empty() {
        println!("\nStuck records (retry ceiling reached):");
        for record in &report.stuck_records {
            println!(
                "  {} / {} - {} ({})",
                record.folder_name,
                record.file_name,
                record.error_message.as_deref().unwrap_or("unknown error"),
                record.retry_count
            );
        }
    }

    if !report.recent_log.is_empty() {
        println!("\nRecent operations:");
        for entry in &report.recent_log {
            println!(
                "  {} | {:7} | {} | {}",
                entry.created_at,
                entry.status,
                entry.folder_name.as_deref().unwrap_or("-"),
                entry.message
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::cmd_tenant_add;
    use crate::db::NewTenant;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_status_on_fresh_install() {
        let tmp = TempDir::new().unwrap();
        let config = Config::with_base_dir(Some(tmp.path().to_path_buf()));

        let report = cmd_status(&config).await.unwrap();
        assert_eq!(report.tenant_count, 0);
        assert_eq!(report.records.active, 0);
        assert!(report.stuck_records.is_empty());
        assert!(report.recent_log.is_empty());
    }

    #[tokio::test]
    async fn test_status_counts_tenants() {
        let tmp = TempDir::new().unwrap();
        let config = Config::with_base_dir(Some(tmp.path().to_path_buf()));

        cmd_tenant_add(
            &config,
            &NewTenant {
                tenant_key: "springfield".to_string(),
                name: "City of Springfield".to_string(),
                output_dir: "/var/www/springfield".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let report = cmd_status(&config).await.unwrap();
        assert_eq!(report.tenant_count, 1);
        assert_eq!(report.enabled_tenant_count, 1);
    }
}

//! Tenant management commands

use crate::config::Config;
use crate::db::{NewTenant, Store, Tenant};
use crate::error::{Error, Result};
use crate::tenant::{FolderConfigStore, TenantRegistry};
use tracing::info;

async fn registry(config: &Config) -> Result<TenantRegistry> {
    let store = Store::connect(config).await?;
    Ok(TenantRegistry::new(store, config.default_folders.clone()))
}

/// Register a new tenant with the default folder set
pub async fn cmd_tenant_add(config: &Config, new: &NewTenant) -> Result<Tenant> {
    let tenant = registry(config).await?.create(new).await?;
    info!(tenant_key = %tenant.tenant_key, "Tenant registered");
    Ok(tenant)
}

/// List registered tenants
pub async fn cmd_tenant_list(config: &Config, enabled_only: bool) -> Result<Vec<Tenant>> {
    registry(config).await?.list(enabled_only).await
}

/// Enable or disable sync for a tenant
pub async fn cmd_tenant_set_enabled(config: &Config, tenant_key: &str, enabled: bool) -> Result<()> {
    registry(config).await?.set_enabled(tenant_key, enabled).await
}

/// Point one of a tenant's folders at an external source folder
pub async fn cmd_tenant_set_folder(
    config: &Config,
    tenant_key: &str,
    folder_name: &str,
    source_folder_id: &str,
    enabled: bool,
) -> Result<()> {
    let store = Store::connect(config).await?;
    let tenant = store
        .tenant_by_key(tenant_key)
        .await?
        .ok_or_else(|| Error::TenantNotFound(tenant_key.to_string()))?;

    FolderConfigStore::new(store)
        .set_source_folder(&tenant.id, folder_name, source_folder_id, enabled)
        .await
}

/// Print tenants to console
pub fn print_tenants(tenants: &[Tenant]) {
    if tenants.is_empty() {
        println!("No tenants registered. Run 'portalsync tenants add' first.");
        return;
    }

    println!("\nRegistered tenants:\n");
    for tenant in tenants {
        let state = if tenant.sync_enabled { "enabled" } else { "disabled" };
        println!("  {} ({}) [{}]", tenant.tenant_key, tenant.name, state);
        if let Some(domain) = &tenant.domain {
            println!("    domain: {}", domain);
        }
        println!("    output: {}", tenant.output_dir);
        println!(
            "    last synced: {}",
            tenant.last_synced.as_deref().unwrap_or("never")
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn test_config() -> (Config, TempDir) {
        let tmp = TempDir::new().unwrap();
        let config = Config::with_base_dir(Some(tmp.path().to_path_buf()));
        (config, tmp)
    }

    fn springfield() -> NewTenant {
        NewTenant {
            tenant_key: "springfield".to_string(),
            name: "City of Springfield".to_string(),
            output_dir: "/var/www/springfield".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_add_list_toggle() {
        let (config, _tmp) = test_config().await;

        cmd_tenant_add(&config, &springfield()).await.unwrap();

        let tenants = cmd_tenant_list(&config, true).await.unwrap();
        assert_eq!(tenants.len(), 1);
        assert_eq!(tenants[0].tenant_key, "springfield");

        cmd_tenant_set_enabled(&config, "springfield", false).await.unwrap();
        assert!(cmd_tenant_list(&config, true).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_set_folder_requires_tenant() {
        let (config, _tmp) = test_config().await;

        let err = cmd_tenant_set_folder(&config, "nowhere", "budgets", "ext-1", true)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::TenantNotFound(_)));

        cmd_tenant_add(&config, &springfield()).await.unwrap();
        cmd_tenant_set_folder(&config, "springfield", "budgets", "ext-1", true)
            .await
            .unwrap();
    }
}

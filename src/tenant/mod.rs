//! Tenant and folder configuration management
//!
//! Thin policy layer over the store: tenant creation seeds the default
//! folder set in one transaction, and the timestamp touches are
//! best-effort so a bookkeeping failure never aborts a sync pass.

use crate::db::{FolderConfig, NewTenant, Store, Tenant};
use crate::error::Result;
use tracing::warn;

/// Creates, lists, and toggles tenants
#[derive(Clone)]
pub struct TenantRegistry {
    store: Store,
    default_folders: Vec<String>,
}

impl TenantRegistry {
    pub fn new(store: Store, default_folders: Vec<String>) -> Self {
        Self {
            store,
            default_folders,
        }
    }

    /// List tenants, optionally only those with sync enabled
    pub async fn list(&self, enabled_only: bool) -> Result<Vec<Tenant>> {
        self.store.list_tenants(enabled_only).await
    }

    /// Look up a tenant by its unique key; absence is not an error
    pub async fn get_by_key(&self, tenant_key: &str) -> Result<Option<Tenant>> {
        self.store.tenant_by_key(tenant_key).await
    }

    /// Look up a tenant by id; absence is not an error
    pub async fn get_by_id(&self, id: &str) -> Result<Option<Tenant>> {
        self.store.tenant_by_id(id).await
    }

    /// Create a tenant and its default folder configuration atomically
    ///
    /// Fails with `DuplicateTenant` if the key is taken. A tenant row
    /// without folder rows is never observable.
    pub async fn create(&self, new: &NewTenant) -> Result<Tenant> {
        self.store.create_tenant(new, &self.default_folders).await
    }

    /// Toggle sync for a tenant
    pub async fn set_enabled(&self, tenant_key: &str, enabled: bool) -> Result<()> {
        self.store.set_tenant_enabled(tenant_key, enabled).await
    }

    /// Update the tenant's last_synced timestamp; best-effort
    pub async fn touch_last_synced(&self, tenant_id: &str) {
        if let Err(e) = self.store.update_tenant_sync_time(tenant_id).await {
            warn!(tenant_id = %tenant_id, "Failed to update tenant sync time: {}", e);
        }
    }
}

/// Per-tenant folder configuration access
#[derive(Clone)]
pub struct FolderConfigStore {
    store: Store,
}

impl FolderConfigStore {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Enabled folders for a tenant, ordered by folder name
    pub async fn enabled_folders(&self, tenant_id: &str) -> Result<Vec<FolderConfig>> {
        self.store.folder_configs(tenant_id, true).await
    }

    /// All folders for a tenant, ordered by folder name
    pub async fn all_folders(&self, tenant_id: &str) -> Result<Vec<FolderConfig>> {
        self.store.folder_configs(tenant_id, false).await
    }

    /// Point a folder at an external source folder id
    pub async fn set_source_folder(
        &self,
        tenant_id: &str,
        folder_name: &str,
        source_folder_id: &str,
        enabled: bool,
    ) -> Result<()> {
        self.store
            .update_folder_source(tenant_id, folder_name, source_folder_id, enabled)
            .await
    }

    /// Update a folder's last_check timestamp; best-effort
    pub async fn mark_checked(&self, tenant_id: &str, folder_name: &str) {
        if let Err(e) = self.store.update_folder_check_time(tenant_id, folder_name).await {
            warn!(
                tenant_id = %tenant_id,
                folder = %folder_name,
                "Failed to update folder check time: {}",
                e
            );
        }
    }
}

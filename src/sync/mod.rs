//! The reconciliation state machine
//!
//! One pass walks tenants → folders → files sequentially. Per folder:
//! list the source, process new or changed files, infer deletions from
//! absence, regenerate the folder's aggregate fragment, and write one
//! log entry. Failures are caught at their own boundary: a listing
//! failure skips the folder until the next cycle, a parse failure marks
//! one record, a store failure loses one write. After a tenant's folders
//! comes one retry attempt for its error records below the retry ceiling.

use crate::config::Config;
use crate::db::{
    ContentRecord, FolderConfig, LogOperation, LogStatus, RecordStatus, RecordUpsert, Store,
    Tenant,
};
use crate::error::Result;
use crate::parse::{effective_content_type, ParserRegistry};
use crate::render;
use crate::source::{ContentSource, HttpSource, SourceFile};
use crate::tenant::{FolderConfigStore, TenantRegistry};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Builds a source handle for a tenant
pub trait SourceFactory: Send + Sync {
    fn create(&self, tenant: &Tenant) -> Result<Arc<dyn ContentSource>>;
}

/// Factory producing HTTP source clients, one per tenant
pub struct HttpSourceFactory {
    source: crate::config::SourceConfig,
    page_size: u32,
}

impl HttpSourceFactory {
    pub fn new(config: &Config) -> Self {
        Self {
            source: config.source.clone(),
            page_size: config.sync.batch_size,
        }
    }
}

impl SourceFactory for HttpSourceFactory {
    fn create(&self, tenant: &Tenant) -> Result<Arc<dyn ContentSource>> {
        let source = HttpSource::new(
            &self.source,
            self.page_size,
            tenant.credential_ref.as_deref(),
        )?;
        Ok(Arc::new(source))
    }
}

/// Folder outcome counts for one tenant pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TenantSyncStats {
    pub success: usize,
    pub error: usize,
}

/// Counts for one full cycle
#[derive(Debug, Clone, Copy, Default)]
pub struct CycleStats {
    pub tenants: usize,
    pub success: usize,
    pub error: usize,
}

/// Drives the reconciliation cycle
pub struct SyncOrchestrator {
    store: Store,
    tenants: TenantRegistry,
    folders: FolderConfigStore,
    parsers: ParserRegistry,
    factory: Box<dyn SourceFactory>,
    // Per-tenant source handles, cached across cycles to avoid
    // reauthentication; holds no state the store does not
    sources: HashMap<String, Arc<dyn ContentSource>>,
    max_retries: u32,
}

impl SyncOrchestrator {
    pub fn new(store: Store, config: &Config, factory: Box<dyn SourceFactory>) -> Self {
        Self {
            tenants: TenantRegistry::new(store.clone(), config.default_folders.clone()),
            folders: FolderConfigStore::new(store.clone()),
            parsers: ParserRegistry::with_defaults(),
            store,
            factory,
            sources: HashMap::new(),
            max_retries: config.sync.max_retries,
        }
    }

    /// Replace the default parser registry
    pub fn with_parsers(mut self, parsers: ParserRegistry) -> Self {
        self.parsers = parsers;
        self
    }

    /// Get or lazily create the source handle for a tenant
    fn source_for(&mut self, tenant: &Tenant) -> Result<Arc<dyn ContentSource>> {
        if let Some(source) = self.sources.get(&tenant.id) {
            return Ok(source.clone());
        }

        let source = self.factory.create(tenant)?;
        self.sources.insert(tenant.id.clone(), source.clone());
        debug!(tenant = %tenant.tenant_key, "Source client initialized");
        Ok(source)
    }

    /// Drop a tenant's cached source handle so the next use rebuilds it
    pub fn invalidate_source(&mut self, tenant_id: &str) {
        self.sources.remove(tenant_id);
    }

    /// Run one full pass over all enabled tenants
    pub async fn run_cycle(&mut self) -> Result<CycleStats> {
        info!("Starting sync cycle");
        let started = Instant::now();

        let tenants = self.tenants.list(true).await?;
        if tenants.is_empty() {
            warn!("No tenants configured or enabled");
            return Ok(CycleStats::default());
        }

        let mut stats = CycleStats {
            tenants: tenants.len(),
            ..Default::default()
        };

        for tenant in &tenants {
            let result = self.sync_tenant(tenant).await;
            stats.success += result.success;
            stats.error += result.error;
        }

        info!(
            tenants = stats.tenants,
            success = stats.success,
            error = stats.error,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Sync cycle complete"
        );
        Ok(stats)
    }

    /// Sync all enabled folders for one tenant, then retry its failures
    pub async fn sync_tenant(&mut self, tenant: &Tenant) -> TenantSyncStats {
        info!(tenant = %tenant.tenant_key, name = %tenant.name, "Syncing tenant");
        let started = Instant::now();

        let folder_list = match self.folders.enabled_folders(&tenant.id).await {
            Ok(folders) => folders,
            Err(e) => {
                error!(tenant = %tenant.tenant_key, "Failed to load folder configs: {}", e);
                return TenantSyncStats::default();
            }
        };

        if folder_list.is_empty() {
            warn!(tenant = %tenant.tenant_key, "No enabled folders configured");
            return TenantSyncStats::default();
        }

        let mut stats = TenantSyncStats::default();
        for folder in &folder_list {
            if self.sync_folder(tenant, folder).await {
                stats.success += 1;
            } else {
                stats.error += 1;
            }
        }

        self.retry_failed(tenant).await;
        self.tenants.touch_last_synced(&tenant.id).await;

        info!(
            tenant = %tenant.tenant_key,
            success = stats.success,
            error = stats.error,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Tenant sync complete"
        );
        stats
    }

    /// Reconcile a single folder; returns whether the folder succeeded
    pub async fn sync_folder(&mut self, tenant: &Tenant, folder: &FolderConfig) -> bool {
        let started = Instant::now();
        let folder_name = folder.folder_name.as_str();

        if folder.source_folder_id.is_empty() {
            debug!(
                tenant = %tenant.tenant_key,
                folder = %folder_name,
                "Skipping folder with no source folder id"
            );
            return false;
        }

        let source = match self.source_for(tenant) {
            Ok(source) => source,
            Err(e) => {
                error!(tenant = %tenant.tenant_key, "No source client available: {}", e);
                self.store
                    .log_operation(&LogOperation {
                        operation: "sync_folder",
                        status: LogStatus::Error,
                        message: "Source client unavailable",
                        tenant_id: Some(&tenant.id),
                        folder_name: Some(folder_name),
                        error_details: Some(&e.to_string()),
                        ..Default::default()
                    })
                    .await;
                return false;
            }
        };

        // 1. List the source folder; a failure here skips the folder and
        // self-heals next cycle since listing repeats every pass
        let files = match source.list_files(&folder.source_folder_id).await {
            Ok(files) => files,
            Err(e) => {
                error!(
                    tenant = %tenant.tenant_key,
                    folder = %folder_name,
                    "Source listing failed: {}",
                    e
                );
                self.store
                    .log_operation(&LogOperation {
                        operation: "sync_folder",
                        status: LogStatus::Error,
                        message: "Source unavailable",
                        tenant_id: Some(&tenant.id),
                        folder_name: Some(folder_name),
                        error_details: Some(&e.to_string()),
                        duration_ms: Some(started.elapsed().as_millis() as i64),
                        ..Default::default()
                    })
                    .await;
                return false;
            }
        };

        info!(
            tenant = %tenant.tenant_key,
            folder = %folder_name,
            count = files.len(),
            "Listed source folder"
        );

        // 2-4. Process each listed file, isolating failures per file
        let mut listed_ids: HashSet<String> = HashSet::new();
        for file in &files {
            listed_ids.insert(file.id.clone());
            if let Err(e) = self.process_file(&source, tenant, folder_name, file).await {
                warn!(
                    tenant = %tenant.tenant_key,
                    file = %file.name,
                    "Failed to persist record: {}",
                    e
                );
            }
        }

        // 5. Deletion by absence
        self.sweep_absent(tenant, folder_name, &listed_ids).await;

        // 6. Aggregate regeneration from the full active set
        if let Err(e) = self.publish_aggregate(tenant, folder_name).await {
            warn!(
                tenant = %tenant.tenant_key,
                folder = %folder_name,
                "Failed to publish aggregate fragment: {}",
                e
            );
        }

        // 7. Bookkeeping
        self.folders.mark_checked(&tenant.id, folder_name).await;

        let duration_ms = started.elapsed().as_millis() as i64;
        self.store
            .log_operation(&LogOperation {
                operation: "sync_folder",
                status: LogStatus::Success,
                message: &format!("Synced {} files", files.len()),
                tenant_id: Some(&tenant.id),
                folder_name: Some(folder_name),
                duration_ms: Some(duration_ms),
                ..Default::default()
            })
            .await;

        info!(
            tenant = %tenant.tenant_key,
            folder = %folder_name,
            duration_ms,
            "Folder sync complete"
        );
        true
    }

    /// Change-detect, parse, render, and persist one listed file
    async fn process_file(
        &self,
        source: &Arc<dyn ContentSource>,
        tenant: &Tenant,
        folder_name: &str,
        file: &SourceFile,
    ) -> Result<()> {
        let existing = self.store.record_by_file_id(&tenant.id, &file.id).await?;

        // Best-effort change detection: trust the source-reported
        // modification time; records not currently active are always
        // reprocessed so a restored file recovers
        if let Some(existing) = &existing {
            if existing.get_status().ok() == Some(RecordStatus::Active)
                && !is_newer(file.modified_time.as_deref(), &existing.last_synced)
            {
                debug!(
                    tenant = %tenant.tenant_key,
                    file = %file.name,
                    "No changes, skipping"
                );
                return Ok(());
            }
        }

        let content_type = effective_content_type(file);
        info!(
            tenant = %tenant.tenant_key,
            file = %file.name,
            content_type = %content_type,
            "Processing file"
        );

        let parser = self.parsers.resolve(&content_type);
        let parsed = match parser.parse(file, source.as_ref()).await {
            Ok(Some(data)) => data,
            Ok(None) => {
                return self
                    .record_parse_failure(
                        tenant,
                        folder_name,
                        file,
                        &content_type,
                        &format!("Failed to parse file of type {}", content_type),
                    )
                    .await;
            }
            Err(e) => {
                return self
                    .record_parse_failure(
                        tenant,
                        folder_name,
                        file,
                        &content_type,
                        &format!("Processing error: {}", e),
                    )
                    .await;
            }
        };

        let fragment = render::render_card(&parsed);
        let data = serde_json::to_string(&parsed)?;
        self.store
            .upsert_record(&RecordUpsert {
                tenant_id: &tenant.id,
                folder_name,
                file_id: &file.id,
                file_name: &file.name,
                content_type: &content_type,
                data: &data,
                fragment: Some(&fragment),
            })
            .await?;

        debug!(tenant = %tenant.tenant_key, file = %file.name, "Synced file");
        Ok(())
    }

    /// Persist a parse failure; creates the error row if the file was
    /// never ingested, with the listing metadata as its payload
    async fn record_parse_failure(
        &self,
        tenant: &Tenant,
        folder_name: &str,
        file: &SourceFile,
        content_type: &str,
        message: &str,
    ) -> Result<()> {
        warn!(
            tenant = %tenant.tenant_key,
            file = %file.name,
            "{}",
            message
        );
        let data = serde_json::to_string(file)?;
        self.store
            .record_failure(
                &RecordUpsert {
                    tenant_id: &tenant.id,
                    folder_name,
                    file_id: &file.id,
                    file_name: &file.name,
                    content_type,
                    data: &data,
                    fragment: None,
                },
                message,
            )
            .await
    }

    /// Mark active records absent from the fresh listing as deleted
    async fn sweep_absent(&self, tenant: &Tenant, folder_name: &str, listed: &HashSet<String>) {
        let records = match self.store.active_records(&tenant.id, folder_name).await {
            Ok(records) => records,
            Err(e) => {
                warn!(
                    tenant = %tenant.tenant_key,
                    folder = %folder_name,
                    "Deletion sweep failed to load records: {}",
                    e
                );
                return;
            }
        };

        for record in records {
            if listed.contains(&record.file_id) {
                continue;
            }
            info!(
                tenant = %tenant.tenant_key,
                file = %record.file_name,
                "Marking record as deleted"
            );
            if let Err(e) = self.store.mark_deleted(&record.file_id, Some(&tenant.id)).await {
                warn!(file = %record.file_name, "Failed to mark record deleted: {}", e);
            }
        }
    }

    /// Regenerate and write the folder's aggregate fragment
    async fn publish_aggregate(&self, tenant: &Tenant, folder_name: &str) -> Result<()> {
        let records = self.store.active_records(&tenant.id, folder_name).await?;
        let fragment = render::render_aggregate(&records);

        let output_dir = Path::new(&tenant.output_dir);
        tokio::fs::create_dir_all(output_dir).await?;
        let path = output_dir.join(format!("{}.html", folder_name));
        tokio::fs::write(&path, &fragment).await?;

        debug!(path = %path.display(), "Published aggregate fragment");
        Ok(())
    }

    /// One retry attempt for each of the tenant's error records below the
    /// retry ceiling
    pub async fn retry_failed(&mut self, tenant: &Tenant) {
        let due = match self
            .store
            .records_needing_retry(self.max_retries, Some(&tenant.id))
            .await
        {
            Ok(due) => due,
            Err(e) => {
                warn!(tenant = %tenant.tenant_key, "Failed to query retry records: {}", e);
                return;
            }
        };

        if due.is_empty() {
            debug!(tenant = %tenant.tenant_key, "No records need retry");
            return;
        }

        info!(tenant = %tenant.tenant_key, count = due.len(), "Retrying failed records");

        let source = match self.source_for(tenant) {
            Ok(source) => source,
            Err(e) => {
                error!(tenant = %tenant.tenant_key, "No source client for retry: {}", e);
                return;
            }
        };

        for record in due {
            if let Err(e) = self.retry_record(&source, tenant, &record).await {
                warn!(file = %record.file_name, "Retry attempt failed: {}", e);
            }
        }
    }

    /// Re-fetch fresh metadata and reprocess one error record
    async fn retry_record(
        &self,
        source: &Arc<dyn ContentSource>,
        tenant: &Tenant,
        record: &ContentRecord,
    ) -> Result<()> {
        let file = match source.fetch_metadata(&record.file_id).await {
            Ok(file) => file,
            Err(e) => {
                self.store
                    .mark_error(
                        &record.file_id,
                        &format!("Retry error: {}", e),
                        true,
                        Some(&tenant.id),
                    )
                    .await?;
                return Ok(());
            }
        };

        let content_type = effective_content_type(&file);
        let parser = self.parsers.resolve(&content_type);
        match parser.parse(&file, source.as_ref()).await {
            Ok(Some(parsed)) => {
                let fragment = render::render_card(&parsed);
                let data = serde_json::to_string(&parsed)?;
                self.store
                    .upsert_record(&RecordUpsert {
                        tenant_id: &tenant.id,
                        folder_name: &record.folder_name,
                        file_id: &file.id,
                        file_name: &file.name,
                        content_type: &content_type,
                        data: &data,
                        fragment: Some(&fragment),
                    })
                    .await?;
                info!(tenant = %tenant.tenant_key, file = %file.name, "Retry succeeded");
            }
            Ok(None) => {
                self.store
                    .mark_error(
                        &record.file_id,
                        "Retry failed - could not parse file",
                        true,
                        Some(&tenant.id),
                    )
                    .await?;
            }
            Err(e) => {
                self.store
                    .mark_error(
                        &record.file_id,
                        &format!("Retry error: {}", e),
                        true,
                        Some(&tenant.id),
                    )
                    .await?;
            }
        }
        Ok(())
    }
}

/// Whether the source-reported modification time is strictly newer than
/// the stored sync time. Plain string comparison of RFC3339 timestamps,
/// as the source reports them; a missing timestamp always reprocesses.
fn is_newer(reported: Option<&str>, stored: &str) -> bool {
    match reported {
        Some(reported) => reported > stored,
        None => true,
    }
}

//! Sync state storage using SQLite
//!
//! This module handles all durable state:
//! - Tenants and their folder configuration
//! - Content records (one per external file, soft-deleted via status)
//! - The append-only operation log

mod schema;

pub use schema::*;

use crate::config::Config;
use crate::error::{Error, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use std::str::FromStr;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Content record status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Active,
    Deleted,
    Error,
}

impl std::fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordStatus::Active => write!(f, "active"),
            RecordStatus::Deleted => write!(f, "deleted"),
            RecordStatus::Error => write!(f, "error"),
        }
    }
}

impl FromStr for RecordStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "active" => Ok(RecordStatus::Active),
            "deleted" => Ok(RecordStatus::Deleted),
            "error" => Ok(RecordStatus::Error),
            _ => Err(Error::Config(format!("Unknown record status: {}", s))),
        }
    }
}

/// Log entry status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStatus {
    #[default]
    Success,
    Error,
}

impl std::fmt::Display for LogStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogStatus::Success => write!(f, "success"),
            LogStatus::Error => write!(f, "error"),
        }
    }
}

/// A tenant row
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Tenant {
    pub id: String,
    pub tenant_key: String,
    pub name: String,
    pub domain: Option<String>,
    pub output_dir: String,
    pub credential_ref: Option<String>,
    pub sync_enabled: bool,
    pub last_synced: Option<String>,
    pub metadata: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields required to create a tenant
#[derive(Debug, Clone, Default)]
pub struct NewTenant {
    pub tenant_key: String,
    pub name: String,
    pub domain: Option<String>,
    pub output_dir: String,
    pub credential_ref: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

impl Tenant {
    fn from_new(new: &NewTenant) -> Self {
        let now = Utc::now().to_rfc3339();
        let metadata = new
            .metadata
            .as_ref()
            .map(|m| m.to_string())
            .unwrap_or_else(|| "{}".to_string());
        Self {
            id: Uuid::new_v4().to_string(),
            tenant_key: new.tenant_key.clone(),
            name: new.name.clone(),
            domain: new.domain.clone(),
            output_dir: new.output_dir.clone(),
            credential_ref: new.credential_ref.clone(),
            sync_enabled: true,
            last_synced: None,
            metadata,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

/// A folder configuration row
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct FolderConfig {
    pub id: String,
    pub tenant_id: String,
    pub folder_name: String,
    pub source_folder_id: String,
    pub enabled: bool,
    pub last_check: Option<String>,
    pub created_at: String,
}

/// A content record row
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ContentRecord {
    pub id: String,
    pub tenant_id: String,
    pub folder_name: String,
    pub file_id: String,
    pub file_name: String,
    pub content_type: String,
    pub data: String,
    pub fragment: Option<String>,
    pub status: String,
    pub error_message: Option<String>,
    pub retry_count: i64,
    pub last_synced: String,
    pub created_at: String,
}

impl ContentRecord {
    pub fn get_status(&self) -> Result<RecordStatus> {
        self.status.parse()
    }
}

/// Fields written by a record upsert
#[derive(Debug, Clone)]
pub struct RecordUpsert<'a> {
    pub tenant_id: &'a str,
    pub folder_name: &'a str,
    pub file_id: &'a str,
    pub file_name: &'a str,
    pub content_type: &'a str,
    pub data: &'a str,
    pub fragment: Option<&'a str>,
}

/// An operation log row
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SyncLogEntry {
    pub id: String,
    pub tenant_id: Option<String>,
    pub operation: String,
    pub folder_name: Option<String>,
    pub file_name: Option<String>,
    pub file_id: Option<String>,
    pub status: String,
    pub message: String,
    pub error_details: Option<String>,
    pub duration_ms: Option<i64>,
    pub created_at: String,
}

/// Fields for one appended log entry
#[derive(Debug, Clone, Default)]
pub struct LogOperation<'a> {
    pub operation: &'a str,
    pub status: LogStatus,
    pub message: &'a str,
    pub tenant_id: Option<&'a str>,
    pub folder_name: Option<&'a str>,
    pub file_name: Option<&'a str>,
    pub file_id: Option<&'a str>,
    pub error_details: Option<&'a str>,
    pub duration_ms: Option<i64>,
}

/// Per-status record counts
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusCounts {
    pub active: i64,
    pub deleted: i64,
    pub error: i64,
}

/// Sync database handle
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Connect using the configured database path
    pub async fn connect(config: &Config) -> Result<Self> {
        Self::open(&config.paths.db_file).await
    }

    /// Open a database at a path directly, initializing the schema if needed
    pub async fn open(db_path: &std::path::Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

        debug!("Connecting to SQLite database at {:?}", db_path);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self { pool };

        if !store.is_initialized().await? {
            store.init_schema().await?;
        }

        Ok(store)
    }

    /// Initialize the database schema
    pub async fn init_schema(&self) -> Result<()> {
        info!("Initializing database schema");
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    /// Check if database is initialized
    pub async fn is_initialized(&self) -> Result<bool> {
        let result: Option<(i32,)> =
            sqlx::query_as("SELECT 1 FROM sqlite_master WHERE type='table' AND name='tenants'")
                .fetch_optional(&self.pool)
                .await?;
        Ok(result.is_some())
    }

    /// Close the pool
    pub async fn close(&self) {
        self.pool.close().await;
    }

    // ===== Tenant Operations =====

    /// Create a tenant and its default folder rows in one transaction
    pub async fn create_tenant(&self, new: &NewTenant, default_folders: &[String]) -> Result<Tenant> {
        if self.tenant_by_key(&new.tenant_key).await?.is_some() {
            return Err(Error::DuplicateTenant(new.tenant_key.clone()));
        }

        let tenant = Tenant::from_new(new);
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO tenants (id, tenant_key, name, domain, output_dir, credential_ref,
                                 sync_enabled, last_synced, metadata, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&tenant.id)
        .bind(&tenant.tenant_key)
        .bind(&tenant.name)
        .bind(&tenant.domain)
        .bind(&tenant.output_dir)
        .bind(&tenant.credential_ref)
        .bind(tenant.sync_enabled)
        .bind(&tenant.last_synced)
        .bind(&tenant.metadata)
        .bind(&tenant.created_at)
        .bind(&tenant.updated_at)
        .execute(&mut *tx)
        .await?;

        // Folders start disabled; they are enabled when an external
        // source folder id is assigned
        for folder_name in default_folders {
            sqlx::query(
                r#"
                INSERT INTO folder_config (id, tenant_id, folder_name, source_folder_id, enabled, created_at)
                VALUES (?, ?, ?, '', 0, ?)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&tenant.id)
            .bind(folder_name)
            .bind(&tenant.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(tenant_key = %tenant.tenant_key, tenant_id = %tenant.id, "Created tenant");
        Ok(tenant)
    }

    /// List tenants, optionally only enabled ones
    pub async fn list_tenants(&self, enabled_only: bool) -> Result<Vec<Tenant>> {
        let query = if enabled_only {
            "SELECT * FROM tenants WHERE sync_enabled = 1 ORDER BY tenant_key"
        } else {
            "SELECT * FROM tenants ORDER BY tenant_key"
        };
        let tenants = sqlx::query_as::<_, Tenant>(query).fetch_all(&self.pool).await?;
        Ok(tenants)
    }

    /// Get tenant by its unique key
    pub async fn tenant_by_key(&self, tenant_key: &str) -> Result<Option<Tenant>> {
        let tenant = sqlx::query_as::<_, Tenant>("SELECT * FROM tenants WHERE tenant_key = ?")
            .bind(tenant_key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(tenant)
    }

    /// Get tenant by ID
    pub async fn tenant_by_id(&self, id: &str) -> Result<Option<Tenant>> {
        let tenant = sqlx::query_as::<_, Tenant>("SELECT * FROM tenants WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(tenant)
    }

    /// Toggle a tenant's sync_enabled flag
    pub async fn set_tenant_enabled(&self, tenant_key: &str, enabled: bool) -> Result<()> {
        let result = sqlx::query(
            "UPDATE tenants SET sync_enabled = ?, updated_at = ? WHERE tenant_key = ?",
        )
        .bind(enabled)
        .bind(Utc::now().to_rfc3339())
        .bind(tenant_key)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::TenantNotFound(tenant_key.to_string()));
        }
        Ok(())
    }

    /// Update a tenant's last_synced timestamp
    pub async fn update_tenant_sync_time(&self, tenant_id: &str) -> Result<()> {
        sqlx::query("UPDATE tenants SET last_synced = ? WHERE id = ?")
            .bind(Utc::now().to_rfc3339())
            .bind(tenant_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ===== Folder Configuration =====

    /// Get folder configurations for a tenant, ordered by folder name
    pub async fn folder_configs(&self, tenant_id: &str, enabled_only: bool) -> Result<Vec<FolderConfig>> {
        let query = if enabled_only {
            "SELECT * FROM folder_config WHERE tenant_id = ? AND enabled = 1 ORDER BY folder_name"
        } else {
            "SELECT * FROM folder_config WHERE tenant_id = ? ORDER BY folder_name"
        };
        let folders = sqlx::query_as::<_, FolderConfig>(query)
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(folders)
    }

    /// Point a folder at an external source folder and toggle it
    pub async fn update_folder_source(
        &self,
        tenant_id: &str,
        folder_name: &str,
        source_folder_id: &str,
        enabled: bool,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE folder_config SET source_folder_id = ?, enabled = ?
            WHERE tenant_id = ? AND folder_name = ?
            "#,
        )
        .bind(source_folder_id)
        .bind(enabled)
        .bind(tenant_id)
        .bind(folder_name)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::FolderNotFound(folder_name.to_string()));
        }
        Ok(())
    }

    /// Update a folder's last_check timestamp
    pub async fn update_folder_check_time(&self, tenant_id: &str, folder_name: &str) -> Result<()> {
        sqlx::query(
            "UPDATE folder_config SET last_check = ? WHERE tenant_id = ? AND folder_name = ?",
        )
        .bind(Utc::now().to_rfc3339())
        .bind(tenant_id)
        .bind(folder_name)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // ===== Content Records =====

    /// Insert or update a content record
    ///
    /// On conflict on (tenant_id, folder_name, file_id) the mutable fields
    /// are overwritten, status is forced back to active, the error message
    /// is cleared and the retry counter resets. Applying identical input
    /// twice yields the same final row.
    pub async fn upsert_record(&self, rec: &RecordUpsert<'_>) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO sync_data (id, tenant_id, folder_name, file_id, file_name, content_type,
                                   data, fragment, status, error_message, retry_count, last_synced, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, 'active', NULL, 0, ?, ?)
            ON CONFLICT(tenant_id, folder_name, file_id) DO UPDATE SET
                file_name = excluded.file_name,
                content_type = excluded.content_type,
                data = excluded.data,
                fragment = excluded.fragment,
                status = 'active',
                error_message = NULL,
                retry_count = 0,
                last_synced = excluded.last_synced
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(rec.tenant_id)
        .bind(rec.folder_name)
        .bind(rec.file_id)
        .bind(rec.file_name)
        .bind(rec.content_type)
        .bind(rec.data)
        .bind(rec.fragment)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Record a processing failure for a listed file
    ///
    /// Unlike `mark_error` this creates the row when the file has never
    /// been ingested, so a file that fails on first sight is still
    /// observable as an Error record. An existing row keeps its last good
    /// data and fragment; only the error fields change.
    pub async fn record_failure(&self, rec: &RecordUpsert<'_>, message: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO sync_data (id, tenant_id, folder_name, file_id, file_name, content_type,
                                   data, fragment, status, error_message, retry_count, last_synced, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, 'error', ?, 1, ?, ?)
            ON CONFLICT(tenant_id, folder_name, file_id) DO UPDATE SET
                status = 'error',
                error_message = excluded.error_message,
                retry_count = retry_count + 1,
                last_synced = excluded.last_synced
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(rec.tenant_id)
        .bind(rec.folder_name)
        .bind(rec.file_id)
        .bind(rec.file_name)
        .bind(rec.content_type)
        .bind(rec.data)
        .bind(rec.fragment)
        .bind(message)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        warn!(file_id = %rec.file_id, error = %message, "Recorded processing failure");
        Ok(())
    }

    /// Transition a record to deleted; all other fields are preserved
    pub async fn mark_deleted(&self, file_id: &str, tenant_id: Option<&str>) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        let query = match tenant_id {
            Some(tid) => sqlx::query(
                "UPDATE sync_data SET status = 'deleted', last_synced = ? WHERE file_id = ? AND tenant_id = ?",
            )
            .bind(&now)
            .bind(file_id)
            .bind(tid),
            None => sqlx::query(
                "UPDATE sync_data SET status = 'deleted', last_synced = ? WHERE file_id = ?",
            )
            .bind(&now)
            .bind(file_id),
        };
        query.execute(&mut *tx).await?;

        tx.commit().await?;
        info!(file_id = %file_id, "Marked record as deleted");
        Ok(())
    }

    /// Transition a record to error, optionally incrementing the retry counter
    pub async fn mark_error(
        &self,
        file_id: &str,
        message: &str,
        increment_retry: bool,
        tenant_id: Option<&str>,
    ) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let bump: i64 = if increment_retry { 1 } else { 0 };
        let mut tx = self.pool.begin().await?;

        let query = match tenant_id {
            Some(tid) => sqlx::query(
                r#"
                UPDATE sync_data
                SET status = 'error', error_message = ?, retry_count = retry_count + ?, last_synced = ?
                WHERE file_id = ? AND tenant_id = ?
                "#,
            )
            .bind(message)
            .bind(bump)
            .bind(&now)
            .bind(file_id)
            .bind(tid),
            None => sqlx::query(
                r#"
                UPDATE sync_data
                SET status = 'error', error_message = ?, retry_count = retry_count + ?, last_synced = ?
                WHERE file_id = ?
                "#,
            )
            .bind(message)
            .bind(bump)
            .bind(&now)
            .bind(file_id),
        };
        query.execute(&mut *tx).await?;

        tx.commit().await?;
        warn!(file_id = %file_id, error = %message, "Marked record as error");
        Ok(())
    }

    /// All active records for a tenant folder
    pub async fn active_records(&self, tenant_id: &str, folder_name: &str) -> Result<Vec<ContentRecord>> {
        let records = sqlx::query_as::<_, ContentRecord>(
            r#"
            SELECT * FROM sync_data
            WHERE tenant_id = ? AND folder_name = ? AND status = 'active'
            ORDER BY last_synced DESC, file_name
            "#,
        )
        .bind(tenant_id)
        .bind(folder_name)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    /// Look up a record by its external file id
    pub async fn record_by_file_id(&self, tenant_id: &str, file_id: &str) -> Result<Option<ContentRecord>> {
        let record = sqlx::query_as::<_, ContentRecord>(
            "SELECT * FROM sync_data WHERE tenant_id = ? AND file_id = ?",
        )
        .bind(tenant_id)
        .bind(file_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    /// Error records still below the retry ceiling, oldest first
    pub async fn records_needing_retry(
        &self,
        max_retries: u32,
        tenant_id: Option<&str>,
    ) -> Result<Vec<ContentRecord>> {
        let records = match tenant_id {
            Some(tid) => {
                sqlx::query_as::<_, ContentRecord>(
                    r#"
                    SELECT * FROM sync_data
                    WHERE tenant_id = ? AND status = 'error' AND retry_count < ?
                    ORDER BY last_synced ASC
                    "#,
                )
                .bind(tid)
                .bind(max_retries as i64)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, ContentRecord>(
                    r#"
                    SELECT * FROM sync_data
                    WHERE status = 'error' AND retry_count < ?
                    ORDER BY last_synced ASC
                    "#,
                )
                .bind(max_retries as i64)
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(records)
    }

    /// Error records at or above the retry ceiling (stuck until intervention)
    pub async fn stuck_records(&self, max_retries: u32) -> Result<Vec<ContentRecord>> {
        let records = sqlx::query_as::<_, ContentRecord>(
            "SELECT * FROM sync_data WHERE status = 'error' AND retry_count >= ? ORDER BY last_synced ASC",
        )
        .bind(max_retries as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    /// Per-status record counts, optionally for one tenant
    pub async fn record_status_counts(&self, tenant_id: Option<&str>) -> Result<StatusCounts> {
        let rows: Vec<(String, i64)> = match tenant_id {
            Some(tid) => {
                sqlx::query_as(
                    "SELECT status, COUNT(*) FROM sync_data WHERE tenant_id = ? GROUP BY status",
                )
                .bind(tid)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as("SELECT status, COUNT(*) FROM sync_data GROUP BY status")
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        let mut counts = StatusCounts::default();
        for (status, count) in rows {
            match status.as_str() {
                "active" => counts.active = count,
                "deleted" => counts.deleted = count,
                "error" => counts.error = count,
                _ => {}
            }
        }
        Ok(counts)
    }

    // ===== Operation Log =====

    /// Append one log entry; failures are logged and swallowed so the
    /// caller's sync path never fails on bookkeeping
    pub async fn log_operation(&self, op: &LogOperation<'_>) {
        let result = sqlx::query(
            r#"
            INSERT INTO sync_log (id, tenant_id, operation, folder_name, file_name, file_id,
                                  status, message, error_details, duration_ms, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(op.tenant_id)
        .bind(op.operation)
        .bind(op.folder_name)
        .bind(op.file_name)
        .bind(op.file_id)
        .bind(op.status.to_string())
        .bind(op.message)
        .bind(op.error_details)
        .bind(op.duration_ms)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            warn!(operation = %op.operation, "Failed to write sync log entry: {}", e);
        }
    }

    /// Most recent log entries
    pub async fn recent_log(&self, limit: i64) -> Result<Vec<SyncLogEntry>> {
        let entries = sqlx::query_as::<_, SyncLogEntry>(
            "SELECT * FROM sync_log ORDER BY created_at DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    /// Log entries for one tenant folder
    pub async fn folder_log(&self, tenant_id: &str, folder_name: &str) -> Result<Vec<SyncLogEntry>> {
        let entries = sqlx::query_as::<_, SyncLogEntry>(
            r#"
            SELECT * FROM sync_log
            WHERE tenant_id = ? AND folder_name = ?
            ORDER BY created_at DESC
            "#,
        )
        .bind(tenant_id)
        .bind(folder_name)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn setup_test_store() -> (Store, TempDir) {
        let tmp = TempDir::new().unwrap();
        let store = Store::open(&tmp.path().join("test.db")).await.unwrap();
        (store, tmp)
    }

    fn test_tenant(key: &str) -> NewTenant {
        NewTenant {
            tenant_key: key.to_string(),
            name: format!("City of {}", key),
            output_dir: format!("/var/www/{}", key),
            ..Default::default()
        }
    }

    fn folders(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn upsert<'a>(tenant_id: &'a str, file_id: &'a str, data: &'a str) -> RecordUpsert<'a> {
        RecordUpsert {
            tenant_id,
            folder_name: "budgets",
            file_id,
            file_name: "budget.pdf",
            content_type: "application/pdf",
            data,
            fragment: Some("<div class=\"card\"></div>"),
        }
    }

    #[tokio::test]
    async fn test_create_tenant_with_default_folders() {
        let (store, _tmp) = setup_test_store().await;

        let tenant = store
            .create_tenant(&test_tenant("springfield"), &folders(&["budgets", "agendas"]))
            .await
            .unwrap();

        let loaded = store.tenant_by_key("springfield").await.unwrap().unwrap();
        assert_eq!(loaded.id, tenant.id);
        assert!(loaded.sync_enabled);

        let configs = store.folder_configs(&tenant.id, false).await.unwrap();
        assert_eq!(configs.len(), 2);
        // Deterministic ordering by folder name
        assert_eq!(configs[0].folder_name, "agendas");
        assert_eq!(configs[1].folder_name, "budgets");
    }

    #[tokio::test]
    async fn test_duplicate_tenant_rejected() {
        let (store, _tmp) = setup_test_store().await;

        store
            .create_tenant(&test_tenant("springfield"), &folders(&["budgets"]))
            .await
            .unwrap();

        let err = store
            .create_tenant(&test_tenant("springfield"), &folders(&["budgets"]))
            .await
            .expect_err("duplicate key should be rejected");

        match err {
            Error::DuplicateTenant(key) => assert_eq!(key, "springfield"),
            other => panic!("expected DuplicateTenant, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_enable_disable_tenant() {
        let (store, _tmp) = setup_test_store().await;
        store
            .create_tenant(&test_tenant("springfield"), &folders(&["budgets"]))
            .await
            .unwrap();

        store.set_tenant_enabled("springfield", false).await.unwrap();
        assert!(store.list_tenants(true).await.unwrap().is_empty());
        assert_eq!(store.list_tenants(false).await.unwrap().len(), 1);

        store.set_tenant_enabled("springfield", true).await.unwrap();
        assert_eq!(store.list_tenants(true).await.unwrap().len(), 1);

        let err = store.set_tenant_enabled("nowhere", false).await.unwrap_err();
        assert!(matches!(err, Error::TenantNotFound(_)));
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let (store, _tmp) = setup_test_store().await;
        let tenant = store
            .create_tenant(&test_tenant("springfield"), &folders(&["budgets"]))
            .await
            .unwrap();

        let rec = upsert(&tenant.id, "file-1", r#"{"type":"file","name":"budget.pdf"}"#);
        store.upsert_record(&rec).await.unwrap();
        store.upsert_record(&rec).await.unwrap();

        let records = store.active_records(&tenant.id, "budgets").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].retry_count, 0);
        assert!(records[0].error_message.is_none());
        assert_eq!(records[0].get_status().unwrap(), RecordStatus::Active);
    }

    #[tokio::test]
    async fn test_mark_deleted_preserves_fields() {
        let (store, _tmp) = setup_test_store().await;
        let tenant = store
            .create_tenant(&test_tenant("springfield"), &folders(&["budgets"]))
            .await
            .unwrap();

        store
            .upsert_record(&upsert(&tenant.id, "file-1", r#"{"type":"file"}"#))
            .await
            .unwrap();
        store.mark_deleted("file-1", Some(&tenant.id)).await.unwrap();

        let record = store.record_by_file_id(&tenant.id, "file-1").await.unwrap().unwrap();
        assert_eq!(record.get_status().unwrap(), RecordStatus::Deleted);
        assert_eq!(record.file_name, "budget.pdf");
        assert_eq!(record.data, r#"{"type":"file"}"#);
        assert!(store.active_records(&tenant.id, "budgets").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mark_error_increments_and_upsert_recovers() {
        let (store, _tmp) = setup_test_store().await;
        let tenant = store
            .create_tenant(&test_tenant("springfield"), &folders(&["budgets"]))
            .await
            .unwrap();

        store
            .upsert_record(&upsert(&tenant.id, "file-1", r#"{"type":"file"}"#))
            .await
            .unwrap();

        store
            .mark_error("file-1", "parse failed", true, Some(&tenant.id))
            .await
            .unwrap();
        store
            .mark_error("file-1", "parse failed again", true, Some(&tenant.id))
            .await
            .unwrap();

        let record = store.record_by_file_id(&tenant.id, "file-1").await.unwrap().unwrap();
        assert_eq!(record.get_status().unwrap(), RecordStatus::Error);
        assert_eq!(record.retry_count, 2);
        assert_eq!(record.error_message.as_deref(), Some("parse failed again"));

        // Successful reprocessing resets the counter and clears the message
        store
            .upsert_record(&upsert(&tenant.id, "file-1", r#"{"type":"file"}"#))
            .await
            .unwrap();
        let record = store.record_by_file_id(&tenant.id, "file-1").await.unwrap().unwrap();
        assert_eq!(record.get_status().unwrap(), RecordStatus::Active);
        assert_eq!(record.retry_count, 0);
        assert!(record.error_message.is_none());
    }

    #[tokio::test]
    async fn test_record_failure_creates_then_increments() {
        let (store, _tmp) = setup_test_store().await;
        let tenant = store
            .create_tenant(&test_tenant("springfield"), &folders(&["budgets"]))
            .await
            .unwrap();

        // First failure: the file has never been ingested
        let rec = upsert(&tenant.id, "file-1", r#"{"type":"file"}"#);
        store.record_failure(&rec, "cannot parse").await.unwrap();

        let record = store.record_by_file_id(&tenant.id, "file-1").await.unwrap().unwrap();
        assert_eq!(record.get_status().unwrap(), RecordStatus::Error);
        assert_eq!(record.retry_count, 1);
        assert_eq!(record.error_message.as_deref(), Some("cannot parse"));

        // A previously good record keeps its data, only the error fields move
        store.upsert_record(&rec).await.unwrap();
        let good = upsert(&tenant.id, "file-1", r#"{"type":"file","title":"new"}"#);
        store.record_failure(&good, "broke on update").await.unwrap();

        let record = store.record_by_file_id(&tenant.id, "file-1").await.unwrap().unwrap();
        assert_eq!(record.retry_count, 1);
        assert_eq!(record.data, r#"{"type":"file"}"#);
        assert_eq!(record.error_message.as_deref(), Some("broke on update"));
    }

    #[tokio::test]
    async fn test_retry_ceiling_excludes_exhausted_records() {
        let (store, _tmp) = setup_test_store().await;
        let tenant = store
            .create_tenant(&test_tenant("springfield"), &folders(&["budgets"]))
            .await
            .unwrap();

        store
            .upsert_record(&upsert(&tenant.id, "file-1", r#"{"type":"file"}"#))
            .await
            .unwrap();

        for _ in 0..3 {
            store
                .mark_error("file-1", "still failing", true, Some(&tenant.id))
                .await
                .unwrap();
        }

        let due = store.records_needing_retry(3, Some(&tenant.id)).await.unwrap();
        assert!(due.is_empty());

        let stuck = store.stuck_records(3).await.unwrap();
        assert_eq!(stuck.len(), 1);
        assert_eq!(stuck[0].file_id, "file-1");

        // A higher ceiling makes it eligible again
        let due = store.records_needing_retry(5, Some(&tenant.id)).await.unwrap();
        assert_eq!(due.len(), 1);
    }

    #[tokio::test]
    async fn test_log_and_counts() {
        let (store, _tmp) = setup_test_store().await;
        let tenant = store
            .create_tenant(&test_tenant("springfield"), &folders(&["budgets"]))
            .await
            .unwrap();

        store
            .log_operation(&LogOperation {
                operation: "sync_folder",
                status: LogStatus::Success,
                message: "Synced 3 files",
                tenant_id: Some(&tenant.id),
                folder_name: Some("budgets"),
                duration_ms: Some(42),
                ..Default::default()
            })
            .await;

        let entries = store.recent_log(10).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].operation, "sync_folder");
        assert_eq!(entries[0].status, "success");
        assert_eq!(entries[0].duration_ms, Some(42));

        store
            .upsert_record(&upsert(&tenant.id, "file-1", r#"{"type":"file"}"#))
            .await
            .unwrap();
        let counts = store.record_status_counts(Some(&tenant.id)).await.unwrap();
        assert_eq!(counts.active, 1);
        assert_eq!(counts.deleted, 0);
        assert_eq!(counts.error, 0);
    }

    #[tokio::test]
    async fn test_open_fails_under_unwritable_parent() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("not-a-dir");
        std::fs::write(&blocker, b"plain file").unwrap();

        let result = Store::open(&blocker.join("nested").join("test.db")).await;
        assert!(result.is_err());
    }
}

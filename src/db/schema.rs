//! SQLite schema definition

/// SQL schema for the sync database
pub const SCHEMA_SQL: &str = r#"
-- Tenants: isolated owners of folder configuration and output
CREATE TABLE IF NOT EXISTS tenants (
    id TEXT PRIMARY KEY,
    tenant_key TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    domain TEXT,
    output_dir TEXT NOT NULL,
    credential_ref TEXT,
    sync_enabled INTEGER NOT NULL DEFAULT 1,
    last_synced TEXT,
    metadata TEXT NOT NULL DEFAULT '{}',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Folder configuration: one row per (tenant, folder)
CREATE TABLE IF NOT EXISTS folder_config (
    id TEXT PRIMARY KEY,
    tenant_id TEXT NOT NULL REFERENCES tenants(id),
    folder_name TEXT NOT NULL,
    source_folder_id TEXT NOT NULL DEFAULT '',
    enabled INTEGER NOT NULL DEFAULT 0,
    last_check TEXT,
    created_at TEXT NOT NULL,
    UNIQUE(tenant_id, folder_name)
);

-- Content records: one row per external file, soft-deleted via status
CREATE TABLE IF NOT EXISTS sync_data (
    id TEXT PRIMARY KEY,
    tenant_id TEXT NOT NULL REFERENCES tenants(id),
    folder_name TEXT NOT NULL,
    file_id TEXT NOT NULL,
    file_name TEXT NOT NULL,
    content_type TEXT NOT NULL,
    data TEXT NOT NULL,
    fragment TEXT,
    status TEXT NOT NULL DEFAULT 'active',
    error_message TEXT,
    retry_count INTEGER NOT NULL DEFAULT 0,
    last_synced TEXT NOT NULL,
    created_at TEXT NOT NULL,
    UNIQUE(tenant_id, folder_name, file_id)
);

-- Operation log: append-only
CREATE TABLE IF NOT EXISTS sync_log (
    id TEXT PRIMARY KEY,
    tenant_id TEXT,
    operation TEXT NOT NULL,
    folder_name TEXT,
    file_name TEXT,
    file_id TEXT,
    status TEXT NOT NULL,
    message TEXT NOT NULL,
    error_details TEXT,
    duration_ms INTEGER,
    created_at TEXT NOT NULL
);

-- Indexes for performance
CREATE INDEX IF NOT EXISTS idx_folder_config_tenant ON folder_config(tenant_id);
CREATE INDEX IF NOT EXISTS idx_sync_data_tenant_folder ON sync_data(tenant_id, folder_name);
CREATE INDEX IF NOT EXISTS idx_sync_data_file ON sync_data(file_id);
CREATE INDEX IF NOT EXISTS idx_sync_data_status ON sync_data(status);
CREATE INDEX IF NOT EXISTS idx_sync_log_tenant ON sync_log(tenant_id);
CREATE INDEX IF NOT EXISTS idx_sync_log_created ON sync_log(created_at);
"#;

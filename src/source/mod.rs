//! External content source access
//!
//! A source lists the files of an external folder and serves their raw
//! content. Listing and fetching are side-effect free on the source and
//! safely repeatable; the orchestrator re-lists every cycle.

mod http;

pub use http::*;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Metadata for one file as reported by the source
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceFile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub content_type: String,
    #[serde(default)]
    pub modified_time: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub view_link: Option<String>,
    #[serde(default)]
    pub download_link: Option<String>,
    #[serde(default)]
    pub thumbnail_link: Option<String>,
}

/// Read-only access to an external content folder
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// List all files in a folder
    async fn list_files(&self, folder_id: &str) -> Result<Vec<SourceFile>>;

    /// Fetch fresh metadata for a single file
    async fn fetch_metadata(&self, file_id: &str) -> Result<SourceFile>;

    /// Fetch the raw content of a file
    async fn fetch(&self, file_id: &str) -> Result<Vec<u8>>;
}

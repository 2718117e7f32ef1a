//! HTTP-backed content source
//!
//! Speaks to a JSON file-listing API:
//! - `GET /folders/{folder_id}/files` → `{"files": [...]}`
//! - `GET /files/{file_id}` → file metadata
//! - `GET /files/{file_id}/content` → raw bytes
//!
//! The tenant's credential reference is passed through verbatim as a
//! bearer token; acquiring or refreshing credentials is not this
//! service's concern.

use super::{ContentSource, SourceFile};
use crate::config::SourceConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

#[derive(Debug, Deserialize)]
struct ListFilesResponse {
    #[serde(default)]
    files: Vec<SourceFile>,
}

/// Content source over HTTP
pub struct HttpSource {
    client: Client,
    base_url: Url,
    page_size: u32,
    token: Option<String>,
}

impl HttpSource {
    /// Build a source client from config and an opaque credential reference
    pub fn new(config: &SourceConfig, page_size: u32, token: Option<&str>) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)?;

        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url,
            page_size,
            token: token.map(|t| t.to_string()),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::Source(format!("invalid endpoint {}: {}", path, e)))
    }

    fn request(&self, url: Url) -> reqwest::RequestBuilder {
        let req = self.client.get(url);
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }
}

#[async_trait]
impl ContentSource for HttpSource {
    async fn list_files(&self, folder_id: &str) -> Result<Vec<SourceFile>> {
        let url = self.endpoint(&format!("folders/{}/files", folder_id))?;
        debug!(folder_id = %folder_id, "Listing source folder");

        let response = self
            .request(url)
            .query(&[("pageSize", self.page_size)])
            .send()
            .await?
            .error_for_status()?;

        let listing: ListFilesResponse = response.json().await?;
        Ok(listing.files)
    }

    async fn fetch_metadata(&self, file_id: &str) -> Result<SourceFile> {
        let url = self.endpoint(&format!("files/{}", file_id))?;
        let response = self.request(url).send().await?.error_for_status()?;
        let file: SourceFile = response.json().await?;
        Ok(file)
    }

    async fn fetch(&self, file_id: &str) -> Result<Vec<u8>> {
        let url = self.endpoint(&format!("files/{}/content", file_id))?;
        let response = self.request(url).send().await?.error_for_status()?;
        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }
}

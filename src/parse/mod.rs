//! File parsing and structured record extraction
//!
//! Each supported content type has a parser that turns a source file into
//! a structured record. Parsers are looked up through an explicit
//! registry keyed by content-type token, with prefix rules for families
//! like `video/` and a metadata-only fallback for everything else.

mod document;
mod markdown;
mod metadata;
mod spreadsheet;

pub use document::*;
pub use markdown::*;
pub use metadata::*;
pub use spreadsheet::*;

use crate::error::Result;
use crate::source::{ContentSource, SourceFile};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Structured record produced by a parser, tagged by kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecordData {
    Spreadsheet {
        name: String,
        title: String,
        columns: Vec<String>,
        row_count: usize,
        rows: Vec<serde_json::Value>,
        last_modified: Option<String>,
        view_link: Option<String>,
    },
    Markdown {
        name: String,
        title: String,
        content: String,
        html: String,
        last_modified: Option<String>,
        view_link: Option<String>,
    },
    Document {
        name: String,
        title: String,
        content: String,
        preview: String,
        last_modified: Option<String>,
        view_link: Option<String>,
        size: Option<u64>,
    },
    Video {
        name: String,
        title: String,
        last_modified: Option<String>,
        view_link: Option<String>,
        thumbnail_link: Option<String>,
        size: Option<u64>,
    },
    File {
        name: String,
        title: String,
        last_modified: Option<String>,
        view_link: Option<String>,
        download_link: Option<String>,
        thumbnail_link: Option<String>,
        size: Option<u64>,
    },
}

impl RecordData {
    /// The file name the record was built from
    pub fn file_name(&self) -> &str {
        match self {
            RecordData::Spreadsheet { name, .. }
            | RecordData::Markdown { name, .. }
            | RecordData::Document { name, .. }
            | RecordData::Video { name, .. }
            | RecordData::File { name, .. } => name,
        }
    }
}

/// Converts one source file into a structured record
///
/// Returning `Ok(None)` and returning an error are treated identically by
/// the orchestrator: the file is recorded as failed.
#[async_trait]
pub trait ContentParser: Send + Sync {
    /// Short name used in logs and error messages
    fn name(&self) -> &'static str;

    async fn parse(
        &self,
        file: &SourceFile,
        source: &dyn ContentSource,
    ) -> Result<Option<RecordData>>;
}

/// Registry mapping content-type tokens to parsers
pub struct ParserRegistry {
    exact: HashMap<String, Arc<dyn ContentParser>>,
    prefixes: Vec<(String, Arc<dyn ContentParser>)>,
    fallback: Arc<dyn ContentParser>,
}

impl ParserRegistry {
    /// Empty registry with the given fallback
    pub fn new(fallback: Arc<dyn ContentParser>) -> Self {
        Self {
            exact: HashMap::new(),
            prefixes: Vec::new(),
            fallback,
        }
    }

    /// Registry covering the standard content types
    pub fn with_defaults() -> Self {
        let spreadsheet = Arc::new(SpreadsheetParser);
        let document = Arc::new(DocumentParser);

        let mut registry = Self::new(Arc::new(MetadataParser));
        registry.register("text/csv", spreadsheet.clone());
        registry.register(
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            spreadsheet,
        );
        registry.register("text/markdown", Arc::new(MarkdownParser));
        registry.register(
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            document.clone(),
        );
        registry.register_prefix("video/", Arc::new(VideoParser));
        registry.register_prefix("text/", document);
        registry
    }

    /// Register a parser for an exact content-type token
    pub fn register(&mut self, token: &str, parser: Arc<dyn ContentParser>) {
        self.exact.insert(token.to_string(), parser);
    }

    /// Register a parser for a content-type prefix (e.g. `video/`)
    pub fn register_prefix(&mut self, prefix: &str, parser: Arc<dyn ContentParser>) {
        self.prefixes.push((prefix.to_string(), parser));
    }

    /// Resolve the parser for a content type; exact tokens win over
    /// prefixes, and unregistered types get the fallback
    pub fn resolve(&self, content_type: &str) -> &Arc<dyn ContentParser> {
        if let Some(parser) = self.exact.get(content_type) {
            return parser;
        }
        for (prefix, parser) in &self.prefixes {
            if content_type.starts_with(prefix.as_str()) {
                return parser;
            }
        }
        &self.fallback
    }
}

/// The content type to dispatch on, guessed from the file name when the
/// source did not report one
pub fn effective_content_type(file: &SourceFile) -> String {
    if !file.content_type.is_empty() {
        return file.content_type.clone();
    }
    mime_guess::from_path(&file.name)
        .first_raw()
        .unwrap_or("application/octet-stream")
        .to_string()
}

/// Strip the final extension from a file name for use as a title
pub(crate) fn title_from_name(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => name.to_string(),
    }
}

/// Truncate to at most `max` characters on a char boundary
pub(crate) fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::error::{Error, Result};
    use std::collections::HashMap;

    /// In-memory source for parser tests
    #[derive(Default)]
    pub struct StubSource {
        pub contents: HashMap<String, Vec<u8>>,
    }

    impl StubSource {
        pub fn with_file(id: &str, content: &[u8]) -> Self {
            let mut contents = HashMap::new();
            contents.insert(id.to_string(), content.to_vec());
            Self { contents }
        }
    }

    #[async_trait]
    impl ContentSource for StubSource {
        async fn list_files(&self, _folder_id: &str) -> Result<Vec<SourceFile>> {
            Ok(Vec::new())
        }

        async fn fetch_metadata(&self, file_id: &str) -> Result<SourceFile> {
            Err(Error::Source(format!("no metadata for {}", file_id)))
        }

        async fn fetch(&self, file_id: &str) -> Result<Vec<u8>> {
            self.contents
                .get(file_id)
                .cloned()
                .ok_or_else(|| Error::Source(format!("no such file: {}", file_id)))
        }
    }

    pub fn file(id: &str, name: &str, content_type: &str) -> SourceFile {
        SourceFile {
            id: id.to_string(),
            name: name.to_string(),
            content_type: content_type.to_string(),
            modified_time: Some("2025-06-01T10:00:00Z".to_string()),
            size: Some(1024),
            view_link: Some(format!("https://source.example.com/view/{}", id)),
            download_link: None,
            thumbnail_link: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_resolution() {
        let registry = ParserRegistry::with_defaults();

        assert_eq!(registry.resolve("text/csv").name(), "spreadsheet");
        assert_eq!(registry.resolve("text/markdown").name(), "markdown");
        assert_eq!(registry.resolve("text/plain").name(), "document");
        assert_eq!(registry.resolve("video/mp4").name(), "video");
        // Unregistered types fall back to metadata-only parsing
        assert_eq!(registry.resolve("application/pdf").name(), "metadata");
        assert_eq!(registry.resolve("application/zip").name(), "metadata");
    }

    #[test]
    fn test_exact_token_wins_over_prefix() {
        let registry = ParserRegistry::with_defaults();
        // text/markdown matches both the exact token and the text/ prefix
        assert_eq!(registry.resolve("text/markdown").name(), "markdown");
    }

    #[test]
    fn test_effective_content_type_guesses_from_name() {
        let mut file = test_support::file("f1", "report.pdf", "");
        assert_eq!(effective_content_type(&file), "application/pdf");

        file.content_type = "text/csv".to_string();
        assert_eq!(effective_content_type(&file), "text/csv");

        let unknown = test_support::file("f2", "mystery", "");
        assert_eq!(effective_content_type(&unknown), "application/octet-stream");
    }

    #[test]
    fn test_title_from_name() {
        assert_eq!(title_from_name("budget_2025.pdf"), "budget_2025");
        assert_eq!(title_from_name("README"), "README");
        assert_eq!(title_from_name(".hidden"), ".hidden");
    }

    #[test]
    fn test_record_data_round_trips_with_type_tag() {
        let data = RecordData::File {
            name: "budget.pdf".to_string(),
            title: "budget".to_string(),
            last_modified: None,
            view_link: None,
            download_link: None,
            thumbnail_link: None,
            size: Some(10),
        };

        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["type"], "file");

        let back: RecordData = serde_json::from_value(json).unwrap();
        assert_eq!(back, data);
    }
}

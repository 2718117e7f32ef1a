//! Document and plain text parsing

use super::{title_from_name, truncate_chars, ContentParser, RecordData};
use crate::error::{Error, Result};
use crate::source::{ContentSource, SourceFile};
use async_trait::async_trait;

/// Characters of content kept in the record
const CONTENT_LIMIT: usize = 500;

/// Characters of preview shown on cards
const PREVIEW_LIMIT: usize = 200;

/// Parser for word-processing documents and plain text
pub struct DocumentParser;

#[async_trait]
impl ContentParser for DocumentParser {
    fn name(&self) -> &'static str {
        "document"
    }

    async fn parse(
        &self,
        file: &SourceFile,
        source: &dyn ContentSource,
    ) -> Result<Option<RecordData>> {
        let bytes = source.fetch(&file.id).await?;
        let text = String::from_utf8(bytes)
            .map_err(|_| Error::Parse(format!("{} is not valid UTF-8", file.name)))?;

        Ok(Some(RecordData::Document {
            name: file.name.clone(),
            title: title_from_name(&file.name),
            preview: truncate_chars(&text, PREVIEW_LIMIT),
            content: truncate_chars(&text, CONTENT_LIMIT),
            last_modified: file.modified_time.clone(),
            view_link: file.view_link.clone(),
            size: file.size,
        }))
    }
}

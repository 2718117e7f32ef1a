//! Metadata-only parsers
//!
//! Video files and unregistered content types are not fetched at all:
//! the card is built from listing metadata alone.

use super::{title_from_name, ContentParser, RecordData};
use crate::error::Result;
use crate::source::{ContentSource, SourceFile};
use async_trait::async_trait;

/// Parser for video files; keeps the thumbnail for the card
pub struct VideoParser;

#[async_trait]
impl ContentParser for VideoParser {
    fn name(&self) -> &'static str {
        "video"
    }

    async fn parse(
        &self,
        file: &SourceFile,
        _source: &dyn ContentSource,
    ) -> Result<Option<RecordData>> {
        Ok(Some(RecordData::Video {
            name: file.name.clone(),
            title: title_from_name(&file.name),
            last_modified: file.modified_time.clone(),
            view_link: file.view_link.clone(),
            thumbnail_link: file.thumbnail_link.clone(),
            size: file.size,
        }))
    }
}

/// Fallback parser for unregistered content types (PDFs, archives, ...)
pub struct MetadataParser;

#[async_trait]
impl ContentParser for MetadataParser {
    fn name(&self) -> &'static str {
        "metadata"
    }

    async fn parse(
        &self,
        file: &SourceFile,
        _source: &dyn ContentSource,
    ) -> Result<Option<RecordData>> {
        Ok(Some(RecordData::File {
            name: file.name.clone(),
            title: title_from_name(&file.name),
            last_modified: file.modified_time.clone(),
            view_link: file.view_link.clone(),
            download_link: file.download_link.clone(),
            thumbnail_link: file.thumbnail_link.clone(),
            size: file.size,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{file, StubSource};
    use super::*;

    #[tokio::test]
    async fn test_metadata_parser_never_fetches() {
        // Empty stub source: a fetch would fail
        let source = StubSource::default();
        let meta = file("f1", "budget_2025.pdf", "application/pdf");

        let parsed = MetadataParser.parse(&meta, &source).await.unwrap().unwrap();
        match parsed {
            RecordData::File { title, size, .. } => {
                assert_eq!(title, "budget_2025");
                assert_eq!(size, Some(1024));
            }
            other => panic!("expected file record, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_video_keeps_thumbnail() {
        let source = StubSource::default();
        let mut meta = file("f1", "council_meeting.mp4", "video/mp4");
        meta.thumbnail_link = Some("https://source.example.com/thumb/f1".to_string());

        let parsed = VideoParser.parse(&meta, &source).await.unwrap().unwrap();
        match parsed {
            RecordData::Video { thumbnail_link, .. } => {
                assert_eq!(
                    thumbnail_link.as_deref(),
                    Some("https://source.example.com/thumb/f1")
                );
            }
            other => panic!("expected video record, got {other:?}"),
        }
    }
}

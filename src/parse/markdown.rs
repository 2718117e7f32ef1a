//! Markdown parsing

use super::{title_from_name, ContentParser, RecordData};
use crate::error::{Error, Result};
use crate::source::{ContentSource, SourceFile};
use async_trait::async_trait;
use pulldown_cmark::{html, Options, Parser};

/// Parser for markdown files
pub struct MarkdownParser;

#[async_trait]
impl ContentParser for MarkdownParser {
    fn name(&self) -> &'static str {
        "markdown"
    }

    async fn parse(
        &self,
        file: &SourceFile,
        source: &dyn ContentSource,
    ) -> Result<Option<RecordData>> {
        let bytes = source.fetch(&file.id).await?;
        let content = String::from_utf8(bytes)
            .map_err(|_| Error::Parse(format!("{} is not valid UTF-8", file.name)))?;

        // Title from the first H1, falling back to the file name
        let title = content
            .lines()
            .find_map(|line| line.strip_prefix("# ").map(|t| t.trim().to_string()))
            .unwrap_or_else(|| title_from_name(&file.name));

        Ok(Some(RecordData::Markdown {
            name: file.name.clone(),
            title,
            html: markdown_to_html(&content),
            content,
            last_modified: file.modified_time.clone(),
            view_link: file.view_link.clone(),
        }))
    }
}

/// Convert markdown to HTML
fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let parser = Parser::new_ext(markdown, options);
    let mut output = String::with_capacity(markdown.len() * 2);
    html::push_html(&mut output, parser);
    output
}

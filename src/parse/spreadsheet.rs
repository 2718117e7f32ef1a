//! Spreadsheet parsing (CSV content)

use super::{title_from_name, ContentParser, RecordData};
use crate::error::{Error, Result};
use crate::source::{ContentSource, SourceFile};
use async_trait::async_trait;

/// Parser for CSV and exported spreadsheet content
pub struct SpreadsheetParser;

#[async_trait]
impl ContentParser for SpreadsheetParser {
    fn name(&self) -> &'static str {
        "spreadsheet"
    }

    async fn parse(
        &self,
        file: &SourceFile,
        source: &dyn ContentSource,
    ) -> Result<Option<RecordData>> {
        let bytes = source.fetch(&file.id).await?;
        let content = String::from_utf8(bytes)
            .map_err(|_| Error::Parse(format!("{} is not valid UTF-8", file.name)))?;

        let table = parse_csv(&content);
        let mut records = table.into_iter();

        let columns = match records.next() {
            Some(header) => header,
            None => return Ok(None),
        };

        let rows: Vec<serde_json::Value> = records
            .map(|row| {
                let obj: serde_json::Map<String, serde_json::Value> = columns
                    .iter()
                    .zip(row.into_iter())
                    .map(|(col, value)| (col.clone(), serde_json::Value::String(value)))
                    .collect();
                serde_json::Value::Object(obj)
            })
            .collect();

        Ok(Some(RecordData::Spreadsheet {
            name: file.name.clone(),
            title: title_from_name(&file.name),
            row_count: rows.len(),
            columns,
            rows,
            last_modified: file.modified_time.clone(),
            view_link: file.view_link.clone(),
        }))
    }
}

/// Minimal quote-aware CSV reader
///
/// Handles quoted fields, doubled-quote escapes, and CRLF line endings.
/// Trailing empty lines are dropped.
fn parse_csv(input: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' => {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        field.push('"');
                    } else {
                        in_quotes = false;
                    }
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' => in_quotes = true,
            ',' => {
                row.push(std::mem::take(&mut field));
            }
            '\r' => {}
            '\n' => {
                row.push(std::mem::take(&mut field));
                if !(row.len() == 1 && row[0].is_empty()) {
                    rows.push(std::mem::take(&mut row));
                } else {
                    row.clear();
                }
            }
            _ => field.push(c),
        }
    }

    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{file, StubSource};
    use super::*;

    #[test]
    fn test_parse_csv_basic() {
        let rows = parse_csv("a,b,c\n1,2,3\n4,5,6\n");
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], vec!["a", "b", "c"]);
        assert_eq!(rows[2], vec!["4", "5", "6"]);
    }

    #[test]
    fn test_parse_csv_quotes_and_crlf() {
        let rows = parse_csv("name,note\r\n\"Smith, Jane\",\"said \"\"hi\"\"\"\r\n");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][0], "Smith, Jane");
        assert_eq!(rows[1][1], "said \"hi\"");
    }

    #[tokio::test]
    async fn test_parse_spreadsheet() {
        let source = StubSource::with_file("f1", b"title,date\nBudget Hearing,2025-06-01\n");
        let meta = file("f1", "events.csv", "text/csv");

        let parsed = SpreadsheetParser
            .parse(&meta, &source)
            .await
            .unwrap()
            .unwrap();

        match parsed {
            RecordData::Spreadsheet {
                title,
                columns,
                row_count,
                rows,
                ..
            } => {
                assert_eq!(title, "events");
                assert_eq!(columns, vec!["title", "date"]);
                assert_eq!(row_count, 1);
                assert_eq!(rows[0]["title"], "Budget Hearing");
            }
            other => panic!("expected spreadsheet record, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_content_is_absent() {
        let source = StubSource::with_file("f1", b"");
        let meta = file("f1", "empty.csv", "text/csv");

        let parsed = SpreadsheetParser.parse(&meta, &source).await.unwrap();
        assert!(parsed.is_none());
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_parse_error() {
        let source = StubSource::with_file("f1", &[0xff, 0xfe, 0x00]);
        let meta = file("f1", "binary.csv", "text/csv");

        let err = SpreadsheetParser.parse(&meta, &source).await.unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }
}

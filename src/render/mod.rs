//! Static HTML fragment rendering
//!
//! Pure string building: one card per record, and one aggregate fragment
//! per folder built from the full set of active records. All untrusted
//! text and link values are escaped before embedding.

use crate::db::ContentRecord;
use crate::parse::RecordData;
use chrono::DateTime;
use tracing::warn;

/// Render the card fragment for one record
pub fn render_card(data: &RecordData) -> String {
    match data {
        RecordData::Spreadsheet {
            title,
            row_count,
            last_modified,
            view_link,
            ..
        } => {
            let title = escape_html(title);
            let date = format_date(last_modified.as_deref());
            let link = escape_html(view_link.as_deref().unwrap_or("#"));
            format!(
                r#"<div class="card data-card" data-file-type="spreadsheet">
    <h3><a href="{link}" target="_blank">{title}</a></h3>
    <div class="card-meta">
        <span class="row-count">{row_count} rows</span>
        <span class="date">{date}</span>
    </div>
    <div class="card-actions">
        <a href="{link}" target="_blank" class="btn btn-secondary">View Data</a>
    </div>
</div>"#
            )
        }

        RecordData::Markdown {
            title,
            content,
            last_modified,
            view_link,
            ..
        } => {
            let title = escape_html(title);
            let preview = escape_html(&preview_text(content, 200));
            let date = format_date(last_modified.as_deref());
            let link = escape_html(view_link.as_deref().unwrap_or("#"));
            format!(
                r#"<div class="card article-card" data-file-type="markdown">
    <h3><a href="{link}" target="_blank">{title}</a></h3>
    <div class="card-preview">{preview}&hellip;</div>
    <div class="card-meta">
        <span class="date">{date}</span>
    </div>
    <div class="card-actions">
        <a href="{link}" target="_blank" class="btn btn-secondary">Read More</a>
    </div>
</div>"#
            )
        }

        RecordData::Document {
            title,
            preview,
            last_modified,
            view_link,
            size,
            ..
        } => {
            let title = escape_html(title);
            let preview = escape_html(&preview_text(preview, 200));
            let date = format_date(last_modified.as_deref());
            let link = escape_html(view_link.as_deref().unwrap_or("#"));
            let size_span = (*size)
                .and_then(format_file_size)
                .map(|s| format!(r#"<span class="size">{s}</span>"#))
                .unwrap_or_default();
            format!(
                r#"<div class="card document-card" data-file-type="document">
    <h3><a href="{link}" target="_blank">{title}</a></h3>
    <div class="card-preview">{preview}</div>
    <div class="card-meta">
        <span class="date">{date}</span>
        {size_span}
    </div>
    <div class="card-actions">
        <a href="{link}" target="_blank" class="btn btn-secondary">View</a>
    </div>
</div>"#
            )
        }

        RecordData::Video {
            title,
            last_modified,
            view_link,
            thumbnail_link,
            size,
            ..
        } => {
            let title = escape_html(title);
            let date = format_date(last_modified.as_deref());
            let link = escape_html(view_link.as_deref().unwrap_or("#"));
            let thumbnail = thumbnail_link
                .as_deref()
                .map(|t| {
                    format!(
                        r#"<img src="{}" alt="{}" class="card-thumbnail">"#,
                        escape_html(t),
                        title
                    )
                })
                .unwrap_or_default();
            let size_span = (*size)
                .and_then(format_file_size)
                .map(|s| format!(r#"<span class="size">{s}</span>"#))
                .unwrap_or_default();
            format!(
                r#"<div class="card video-card" data-file-type="video">
    {thumbnail}
    <h3><a href="{link}" target="_blank">{title}</a></h3>
    <div class="card-meta">
        <span class="date">{date}</span>
        {size_span}
    </div>
    <div class="card-actions">
        <a href="{link}" target="_blank" class="btn btn-secondary">Watch</a>
    </div>
</div>"#
            )
        }

        RecordData::File {
            title,
            last_modified,
            view_link,
            download_link,
            size,
            ..
        } => {
            let title = escape_html(title);
            let date = format_date(last_modified.as_deref());
            let link = escape_html(view_link.as_deref().unwrap_or("#"));
            let download = download_link
                .as_deref()
                .map(|d| {
                    format!(
                        r#"<a href="{}" target="_blank" class="btn btn-secondary">Download</a>"#,
                        escape_html(d)
                    )
                })
                .unwrap_or_default();
            let size_span = (*size)
                .and_then(format_file_size)
                .map(|s| format!(r#"<span class="size">{s}</span>"#))
                .unwrap_or_default();
            format!(
                r#"<div class="card document-card" data-file-type="file">
    <h3><a href="{link}" target="_blank">{title}</a></h3>
    <div class="card-meta">
        <span class="date">{date}</span>
        {size_span}
    </div>
    <div class="card-actions">
        <a href="{link}" target="_blank" class="btn btn-secondary">View</a>
        {download}
    </div>
</div>"#
            )
        }
    }
}

/// Card shown when a record's stored data cannot be rendered
pub fn render_error_card(file_name: &str) -> String {
    format!(
        r#"<div class="card error-card">
    <h3>{}</h3>
    <p>Error loading this file. Please try again later.</p>
</div>"#,
        escape_html(file_name)
    )
}

/// Render the aggregate fragment for a folder from its active records
///
/// Always built from the complete active set so the published artifact
/// reflects the full current state, not just what changed this cycle.
pub fn render_aggregate(records: &[ContentRecord]) -> String {
    if records.is_empty() {
        return "<p><em>No files available at this time.</em></p>".to_string();
    }

    let cards: Vec<String> = records
        .iter()
        .map(|record| match serde_json::from_str::<RecordData>(&record.data) {
            Ok(data) => render_card(&data),
            Err(e) => {
                warn!(file = %record.file_name, "Stored record data is unreadable: {}", e);
                render_error_card(&record.file_name)
            }
        })
        .collect();

    format!("<div class=\"grid\">\n{}\n</div>", cards.join("\n"))
}

/// Escape HTML special characters
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Format an RFC3339 timestamp as a readable date
fn format_date(date: Option<&str>) -> String {
    let Some(date) = date else {
        return "Unknown".to_string();
    };

    match DateTime::parse_from_rfc3339(date) {
        Ok(dt) => dt.format("%B %d, %Y").to_string(),
        Err(_) => date.to_string(),
    }
}

/// Format a byte count as a human-readable size; zero is omitted
fn format_file_size(bytes: u64) -> Option<String> {
    if bytes == 0 {
        return None;
    }

    let mut size = bytes as f64;
    for unit in ["B", "KB", "MB", "GB"] {
        if size < 1024.0 {
            return Some(format!("{size:.1} {unit}"));
        }
        size /= 1024.0;
    }
    Some(format!("{size:.1} TB"))
}

/// First `max` characters of a single-line preview
fn preview_text(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(file_name: &str, data: &str) -> ContentRecord {
        ContentRecord {
            id: "r1".to_string(),
            tenant_id: "t1".to_string(),
            folder_name: "budgets".to_string(),
            file_id: "f1".to_string(),
            file_name: file_name.to_string(),
            content_type: "application/pdf".to_string(),
            data: data.to_string(),
            fragment: None,
            status: "active".to_string(),
            error_message: None,
            retry_count: 0,
            last_synced: "2025-06-01T10:00:00Z".to_string(),
            created_at: "2025-06-01T10:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<script>alert("x&y")</script>"#),
            "&lt;script&gt;alert(&quot;x&amp;y&quot;)&lt;/script&gt;"
        );
        assert_eq!(escape_html("it's"), "it&#x27;s");
    }

    #[test]
    fn test_card_escapes_untrusted_title() {
        let data = RecordData::File {
            name: "evil.pdf".to_string(),
            title: "<img onerror=alert(1)>".to_string(),
            last_modified: Some("2025-06-01T10:00:00Z".to_string()),
            view_link: Some("https://example.com/\" onclick=\"x".to_string()),
            download_link: None,
            thumbnail_link: None,
            size: Some(2048),
        };

        let card = render_card(&data);
        assert!(!card.contains("<img onerror"));
        assert!(card.contains("&lt;img onerror=alert(1)&gt;"));
        assert!(card.contains("&quot; onclick=&quot;x"));
        assert!(card.contains("June 01, 2025"));
        assert!(card.contains("2.0 KB"));
    }

    #[test]
    fn test_aggregate_counts_and_empty_state() {
        let records = vec![
            record("a.pdf", r#"{"type":"file","name":"a.pdf","title":"a"}"#),
            record("b.pdf", r#"{"type":"file","name":"b.pdf","title":"b"}"#),
        ];

        let aggregate = render_aggregate(&records);
        assert_eq!(aggregate.matches("<div class=\"card").count(), 2);
        assert!(aggregate.starts_with("<div class=\"grid\">"));

        let empty = render_aggregate(&[]);
        assert!(empty.contains("No files available"));
    }

    #[test]
    fn test_aggregate_falls_back_to_error_card() {
        let records = vec![record("broken.pdf", "not json")];
        let aggregate = render_aggregate(&records);
        assert!(aggregate.contains("error-card"));
        assert!(aggregate.contains("broken.pdf"));
    }

    #[test]
    fn test_format_date_unknown() {
        assert_eq!(format_date(None), "Unknown");
        assert_eq!(format_date(Some("not a date")), "not a date");
    }

    #[test]
    fn test_spreadsheet_card_shows_row_count() {
        let data = RecordData::Spreadsheet {
            name: "events.csv".to_string(),
            title: "events".to_string(),
            columns: vec!["title".to_string()],
            row_count: 7,
            rows: Vec::new(),
            last_modified: None,
            view_link: None,
        };

        let card = render_card(&data);
        assert!(card.contains("7 rows"));
        assert!(card.contains("Unknown"));
    }
}

//! Entry export helpers shared by clients.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::models::Entry;

/// Export output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportFormat {
    Json,
    Markdown,
}

impl ExportFormat {
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Markdown => "md",
        }
    }
}

/// Serializable entry representation used in JSON and Markdown exports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportEntry {
    pub id: String,
    pub text: String,
    pub book: Option<String>,
    pub verse_reference: Option<String>,
    pub category: String,
    pub is_favorite: bool,
    pub created_at: i64,
    pub last_modified: i64,
}

/// Convert an entry into an export record.
#[must_use]
pub fn entry_to_export_item(entry: &Entry) -> ExportEntry {
    ExportEntry {
        id: entry.id.to_string(),
        text: entry.text.clone(),
        book: entry.book.clone(),
        verse_reference: entry.verse_reference.clone(),
        category: entry.category.clone(),
        is_favorite: entry.is_favorite,
        created_at: entry.created_at,
        last_modified: entry.last_modified,
    }
}

/// Render entries as pretty-printed JSON.
pub fn render_json_export(entries: &[Entry]) -> serde_json::Result<String> {
    let items = entries
        .iter()
        .map(entry_to_export_item)
        .collect::<Vec<ExportEntry>>();
    serde_json::to_string_pretty(&items)
}

/// Render entries in Markdown with frontmatter blocks.
#[must_use]
pub fn render_markdown_export(entries: &[Entry]) -> String {
    let mut output = String::new();

    for (index, entry) in entries.iter().enumerate() {
        if index > 0 {
            output.push('\n');
        }

        let item = entry_to_export_item(entry);
        let _ = writeln!(output, "---");
        let _ = writeln!(output, "id: {}", item.id);
        if let Some(book) = &item.book {
            let _ = writeln!(output, "book: {book}");
        }
        if let Some(verse) = &item.verse_reference {
            let _ = writeln!(output, "verse: {verse}");
        }
        let _ = writeln!(output, "category: {}", item.category);
        let _ = writeln!(output, "favorite: {}", item.is_favorite);
        let _ = writeln!(output, "created_at: {}", item.created_at);
        let _ = writeln!(output, "last_modified: {}", item.last_modified);
        let _ = writeln!(output, "---");
        let _ = writeln!(output);
        output.push_str(&item.text);
        output.push('\n');
    }

    output
}

/// Render entries based on selected export format.
pub fn render_entries_export(entries: &[Entry], format: ExportFormat) -> serde_json::Result<String> {
    match format {
        ExportFormat::Json => render_json_export(entries),
        ExportFormat::Markdown => Ok(render_markdown_export(entries)),
    }
}

/// Build a deterministic default file name for export flows.
#[must_use]
pub fn suggested_export_file_name(format: ExportFormat, timestamp_ms: i64) -> String {
    format!("selah-export-{timestamp_ms}.{}", format.extension())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Entry {
        Entry {
            id: "cccccccc-cccc-7ccc-8ccc-111111111111".parse().unwrap(),
            text: "He restores my soul".to_string(),
            book: Some("Psalms".to_string()),
            verse_reference: Some("23:3".to_string()),
            category: "my-own".to_string(),
            is_favorite: true,
            created_at: 123,
            last_modified: 456,
        }
    }

    #[test]
    fn render_markdown_export_includes_frontmatter_and_text() {
        let rendered = render_markdown_export(&[sample()]);
        assert!(rendered.contains("id: cccccccc-cccc-7ccc-8ccc-111111111111"));
        assert!(rendered.contains("book: Psalms"));
        assert!(rendered.contains("verse: 23:3"));
        assert!(rendered.contains("favorite: true"));
        assert!(rendered.contains("He restores my soul"));
    }

    #[test]
    fn render_markdown_export_omits_absent_reference_fields() {
        let mut entry = sample();
        entry.book = None;
        entry.verse_reference = None;

        let rendered = render_markdown_export(&[entry]);
        assert!(!rendered.contains("book:"));
        assert!(!rendered.contains("verse:"));
    }

    #[test]
    fn render_json_export_round_trips() {
        let rendered = render_json_export(&[sample()]).unwrap();
        let parsed: Vec<ExportEntry> = serde_json::from_str(&rendered).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].text, "He restores my soul");
    }

    #[test]
    fn suggested_export_file_name_uses_format_extension() {
        assert_eq!(
            suggested_export_file_name(ExportFormat::Json, 123),
            "selah-export-123.json"
        );
        assert_eq!(
            suggested_export_file_name(ExportFormat::Markdown, 456),
            "selah-export-456.md"
        );
    }
}

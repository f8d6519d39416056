//! Records and batches produced by a scrape session.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One extracted container: its text lines plus any image references.
///
/// A record always carries at least one non-empty, trimmed content line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    content: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    images: Vec<String>,
    source_selector: String,
}

impl Record {
    /// Build a record from rendered element text.
    ///
    /// Returns `None` when the text has no non-blank lines.
    pub fn from_text(
        text: &str,
        images: Vec<String>,
        source_selector: impl Into<String>,
    ) -> Option<Self> {
        let content = normalize_lines(text);
        if content.is_empty() {
            return None;
        }
        Some(Self {
            content,
            images,
            source_selector: source_selector.into(),
        })
    }

    pub fn content(&self) -> &[String] {
        &self.content
    }

    pub fn images(&self) -> &[String] {
        &self.images
    }

    pub fn source_selector(&self) -> &str {
        &self.source_selector
    }

    /// SHA-256 over the `|`-joined content lines, hex encoded. Images do not participate.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.content.join("|").as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// Newly seen records attributed to one page URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    #[serde(rename = "url")]
    pub page_url: String,
    pub items: Vec<Record>,
}

impl Batch {
    pub fn new(page_url: impl Into<String>, items: Vec<Record>) -> Self {
        Self {
            page_url: page_url.into(),
            items,
        }
    }
}

/// Split on line breaks, trim, and drop empty lines.
pub fn normalize_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn is_data_uri(src: &str) -> bool {
    src.trim_start().starts_with("data:")
}

/// Wrap PNG bytes as a `data:image/png;base64,...` URI.
pub fn png_data_uri(bytes: &[u8]) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_text_yields_no_record() {
        assert!(Record::from_text("  \n\t\n   ", vec![], "item").is_none());
        assert!(Record::from_text("", vec![], "item").is_none());
    }

    #[test]
    fn test_lines_are_trimmed_and_filtered() {
        let record = Record::from_text("  Title A \r\n\n  Price 1\n", vec![], "item").unwrap();
        assert_eq!(record.content(), ["Title A", "Price 1"]);
        assert_eq!(record.source_selector(), "item");
    }

    #[test]
    fn test_fingerprint_ignores_selector_and_images() {
        let a = Record::from_text("Title A\nPrice 1", vec![], "item").unwrap();
        let b = Record::from_text(
            "Title A\n  Price 1",
            vec!["data:image/png;base64,AAAA".into()],
            "card",
        )
        .unwrap();
        let c = Record::from_text("Title A|Price 2", vec![], "item").unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
    }

    #[test]
    fn test_batch_serializes_with_url_key() {
        let record = Record::from_text("Only line", vec![], "item").unwrap();
        let batch = Batch::new("https://example.com/a", vec![record]);
        let json = serde_json::to_value(&batch).unwrap();
        assert_eq!(json["url"], "https://example.com/a");
        assert_eq!(json["items"][0]["content"][0], "Only line");
        assert!(json["items"][0].get("images").is_none());
    }

    #[test]
    fn test_png_data_uri() {
        assert_eq!(png_data_uri(&[0x89, 0x50]), "data:image/png;base64,iVA=");
        assert!(is_data_uri("data:image/gif;base64,R0lG"));
        assert!(!is_data_uri("https://cdn.example.com/a.png"));
    }
}

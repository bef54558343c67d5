//! OData JSON feed pages.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::Result;

/// One feed item: a JSON object keyed by OData property name.
pub type Item = Map<String, Value>;

/// One page of an OData JSON feed.
///
/// The service emits `{"value": [...], "odata.nextLink": "..."}`; the last
/// page has no next link. `items` and `nextLink` are accepted as aliases.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Page {
    #[serde(rename = "value", alias = "items", default)]
    pub items: Vec<Item>,
    #[serde(rename = "odata.nextLink", alias = "nextLink", default)]
    pub next_link: Option<String>,
}

impl Page {
    /// Decodes a page from raw JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Decodes a page from a reader.
    pub fn from_reader(reader: impl std::io::Read) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_with_next_link() {
        let page = Page::from_slice(
            br#"{"odata.metadata": "x", "value": [{"Code": "A"}, {"Code": "B"}],
                "odata.nextLink": "http://example.test/p2"}"#,
        )
        .unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[1]["Code"], "B");
        assert_eq!(page.next_link.as_deref(), Some("http://example.test/p2"));
    }

    #[test]
    fn test_page_aliases() {
        let page = Page::from_slice(br#"{"items": [{"Code": "C"}], "nextLink": null}"#).unwrap();
        assert_eq!(page.items.len(), 1);
        assert!(page.next_link.is_none());
    }

    #[test]
    fn test_page_rejects_non_object_items() {
        assert!(Page::from_slice(br#"{"value": [1, 2]}"#).is_err());
        assert!(Page::from_slice(b"not json").is_err());
    }
}

//! Fetch-cache metadata types.

use serde::{Deserialize, Serialize};

/// Metadata recorded for one fetch of one URI.
///
/// `(uri, timestamp)` identifies a fetch. The response body lives in the
/// blob store under [`digest`](Self::digest); several entries may share a
/// digest when different URIs returned identical bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Absolute URI that was requested.
    pub uri: String,
    /// RFC 3339 time at which the fetch completed.
    pub timestamp: String,
    /// HTTP status code.
    pub status: u16,
    /// Raw `Content-Type` header, if sent.
    pub content_type: Option<String>,
    /// Raw `Content-Length` header, if sent and numeric.
    pub content_length: Option<i64>,
    pub cache_control: Option<String>,
    pub pragma: Option<String>,
    pub expires: Option<String>,
    pub date: Option<String>,
    /// Lowercase hex SHA-256 of the body; also the blob file name.
    pub digest: String,
}

impl CacheEntry {
    /// Parsed content type, or an empty one when the header was missing.
    pub fn content_type(&self) -> ContentType {
        self.content_type
            .as_deref()
            .map(ContentType::parse)
            .unwrap_or_default()
    }

    /// Returns `true` when the response carried the given mime type.
    pub fn is_mime(&self, mime: &str) -> bool {
        self.content_type().mime == mime
    }
}

/// A parsed `Content-Type` header value.
///
/// # Examples
///
/// ```
/// use hypercube_core::ContentType;
///
/// let ct = ContentType::parse("application/atomsvc+xml;charset=utf-8");
/// assert_eq!(ct.mime, "application/atomsvc+xml");
/// assert_eq!(ct.param("charset"), Some("utf-8"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentType {
    pub mime: String,
    pub params: Vec<(String, String)>,
}

impl ContentType {
    /// Splits `mime; k=v; k=v` into the mime type and its parameters.
    ///
    /// Parameters without `=` are kept with an empty value. Surrounding
    /// whitespace is trimmed; case is preserved.
    pub fn parse(header: &str) -> Self {
        let mut parts = header.split(';');
        let mime = parts.next().unwrap_or_default().trim().to_string();
        let params = parts
            .map(str::trim)
            .filter(|kv| !kv.is_empty())
            .map(|kv| match kv.split_once('=') {
                Some((k, v)) => (k.trim().to_string(), v.trim().to_string()),
                None => (kv.to_string(), String::new()),
            })
            .collect();
        Self { mime, params }
    }

    /// Looks up a parameter by name.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(content_type: Option<&str>) -> CacheEntry {
        CacheEntry {
            uri: "http://example.test/discover/metadata".into(),
            timestamp: "2024-01-01T00:00:00.000000Z".into(),
            status: 200,
            content_type: content_type.map(String::from),
            content_length: None,
            cache_control: None,
            pragma: None,
            expires: None,
            date: None,
            digest: "00".into(),
        }
    }

    #[test]
    fn test_parse_plain_mime() {
        let ct = ContentType::parse("application/json");
        assert_eq!(ct.mime, "application/json");
        assert!(ct.params.is_empty());
    }

    #[test]
    fn test_parse_params() {
        let ct = ContentType::parse("application/json;odata=minimalmetadata; charset=utf-8");
        assert_eq!(ct.mime, "application/json");
        assert_eq!(ct.param("odata"), Some("minimalmetadata"));
        assert_eq!(ct.param("charset"), Some("utf-8"));
        assert_eq!(ct.param("missing"), None);
    }

    #[test]
    fn test_entry_mime_checks() {
        assert!(entry(Some("application/xml; charset=utf-8")).is_mime("application/xml"));
        assert!(!entry(Some("text/html")).is_mime("application/xml"));
        assert!(!entry(None).is_mime("application/json"));
    }
}

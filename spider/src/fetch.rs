//! The fetch cache.
//!
//! Every document the loaders read comes through [`Spider::fetch`]. A URI
//! that has been fetched before is served from the cache index without
//! touching the network. Otherwise the body is streamed into the blob store
//! under its SHA-256 digest, the fetch is recorded in the index, and only
//! then is the blob promoted out of staging. A crash between the two
//! leaves a harmless staged file behind.

use std::io;
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use hypercube_core::CacheEntry;
use hypercube_sqlite::{uri_cache, with_savepoint};
use hypercube_store::RetryConfig;
use tracing::{info, warn};
use url::Url;

use crate::error::{Result, SpiderError};
use crate::spider::Spider;
use crate::transport::TransportError;

/// Joins percent-encoded path segments onto a base URI.
///
/// Each segment is encoded completely (`/` and `$` included) and the joined
/// path is resolved against `base` as a relative reference, so a base
/// without a trailing slash loses its last segment.
///
/// # Examples
///
/// ```
/// use hypercube_spider::build_uri;
///
/// let uri = build_uri("http://open.statswales.gov.wales/en-gb/", &["dataset", "$metadata"]).unwrap();
/// assert_eq!(uri.as_str(), "http://open.statswales.gov.wales/en-gb/dataset/%24metadata");
/// ```
pub fn build_uri(base: &str, segments: &[&str]) -> Result<Url> {
    let base = Url::parse(base)?;
    if segments.is_empty() {
        return Ok(base);
    }
    let path = segments
        .iter()
        .map(|s| urlencoding::encode(s))
        .collect::<Vec<_>>()
        .join("/");
    Ok(base.join(&path)?)
}

/// Shortest timeout and wait, whatever the configuration says.
const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Exponential backoff between timed-out attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backoff {
    interval: Duration,
    max: Duration,
}

impl Backoff {
    pub fn new(retry: &RetryConfig) -> Self {
        let max = Duration::from_secs(retry.max_secs).max(MIN_INTERVAL);
        Self {
            interval: Duration::from_secs(retry.initial_secs)
                .max(MIN_INTERVAL)
                .min(max),
            max,
        }
    }

    /// Timeout for the next attempt, and the wait after it times out.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Doubles the interval, capped at the maximum.
    pub fn advance(&mut self) {
        self.interval = (self.interval * 2).min(self.max);
    }
}

/// Shortens long URIs for log lines.
fn abbreviate(uri: &str) -> String {
    let chars: Vec<char> = uri.chars().collect();
    if chars.len() <= 30 {
        return uri.to_string();
    }
    let head: String = chars[..15].iter().collect();
    let tail: String = chars[chars.len() - 15..].iter().collect();
    format!("{head}...{tail}")
}

impl Spider {
    /// Fetches `base` joined with `segments`, from the cache if possible.
    ///
    /// Connect and read timeouts are retried indefinitely with exponential
    /// backoff; any other transport failure is returned. Cached and fresh
    /// results have the same shape: the freshly written index row is read
    /// back before returning.
    pub fn fetch(&self, base: &str, segments: &[&str]) -> Result<CacheEntry> {
        let uri = build_uri(base, segments)?;
        let uri = uri.as_str();

        if let Some(entry) = uri_cache::lookup(&self.conn, uri)? {
            info!(uri = %abbreviate(uri), digest = %&entry.digest[..7.min(entry.digest.len())], "cache hit");
            return Ok(entry);
        }

        let entry = self.download(uri)?;
        let timestamp = entry.timestamp.clone();

        let recorded = with_savepoint(&self.conn, "fetch_uri", |conn| {
            uri_cache::record(conn, &entry)?;
            self.blobs.commit(&entry.digest)?;
            Ok::<_, SpiderError>(())
        });
        if let Err(err) = recorded {
            // Committed blobs are shared; only the staged copy is ours.
            if let Err(discard) = self.blobs.discard(&entry.digest) {
                warn!(digest = %entry.digest, error = %discard, "could not discard staged blob");
            }
            return Err(err);
        }

        if !(200..300).contains(&entry.status) {
            warn!(uri, status = entry.status, "cached non-success response");
        }
        info!(uri = %abbreviate(uri), status = entry.status, digest = %&entry.digest[..7], "fetched");

        uri_cache::get(&self.conn, uri, &timestamp)?.ok_or_else(|| {
            SpiderError::UnexpectedDocument(format!("cache row for {uri} vanished after insert"))
        })
    }

    /// GETs `uri` into staging, retrying timeouts, and describes the
    /// response as a not-yet-recorded cache entry.
    fn download(&self, uri: &str) -> Result<CacheEntry> {
        // Stamped before the first attempt, so retries do not move it.
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        let mut backoff = Backoff::new(&self.config.retry);
        loop {
            match self.transport.get(uri, backoff.interval()) {
                Ok(mut response) => {
                    let mut writer = self.blobs.allocate()?;
                    match io::copy(&mut response.body, &mut writer) {
                        Ok(_) => {
                            let digest = writer.finish()?;
                            let header = |name| response.header(name).map(str::to_string);
                            return Ok(CacheEntry {
                                uri: uri.to_string(),
                                timestamp: timestamp.clone(),
                                status: response.status,
                                content_type: header("content-type"),
                                content_length: response
                                    .header("content-length")
                                    .and_then(|v| v.trim().parse().ok()),
                                cache_control: header("cache-control"),
                                pragma: header("pragma"),
                                expires: header("expires"),
                                date: header("date"),
                                digest,
                            });
                        }
                        Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                            warn!(uri, retry_in = ?backoff.interval(), "body read timed out");
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
                Err(TransportError::ConnectTimeout) => {
                    warn!(uri, retry_in = ?backoff.interval(), "TCP connect timed out");
                }
                Err(TransportError::ReadTimeout) => {
                    warn!(uri, retry_in = ?backoff.interval(), "HTTP request timed out");
                }
                Err(other) => return Err(other.into()),
            }
            (self.sleeper)(backoff.interval());
            backoff.advance();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_uri_encodes_segments() {
        let uri = build_uri("http://example.test/en-gb/", &["discover", "catalogue"]).unwrap();
        assert_eq!(uri.as_str(), "http://example.test/en-gb/discover/catalogue");

        let uri = build_uri("http://example.test/en-gb/", &["a b", "c/d"]).unwrap();
        assert_eq!(uri.as_str(), "http://example.test/en-gb/a%20b/c%2Fd");
    }

    #[test]
    fn test_build_uri_without_trailing_slash_replaces_last_segment() {
        let uri = build_uri("http://example.test/en-gb", &["dataset"]).unwrap();
        assert_eq!(uri.as_str(), "http://example.test/dataset");
    }

    #[test]
    fn test_build_uri_without_segments_is_base() {
        let link = "http://example.test/en-gb/discover/catalogue?$skiptoken=1!2";
        assert_eq!(build_uri(link, &[]).unwrap().as_str(), link);
    }

    #[test]
    fn test_build_uri_rejects_garbage() {
        assert!(matches!(build_uri("not a uri", &[]), Err(SpiderError::Url(_))));
    }

    #[test]
    fn test_backoff_doubles_to_cap() {
        let mut backoff = Backoff::new(&RetryConfig {
            initial_secs: 64,
            max_secs: 512,
        });
        let mut seen = Vec::new();
        for _ in 0..6 {
            seen.push(backoff.interval().as_secs());
            backoff.advance();
        }
        assert_eq!(seen, vec![64, 128, 256, 512, 512, 512]);
    }

    #[test]
    fn test_backoff_never_drops_below_one_second() {
        let mut backoff = Backoff::new(&RetryConfig {
            initial_secs: 0,
            max_secs: 0,
        });
        assert_eq!(backoff.interval(), Duration::from_secs(1));
        backoff.advance();
        assert_eq!(backoff.interval(), Duration::from_secs(1));

        let backoff = Backoff::new(&RetryConfig {
            initial_secs: 0,
            max_secs: 8,
        });
        assert_eq!(backoff.interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_abbreviate() {
        assert_eq!(abbreviate("http://short/"), "http://short/");
        let long = "http://open.statswales.gov.wales/en-gb/discover/catalogue";
        assert_eq!(abbreviate(long), "http://open.sta...cover/catalogue");
    }
}

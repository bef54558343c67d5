//! HTTP transport.
//!
//! [`Transport`] is the seam between the fetch cache and the network. The
//! fetcher only needs a status, a few headers and a body stream, and it
//! must be able to tell timeouts (retried) from every other failure
//! (fatal). [`HttpTransport`] implements it with a blocking `reqwest`
//! client; tests substitute canned responses.

use std::cell::RefCell;
use std::io::{self, Read};
use std::time::Duration;

use reqwest::blocking::Client;
use thiserror::Error;

/// Transport-level failures.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The TCP connection was not established in time.
    #[error("connect timed out")]
    ConnectTimeout,

    /// The server did not respond in time.
    #[error("read timed out")]
    ReadTimeout,

    /// Any other failure. Not retried.
    #[error("HTTP request failed: {0}")]
    Request(String),
}

impl TransportError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::ConnectTimeout | TransportError::ReadTimeout)
    }
}

/// A response whose body has not been read yet.
pub struct Response {
    pub status: u16,
    /// Header names are lowercase.
    pub headers: Vec<(String, String)>,
    /// A body read that times out fails with [`io::ErrorKind::TimedOut`].
    pub body: Box<dyn Read>,
}

impl Response {
    /// Returns the first header value with this (case-insensitive) name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

impl std::fmt::Debug for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Issues GET requests.
pub trait Transport {
    /// Sends a GET with `timeout` as both the connect and the read timeout.
    fn get(&self, uri: &str, timeout: Duration) -> Result<Response, TransportError>;
}

/// Blocking HTTP transport backed by `reqwest`.
///
/// Timeouts are fixed when a client is built, so a client is kept per
/// timeout value and rebuilt when the fetcher backs off.
///
/// The blocking client's `timeout` bounds the wait for the response head
/// and then each body `read` on its own, not the whole transfer, so a
/// large body that keeps arriving is never cut off.
pub struct HttpTransport {
    user_agent: String,
    client: RefCell<Option<(Duration, Client)>>,
}

impl HttpTransport {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            client: RefCell::new(None),
        }
    }

    fn client(&self, timeout: Duration) -> Result<Client, TransportError> {
        let mut slot = self.client.borrow_mut();
        if let Some((cached, client)) = slot.as_ref() {
            if *cached == timeout {
                return Ok(client.clone());
            }
        }
        let client = Client::builder()
            .user_agent(self.user_agent.clone())
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Request(e.to_string()))?;
        *slot = Some((timeout, client.clone()));
        Ok(client)
    }
}

impl Transport for HttpTransport {
    fn get(&self, uri: &str, timeout: Duration) -> Result<Response, TransportError> {
        let response = self.client(timeout)?.get(uri).send().map_err(classify)?;
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        Ok(Response {
            status: response.status().as_u16(),
            headers,
            body: Box::new(TimeoutAwareBody(response)),
        })
    }
}

fn classify(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        if err.is_connect() {
            TransportError::ConnectTimeout
        } else {
            TransportError::ReadTimeout
        }
    } else {
        TransportError::Request(err.to_string())
    }
}

/// Surfaces body read timeouts as [`io::ErrorKind::TimedOut`].
struct TimeoutAwareBody(reqwest::blocking::Response);

impl Read for TimeoutAwareBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf).map_err(|e| {
            if e.kind() != io::ErrorKind::TimedOut && is_reqwest_timeout(&e) {
                io::Error::new(io::ErrorKind::TimedOut, e)
            } else {
                e
            }
        })
    }
}

fn is_reqwest_timeout(err: &io::Error) -> bool {
    err.get_ref()
        .and_then(|inner| inner.downcast_ref::<reqwest::Error>())
        .is_some_and(reqwest::Error::is_timeout)
}

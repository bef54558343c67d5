//! Core types shared by the hypercube crates.
//!
//! This crate defines the small vocabulary every other layer speaks:
//!
//! - [`Lang`]: the two languages the StatsWales2 service publishes in,
//!   with their URI locale codes and property-name suffixes.
//! - [`CacheEntry`]: metadata recorded for one fetch of one URI.
//! - [`ContentType`]: a parsed `Content-Type` header value.
//! - [`Page`]: one page of an OData JSON feed (items plus an optional
//!   link to the next page).
//!
//! # Example
//!
//! ```
//! use hypercube_core::{ContentType, Lang, Page};
//!
//! assert_eq!(Lang::Welsh.code(), "cy-gb");
//!
//! let ct = ContentType::parse("application/json; charset=utf-8");
//! assert_eq!(ct.mime, "application/json");
//! assert_eq!(ct.param("charset"), Some("utf-8"));
//!
//! let page = Page::from_slice(br#"{"value": [{"Code": "A"}]}"#).unwrap();
//! assert_eq!(page.items.len(), 1);
//! assert!(page.next_link.is_none());
//! ```

mod entry;
mod error;
mod lang;
mod page;

pub use entry::{CacheEntry, ContentType};
pub use error::{CoreError, Result};
pub use lang::Lang;
pub use page::{Item, Page};

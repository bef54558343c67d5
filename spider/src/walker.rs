//! Paginated OData feed walking.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use hypercube_core::{CacheEntry, Page};
use hypercube_sqlite::RowProcedure;
use tracing::debug;

use crate::error::{Result, SpiderError};
use crate::spider::Spider;

pub const JSON_MIME: &str = "application/json";

/// Where the first page of a feed comes from.
#[derive(Debug, Clone)]
pub enum PageSource {
    /// A fetched response.
    Cached(CacheEntry),
    /// A local supplement file, read as JSON whatever its name.
    File(PathBuf),
}

impl PageSource {
    fn name(&self) -> String {
        match self {
            PageSource::Cached(entry) => entry.uri.clone(),
            PageSource::File(path) => path.display().to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkStats {
    pub pages: usize,
    pub items: usize,
}

/// Checks that a fetched document has the mime type a loader reads.
pub(crate) fn expect_mime(entry: &CacheEntry, expected: &'static str) -> Result<()> {
    if entry.is_mime(expected) {
        return Ok(());
    }
    Err(SpiderError::UnexpectedContentType {
        source_name: entry.uri.clone(),
        expected,
        found: entry.content_type.clone().unwrap_or_default(),
    })
}

impl Spider {
    fn read_page(&self, source: &PageSource) -> Result<Page> {
        let page = match source {
            PageSource::Cached(entry) => {
                expect_mime(entry, JSON_MIME)?;
                Page::from_reader(self.blobs.open(&entry.digest)?)?
            }
            PageSource::File(path) => Page::from_reader(BufReader::new(File::open(path)?))?,
        };
        Ok(page)
    }

    /// Applies `procedures` to every item of a feed, following next links
    /// until a page has none.
    ///
    /// Within a page each procedure sees every item before the next
    /// procedure starts, so a table's rows go in before rows that reference
    /// them. Next links are fetched through the cache like any other URI.
    pub fn walk(&self, source: PageSource, procedures: &[RowProcedure]) -> Result<WalkStats> {
        let mut stats = WalkStats::default();
        let mut next = Some(source);

        while let Some(source) = next.take() {
            let page = self.read_page(&source)?;
            for procedure in procedures {
                for item in &page.items {
                    procedure.apply(&self.conn, item)?;
                }
            }
            stats.pages += 1;
            stats.items += page.items.len();
            debug!(source = %source.name(), items = page.items.len(), "walked page");

            if let Some(link) = page.next_link {
                next = Some(PageSource::Cached(self.fetch(&link, &[])?));
            }
        }
        Ok(stats)
    }
}

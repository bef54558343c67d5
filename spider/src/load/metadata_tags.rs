//! `odata_metadata_tag` from `discover/metadata`. Both languages insert.

use hypercube_core::Lang;
use hypercube_sqlite::{ColumnMap, RowProcedure};
use tracing::info;

use crate::error::Result;
use crate::spider::Spider;
use crate::walker::PageSource;

fn procedure(lang: Lang) -> Result<RowProcedure> {
    let tag = ColumnMap::new()
        .field("dataset", "Dataset")
        .field("partition_key", "PartitionKey")
        .field("row_key", "RowKey")
        .constant("lang", lang.code().to_string())
        .field("tag_type", lang.field("TagType"))
        .field("tag", lang.field("Tag"))
        .field("description", lang.field("Description"))
        .field("timestamp", "Timestamp")
        .field("etag", "ETag");
    RowProcedure::insert("odata_metadata_tag", tag).map_err(Into::into)
}

pub(super) fn load(spider: &Spider) -> Result<()> {
    for lang in Lang::ALL {
        let entry = spider.fetch(spider.base(lang), &["discover", "metadata"])?;
        let stats = spider.walk(PageSource::Cached(entry), &[procedure(lang)?])?;
        info!(%lang, pages = stats.pages, items = stats.items, "loaded metadata tags");
    }
    Ok(())
}

//! `odata_dimension_item*` from `discover/dimensionitems`.
//!
//! The Welsh feed lacks the non-key columns of `odata_dimension_item`, so
//! the Welsh pass checks only the alternatives; the foreign keys from
//! `_info` cover the items themselves.

use hypercube_core::Lang;
use hypercube_sqlite::{ColumnMap, RowProcedure};
use tracing::info;

use super::shared;
use crate::error::Result;
use crate::spider::Spider;
use crate::walker::PageSource;

/// Items carry up to this many alternative codes, `AltCode1`...
pub(crate) const ALTERNATIVE_CODES: i64 = 3;

fn procedures(lang: Lang) -> Result<Vec<RowProcedure>> {
    let mut procedures = Vec::new();

    if lang == Lang::English {
        let item = ColumnMap::new()
            .field("semantic_key", "SemanticKey")
            .field("item", "Code")
            .field("hierarchy", "Hierarchy")
            .field("partition_key", "PartitionKey")
            .field("row_key", "RowKey")
            .field("etag", "ETag");
        procedures.push(RowProcedure::insert("odata_dimension_item", item)?);
    }

    let info = ColumnMap::new()
        .field("semantic_key", "SemanticKey")
        .field("item", "Code")
        .constant("lang", lang.code().to_string())
        .field("description", lang.field("Description"));
    procedures.push(RowProcedure::insert("odata_dimension_item_info", info)?);

    for n in 1..=ALTERNATIVE_CODES {
        let alternative = ColumnMap::new()
            .field("semantic_key", "SemanticKey")
            .field("item", "Code")
            .constant("alternative_index", n)
            .non_empty("alternative_item", format!("AltCode{n}"));
        procedures.push(RowProcedure::new(
            shared(lang),
            "odata_dimension_item_alternative",
            alternative,
        )?);
    }
    Ok(procedures)
}

pub(super) fn load(spider: &Spider) -> Result<()> {
    for lang in Lang::ALL {
        let entry = spider.fetch(spider.base(lang), &["discover", "dimensionitems"])?;
        let stats = spider.walk(PageSource::Cached(entry), &procedures(lang)?)?;
        info!(%lang, pages = stats.pages, items = stats.items, "loaded dimension items");
    }
    Ok(())
}

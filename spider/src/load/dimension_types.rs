//! `odata_dimension_type` and `odata_dimension_type_info` from
//! `discover/dimensiontypes`.

use hypercube_core::Lang;
use hypercube_sqlite::{ColumnMap, RowProcedure};
use tracing::info;

use super::shared;
use crate::error::Result;
use crate::spider::Spider;
use crate::walker::PageSource;

fn procedures(lang: Lang) -> Result<Vec<RowProcedure>> {
    let dimension_type = ColumnMap::new()
        .field("semantic_key", "SemanticKey")
        .field("type", "Type")
        .field("subtype", "SubType");

    let info = ColumnMap::new()
        .field("semantic_key", "SemanticKey")
        .constant("lang", lang.code().to_string())
        .field("type_description", lang.field("TypeDesc"))
        .field("subtype_description", lang.field("SubTypeDesc"))
        .field("external_uri", lang.field("ExternalURI"));

    Ok(vec![
        RowProcedure::new(shared(lang), "odata_dimension_type", dimension_type)?,
        RowProcedure::insert("odata_dimension_type_info", info)?,
    ])
}

pub(super) fn load(spider: &Spider) -> Result<()> {
    for lang in Lang::ALL {
        let entry = spider.fetch(spider.base(lang), &["discover", "dimensiontypes"])?;
        let stats = spider.walk(PageSource::Cached(entry), &procedures(lang)?)?;
        info!(%lang, pages = stats.pages, items = stats.items, "loaded dimension types");
    }
    Ok(())
}

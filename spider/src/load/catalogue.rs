//! `odata_catalogue` and `odata_catalogue_info` from `discover/catalogue`.

use hypercube_core::Lang;
use hypercube_sqlite::{ColumnMap, RowProcedure};
use tracing::info;

use super::shared;
use crate::error::Result;
use crate::spider::Spider;
use crate::walker::PageSource;

fn procedures(lang: Lang) -> Result<Vec<RowProcedure>> {
    let catalogue = ColumnMap::new()
        .field("dataset", "Dataset")
        .field("partition_key", "PartitionKey")
        .field("row_key", "RowKey")
        .field("folder_path", "FolderPath");

    let info = ColumnMap::new()
        .field("dataset", "Dataset")
        .field("partition_key", "PartitionKey")
        .field("row_key", "RowKey")
        .constant("lang", lang.code().to_string())
        .field("dataset_uri", lang.field("DatasetURI"))
        .field("hierarchy_path", lang.field("HierarchyPath"))
        .field("view_name", lang.field("ViewName"));

    Ok(vec![
        RowProcedure::new(shared(lang), "odata_catalogue", catalogue)?,
        RowProcedure::insert("odata_catalogue_info", info)?,
    ])
}

pub(super) fn load(spider: &Spider) -> Result<()> {
    for lang in Lang::ALL {
        let entry = spider.fetch(spider.base(lang), &["discover", "catalogue"])?;
        let stats = spider.walk(PageSource::Cached(entry), &procedures(lang)?)?;
        info!(%lang, pages = stats.pages, items = stats.items, "loaded catalogue");
    }
    Ok(())
}

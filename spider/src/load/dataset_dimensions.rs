//! `odata_dataset_dimension` and `odata_dataset_dimension_info` from
//! `discover/datasetdimensions`, plus a supplementary feed of dimensions
//! for datasets that have items but are never declared.
//!
//! Rows are paired across languages by position; see
//! [`reconcile`](crate::reconcile).

use hypercube_core::Lang;
use hypercube_sqlite::{ColumnMap, RowProcedure};
use tracing::info;

use super::shared;
use crate::error::Result;
use crate::reconcile::{IndexCounters, dimension_key};
use crate::spider::Spider;
use crate::walker::PageSource;

/// Supplementary dimensions, as one OData JSON page.
pub const EXTRA_DATASET_DIMENSIONS: &str = "extra.odata_dataset_dimensions.json";

pub(crate) fn procedures(lang: Lang, counters: &IndexCounters) -> Result<Vec<RowProcedure>> {
    let mut dimension = ColumnMap::new().field("dataset", "Dataset");
    if lang == Lang::English {
        dimension = dimension.mapped("dimension", lang.field("DimensionName"), dimension_key);
    }
    let dimension = dimension
        .autoincrement("dimension_index", &counters.main)
        .field("semantic_key", "SemanticKey");

    let info = ColumnMap::new()
        .field("dataset", "Dataset")
        .autoincrement("dimension_index", &counters.info)
        .constant("lang", lang.code().to_string())
        .mapped("dimension_localised", lang.field("DimensionName"), dimension_key)
        .field("dimension_name", lang.field("DimensionName"))
        .field("description", lang.field("DatasetDescription"))
        .field("dataset_uri", lang.field("DatasetURI"))
        .field("dataset_dimension_uri", lang.field("DatasetDimensionURI"))
        .field("notes", lang.field("Notes"))
        .field("external_uri", lang.field("ExternalURI"));

    Ok(vec![
        RowProcedure::new(shared(lang), "odata_dataset_dimension", dimension)?,
        RowProcedure::insert("odata_dataset_dimension_info", info)?,
    ])
}

pub(super) fn load(spider: &Spider) -> Result<()> {
    let extra = spider.extra_file(EXTRA_DATASET_DIMENSIONS);

    for lang in Lang::ALL {
        let counters = IndexCounters::fresh();
        let procedures = procedures(lang, &counters)?;

        let entry = spider.fetch(spider.base(lang), &["discover", "datasetdimensions"])?;
        let stats = spider.walk(PageSource::Cached(entry), &procedures)?;
        info!(%lang, pages = stats.pages, items = stats.items, "loaded dataset dimensions");

        if let Some(path) = &extra {
            let stats = spider.walk(PageSource::File(path.clone()), &procedures)?;
            info!(%lang, items = stats.items, "loaded supplementary dataset dimensions");
        }
    }
    Ok(())
}

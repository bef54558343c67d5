//! `odata_dataset_dimension_item*` from `discover/datasetdimensionitems`.
//!
//! Items are paired across languages by position like dataset dimensions.
//! Alternative codes get a counter of their own per code slot, which
//! advances for every item whether or not it has that code, so an
//! alternative row lands on the index of the item it belongs to.

use hypercube_core::Lang;
use hypercube_sqlite::{Autoincrement, ColumnMap, RowProcedure};
use tracing::info;

use super::dimension_items::ALTERNATIVE_CODES;
use super::shared;
use crate::error::Result;
use crate::reconcile::{IndexCounters, dimension_key};
use crate::spider::Spider;
use crate::walker::PageSource;

pub(crate) fn procedures(lang: Lang, counters: &IndexCounters) -> Result<Vec<RowProcedure>> {
    let mut item = ColumnMap::new().field("dataset", "Dataset");
    if lang == Lang::English {
        item = item.mapped("dimension", lang.field("DimensionName"), dimension_key);
    }
    let item = item
        .field("item", "Code")
        .autoincrement("item_index", &counters.main)
        .field("hierarchy", "Hierarchy")
        .field("sort_order", "SortOrder")
        .field("semantic_key", "SemanticKey");

    let info = ColumnMap::new()
        .field("dataset", "Dataset")
        .autoincrement("item_index", &counters.info)
        .constant("lang", lang.code().to_string())
        .mapped("dimension_localised", lang.field("DimensionName"), dimension_key)
        .field("description", lang.field("Description"))
        .field("notes", lang.field("Notes"));

    let mut procedures = vec![
        RowProcedure::new(shared(lang), "odata_dataset_dimension_item", item)?,
        RowProcedure::insert("odata_dataset_dimension_item_info", info)?,
    ];

    for n in 1..=ALTERNATIVE_CODES {
        let alternative = ColumnMap::new()
            .field("dataset", "Dataset")
            .autoincrement("item_index", &Autoincrement::new(0))
            .constant("alternative_index", n)
            .non_empty("alternative_item", format!("AltCode{n}"));
        procedures.push(RowProcedure::new(
            shared(lang),
            "odata_dataset_dimension_item_alternative",
            alternative,
        )?);
    }
    Ok(procedures)
}

pub(super) fn load(spider: &Spider) -> Result<()> {
    for lang in Lang::ALL {
        let procedures = procedures(lang, &IndexCounters::fresh())?;
        let entry = spider.fetch(spider.base(lang), &["discover", "datasetdimensionitems"])?;
        let stats = spider.walk(PageSource::Cached(entry), &procedures)?;
        info!(%lang, pages = stats.pages, items = stats.items, "loaded dataset dimension items");
    }
    Ok(())
}

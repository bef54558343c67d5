//! `dataset_collection` and `dataset_collection_info` from the Atom
//! service document.

use hypercube_core::{Item, Lang};
use hypercube_sqlite::{ColumnMap, RowProcedure, Strategy};
use tracing::{info, warn};

use super::shared;
use crate::error::Result;
use crate::spider::Spider;
use crate::walker::expect_mime;
use crate::xml;

const MIME: &str = "application/atomsvc+xml";

/// Datasets referenced by `discover/datasetdimensions` that the service
/// document omits.
pub const MISSING_FROM_DIMENSIONS: [&str; 9] = [
    "equ1014", "educ0024", "educ0023", "care0138", "schs0263", "schs0265", "schs0268",
    "schs0270", "tran0305",
];

/// Datasets referenced by `discover/catalogue` that the service document
/// omits.
pub const MISSING_FROM_CATALOGUE: [&str; 4] = ["educ0192", "educ0196", "hlth0458", "hlth0459"];

fn load_collection(spider: &Spider, lang: Lang, dataset: &str, href: Option<&str>) -> Result<()> {
    let collection = ColumnMap::new()
        .constant("dataset", dataset.to_string())
        .constant("href", href.map(str::to_string));
    let info = ColumnMap::new()
        .constant("dataset", dataset.to_string())
        .constant("lang", lang.code().to_string());

    let empty = Item::new();
    RowProcedure::new(shared(lang), "dataset_collection", collection)?
        .apply(spider.connection(), &empty)?;
    RowProcedure::new(Strategy::Insert, "dataset_collection_info", info)?
        .apply(spider.connection(), &empty)?;
    Ok(())
}

pub(super) fn load(spider: &Spider) -> Result<()> {
    for lang in Lang::ALL {
        let entry = spider.fetch(spider.base(lang), &["dataset"])?;
        expect_mime(&entry, MIME)?;
        let collections = xml::parse_service_document(std::io::BufReader::new(
            spider.blobs().open(&entry.digest)?,
        ))?;
        for c in &collections {
            load_collection(spider, lang, &c.dataset, Some(&c.href))?;
        }
        info!(%lang, datasets = collections.len(), "loaded dataset collections");
    }

    for dataset in MISSING_FROM_DIMENSIONS.iter().chain(&MISSING_FROM_CATALOGUE) {
        for lang in Lang::ALL {
            warn!(dataset, %lang, "loading dataset missing from the service document");
            load_collection(spider, lang, dataset, None)?;
        }
    }
    Ok(())
}

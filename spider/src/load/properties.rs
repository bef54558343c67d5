//! `dataset_property_*` from the EDMX metadata document.

use std::fs::File;
use std::io::BufReader;

use hypercube_core::{Item, Lang};
use hypercube_sqlite::{ColumnMap, RowProcedure, Strategy};
use tracing::{info, warn};

use crate::error::Result;
use crate::signature::{Columns, DatasetSignature};
use crate::spider::Spider;
use crate::walker::expect_mime;
use crate::xml::{self, EntitySetSchema};

const MIME: &str = "application/xml";

/// Hand-written metadata for datasets the service document does not
/// describe, in the same EDMX format.
pub const EXTRA_PROPERTIES: &str = "extra.dataset_property_dimension.xml";

/// Datasets whose Welsh metadata is known to disagree with the English.
///
/// hous0701 and hous0702 have `Area_ItemNotes_WEL` but no English
/// counterpart; schs0255 types `YearGroup_ItemName` differently.
pub const UNCHECKED_PROPERTIES: [&str; 3] = ["hous0701", "hous0702", "schs0255"];

fn strategy(lang: Lang, dataset: &str) -> Strategy {
    match lang {
        Lang::English => Strategy::Insert,
        Lang::Welsh if UNCHECKED_PROPERTIES.contains(&dataset) => {
            warn!(dataset, %lang, "not checking properties known to mismatch English");
            Strategy::Ignore
        }
        Lang::Welsh => Strategy::Check,
    }
}

fn with_columns(map: ColumnMap, columns: &Columns) -> ColumnMap {
    columns.iter().fold(map, |map, (prefix, sig)| {
        map.constant(format!("{prefix}_type"), sig.type_name.clone())
            .constant(format!("{prefix}_nullable"), i64::from(sig.nullable))
    })
}

fn load_sets(spider: &Spider, lang: Lang, sets: &[EntitySetSchema]) -> Result<()> {
    let conn = spider.connection();
    let empty = Item::new();

    for set in sets {
        let signature = DatasetSignature::from_properties(&set.properties)?;
        let strategy = strategy(lang, &set.dataset);
        let dataset = || ColumnMap::new().constant("dataset", set.dataset.clone());

        if signature.measure.is_empty() {
            warn!(dataset = %set.dataset, "no measure properties");
        } else {
            let map = with_columns(dataset(), &signature.measure);
            RowProcedure::new(strategy, "dataset_property_measure", map)?.apply(conn, &empty)?;
        }

        for (dimension, columns) in &signature.dimensions {
            let map = with_columns(dataset().constant("dimension", dimension.clone()), columns);
            RowProcedure::new(strategy, "dataset_property_dimension", map)?.apply(conn, &empty)?;
        }

        for (dimension, alternatives) in &signature.alternatives {
            for (index, sig) in alternatives {
                let map = dataset()
                    .constant("dimension", dimension.clone())
                    .constant("alternative_index", *index)
                    .constant("alternative_type", sig.type_name.clone())
                    .constant("alternative_nullable", i64::from(sig.nullable));
                RowProcedure::new(strategy, "dataset_property_dimension_alternative", map)?
                    .apply(conn, &empty)?;
            }
        }
    }
    Ok(())
}

pub(super) fn load(spider: &Spider) -> Result<()> {
    let extras = match spider.extra_file(EXTRA_PROPERTIES) {
        Some(path) => xml::parse_edmx(BufReader::new(File::open(path)?))?,
        None => Vec::new(),
    };

    for lang in Lang::ALL {
        let entry = spider.fetch(spider.base(lang), &["dataset", "$metadata"])?;
        expect_mime(&entry, MIME)?;
        let sets = xml::parse_edmx(BufReader::new(spider.blobs().open(&entry.digest)?))?;
        load_sets(spider, lang, &sets)?;
        load_sets(spider, lang, &extras)?;
        info!(%lang, datasets = sets.len(), supplementary = extras.len(), "loaded dataset properties");
    }
    Ok(())
}

//! Loaders, one per group of warehouse tables.
//!
//! Each loader reads its feed in English and then in Welsh. The English
//! pass inserts every table. The Welsh pass inserts the localised `_info`
//! tables and checks the language-independent ones against what English
//! wrote, so a disagreement between the two services fails the load.
//!
//! A loader runs inside its own savepoint: when it fails, its rows are
//! rolled back and the loaders before it stay committed.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use hypercube_core::Lang;
use hypercube_sqlite::{Strategy, with_savepoint};
use tracing::{info, warn};

use crate::error::{Result, SpiderError};
use crate::spider::Spider;

mod catalogue;
mod collections;
mod dataset_dimension_items;
mod dataset_dimensions;
mod dimension_items;
mod dimension_types;
mod metadata_tags;
mod properties;

pub use collections::{MISSING_FROM_CATALOGUE, MISSING_FROM_DIMENSIONS};
pub use dataset_dimensions::EXTRA_DATASET_DIMENSIONS;
pub use properties::{EXTRA_PROPERTIES, UNCHECKED_PROPERTIES};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Loader {
    Collections,
    Properties,
    Catalogue,
    MetadataTags,
    DimensionTypes,
    DimensionItems,
    DatasetDimensions,
    DatasetDimensionItems,
}

impl Loader {
    /// Every loader, in dependency order.
    pub const ALL: [Loader; 8] = [
        Loader::Collections,
        Loader::Properties,
        Loader::Catalogue,
        Loader::MetadataTags,
        Loader::DimensionTypes,
        Loader::DimensionItems,
        Loader::DatasetDimensions,
        Loader::DatasetDimensionItems,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Loader::Collections => "dataset_collections",
            Loader::Properties => "dataset_properties",
            Loader::Catalogue => "odata_catalogue",
            Loader::MetadataTags => "odata_metadata_tags",
            Loader::DimensionTypes => "odata_dimension_types",
            Loader::DimensionItems => "odata_dimension_items",
            Loader::DatasetDimensions => "odata_dataset_dimensions",
            Loader::DatasetDimensionItems => "odata_dataset_dimension_items",
        }
    }

    /// Runs this loader in its own savepoint.
    pub fn run(self, spider: &Spider) -> Result<()> {
        info!(loader = self.name(), "loading");
        let savepoint = format!("load_{}", self.name());
        with_savepoint(spider.connection(), &savepoint, |_| match self {
            Loader::Collections => collections::load(spider),
            Loader::Properties => properties::load(spider),
            Loader::Catalogue => catalogue::load(spider),
            Loader::MetadataTags => metadata_tags::load(spider),
            Loader::DimensionTypes => dimension_types::load(spider),
            Loader::DimensionItems => dimension_items::load(spider),
            Loader::DatasetDimensions => dataset_dimensions::load(spider),
            Loader::DatasetDimensionItems => dataset_dimension_items::load(spider),
        })
    }
}

impl fmt::Display for Loader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Loader {
    type Err = SpiderError;

    fn from_str(s: &str) -> Result<Self> {
        Loader::ALL
            .into_iter()
            .find(|l| l.name() == s)
            .ok_or_else(|| SpiderError::UnknownLoader(s.to_string()))
    }
}

impl Spider {
    /// Runs every loader in order, stopping at the first failure.
    pub fn load_all(&self) -> Result<()> {
        for loader in Loader::ALL {
            loader.run(self)?;
        }
        info!("load complete");
        Ok(())
    }

    /// Path of a supplementary file, or `None` (with a warning) when no
    /// extras directory is configured or the file is absent.
    pub(crate) fn extra_file(&self, name: &str) -> Option<PathBuf> {
        match self.config.extra_path(name) {
            Some(path) if path.is_file() => Some(path),
            Some(path) => {
                warn!(path = %path.display(), "supplementary file not found, skipping");
                None
            }
            None => {
                warn!(file = name, "no extras directory configured, skipping");
                None
            }
        }
    }
}

/// Strategy for tables the English pass inserts and the Welsh pass checks.
pub(crate) fn shared(lang: Lang) -> Strategy {
    match lang {
        Lang::English => Strategy::Insert,
        Lang::Welsh => Strategy::Check,
    }
}

//! Publication languages.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Language a feed is published in.
///
/// The service exposes the same catalogue twice, once per language, under
/// different hosts. Field names inside the feeds carry a language suffix
/// (`DatasetURI_ENG`, `DatasetURI_WEL`), and localised rows in the store are
/// keyed by [`code`](Self::code).
///
/// # Examples
///
/// ```
/// use hypercube_core::Lang;
///
/// assert_eq!(Lang::English.suffix(), "ENG");
/// assert_eq!(Lang::English.field("Description"), "Description_ENG");
/// assert_eq!("cy-gb".parse::<Lang>().unwrap(), Lang::Welsh);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Lang {
    #[serde(rename = "en-gb")]
    English,
    #[serde(rename = "cy-gb")]
    Welsh,
}

impl Lang {
    /// Both languages, English first. Loaders run in this order.
    pub const ALL: [Lang; 2] = [Lang::English, Lang::Welsh];

    /// Locale code stored in `lang` columns.
    pub fn code(self) -> &'static str {
        match self {
            Lang::English => "en-gb",
            Lang::Welsh => "cy-gb",
        }
    }

    /// Suffix used by localised property and feed field names.
    pub fn suffix(self) -> &'static str {
        match self {
            Lang::English => "ENG",
            Lang::Welsh => "WEL",
        }
    }

    /// Builds the localised field name `{base}_{suffix}`.
    pub fn field(self, base: &str) -> String {
        format!("{base}_{}", self.suffix())
    }

    /// Maps a property-name suffix back to a language.
    pub fn from_suffix(suffix: &str) -> Option<Lang> {
        match suffix {
            "ENG" => Some(Lang::English),
            "WEL" => Some(Lang::Welsh),
            _ => None,
        }
    }
}

impl fmt::Display for Lang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Lang {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "en-gb" => Ok(Lang::English),
            "cy-gb" => Ok(Lang::Welsh),
            other => Err(CoreError::UnknownLang(other.to_string())),
        }
    }
}

//! Cross-language reconciliation of dataset dimensions and their items.
//!
//! The dimension feeds carry no language-independent key for a dimension:
//! only its display name in each language. The English name with every
//! non-letter removed is the key the dataset feeds use, so English rows are
//! keyed by that. Welsh rows cannot be, so both passes number their rows
//! with a counter starting at zero and the Welsh row with index `n` is
//! taken to be the translation of the English row with index `n`.
//!
//! This relies on the service returning both languages in the same order.
//! The Welsh pass checks every non-localised column against the English
//! row with the same index, which catches most reorderings. Rows whose
//! non-localised columns are identical can swap places undetected.

use std::sync::LazyLock;

use hypercube_sqlite::Autoincrement;
use regex::Regex;

static NON_LETTERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z]+").expect("static regex must compile"));

/// Derives the property-name key of a dimension from its display name.
///
/// # Examples
///
/// ```
/// use hypercube_spider::dimension_key;
///
/// assert_eq!(dimension_key("Standard Output on a farm (€000s)"), "StandardOutputonafarms");
/// ```
pub fn dimension_key(name: &str) -> String {
    NON_LETTERS.replace_all(name, "").into_owned()
}

/// The pair of counters numbering a feed's main rows and its `_info` rows.
///
/// Each language pass takes a fresh pair so that both passes assign the
/// same index to the same position.
#[derive(Debug, Clone)]
pub struct IndexCounters {
    pub main: Autoincrement,
    pub info: Autoincrement,
}

impl IndexCounters {
    pub fn fresh() -> Self {
        Self {
            main: Autoincrement::new(0),
            info: Autoincrement::new(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_key_strips_non_letters() {
        assert_eq!(dimension_key("Area"), "Area");
        assert_eq!(dimension_key("Year of birth"), "Yearofbirth");
        assert_eq!(dimension_key("Age 16-64"), "Age");
        assert_eq!(dimension_key("Ffynhonnell ddata"), "Ffynhonnellddata");
        assert_eq!(dimension_key("  "), "");
    }

    #[test]
    fn test_fresh_counters_start_at_zero() {
        let first = IndexCounters::fresh();
        first.main.next_value();
        first.main.next_value();
        let second = IndexCounters::fresh();
        assert_eq!(second.main.next_value(), 0);
        assert_eq!(second.info.next_value(), 0);
        assert_eq!(first.main.peek(), 2);
    }
}

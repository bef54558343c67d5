//! Groups the flat property list of an entity type into the type
//! signature of its measure, its dimensions and their alternative codes.
//!
//! Property names follow `Measure`, `Dimension_Key` or
//! `Dimension_Key_LANG`. Both language variants of a key describe the same
//! column, so the later one wins.

use std::collections::BTreeMap;

use hypercube_core::Lang;

use crate::error::{Result, SpiderError};
use crate::xml::PropertyDecl;

/// Type name and nullability of one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSignature {
    pub type_name: String,
    pub nullable: bool,
}

impl From<&PropertyDecl> for ColumnSignature {
    fn from(p: &PropertyDecl) -> Self {
        Self {
            type_name: p.type_name.clone(),
            nullable: p.nullable,
        }
    }
}

/// Column prefix to signature, e.g. `item` -> `Edm.String`.
pub type Columns = BTreeMap<String, ColumnSignature>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatasetSignature {
    pub measure: Columns,
    /// Dimension name to its columns.
    pub dimensions: BTreeMap<String, Columns>,
    /// Dimension name to alternative index to signature.
    pub alternatives: BTreeMap<String, BTreeMap<i64, ColumnSignature>>,
}

fn measure_prefix(key: &str) -> Option<&'static str> {
    Some(match key {
        "Data" | "Percentage" => "measure",
        "RowKey" => "row_key",
        "PartitionKey" => "partition_key",
        _ => return None,
    })
}

fn dimension_prefix(key: &str) -> Option<&'static str> {
    Some(match key {
        "Code" => "item",
        "ItemName" => "item_name",
        "SortOrder" => "sort_order",
        "Hierarchy" => "hierarchy",
        "ItemNotes" => "item_notes",
        _ => return None,
    })
}

fn alternative_index(key: &str) -> Option<i64> {
    let digits = key.strip_prefix("AltCode")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn unknown(property: &str) -> SpiderError {
    SpiderError::UnexpectedDocument(format!("unknown property kind in {property}"))
}

impl DatasetSignature {
    /// Groups `properties`, failing on any name it cannot classify.
    pub fn from_properties(properties: &[PropertyDecl]) -> Result<Self> {
        let mut signature = Self::default();
        for p in properties {
            let parts: Vec<&str> = p.name.split('_').collect();
            match parts.as_slice() {
                [key] => {
                    let prefix = measure_prefix(key).ok_or_else(|| unknown(&p.name))?;
                    signature.measure.insert(prefix.to_string(), p.into());
                }
                [dimension, key] | [dimension, key, _] => {
                    if let [_, _, suffix] = parts.as_slice() {
                        if Lang::from_suffix(suffix).is_none() {
                            return Err(SpiderError::UnexpectedDocument(format!(
                                "expected property name to end in _ENG or _WEL but got {}",
                                p.name
                            )));
                        }
                    }
                    if let Some(index) = alternative_index(key) {
                        signature
                            .alternatives
                            .entry(dimension.to_string())
                            .or_default()
                            .insert(index, p.into());
                    } else {
                        let prefix = dimension_prefix(key).ok_or_else(|| unknown(&p.name))?;
                        signature
                            .dimensions
                            .entry(dimension.to_string())
                            .or_default()
                            .insert(prefix.to_string(), p.into());
                    }
                }
                _ => {
                    return Err(SpiderError::UnexpectedDocument(format!(
                        "expected property name with 2 or 3 components but {} has {}",
                        p.name,
                        parts.len()
                    )));
                }
            }
        }
        Ok(signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prop(name: &str, type_name: &str, nullable: bool) -> PropertyDecl {
        PropertyDecl {
            name: name.into(),
            type_name: type_name.into(),
            nullable,
        }
    }

    #[test]
    fn test_groups_measure_dimensions_and_alternatives() {
        let sig = DatasetSignature::from_properties(&[
            prop("PartitionKey", "Edm.String", false),
            prop("RowKey", "Edm.String", false),
            prop("Data", "Edm.Double", true),
            prop("Area_Code", "Edm.String", true),
            prop("Area_ItemName_ENG", "Edm.String", true),
            prop("Area_AltCode1", "Edm.String", true),
            prop("Area_AltCode2", "Edm.String", false),
            prop("Year_Code", "Edm.String", true),
            prop("Year_SortOrder", "Edm.Int32", true),
        ])
        .unwrap();

        let measure: Vec<&str> = sig.measure.keys().map(String::as_str).collect();
        assert_eq!(measure, vec!["measure", "partition_key", "row_key"]);
        assert_eq!(sig.measure["measure"].type_name, "Edm.Double");

        let area = &sig.dimensions["Area"];
        assert_eq!(area.keys().collect::<Vec<_>>(), vec!["item", "item_name"]);
        assert_eq!(sig.dimensions["Year"]["sort_order"].type_name, "Edm.Int32");

        let alts = &sig.alternatives["Area"];
        assert_eq!(alts.keys().copied().collect::<Vec<_>>(), vec![1, 2]);
        assert!(!alts[&2].nullable);
    }

    #[test]
    fn test_percentage_is_a_measure() {
        let sig = DatasetSignature::from_properties(&[prop("Percentage", "Edm.Double", true)]).unwrap();
        assert!(sig.measure.contains_key("measure"));
    }

    #[test]
    fn test_later_language_variant_wins() {
        let sig = DatasetSignature::from_properties(&[
            prop("YearGroup_ItemName_ENG", "Edm.String", true),
            prop("YearGroup_ItemName_WEL", "Edm.Int64", false),
        ])
        .unwrap();
        assert_eq!(sig.dimensions["YearGroup"]["item_name"].type_name, "Edm.Int64");
    }

    #[test]
    fn test_rejects_bad_suffix() {
        let err = DatasetSignature::from_properties(&[prop("Area_ItemName_FRA", "Edm.String", true)])
            .unwrap_err();
        assert!(err.to_string().contains("_ENG or _WEL"));
    }

    #[test]
    fn test_rejects_unknown_kind() {
        assert!(DatasetSignature::from_properties(&[prop("Value", "Edm.Double", true)]).is_err());
        assert!(DatasetSignature::from_properties(&[prop("Area_Colour", "Edm.String", true)]).is_err());
    }

    #[test]
    fn test_rejects_too_many_components() {
        let err = DatasetSignature::from_properties(&[prop("A_B_C_D", "Edm.String", true)])
            .unwrap_err();
        assert!(err.to_string().contains("has 4"));
    }
}

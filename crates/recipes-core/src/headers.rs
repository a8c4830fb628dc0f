//! Header → parameter mapping

use crate::params::{ParamType, ParameterSet};
use serde::Serialize;

/// A CSV column selected for a recognized parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnMapping {
    /// Trimmed header text as it appears in the file
    pub csv_column: String,
    /// Matched parameter name
    pub param: String,
    /// Declared type of the parameter
    #[serde(rename = "type")]
    pub declared_type: ParamType,
    /// Zero-based column position in the table
    #[serde(skip)]
    pub column: usize,
}

/// Map headers onto `params`, preserving column order.
///
/// A header matches when its trimmed, lower-cased text equals a parameter
/// name exactly. Blank and unrecognized headers are skipped.
pub fn map_headers<S: AsRef<str>>(headers: &[S], params: &ParameterSet) -> Vec<ColumnMapping> {
    headers
        .iter()
        .enumerate()
        .filter_map(|(column, header)| {
            let key = header.as_ref().trim();
            if key.is_empty() {
                return None;
            }
            let descriptor = params.get(&key.to_lowercase())?;
            Some(ColumnMapping {
                csv_column: key.to_string(),
                param: descriptor.name.to_string(),
                declared_type: descriptor.declared_type,
                column,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_exact_match() {
        let params = ParameterSet::recipes();
        let mapped = map_headers(&["Cuisine", "Cuisines", " LIMIT "], &params);

        assert_eq!(mapped.len(), 2);
        assert_eq!(mapped[0].csv_column, "Cuisine");
        assert_eq!(mapped[0].param, "cuisine");
        assert_eq!(mapped[0].column, 0);
        assert_eq!(mapped[1].csv_column, "LIMIT");
        assert_eq!(mapped[1].param, "limit");
        assert_eq!(mapped[1].declared_type, ParamType::Integer);
        assert_eq!(mapped[1].column, 2);
    }

    #[test]
    fn test_skips_blank_and_unknown_headers() {
        let params = ParameterSet::recipes();
        let mapped = map_headers(&["", "   ", "unused_col", "diet"], &params);
        assert!(mapped.is_empty());
    }

    #[test]
    fn test_preserves_column_order_and_case_variants() {
        let params = ParameterSet::recipes();
        let mapped = map_headers(&["country", "city", "Country"], &params);
        let names: Vec<_> = mapped.iter().map(|m| m.param.as_str()).collect();
        assert_eq!(names, vec!["country", "city", "country"]);
    }

    #[test]
    fn test_mapping_is_deterministic() {
        let params = ParameterSet::recipes();
        let headers = ["cuisine", "limit", "dietary_restrictions", "unused_col"];
        assert_eq!(map_headers(&headers, &params), map_headers(&headers, &params));
    }

    #[test]
    fn test_serializes_selected_params_shape() {
        let params = ParameterSet::recipes();
        let mapped = map_headers(&["Limit"], &params);
        let json = serde_json::to_value(&mapped).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{"csv_column": "Limit", "param": "limit", "type": "integer"}])
        );
    }
}

//! Recognized recipes-search parameters
//!
//! The whitelist is immutable configuration: build a [`ParameterSet`] once and
//! share it (it is cheap to clone behind an `Arc`).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared type of an API parameter, which selects the normalization rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    List,
}

impl ParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::List => "list",
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single recognized parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterDescriptor {
    pub name: &'static str,
    pub declared_type: ParamType,
}

impl ParameterDescriptor {
    pub const fn new(name: &'static str, declared_type: ParamType) -> Self {
        Self {
            name,
            declared_type,
        }
    }
}

/// Parameters accepted by the recipes search API.
pub const RECIPES_SEARCH_PARAMS: &[ParameterDescriptor] = &[
    ParameterDescriptor::new("cuisine", ParamType::String),
    ParameterDescriptor::new("dietary_restrictions", ParamType::List),
    ParameterDescriptor::new("include_ingredients", ParamType::List),
    ParameterDescriptor::new("exclude_ingredients", ParamType::List),
    ParameterDescriptor::new("max_prep_time_mins", ParamType::Integer),
    ParameterDescriptor::new("limit", ParamType::Integer),
    ParameterDescriptor::new("sort_by", ParamType::String),
    ParameterDescriptor::new("city", ParamType::String),
    ParameterDescriptor::new("country", ParamType::String),
];

/// Ordered, read-only whitelist of parameters a batch may populate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSet {
    params: Vec<ParameterDescriptor>,
}

impl ParameterSet {
    /// Build a set from descriptors. Names are lower-cased lookups, so callers
    /// must supply unique lower-case names.
    pub fn new(params: impl IntoIterator<Item = ParameterDescriptor>) -> Self {
        Self {
            params: params.into_iter().collect(),
        }
    }

    /// The recipes search whitelist.
    pub fn recipes() -> Self {
        Self::new(RECIPES_SEARCH_PARAMS.iter().cloned())
    }

    pub fn get(&self, name: &str) -> Option<&ParameterDescriptor> {
        self.params.iter().find(|p| p.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParameterDescriptor> {
        self.params.iter()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.params.iter().map(|p| p.name).collect()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

impl Default for ParameterSet {
    fn default() -> Self {
        Self::recipes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_recipes_whitelist_names_are_unique_lowercase() {
        let set = ParameterSet::recipes();
        let names: HashSet<_> = set.names().into_iter().collect();
        assert_eq!(names.len(), set.len());
        assert!(set.iter().all(|p| p.name == p.name.to_lowercase()));
    }

    #[test]
    fn test_declared_types() {
        let set = ParameterSet::recipes();
        assert_eq!(set.get("limit").unwrap().declared_type, ParamType::Integer);
        assert_eq!(
            set.get("exclude_ingredients").unwrap().declared_type,
            ParamType::List
        );
        assert_eq!(set.get("city").unwrap().declared_type, ParamType::String);
        assert!(set.get("Cuisine").is_none());
    }

    #[test]
    fn test_param_type_serializes_lowercase() {
        let json = serde_json::to_string(&ParamType::Integer).unwrap();
        assert_eq!(json, "\"integer\"");
    }
}

//! Synthetic call rendering

use crate::headers::ColumnMapping;
use crate::normalize::{normalize, ArgValue};
use crate::table::Cell;
use std::fmt;

/// Name used when no other call name is configured.
pub const DEFAULT_CALL_NAME: &str = "recipes.search";

/// One row's call: ordered `param=value` pairs under a fixed call name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntheticCall {
    name: String,
    args: Vec<(String, ArgValue)>,
}

impl SyntheticCall {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// Build the call for one row, skipping cells that normalize to nothing.
    pub fn from_row(name: impl Into<String>, mapping: &[ColumnMapping], row: &[Cell]) -> Self {
        let mut call = Self::new(name);
        for entry in mapping {
            let cell = row.get(entry.column).unwrap_or(&Cell::Missing);
            if let Some(value) = normalize(entry.declared_type, cell).into_value() {
                call.push(entry.param.clone(), value);
            }
        }
        call
    }

    pub fn push(&mut self, param: impl Into<String>, value: ArgValue) {
        self.args.push((param.into(), value));
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[(String, ArgValue)] {
        &self.args
    }

    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for SyntheticCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, (param, value)) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", param, value)?;
        }
        f.write_str(")")
    }
}

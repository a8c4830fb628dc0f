//! Cell normalization
//!
//! Turns a classified [`Cell`] into the typed argument a parameter expects.
//! Normalization is total: anything that cannot be coerced is reported as
//! omitted, never as an error.

use crate::params::ParamType;
use crate::table::Cell;
use std::fmt;

/// A typed argument value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgValue {
    Int(i64),
    Str(String),
    List(Vec<String>),
}

impl ArgValue {
    /// Literal form used in rendered call text.
    pub fn display_repr(&self) -> String {
        match self {
            ArgValue::Int(n) => n.to_string(),
            ArgValue::Str(s) => quote_literal(s),
            ArgValue::List(items) => {
                let inner: Vec<String> = items.iter().map(|s| quote_literal(s)).collect();
                format!("[{}]", inner.join(", "))
            }
        }
    }
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_repr())
    }
}

/// Outcome of normalizing one cell: a value, or `None` when the parameter is
/// omitted from the row's call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedArg(pub Option<ArgValue>);

impl NormalizedArg {
    pub fn omitted() -> Self {
        Self(None)
    }

    pub fn value(&self) -> Option<&ArgValue> {
        self.0.as_ref()
    }

    pub fn into_value(self) -> Option<ArgValue> {
        self.0
    }

    pub fn is_omitted(&self) -> bool {
        self.0.is_none()
    }

    /// `"None"` when omitted, else the value's literal.
    pub fn display_repr(&self) -> String {
        match &self.0 {
            Some(value) => value.display_repr(),
            None => "None".to_string(),
        }
    }
}

/// Normalize `cell` according to `declared_type`.
///
/// Only [`Cell::Numeric`] can become an integer; text cells of an integer
/// parameter are omitted.
pub fn normalize(declared_type: ParamType, cell: &Cell) -> NormalizedArg {
    let value = match (declared_type, cell) {
        (_, Cell::Missing) => None,
        (ParamType::Integer, Cell::Numeric(text)) => parse_truncated_int(text).map(ArgValue::Int),
        (ParamType::Integer, Cell::Text(_)) => None,
        (ParamType::List, Cell::Numeric(text) | Cell::Text(text)) => {
            Some(ArgValue::List(split_list(text)))
        }
        (ParamType::String, Cell::Numeric(text) | Cell::Text(text)) => {
            let trimmed = text.trim();
            (!trimmed.is_empty()).then(|| ArgValue::Str(trimmed.to_string()))
        }
    };
    NormalizedArg(value)
}

/// Parse as a float first (so `"5.0"` is accepted) and truncate toward zero.
pub fn parse_truncated_int(text: &str) -> Option<i64> {
    let value: f64 = text.trim().parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    let truncated = value.trunc();
    // i64::MAX is not exactly representable, so compare against 2^63
    if truncated < -9_223_372_036_854_775_808.0 || truncated >= 9_223_372_036_854_775_808.0 {
        return None;
    }
    Some(truncated as i64)
}

/// Split on `,` or `;`, trimming each piece and dropping empties.
pub fn split_list(text: &str) -> Vec<String> {
    text.split([',', ';'])
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(str::to_string)
        .collect()
}

/// Quote `s` the way a Python `str` repr does.
pub fn quote_literal(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };

    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if !is_printable(c) => {
                let code = c as u32;
                let escaped = if code < 0x100 {
                    format!("\\x{:02x}", code)
                } else if code < 0x10000 {
                    format!("\\u{:04x}", code)
                } else {
                    format!("\\U{:08x}", code)
                };
                out.push_str(&escaped);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

/// Format characters (general category Cf).
const FORMAT_RANGES: &[(u32, u32)] = &[
    (0x00AD, 0x00AD),
    (0x0600, 0x0605),
    (0x061C, 0x061C),
    (0x06DD, 0x06DD),
    (0x070F, 0x070F),
    (0x0890, 0x0891),
    (0x08E2, 0x08E2),
    (0x180E, 0x180E),
    (0x200B, 0x200F),
    (0x202A, 0x202E),
    (0x2060, 0x2064),
    (0x2066, 0x206F),
    (0xFEFF, 0xFEFF),
    (0xFFF9, 0xFFFB),
    (0x110BD, 0x110BD),
    (0x110CD, 0x110CD),
    (0x13430, 0x1343F),
    (0x1BCA0, 0x1BCA3),
    (0x1D173, 0x1D17A),
    (0xE0001, 0xE0001),
    (0xE0020, 0xE007F),
];

/// Python's `str.isprintable` for one character.
///
/// Controls, format characters, separators other than the ASCII space,
/// private-use code points and noncharacters are not printable. Code points
/// unassigned in the Unicode database are treated as printable.
fn is_printable(c: char) -> bool {
    if c == ' ' {
        return true;
    }
    if c.is_control() || c.is_whitespace() {
        return false;
    }
    let code = c as u32;
    let private_use = matches!(code, 0xE000..=0xF8FF | 0xF0000..=0xFFFFD | 0x100000..=0x10FFFD);
    let noncharacter = (0xFDD0..=0xFDEF).contains(&code) || (code & 0xFFFE) == 0xFFFE;
    let format = FORMAT_RANGES
        .iter()
        .any(|&(lo, hi)| (lo..=hi).contains(&code));
    !(private_use || noncharacter || format)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Cell {
        Cell::classify(s)
    }

    #[test]
    fn test_missing_is_omitted_for_every_type() {
        for ty in [ParamType::String, ParamType::Integer, ParamType::List] {
            let arg = normalize(ty, &Cell::Missing);
            assert!(arg.is_omitted());
            assert_eq!(arg.display_repr(), "None");
        }
    }

    #[test]
    fn test_integer_coercion() {
        assert_eq!(
            normalize(ParamType::Integer, &text("5.0")).into_value(),
            Some(ArgValue::Int(5))
        );
        assert_eq!(
            normalize(ParamType::Integer, &text("5.7")).into_value(),
            Some(ArgValue::Int(5))
        );
        assert_eq!(
            normalize(ParamType::Integer, &text("-2.9")).into_value(),
            Some(ArgValue::Int(-2))
        );
        assert_eq!(
            normalize(ParamType::Integer, &text(" 1e3 ")).into_value(),
            Some(ArgValue::Int(1000))
        );
        assert!(normalize(ParamType::Integer, &text("abc")).is_omitted());
        assert!(normalize(ParamType::Integer, &text("inf")).is_omitted());
        assert!(normalize(ParamType::Integer, &text("1e300")).is_omitted());
    }

    #[test]
    fn test_integer_repr_is_bare() {
        assert_eq!(normalize(ParamType::Integer, &text("30")).display_repr(), "30");
    }

    #[test]
    fn test_list_splitting() {
        let arg = normalize(ParamType::List, &text("vegan; gluten-free, soy-free"));
        assert_eq!(
            arg.value(),
            Some(&ArgValue::List(vec![
                "vegan".into(),
                "gluten-free".into(),
                "soy-free".into()
            ]))
        );
        assert_eq!(arg.display_repr(), "['vegan', 'gluten-free', 'soy-free']");
    }

    #[test]
    fn test_list_of_only_separators_is_present_and_empty() {
        let arg = normalize(ParamType::List, &text(" ; , ;"));
        assert_eq!(arg.value(), Some(&ArgValue::List(vec![])));
        assert_eq!(arg.display_repr(), "[]");
    }

    #[test]
    fn test_list_from_numeric_cell() {
        let arg = normalize(ParamType::List, &text("42"));
        assert_eq!(arg.display_repr(), "['42']");
    }

    #[test]
    fn test_string_trimmed_and_quoted() {
        let arg = normalize(ParamType::String, &text("  Italian  "));
        assert_eq!(arg.value(), Some(&ArgValue::Str("Italian".into())));
        assert_eq!(arg.display_repr(), "'Italian'");
    }

    #[test]
    fn test_quote_literal_matches_python_repr() {
        assert_eq!(quote_literal("plain"), "'plain'");
        assert_eq!(quote_literal("it's"), "\"it's\"");
        assert_eq!(quote_literal("it's \"x\""), "'it\\'s \"x\"'");
        assert_eq!(quote_literal("a\\b"), "'a\\\\b'");
        assert_eq!(quote_literal("line\nbreak"), "'line\\nbreak'");
        assert_eq!(quote_literal("bell\u{7}"), "'bell\\x07'");
        assert_eq!(quote_literal("café"), "'café'");
    }

    #[test]
    fn test_quote_literal_escapes_unprintable_unicode() {
        assert_eq!(quote_literal("no\u{a0}break"), "'no\\xa0break'");
        assert_eq!(quote_literal("zero\u{200b}width"), "'zero\\u200bwidth'");
        assert_eq!(quote_literal("line\u{2028}sep"), "'line\\u2028sep'");
        assert_eq!(quote_literal("\u{feff}bom"), "'\\ufeffbom'");
        assert_eq!(quote_literal("\u{f0000}"), "'\\U000f0000'");
        assert_eq!(quote_literal("\u{85}"), "'\\x85'");
        assert_eq!(quote_literal("tofu 豆腐 🌱"), "'tofu 豆腐 🌱'");
    }

    #[test]
    fn test_integer_requires_numeric_cell() {
        assert_eq!(
            normalize(ParamType::Integer, &Cell::Numeric("12".into())).into_value(),
            Some(ArgValue::Int(12))
        );
        assert!(normalize(ParamType::Integer, &Cell::Text("twelve".into())).is_omitted());
        assert_eq!(
            normalize(ParamType::String, &Cell::Numeric("12".into())).display_repr(),
            "'12'"
        );
    }
}

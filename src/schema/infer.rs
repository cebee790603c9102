//! Scalar type inference for attribute values and text

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// XSD built-in type a value is inferred as
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScalarType {
    String,
    Boolean,
    Integer,
    Decimal,
    Date,
    DateTime,
    Time,
}

impl ScalarType {
    /// Local name of the XSD type
    pub fn xsd_name(self) -> &'static str {
        match self {
            ScalarType::String => "string",
            ScalarType::Boolean => "boolean",
            ScalarType::Integer => "integer",
            ScalarType::Decimal => "decimal",
            ScalarType::Date => "date",
            ScalarType::DateTime => "dateTime",
            ScalarType::Time => "time",
        }
    }
}

type Pattern = LazyLock<Option<Regex>>;

static INTEGER: Pattern = LazyLock::new(|| Regex::new(r"^-?[0-9]+$").ok());
static DECIMAL: Pattern = LazyLock::new(|| Regex::new(r"^-?[0-9]*\.[0-9]+$").ok());
static DATE: Pattern = LazyLock::new(|| Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").ok());
static DATE_TIME: Pattern =
    LazyLock::new(|| Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}T[0-9]{2}:[0-9]{2}:[0-9]{2}").ok());
static TIME: Pattern = LazyLock::new(|| Regex::new(r"^[0-9]{2}:[0-9]{2}:[0-9]{2}").ok());

/// Infer the type of a value; the first matching rule wins
pub fn infer_type(value: &str) -> ScalarType {
    if value.trim().is_empty() {
        return ScalarType::String;
    }
    if value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("false") {
        return ScalarType::Boolean;
    }

    let rules: [(&Pattern, ScalarType); 5] = [
        (&INTEGER, ScalarType::Integer),
        (&DECIMAL, ScalarType::Decimal),
        (&DATE, ScalarType::Date),
        (&DATE_TIME, ScalarType::DateTime),
        (&TIME, ScalarType::Time),
    ];
    rules
        .iter()
        .find(|(re, _)| matches!(&***re, Some(re) if re.is_match(value)))
        .map_or(ScalarType::String, |&(_, ty)| ty)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inference_table() {
        let cases = [
            ("", ScalarType::String),
            ("   ", ScalarType::String),
            ("TRUE", ScalarType::Boolean),
            ("false", ScalarType::Boolean),
            ("42", ScalarType::Integer),
            ("-7", ScalarType::Integer),
            ("007", ScalarType::Integer),
            ("3.14", ScalarType::Decimal),
            ("-.5", ScalarType::Decimal),
            ("1.", ScalarType::String),
            ("2024-01-31", ScalarType::Date),
            ("2024-01-31T10:20:30", ScalarType::DateTime),
            ("2024-01-31T10:20:30Z", ScalarType::DateTime),
            ("10:20:30", ScalarType::Time),
            ("10:20:30.5", ScalarType::Time),
            ("10:20", ScalarType::String),
            ("hello", ScalarType::String),
            (" 42", ScalarType::String),
            ("١٢٣", ScalarType::String),
        ];
        for (value, expected) in cases {
            assert_eq!(infer_type(value), expected, "{:?}", value);
        }
    }

    #[test]
    fn test_xsd_names() {
        assert_eq!(ScalarType::DateTime.xsd_name(), "dateTime");
        assert_eq!(serde_json::to_string(&ScalarType::DateTime).unwrap(), "\"dateTime\"");
    }
}

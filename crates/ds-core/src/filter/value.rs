use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single value a filter can be constrained to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterScalar {
    Integer(i64),
    Number(f64),
    Date(DateTime<Utc>),
    Text(String),
}

impl FilterScalar {
    /// Parse a raw cell into the narrowest matching scalar
    pub fn parse(raw: &str) -> Self {
        if let Ok(value) = raw.parse::<i64>() {
            FilterScalar::Integer(value)
        } else if let Ok(value) = raw.parse::<f64>() {
            FilterScalar::Number(value)
        } else if let Ok(value) = raw.parse::<DateTime<Utc>>() {
            FilterScalar::Date(value)
        } else {
            FilterScalar::Text(raw.to_string())
        }
    }
}

impl fmt::Display for FilterScalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterScalar::Integer(v) => write!(f, "{}", v),
            FilterScalar::Number(v) => write!(f, "{}", v),
            FilterScalar::Date(v) => write!(f, "{}", v.to_rfc3339()),
            FilterScalar::Text(v) => f.write_str(v),
        }
    }
}

impl From<&str> for FilterScalar {
    fn from(value: &str) -> Self {
        FilterScalar::Text(value.to_string())
    }
}

impl From<String> for FilterScalar {
    fn from(value: String) -> Self {
        FilterScalar::Text(value)
    }
}

impl From<i64> for FilterScalar {
    fn from(value: i64) -> Self {
        FilterScalar::Integer(value)
    }
}

impl From<f64> for FilterScalar {
    fn from(value: f64) -> Self {
        FilterScalar::Number(value)
    }
}

impl From<DateTime<Utc>> for FilterScalar {
    fn from(value: DateTime<Utc>) -> Self {
        FilterScalar::Date(value)
    }
}

/// A possible value for a filter, as returned by a value domain provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterValue {
    /// The value to use when selecting this entry
    pub value: FilterScalar,

    /// Label shown to the user
    pub label: String,
}

impl FilterValue {
    pub fn new(value: impl Into<FilterScalar>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// Operation of a rule-based filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RuleOperation {
    Equals,
    NotEquals,
    Contains,
    StartsWith,
    EndsWith,
    GreaterThan,
    LessThan,
}

/// A rule-based constraint on a field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterRule {
    pub operation: RuleOperation,
    pub operand: FilterScalar,
}

impl FilterRule {
    pub fn new(operation: RuleOperation, operand: impl Into<FilterScalar>) -> Self {
        Self {
            operation,
            operand: operand.into(),
        }
    }
}

/// Mode reported by a filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterType {
    AllValues,
    FilterEmptyValues,
    SelectedValues,
    FilterByRule,
}

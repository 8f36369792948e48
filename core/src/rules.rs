//! Declarative parameter rules for the amoCRM API.
//!
//! # Design
//! A `RuleTable` maps a logical parameter path (`task/add/element_type`,
//! `filter/tasks`, ...) to the JSON type the value must have and, optionally,
//! the closed set of values the server accepts. The table is a plain value:
//! built once, then only ever borrowed. Paths without a rule are unrestricted,
//! so the table lists what is checked rather than describing a full schema.

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde_json::{json, Value};

/// The type a rule requires of a parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Integer,
    String,
    Any,
}

impl ValueType {
    pub fn accepts(self, kind: JsonKind) -> bool {
        match self {
            ValueType::Any => true,
            ValueType::Integer => kind == JsonKind::Integer,
            ValueType::String => kind == JsonKind::String,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Integer => write!(f, "integer"),
            ValueType::String => write!(f, "string"),
            ValueType::Any => write!(f, "any"),
        }
    }
}

/// Runtime kind of a JSON value, as reported in type mismatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonKind {
    Null,
    Boolean,
    Integer,
    Float,
    String,
    Array,
    Object,
}

impl JsonKind {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => JsonKind::Null,
            Value::Bool(_) => JsonKind::Boolean,
            Value::Number(n) if n.is_i64() || n.is_u64() => JsonKind::Integer,
            Value::Number(_) => JsonKind::Float,
            Value::String(_) => JsonKind::String,
            Value::Array(_) => JsonKind::Array,
            Value::Object(_) => JsonKind::Object,
        }
    }
}

impl fmt::Display for JsonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JsonKind::Null => "null",
            JsonKind::Boolean => "boolean",
            JsonKind::Integer => "integer",
            JsonKind::Float => "float",
            JsonKind::String => "string",
            JsonKind::Array => "array",
            JsonKind::Object => "object",
        };
        f.write_str(name)
    }
}

/// Values a rule admits once the type check has passed.
///
/// In configuration files this is either the string `"any"` or an array of
/// literal values.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawAllowed")]
pub enum AllowedValues {
    Any,
    OneOf(Vec<Value>),
}

impl AllowedValues {
    /// Exact JSON equality: `1`, `1.0` and `"1"` are three different values.
    pub fn admits(&self, value: &Value) -> bool {
        match self {
            AllowedValues::Any => true,
            AllowedValues::OneOf(values) => values.iter().any(|v| v == value),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawAllowed {
    Keyword(String),
    List(Vec<Value>),
}

impl TryFrom<RawAllowed> for AllowedValues {
    type Error = String;

    fn try_from(raw: RawAllowed) -> Result<Self, Self::Error> {
        match raw {
            RawAllowed::Keyword(k) if k == "any" => Ok(AllowedValues::Any),
            RawAllowed::Keyword(k) => Err(format!("expected \"any\" or a list of values, got \"{k}\"")),
            RawAllowed::List(values) => Ok(AllowedValues::OneOf(values)),
        }
    }
}

/// A single entry of the rule table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ValidationRule {
    pub path: String,
    #[serde(rename = "type", default = "any_type")]
    pub expected_type: ValueType,
    #[serde(default = "any_value")]
    pub allowed: AllowedValues,
}

fn any_type() -> ValueType {
    ValueType::Any
}

fn any_value() -> AllowedValues {
    AllowedValues::Any
}

impl ValidationRule {
    pub fn new(path: &str, expected_type: ValueType, allowed: AllowedValues) -> Self {
        Self {
            path: path.to_string(),
            expected_type,
            allowed,
        }
    }
}

/// Immutable mapping from parameter path to rule.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleTable {
    rules: BTreeMap<String, ValidationRule>,
}

impl RuleTable {
    /// Builds a table from rules. A later rule replaces an earlier rule with
    /// the same path.
    pub fn new(rules: impl IntoIterator<Item = ValidationRule>) -> Self {
        Self {
            rules: rules.into_iter().map(|r| (r.path.clone(), r)).collect(),
        }
    }

    /// The rules amoCRM's leads and tasks endpoints are checked against.
    pub fn amocrm() -> Self {
        use AllowedValues::{Any, OneOf};

        Self::new([
            ValidationRule::new("filter/tasks", ValueType::Any, OneOf(vec![json!(1), json!(2)])),
            ValidationRule::new("task/add/element_id", ValueType::Integer, Any),
            ValidationRule::new(
                "task/add/element_type",
                ValueType::Integer,
                OneOf(vec![json!(1), json!(2), json!(3), json!(12)]),
            ),
            ValidationRule::new(
                "task/add/task_type",
                ValueType::Integer,
                OneOf(vec![json!(1), json!(2), json!(3)]),
            ),
            ValidationRule::new("task/add/text", ValueType::String, Any),
            ValidationRule::new("task/add/responsible_user_id", ValueType::Integer, Any),
            ValidationRule::new("leads/id", ValueType::Integer, Any),
            ValidationRule::new("leads/name", ValueType::String, Any),
            ValidationRule::new("tasks/text", ValueType::String, Any),
        ])
    }

    /// Returns a new table with `rules` layered over this one.
    pub fn extended(&self, rules: impl IntoIterator<Item = ValidationRule>) -> Self {
        let mut merged = self.rules.clone();
        for rule in rules {
            merged.insert(rule.path.clone(), rule);
        }
        Self { rules: merged }
    }

    pub fn get(&self, path: &str) -> Option<&ValidationRule> {
        self.rules.get(path)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::amocrm()
    }
}

//! Attribute filters over record payloads.
//!
//! A filter is written as a JSON object mapping payload keys to either a
//! literal (equality) or `{"in": [...]}` (set membership). All entries must
//! hold. Keys may be dotted paths into nested payload objects, e.g.
//! `metadata.chapter`. Disjunction and negation are not supported and are
//! rejected instead of being ignored.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::types::Payload;

const IN_OPERATORS: [&str; 2] = ["in", "$in"];

/// A literal a payload field can be matched against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchValue {
    Keyword(String),
    Integer(i64),
    Bool(bool),
}

impl MatchValue {
    fn from_json(key: &str, value: &Value) -> Result<Self> {
        match value {
            Value::String(s) => Ok(Self::Keyword(s.clone())),
            Value::Bool(b) => Ok(Self::Bool(*b)),
            Value::Number(n) => n.as_i64().map(Self::Integer).ok_or_else(|| {
                Error::Configuration(format!("filter '{key}': only integer numbers can be matched, got {n}"))
            }),
            other => Err(Error::Configuration(format!("filter '{key}': unsupported literal {other}"))),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Keyword(s) => Value::String(s.clone()),
            Self::Integer(i) => Value::from(*i),
            Self::Bool(b) => Value::Bool(*b),
        }
    }

    /// Array-valued fields match when any element matches.
    pub fn matches(&self, field: &Value) -> bool {
        match (self, field) {
            (_, Value::Array(items)) => items.iter().any(|item| self.matches(item)),
            (Self::Keyword(want), Value::String(got)) => want == got,
            (Self::Integer(want), Value::Number(got)) => got.as_i64() == Some(*want),
            (Self::Bool(want), Value::Bool(got)) => want == got,
            _ => false,
        }
    }
}

impl From<&str> for MatchValue {
    fn from(s: &str) -> Self { Self::Keyword(s.to_string()) }
}

impl From<String> for MatchValue {
    fn from(s: String) -> Self { Self::Keyword(s) }
}

impl From<i64> for MatchValue {
    fn from(i: i64) -> Self { Self::Integer(i) }
}

impl From<bool> for MatchValue {
    fn from(b: bool) -> Self { Self::Bool(b) }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Equals(MatchValue),
    AnyOf(Vec<MatchValue>),
}

impl Condition {
    pub fn matches(&self, field: &Value) -> bool {
        match self {
            Self::Equals(v) => v.matches(field),
            Self::AnyOf(values) => values.iter().any(|v| v.matches(field)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterClause {
    pub key: String,
    pub condition: Condition,
}

/// Conjunction of clauses. An empty spec matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "Value")]
pub struct FilterSpec {
    clauses: Vec<FilterClause>,
}

impl FilterSpec {
    pub fn new() -> Self { Self::default() }

    #[must_use]
    pub fn eq(mut self, key: impl Into<String>, value: impl Into<MatchValue>) -> Self {
        self.clauses.push(FilterClause { key: key.into(), condition: Condition::Equals(value.into()) });
        self
    }

    #[must_use]
    pub fn any_of<V: Into<MatchValue>>(mut self, key: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        self.clauses.push(FilterClause { key: key.into(), condition: Condition::AnyOf(values) });
        self
    }

    pub fn clauses(&self) -> &[FilterClause] { &self.clauses }

    pub fn is_empty(&self) -> bool { self.clauses.is_empty() }

    /// Parses the JSON form, rejecting anything other than equality and `in`.
    pub fn from_json(value: &Value) -> Result<Self> {
        let Value::Object(entries) = value else {
            return Err(Error::Configuration(format!("filter must be a JSON object, got {value}")));
        };
        let mut spec = Self::new();
        for (key, raw) in entries {
            if key.is_empty() || key.starts_with('$') {
                return Err(Error::Configuration(format!("unsupported filter operator '{key}'")));
            }
            let condition = match raw {
                Value::Object(ops) => {
                    let (op, operand) = match ops.iter().next() {
                        Some(entry) if ops.len() == 1 => entry,
                        _ => {
                            return Err(Error::Configuration(format!(
                                "filter '{key}': expected exactly one operator, got {}",
                                ops.len()
                            )))
                        }
                    };
                    if !IN_OPERATORS.contains(&op.as_str()) {
                        return Err(Error::Configuration(format!("filter '{key}': unsupported operator '{op}'")));
                    }
                    let Value::Array(items) = operand else {
                        return Err(Error::Configuration(format!("filter '{key}': '{op}' expects an array")));
                    };
                    let values = items.iter().map(|v| MatchValue::from_json(key, v)).collect::<Result<Vec<_>>>()?;
                    Condition::AnyOf(values)
                }
                literal => Condition::Equals(MatchValue::from_json(key, literal)?),
            };
            spec.clauses.push(FilterClause { key: key.clone(), condition });
        }
        Ok(spec)
    }
}

impl TryFrom<Value> for FilterSpec {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> { Self::from_json(&value) }
}

/// Resolves a dotted path through nested payload objects.
pub fn lookup<'a>(payload: &'a Payload, key: &str) -> Option<&'a Value> {
    let mut parts = key.split('.');
    let mut current = payload.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

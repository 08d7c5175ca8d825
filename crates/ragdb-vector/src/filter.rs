//! Filter translation for both engines.
//!
//! Parsing already rejected disjunction and negation, so translation here is
//! total: every clause becomes one `must` condition.

use serde_json::{json, Value};

use ragdb_core::filter::{lookup, Condition, FilterSpec};
use ragdb_core::types::Payload;

/// Qdrant's native form: `{"must": [{"key": K, "match": {"value" | "any": ...}}]}`.
pub fn translate(spec: &FilterSpec) -> Value {
    let must: Vec<Value> = spec
        .clauses()
        .iter()
        .map(|clause| {
            let matcher = match &clause.condition {
                Condition::Equals(v) => json!({ "value": v.to_json() }),
                Condition::AnyOf(values) => {
                    json!({ "any": values.iter().map(|v| v.to_json()).collect::<Vec<_>>() })
                }
            };
            json!({ "key": clause.key, "match": matcher })
        })
        .collect();
    json!({ "must": must })
}

/// In-memory predicate. A missing field fails every clause.
pub fn matches(spec: &FilterSpec, payload: &Payload) -> bool {
    spec.clauses()
        .iter()
        .all(|clause| lookup(payload, &clause.key).is_some_and(|field| clause.condition.matches(field)))
}

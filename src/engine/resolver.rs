//! Substitutes step references in a planned input with stored outputs.

use serde_json::{Map, Value};

use super::reference::{scan, whole};
use super::types::ExecutionState;
use crate::error::{EngineError, Result};

/// Resolve every reference in `raw` against `state`.
///
/// Pure and recursive over objects and arrays. A string that is exactly one
/// reference becomes the stored value with its type intact; references inside
/// longer text are replaced by [`render`]ed values. Any reference to a step
/// missing from state fails with [`EngineError::DependencyNotFound`].
pub fn resolve(raw: &Value, state: &ExecutionState) -> Result<Value> {
    match raw {
        Value::String(text) => resolve_str(text, state),
        Value::Object(map) => resolve_map(map, state).map(Value::Object),
        Value::Array(items) => items
            .iter()
            .map(|item| resolve(item, state))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        other => Ok(other.clone()),
    }
}

pub fn resolve_map(map: &Map<String, Value>, state: &ExecutionState) -> Result<Map<String, Value>> {
    map.iter()
        .map(|(key, value)| Ok((key.clone(), resolve(value, state)?)))
        .collect()
}

/// String form of a stored value: strings verbatim, anything else as compact JSON.
pub fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn lookup(step: u32, state: &ExecutionState) -> Result<&Value> {
    state
        .get(step)
        .ok_or(EngineError::DependencyNotFound { step })
}

fn resolve_str(text: &str, state: &ExecutionState) -> Result<Value> {
    if let Some(step) = whole(text) {
        tracing::debug!(step, "Resolved whole-string reference");
        return lookup(step, state).cloned();
    }

    let refs = scan(text);
    if refs.is_empty() {
        return Ok(Value::String(text.to_string()));
    }

    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for reference in refs {
        out.push_str(&text[cursor..reference.span.start]);
        out.push_str(&render(lookup(reference.step, state)?));
        cursor = reference.span.end;
    }
    out.push_str(&text[cursor..]);
    Ok(Value::String(out))
}

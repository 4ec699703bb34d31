//! Map the model's raw `parameters` onto a tool's declared schema.
//!
//! Pairing is positional: the i-th value the model emitted is bound to the
//! i-th parameter the schema declares, whatever key the model used for it.
//! Named values must still carry the name of the parameter they land on, so
//! reordered keys are rejected instead of being bound to the wrong
//! parameter. A differing count is an error too.

use serde_json::{Map, Number, Value};
use thiserror::Error;

use super::{ParamSpec, ParamType, ToolSpec};

/// A value could not be bound to the declared schema.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoercionError {
    #[error("tool '{tool}' declares {expected} parameter(s) but {received} were given")]
    ArityMismatch {
        tool: String,
        expected: usize,
        received: usize,
    },

    #[error("value given as '{given}' would bind by position to parameter '{param}'")]
    NameMismatch { param: String, given: String },

    #[error("parameter '{param}' expects {expected} but got {value}")]
    InvalidValue {
        param: String,
        expected: ParamType,
        value: String,
    },
}

/// Tool parameters exactly as the model emitted them, in emission order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawArguments {
    entries: Vec<(Option<String>, Value)>,
}

impl RawArguments {
    /// Accepts an object (named values), an array (positional values), a lone
    /// scalar (one positional value), or `null`/`""`/absent (no input).
    pub fn from_value(value: Option<&Value>) -> Self {
        let entries = match value {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::String(s)) if s.trim().is_empty() => Vec::new(),
            Some(Value::Object(map)) => map
                .iter()
                .map(|(k, v)| (Some(k.clone()), v.clone()))
                .collect(),
            Some(Value::Array(items)) => items.iter().map(|v| (None, v.clone())).collect(),
            Some(other) => vec![(None, other.clone())],
        };
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// JSON rendering for logs and diagnostics.
    pub fn to_value(&self) -> Value {
        if self.entries.iter().all(|(name, _)| name.is_some()) {
            Value::Object(
                self.entries
                    .iter()
                    .filter_map(|(name, v)| name.clone().map(|n| (n, v.clone())))
                    .collect(),
            )
        } else {
            Value::Array(self.entries.iter().map(|(_, v)| v.clone()).collect())
        }
    }
}

/// Bind raw values to the tool's parameters in declared order, coercing each
/// one to its declared primitive type.
pub fn coerce_arguments(
    spec: &ToolSpec,
    raw: &RawArguments,
) -> Result<Map<String, Value>, CoercionError> {
    if raw.len() != spec.parameters.len() {
        return Err(CoercionError::ArityMismatch {
            tool: spec.name.clone(),
            expected: spec.parameters.len(),
            received: raw.len(),
        });
    }

    let mut arguments = Map::new();
    for (param, (given_name, value)) in spec.parameters.iter().zip(&raw.entries) {
        if let Some(given) = given_name.as_deref().filter(|g| *g != param.name) {
            tracing::warn!(
                "Tool '{}': value given as '{}' sits where '{}' is declared",
                spec.name,
                given,
                param.name
            );
            return Err(CoercionError::NameMismatch {
                param: param.name.clone(),
                given: given.to_string(),
            });
        }
        arguments.insert(param.name.clone(), coerce_value(param, value)?);
    }

    Ok(arguments)
}

fn coerce_value(param: &ParamSpec, value: &Value) -> Result<Value, CoercionError> {
    let coerced = match param.declared_type {
        ParamType::Integer => to_integer(value),
        ParamType::Number => to_number(value),
        ParamType::Array => to_array(value),
        // Strings, booleans and undeclared types are passed through untouched.
        ParamType::String | ParamType::Boolean | ParamType::Unknown => Some(value.clone()),
    };

    coerced.ok_or_else(|| CoercionError::InvalidValue {
        param: param.name.clone(),
        expected: param.declared_type,
        value: value.to_string(),
    })
}

fn to_integer(value: &Value) -> Option<Value> {
    match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => Some(value.clone()),
        Value::Number(n) => n.as_f64().and_then(truncate),
        Value::String(s) => s.trim().parse::<i64>().ok().map(Value::from),
        Value::Bool(b) => Some(Value::from(i64::from(*b))),
        _ => None,
    }
}

/// Truncate toward zero, refusing values outside the i64 range.
fn truncate(f: f64) -> Option<Value> {
    let t = f.trunc();
    (t.is_finite() && t >= i64::MIN as f64 && t < i64::MAX as f64).then(|| Value::from(t as i64))
}

fn to_number(value: &Value) -> Option<Value> {
    let f = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        Value::Bool(b) => f64::from(u8::from(*b)),
        _ => return None,
    };
    Number::from_f64(f).map(Value::Number)
}

fn to_array(value: &Value) -> Option<Value> {
    match value {
        Value::Array(_) => Some(value.clone()),
        // Models often quote list literals.
        Value::String(s) => match serde_json::from_str::<Value>(s.trim()) {
            Ok(parsed @ Value::Array(_)) => Some(parsed),
            _ => None,
        },
        _ => None,
    }
}

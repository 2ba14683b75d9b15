//! Tool argument resolution.
//!
//! Builds a tool's argument object from the activation payload according to the
//! tool's declared parameters.
//!
//! # Rules
//! - Each parameter is looked up by name in the payload, then in the payload's
//!   nested trigger `payload` object, then in the run context.
//! - Scalar or array payload: bound to the parameter when the tool declares
//!   exactly one.
//! - Missing values fall back to the parameter default, then fail if required.
//! - String values are parsed into the declared type (`"42"` -> `42`,
//!   `"19.5"` -> `19.5`).

use switchboard_config::{ParameterType, ToolParameter};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgumentError {
  #[error("missing required parameter '{name}'")]
  MissingRequired { name: String },

  #[error("parameter '{name}' expected {expected}, got '{got}'")]
  TypeMismatch {
    name: String,
    expected: &'static str,
    got: String,
  },
}

/// Resolve tool arguments from a payload and the run context.
pub fn resolve_arguments(
  parameters: &[ToolParameter],
  payload: &serde_json::Value,
  context: Option<&serde_json::Value>,
) -> Result<serde_json::Value, ArgumentError> {
  let mut arguments = serde_json::Map::new();

  for param in parameters {
    let supplied = match payload {
      serde_json::Value::Object(fields) => fields
        .get(&param.name)
        .or_else(|| fields.get("payload").and_then(|nested| nested.get(&param.name)))
        .cloned(),
      serde_json::Value::Null => None,
      other if parameters.len() == 1 => Some(other.clone()),
      _ => None,
    }
    .or_else(|| context.and_then(|ctx| ctx.get(&param.name)).cloned());

    let value = match supplied.or_else(|| param.default.clone()) {
      Some(value) => coerce_value(param, value)?,
      None if param.required => {
        return Err(ArgumentError::MissingRequired {
          name: param.name.clone(),
        });
      }
      None => continue,
    };

    arguments.insert(param.name.clone(), value);
  }

  Ok(serde_json::Value::Object(arguments))
}

fn type_name(param_type: ParameterType) -> &'static str {
  match param_type {
    ParameterType::String => "string",
    ParameterType::Number => "number",
    ParameterType::Boolean => "boolean",
    ParameterType::Object => "object",
    ParameterType::Array => "array",
  }
}

fn parse_number(s: &str) -> Option<serde_json::Number> {
  if let Ok(int) = s.parse::<i64>() {
    return Some(int.into());
  }
  s.parse::<f64>().ok().and_then(serde_json::Number::from_f64)
}

/// Coerce a supplied value to the parameter's declared type.
fn coerce_value(
  param: &ToolParameter,
  value: serde_json::Value,
) -> Result<serde_json::Value, ArgumentError> {
  use serde_json::Value;

  let mismatch = |got: &Value| ArgumentError::TypeMismatch {
    name: param.name.clone(),
    expected: type_name(param.param_type),
    got: match got {
      Value::String(s) => s.clone(),
      other => other.to_string(),
    },
  };

  match (param.param_type, value) {
    (ParameterType::String, Value::String(s)) => Ok(Value::String(s)),
    (ParameterType::String, other) => Ok(Value::String(other.to_string())),

    (ParameterType::Number, Value::Number(n)) => Ok(Value::Number(n)),
    (ParameterType::Number, Value::String(s)) => parse_number(s.trim())
      .map(Value::Number)
      .ok_or_else(|| mismatch(&Value::String(s))),

    (ParameterType::Boolean, Value::Bool(b)) => Ok(Value::Bool(b)),
    (ParameterType::Boolean, Value::String(s)) => match s.to_lowercase().as_str() {
      "true" => Ok(Value::Bool(true)),
      "false" => Ok(Value::Bool(false)),
      _ => Err(mismatch(&Value::String(s))),
    },

    (ParameterType::Object, Value::Object(m)) => Ok(Value::Object(m)),
    (ParameterType::Array, Value::Array(a)) => Ok(Value::Array(a)),
    (ParameterType::Object | ParameterType::Array, Value::String(s)) => {
      match serde_json::from_str::<Value>(&s) {
        Ok(parsed @ Value::Object(_)) if param.param_type == ParameterType::Object => Ok(parsed),
        Ok(parsed @ Value::Array(_)) if param.param_type == ParameterType::Array => Ok(parsed),
        _ => Err(mismatch(&Value::String(s))),
      }
    }

    (_, other) => Err(mismatch(&other)),
  }
}

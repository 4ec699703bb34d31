//! Tool registry: declared tool schemas and the transport that executes them.
//!
//! Tools live on an external server. At startup the agent asks the
//! [`ToolTransport`] for its definitions, turns each one into a [`ToolSpec`]
//! and keeps them in a [`ToolRegistry`] keyed by name. Definitions whose
//! schema cannot be understood stay in the registry as malformed entries so
//! the catalog can still mention them, but they are never dispatchable.

mod catalog;
mod coerce;
mod dispatcher;
pub mod mcp;

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub use catalog::{describe_tools, render_catalog};
pub use coerce::{coerce_arguments, CoercionError, RawArguments};
pub use dispatcher::{dispatch, normalize_output, DispatchError};

/// Primitive type declared for a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    Integer,
    Number,
    String,
    Array,
    Boolean,
    /// Anything the schema does not spell out as one of the above.
    Unknown,
}

impl ParamType {
    /// Read the declared type from one JSON-schema property.
    ///
    /// Nullable unions such as `["integer", "null"]` resolve to their
    /// non-null member.
    pub fn from_schema(property: &Value) -> Self {
        match property.get("type") {
            Some(Value::String(t)) => Self::parse(t),
            Some(Value::Array(types)) => types
                .iter()
                .filter_map(Value::as_str)
                .find(|t| *t != "null")
                .map(Self::parse)
                .unwrap_or(Self::Unknown),
            _ => Self::Unknown,
        }
    }

    fn parse(name: &str) -> Self {
        match name {
            "integer" => Self::Integer,
            "number" => Self::Number,
            "string" => Self::String,
            "array" => Self::Array,
            "boolean" => Self::Boolean,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Number => "number",
            Self::String => "string",
            Self::Array => "array",
            Self::Boolean => "boolean",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One declared parameter of a tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParamSpec {
    pub name: String,
    pub declared_type: ParamType,
    pub required: bool,
}

/// A tool definition exactly as the transport reports it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// JSON schema of the tool input (`{"type": "object", "properties": ...}`).
    #[serde(default)]
    pub input_schema: Value,
}

/// Why a tool definition could not be turned into a [`ToolSpec`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("tool has no name")]
    MissingName,

    #[error("input schema is not an object")]
    NotAnObject,

    #[error("'properties' is not an object")]
    InvalidProperties,

    #[error("parameter '{0}' is not described by an object")]
    InvalidParameter(String),

    #[error("duplicate tool name '{0}'")]
    DuplicateName(String),
}

/// Validated, immutable description of one invokable tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// Parameters in the order the schema declares them.
    pub parameters: Vec<ParamSpec>,
}

impl ToolSpec {
    /// Validate a raw definition.
    pub fn from_definition(definition: &ToolDefinition) -> Result<Self, SchemaError> {
        if definition.name.trim().is_empty() {
            return Err(SchemaError::MissingName);
        }

        let schema = definition
            .input_schema
            .as_object()
            .ok_or(SchemaError::NotAnObject)?;

        let required: Vec<&str> = schema
            .get("required")
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        let parameters = match schema.get("properties") {
            None => Vec::new(),
            Some(Value::Object(properties)) => properties
                .iter()
                .map(|(name, property)| {
                    if !property.is_object() {
                        return Err(SchemaError::InvalidParameter(name.clone()));
                    }
                    Ok(ParamSpec {
                        name: name.clone(),
                        declared_type: ParamType::from_schema(property),
                        required: required.contains(&name.as_str()),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => return Err(SchemaError::InvalidProperties),
        };

        Ok(Self {
            name: definition.name.clone(),
            description: definition
                .description
                .clone()
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| "No description available".to_string()),
            parameters,
        })
    }
}

/// A registry slot: either a usable tool or a definition that failed validation.
#[derive(Debug, Clone)]
pub enum RegistryEntry {
    Valid(ToolSpec),
    Malformed { name: String, error: SchemaError },
}

/// All tools reported by the transport, in listing order, with O(1) lookup
/// of the dispatchable ones by name.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    entries: Vec<RegistryEntry>,
    by_name: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Build the registry once from the transport's listing.
    pub fn from_definitions(definitions: &[ToolDefinition]) -> Self {
        let mut entries = Vec::with_capacity(definitions.len());
        let mut by_name = HashMap::new();

        for (index, definition) in definitions.iter().enumerate() {
            let entry = match ToolSpec::from_definition(definition) {
                Ok(spec) if by_name.contains_key(&spec.name) => RegistryEntry::Malformed {
                    name: spec.name.clone(),
                    error: SchemaError::DuplicateName(spec.name),
                },
                Ok(spec) => {
                    by_name.insert(spec.name.clone(), index);
                    RegistryEntry::Valid(spec)
                }
                Err(error) => RegistryEntry::Malformed {
                    name: definition.name.clone(),
                    error,
                },
            };

            if let RegistryEntry::Malformed { name, error } = &entry {
                tracing::warn!("Tool {} ('{}') is not usable: {}", index + 1, name, error);
            }
            entries.push(entry);
        }

        Self { entries, by_name }
    }

    /// Look up a dispatchable tool by exact name.
    pub fn get(&self, name: &str) -> Option<&ToolSpec> {
        match self.by_name.get(name).map(|&i| &self.entries[i]) {
            Some(RegistryEntry::Valid(spec)) => Some(spec),
            _ => None,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Every entry in listing order, malformed ones included.
    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    /// The dispatchable tools in listing order.
    pub fn list_tools(&self) -> Vec<&ToolSpec> {
        self.entries
            .iter()
            .filter_map(|entry| match entry {
                RegistryEntry::Valid(spec) => Some(spec),
                RegistryEntry::Malformed { .. } => None,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Raw result of a tool invocation, before normalization into text fragments.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    /// The tool produced a sequence of values (one fragment each).
    List(Vec<Value>),
    /// The tool produced a single value.
    Single(Value),
}

/// The external tool server.
#[async_trait]
pub trait ToolTransport: Send + Sync {
    /// List every tool the server exposes.
    async fn list_tools(&self) -> anyhow::Result<Vec<ToolDefinition>>;

    /// Invoke a tool by name with already-coerced arguments.
    async fn call_tool(&self, name: &str, arguments: Map<String, Value>)
        -> anyhow::Result<ToolOutput>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn definition(name: &str, schema: Value) -> ToolDefinition {
        ToolDefinition {
            name: name.to_string(),
            description: Some(format!("{name} tool")),
            input_schema: schema,
        }
    }

    #[test]
    fn parses_parameters_in_declared_order() {
        let spec = ToolSpec::from_definition(&definition(
            "add",
            json!({
                "type": "object",
                "properties": {
                    "b": {"type": "integer"},
                    "a": {"type": "number"},
                    "tags": {"type": "array"},
                    "extra": {"title": "Extra"}
                },
                "required": ["b"]
            }),
        ))
        .unwrap();

        let names: Vec<_> = spec.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a", "tags", "extra"]);
        assert_eq!(spec.parameters[0].declared_type, ParamType::Integer);
        assert!(spec.parameters[0].required);
        assert_eq!(spec.parameters[1].declared_type, ParamType::Number);
        assert!(!spec.parameters[1].required);
        assert_eq!(spec.parameters[2].declared_type, ParamType::Array);
        assert_eq!(spec.parameters[3].declared_type, ParamType::Unknown);
    }

    #[test]
    fn nullable_type_resolves_to_non_null_member() {
        assert_eq!(
            ParamType::from_schema(&json!({"type": ["null", "integer"]})),
            ParamType::Integer
        );
        assert_eq!(
            ParamType::from_schema(&json!({"anyOf": [{"type": "string"}]})),
            ParamType::Unknown
        );
    }

    #[test]
    fn schema_without_properties_has_no_parameters() {
        let spec =
            ToolSpec::from_definition(&definition("open_paint", json!({"type": "object"})))
                .unwrap();
        assert!(spec.parameters.is_empty());
    }

    #[test]
    fn missing_description_gets_placeholder() {
        let mut def = definition("noop", json!({}));
        def.description = None;
        let spec = ToolSpec::from_definition(&def).unwrap();
        assert_eq!(spec.description, "No description available");
    }

    #[test]
    fn malformed_schemas_are_rejected() {
        assert_eq!(
            ToolSpec::from_definition(&definition("x", Value::Null)),
            Err(SchemaError::NotAnObject)
        );
        assert_eq!(
            ToolSpec::from_definition(&definition("x", json!({"properties": [1, 2]}))),
            Err(SchemaError::InvalidProperties)
        );
        assert_eq!(
            ToolSpec::from_definition(&definition("x", json!({"properties": {"a": 3}}))),
            Err(SchemaError::InvalidParameter("a".to_string()))
        );
        assert_eq!(
            ToolSpec::from_definition(&definition("  ", json!({}))),
            Err(SchemaError::MissingName)
        );
    }

    #[test]
    fn registry_keeps_malformed_entries_but_not_for_lookup() {
        let registry = ToolRegistry::from_definitions(&[
            definition("good", json!({"properties": {"a": {"type": "integer"}}})),
            definition("bad", Value::Null),
            definition("good", json!({})),
        ]);

        assert_eq!(registry.len(), 3);
        assert!(registry.contains("good"));
        assert!(!registry.contains("bad"));
        assert_eq!(registry.list_tools().len(), 1);
        // The first definition of a duplicated name wins.
        assert_eq!(registry.get("good").unwrap().parameters.len(), 1);
        assert!(matches!(
            &registry.entries()[2],
            RegistryEntry::Malformed { error: SchemaError::DuplicateName(_), .. }
        ));
    }
}

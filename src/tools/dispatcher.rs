//! Submit a tool call through the transport and flatten its result to text.

use serde_json::{Map, Value};
use thiserror::Error;

use super::{ToolOutput, ToolRegistry, ToolTransport};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("tool '{tool}' failed: {message}")]
    Transport { tool: String, message: String },
}

/// Look the tool up by exact name, call it, and normalize the result into a
/// flat sequence of text fragments.
pub async fn dispatch(
    registry: &ToolRegistry,
    transport: &dyn ToolTransport,
    tool_name: &str,
    arguments: Map<String, Value>,
) -> Result<Vec<String>, DispatchError> {
    if !registry.contains(tool_name) {
        return Err(DispatchError::UnknownTool(tool_name.to_string()));
    }

    tracing::info!(
        "Executing tool call: {} with arguments: {}",
        tool_name,
        serde_json::Value::Object(arguments.clone())
    );

    let output = transport
        .call_tool(tool_name, arguments)
        .await
        .map_err(|e| DispatchError::Transport {
            tool: tool_name.to_string(),
            message: format!("{:#}", e),
        })?;

    let fragments = normalize_output(output);
    tracing::info!("Tool '{}' returned: {:?}", tool_name, fragments);
    Ok(fragments)
}

/// One fragment per element for list-shaped results, a single fragment
/// otherwise.
pub fn normalize_output(output: ToolOutput) -> Vec<String> {
    match output {
        ToolOutput::List(items) | ToolOutput::Single(Value::Array(items)) => {
            items.iter().map(fragment).collect()
        }
        ToolOutput::Single(value) => vec![fragment(&value)],
    }
}

/// Plain strings stay as they are, text content blocks yield their text,
/// anything else is rendered as JSON.
fn fragment(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Object(map) => match map.get("text") {
            Some(Value::String(text)) => text.clone(),
            _ => value.to_string(),
        },
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolDefinition;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    struct RecordingTransport {
        calls: Mutex<Vec<(String, Map<String, Value>)>>,
        reply: anyhow::Result<ToolOutput>,
    }

    #[async_trait]
    impl ToolTransport for RecordingTransport {
        async fn list_tools(&self) -> anyhow::Result<Vec<ToolDefinition>> {
            Ok(Vec::new())
        }

        async fn call_tool(
            &self,
            name: &str,
            arguments: Map<String, Value>,
        ) -> anyhow::Result<ToolOutput> {
            self.calls
                .lock()
                .unwrap()
                .push((name.to_string(), arguments));
            match &self.reply {
                Ok(output) => Ok(output.clone()),
                Err(e) => Err(anyhow::anyhow!("{}", e)),
            }
        }
    }

    fn registry() -> ToolRegistry {
        ToolRegistry::from_definitions(&[ToolDefinition {
            name: "get_ascii_values".to_string(),
            description: None,
            input_schema: json!({"properties": {"string": {"type": "string"}}}),
        }])
    }

    #[test]
    fn list_results_become_one_fragment_per_element() {
        let output = ToolOutput::List(vec![
            json!(73),
            json!("78"),
            json!({"type": "text", "text": "68"}),
        ]);
        assert_eq!(normalize_output(output), vec!["73", "78", "68"]);
    }

    #[test]
    fn single_results_become_one_fragment() {
        assert_eq!(normalize_output(ToolOutput::Single(json!("ok"))), vec!["ok"]);
        assert_eq!(
            normalize_output(ToolOutput::Single(json!({"sum": 1.5}))),
            vec![r#"{"sum":1.5}"#]
        );
        assert_eq!(
            normalize_output(ToolOutput::Single(json!([1, 2]))),
            vec!["1", "2"]
        );
    }

    #[tokio::test]
    async fn dispatches_registered_tool() {
        let transport = RecordingTransport {
            calls: Mutex::new(Vec::new()),
            reply: Ok(ToolOutput::List(vec![json!(73), json!(78)])),
        };
        let mut args = Map::new();
        args.insert("string".to_string(), json!("IN"));

        let fragments = dispatch(&registry(), &transport, "get_ascii_values", args)
            .await
            .unwrap();

        assert_eq!(fragments, vec!["73", "78"]);
        let calls = transport.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "get_ascii_values");
        assert_eq!(calls[0].1["string"], json!("IN"));
    }

    #[tokio::test]
    async fn unknown_tool_never_reaches_transport() {
        let transport = RecordingTransport {
            calls: Mutex::new(Vec::new()),
            reply: Ok(ToolOutput::Single(json!("unused"))),
        };

        let err = dispatch(&registry(), &transport, "rm_rf", Map::new())
            .await
            .unwrap_err();

        assert_eq!(err, DispatchError::UnknownTool("rm_rf".to_string()));
        assert_eq!(err.to_string(), "Unknown tool: rm_rf");
        assert!(transport.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn transport_failure_is_a_dispatch_error() {
        let transport = RecordingTransport {
            calls: Mutex::new(Vec::new()),
            reply: Err(anyhow::anyhow!("connection closed")),
        };

        let err = dispatch(&registry(), &transport, "get_ascii_values", Map::new())
            .await
            .unwrap_err();

        assert_eq!(
            err,
            DispatchError::Transport {
                tool: "get_ascii_values".to_string(),
                message: "connection closed".to_string(),
            }
        );
    }
}

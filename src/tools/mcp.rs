//! MCP stdio transport: runs the tool server as a child process.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use rmcp::model::{CallToolRequestParams, CallToolResult, RawContent};
use rmcp::service::RunningService;
use rmcp::transport::TokioChildProcess;
use rmcp::{RoleClient, ServiceExt};
use serde_json::{Map, Value};
use tokio::process::Command;

use super::{ToolDefinition, ToolOutput, ToolTransport};

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);

/// A connected MCP server speaking over the child's stdin/stdout.
pub struct McpTransport {
    client: RunningService<RoleClient, ()>,
    command: String,
}

impl McpTransport {
    /// Spawn `command args...` and complete the MCP handshake.
    pub async fn spawn(command: &str, args: &[String]) -> anyhow::Result<Self> {
        tracing::info!("Starting MCP server: {} {}", command, args.join(" "));

        let mut cmd = Command::new(command);
        cmd.args(args);
        // stdin/stdout carry the protocol, stderr goes to our terminal
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::inherit());

        let transport = TokioChildProcess::new(cmd)?;
        let client = tokio::time::timeout(HANDSHAKE_TIMEOUT, ().serve(transport))
            .await
            .map_err(|_| {
                anyhow::anyhow!(
                    "MCP handshake timed out for '{}' ({}s)",
                    command,
                    HANDSHAKE_TIMEOUT.as_secs()
                )
            })?
            .map_err(|e| anyhow::anyhow!("MCP handshake failed for '{}': {}", command, e))?;

        tracing::info!("MCP session established with '{}'", command);
        Ok(Self {
            client,
            command: command.to_string(),
        })
    }

    /// Close the session and stop the server process.
    pub async fn shutdown(self) {
        if let Err(e) = self.client.cancel().await {
            tracing::warn!("Error shutting down MCP server '{}': {}", self.command, e);
        }
    }
}

#[async_trait]
impl ToolTransport for McpTransport {
    async fn list_tools(&self) -> anyhow::Result<Vec<ToolDefinition>> {
        let tools = self
            .client
            .peer()
            .list_all_tools()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to list tools: {}", e))?;

        Ok(tools
            .into_iter()
            .map(|tool| ToolDefinition {
                name: tool.name.to_string(),
                description: tool.description.as_deref().map(str::to_string),
                input_schema: Value::Object((*tool.input_schema).clone()),
            })
            .collect())
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> anyhow::Result<ToolOutput> {
        let request = CallToolRequestParams::new(name.to_string()).with_arguments(arguments);

        let result = self
            .client
            .peer()
            .call_tool(request)
            .await
            .map_err(|e| anyhow::anyhow!("MCP tool '{}' call failed: {}", name, e))?;

        Ok(tool_output(name, &result))
    }
}

/// Flatten a call result into one value per content block.
///
/// Results flagged `is_error` are still returned: the model sees the error
/// text in its next prompt and can react.
fn tool_output(name: &str, result: &CallToolResult) -> ToolOutput {
    let items: Vec<Value> = result
        .content
        .iter()
        .map(|content| match &content.raw {
            RawContent::Text(text) => Value::String(text.text.clone()),
            RawContent::Image(img) => Value::String(format!(
                "[Image: {} ({} bytes)]",
                img.mime_type,
                img.data.len()
            )),
            RawContent::Audio(audio) => Value::String(format!(
                "[Audio: {} ({} bytes)]",
                audio.mime_type,
                audio.data.len()
            )),
            _ => Value::String("[Unsupported MCP content type]".to_string()),
        })
        .collect();

    if result.is_error.unwrap_or(false) {
        tracing::warn!("Tool '{}' reported an error: {:?}", name, items);
    }

    ToolOutput::List(items)
}

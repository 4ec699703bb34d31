//! Per-run state: iteration transcript and execution log.

use serde::Serialize;
use serde_json::{Map, Value};

/// One completed tool invocation. Never modified once recorded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IterationRecord {
    /// 1-based iteration that produced this record.
    pub index: usize,
    pub tool_name: Option<String>,
    pub coerced_arguments: Option<Map<String, Value>>,
    pub result_text: Vec<String>,
}

impl IterationRecord {
    /// Natural-language account of this iteration for the next prompt.
    pub fn summary(&self) -> String {
        let tool = self.tool_name.as_deref().unwrap_or("no tool");
        let args = self
            .coerced_arguments
            .clone()
            .map(Value::Object)
            .unwrap_or_else(|| Value::Object(Map::new()));

        format!(
            "In the {} iteration you called {} with {} parameters, and the function returned {}.",
            self.index,
            tool,
            args,
            render_result(&self.result_text)
        )
    }
}

fn render_result(fragments: &[String]) -> String {
    match fragments {
        [single] => single.clone(),
        many => format!("[{}]", many.join(", ")),
    }
}

/// Mutable state of one agent run. Owned by the controller, dropped with it.
#[derive(Debug, Clone, Default)]
pub struct LoopState {
    pub iteration_count: usize,
    pub history: Vec<IterationRecord>,
    pub last_result: Option<Vec<String>>,
    /// Records already folded into the running query.
    folded: usize,
}

impl LoopState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the record of a successful tool iteration and advance the count.
    pub fn record(&mut self, record: IterationRecord) {
        self.last_result = Some(record.result_text.clone());
        self.history.push(record);
        self.iteration_count += 1;
    }

    /// Records not yet folded into the query; marks them folded.
    pub fn take_unfolded(&mut self) -> &[IterationRecord] {
        let start = self.folded;
        self.folded = self.history.len();
        &self.history[start..]
    }
}

/// A single entry in the run's execution log.
#[derive(Debug, Clone, Serialize)]
pub struct TaskLogEntry {
    /// Timestamp (RFC 3339)
    pub timestamp: String,

    pub entry_type: LogEntryType,

    pub content: String,
}

impl TaskLogEntry {
    pub fn new(entry_type: LogEntryType, content: impl Into<String>) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            entry_type,
            content: content.into(),
        }
    }
}

/// Types of log entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogEntryType {
    /// Model reasoning / self-correction
    Thinking,
    /// Tool is being called
    ToolCall,
    /// Tool returned a result
    ToolResult,
    /// Model produced the final answer
    Response,
    /// The run stopped on an error
    Error,
}

/// Truncate a string for logging purposes.
pub(crate) fn truncate_for_log(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}... [truncated]", &s[..idx]),
        None => s.to_string(),
    }
}

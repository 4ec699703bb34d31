//! Agent module - the core autonomous agent logic.
//!
//! The agent follows a "tools in a loop" pattern:
//! 1. Build a prompt from the instructions, the tool catalog and the query so far
//! 2. Call the LLM under a hard timeout
//! 3. Parse its reply into a tool call or a final answer
//! 4. Run the tool, fold the result into the query, and repeat until the
//!    model answers, the iteration budget runs out, or something fails

mod agent_loop;
mod decision;
mod history;
mod prompt;

pub use agent_loop::{Agent, AgentRun, Outcome};
pub use decision::{extract_json_span, parse_decision, AgentDecision, ParseError};
pub(crate) use history::truncate_for_log;
pub use history::{IterationRecord, LogEntryType, LoopState, TaskLogEntry};
pub use prompt::{build_system_prompt, PromptBuilder};

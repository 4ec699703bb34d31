//! Core agent loop implementation.

use std::sync::Arc;

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::config::AgentConfig;
use crate::error::AgentError;
use crate::llm::{invoke_with_timeout, InvokeError, LlmClient};
use crate::tools::{
    coerce_arguments, dispatch, render_catalog, DispatchError, ToolRegistry, ToolTransport,
};

use super::decision::{parse_decision, AgentDecision};
use super::history::{truncate_for_log, IterationRecord, LogEntryType, LoopState, TaskLogEntry};
use super::prompt::PromptBuilder;

/// How a run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The model gave a final answer.
    Completed {
        answer: String,
        reasoning: String,
        self_correction: String,
    },
    /// Every allowed iteration ran a tool and none produced an answer.
    BudgetExhausted { max_iterations: usize },
    /// A fatal error stopped the run.
    Failed(AgentError),
}

/// Result of one agent run.
#[derive(Debug, Clone)]
pub struct AgentRun {
    pub id: Uuid,
    pub outcome: Outcome,
    /// Completed tool iterations.
    pub iterations: usize,
    pub history: Vec<IterationRecord>,
    /// Output fragments of the most recent tool call, if any ran.
    pub last_result: Option<Vec<String>>,
    pub log: Vec<TaskLogEntry>,
}

impl AgentRun {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Completed { .. })
    }
}

/// What a single iteration decided.
enum Step {
    Continue(IterationRecord),
    Finish {
        answer: String,
        reasoning: String,
        self_correction: String,
    },
}

/// The autonomous agent.
pub struct Agent {
    config: AgentConfig,
    llm: Arc<dyn LlmClient>,
    transport: Arc<dyn ToolTransport>,
    tools: ToolRegistry,
    catalog: String,
}

impl Agent {
    /// Create an agent over an already-built registry.
    pub fn new(
        config: AgentConfig,
        llm: Arc<dyn LlmClient>,
        transport: Arc<dyn ToolTransport>,
        tools: ToolRegistry,
    ) -> Self {
        let catalog = render_catalog(&tools);
        Self {
            config,
            llm,
            transport,
            tools,
            catalog,
        }
    }

    /// Ask the transport for its tools and create the agent.
    pub async fn connect(
        config: AgentConfig,
        llm: Arc<dyn LlmClient>,
        transport: Arc<dyn ToolTransport>,
    ) -> anyhow::Result<Self> {
        let definitions = transport.list_tools().await?;
        tracing::info!("Successfully retrieved {} tools", definitions.len());

        let tools = ToolRegistry::from_definitions(&definitions);
        Ok(Self::new(config, llm, transport, tools))
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn catalog(&self) -> &str {
        &self.catalog
    }

    /// Run a task until the model answers, the budget runs out, or something
    /// fails.
    pub async fn run_task(&self, task: &str) -> AgentRun {
        let id = Uuid::new_v4();
        let mut state = LoopState::new();
        let mut prompts = PromptBuilder::new(&self.catalog, task);
        let mut log = Vec::new();

        tracing::info!("Starting run {} ({} tools)", id, self.tools.len());

        while state.iteration_count < self.config.max_iterations {
            if state.iteration_count > 0 && !self.config.iteration_delay.is_zero() {
                tokio::time::sleep(self.config.iteration_delay).await;
            }

            let iteration = state.iteration_count + 1;
            tracing::info!("--- Iteration {} ---", iteration);
            prompts.fold(state.take_unfolded());

            let outcome = match self.step(iteration, &prompts, &mut log).await {
                Ok(Step::Continue(record)) => {
                    state.record(record);
                    continue;
                }
                Ok(Step::Finish {
                    answer,
                    reasoning,
                    self_correction,
                }) => {
                    tracing::info!("Final reasoning: {}", reasoning);
                    tracing::info!("Final answer: {}", answer);
                    log.push(TaskLogEntry::new(
                        LogEntryType::Response,
                        truncate_for_log(&answer, 2000),
                    ));
                    Outcome::Completed {
                        answer,
                        reasoning,
                        self_correction,
                    }
                }
                Err(error) => {
                    tracing::error!("Run {} stopped: {}", id, error);
                    log.push(TaskLogEntry::new(LogEntryType::Error, error.to_string()));
                    Outcome::Failed(error)
                }
            };

            return AgentRun {
                id,
                outcome,
                iterations: state.iteration_count,
                history: state.history,
                last_result: state.last_result,
                log,
            };
        }

        let max_iterations = self.config.max_iterations;
        tracing::warn!("Max iterations ({}) reached without completion", max_iterations);
        log.push(TaskLogEntry::new(
            LogEntryType::Error,
            format!("Max iterations ({}) reached without completion", max_iterations),
        ));

        AgentRun {
            id,
            outcome: Outcome::BudgetExhausted { max_iterations },
            iterations: state.iteration_count,
            history: state.history,
            last_result: state.last_result,
            log,
        }
    }

    /// Prompt, invoke, parse, and (for tool calls) coerce and dispatch.
    async fn step(
        &self,
        iteration: usize,
        prompts: &PromptBuilder,
        log: &mut Vec<TaskLogEntry>,
    ) -> Result<Step, AgentError> {
        let prompt = prompts.build();

        let text = invoke_with_timeout(self.llm.as_ref(), &prompt, self.config.llm_timeout)
            .await
            .map_err(|e| match e {
                InvokeError::TimedOut(timeout) => AgentError::Timeout { iteration, timeout },
                InvokeError::Failed(message) => AgentError::Invocation { iteration, message },
            })?;

        let decision = parse_decision(&text).map_err(|e| AgentError::MalformedResponse {
            iteration,
            reason: e.to_string(),
            payload: truncate_for_log(text.trim(), 500),
        })?;
        tracing::debug!("Parsed decision: {:?}", decision);

        let mut thinking = decision.reasoning().to_string();
        if !decision.self_correction().is_empty() {
            if !thinking.is_empty() {
                thinking.push('\n');
            }
            thinking.push_str("Self-check: ");
            thinking.push_str(decision.self_correction());
        }
        if !thinking.is_empty() {
            log.push(TaskLogEntry::new(
                LogEntryType::Thinking,
                truncate_for_log(&thinking, 1000),
            ));
        }

        match decision {
            AgentDecision::FinalAnswer {
                answer,
                reasoning,
                self_correction,
            } => Ok(Step::Finish {
                answer,
                reasoning,
                self_correction,
            }),
            AgentDecision::ToolCall {
                function_name,
                arguments,
                ..
            } => {
                tracing::info!(
                    "Calling function {} with params {}",
                    function_name,
                    arguments.to_value()
                );

                let spec = self
                    .tools
                    .get(&function_name)
                    .ok_or_else(|| AgentError::UnknownTool {
                        iteration,
                        name: function_name.clone(),
                    })?;

                let coerced = coerce_arguments(spec, &arguments).map_err(|source| {
                    AgentError::ArgumentCoercion {
                        iteration,
                        tool: function_name.clone(),
                        source,
                    }
                })?;

                log.push(TaskLogEntry::new(
                    LogEntryType::ToolCall,
                    format!(
                        "Calling tool: {} with args: {}",
                        function_name,
                        Value::Object(coerced.clone())
                    ),
                ));

                let result_text = self
                    .dispatch(iteration, &function_name, coerced.clone())
                    .await?;

                log.push(TaskLogEntry::new(
                    LogEntryType::ToolResult,
                    truncate_for_log(&result_text.join("\n"), 1000),
                ));

                Ok(Step::Continue(IterationRecord {
                    index: iteration,
                    tool_name: Some(function_name),
                    coerced_arguments: Some(coerced),
                    result_text,
                }))
            }
        }
    }

    async fn dispatch(
        &self,
        iteration: usize,
        tool_name: &str,
        arguments: Map<String, Value>,
    ) -> Result<Vec<String>, AgentError> {
        dispatch(&self.tools, self.transport.as_ref(), tool_name, arguments)
            .await
            .map_err(|e| match e {
                DispatchError::UnknownTool(name) => AgentError::UnknownTool { iteration, name },
                DispatchError::Transport { tool, message } => AgentError::Dispatch {
                    iteration,
                    tool,
                    message,
                },
            })
    }
}

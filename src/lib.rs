//! # MCP Agent
//!
//! A prompt-driven agent that solves a task by calling tools on an MCP server.
//!
//! This library provides:
//! - A tool registry built from the server's listing, rendered as a catalog
//! - Schema-driven coercion of the model's arguments before dispatch
//! - A bounded model invocation and strict parsing of the model's JSON reply
//! - The sequential iteration loop that ties them together
//!
//! ## Architecture
//!
//! The agent follows the "tools in a loop" pattern:
//! 1. List the server's tools and render them into the system prompt
//! 2. Ask the LLM for exactly one JSON decision: a tool call or a final answer
//! 3. Coerce the arguments, call the tool, and summarize the result
//! 4. Feed the summary back in the next query, repeat until done
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use mcp_agent::{agent::Agent, config::Config, llm::GeminiClient, tools::mcp::McpTransport};
//!
//! let config = Config::from_env()?;
//! let llm = Arc::new(GeminiClient::new(config.api_key.clone(), config.default_model.clone()));
//! let transport = Arc::new(McpTransport::spawn(&config.mcp_command, &config.mcp_args).await?);
//! let agent = Agent::connect(config.agent.clone(), llm, transport).await?;
//! let run = agent.run_task("Add 2 and 3").await;
//! ```

pub mod agent;
pub mod config;
pub mod error;
pub mod llm;
pub mod tools;

pub use config::Config;
pub use error::AgentError;

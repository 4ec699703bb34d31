//! Configuration management for the agent.
//!
//! Configuration is read from environment variables, after loading an
//! optional `.env` file from the working directory:
//! - `GEMINI_API_KEY` - Required. API key for the Gemini backend.
//! - `DEFAULT_MODEL` - Optional. Model identifier. Defaults to `gemini-2.0-flash`.
//! - `MAX_ITERATIONS` - Optional. Iteration budget. Defaults to `8`.
//! - `LLM_TIMEOUT_SECS` - Optional. Bound on each model call. Defaults to `10`.
//! - `ITERATION_DELAY_MS` - Optional. Pause between iterations. Defaults to `2000`.
//! - `MCP_SERVER_COMMAND` - Optional. Tool server executable. Defaults to `python`.
//! - `MCP_SERVER_ARGS` - Optional. Whitespace-separated server arguments. Defaults to `server.py`.
//! - `AGENT_QUERY` - Optional. Task text when none is given on the command line.

use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_QUERY: &str = "Find the ASCII values of characters in INDIA and then return sum of exponentials of those values, Write the Answer in Paint";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),

    #[error("Failed to read env file {0}: {1}")]
    EnvFile(String, String),
}

/// Loop settings used by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    /// Maximum number of tool iterations per run
    pub max_iterations: usize,

    /// Bound on a single model call
    pub llm_timeout: Duration,

    /// Pacing pause between iterations (not a retry backoff)
    pub iteration_delay: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: 8,
            llm_timeout: Duration::from_secs(10),
            iteration_delay: Duration::from_millis(2000),
        }
    }
}

/// Process configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Gemini API key
    pub api_key: String,

    /// Model identifier
    pub default_model: String,

    pub agent: AgentConfig,

    /// Tool server executable
    pub mcp_command: String,

    /// Tool server arguments
    pub mcp_args: Vec<String>,

    /// Task given to the agent
    pub query: String,
}

impl Config {
    /// Load configuration from the process environment (and `.env`, if any).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if `GEMINI_API_KEY` is not set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let env_file = Path::new(".env");
        if env_file.is_file() {
            tracing::debug!("Loading environment from {}", env_file.display());
            return Self::from_env_file(env_file);
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an env file, letting the process environment
    /// override it. The process environment itself is left untouched.
    pub fn from_env_file(path: &Path) -> Result<Self, ConfigError> {
        Self::layered(path, |key| std::env::var(key).ok())
    }

    /// Values from `env` win over values from the file at `path`.
    fn layered(
        path: &Path,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let file_error = |e: dotenvy::Error| {
            ConfigError::EnvFile(path.display().to_string(), e.to_string())
        };

        let mut values = HashMap::new();
        for item in dotenvy::from_path_iter(path).map_err(file_error)? {
            let (key, value) = item.map_err(file_error)?;
            values.insert(key, value);
        }

        Self::from_lookup(|key| env(key).or_else(|| values.get(key).cloned()))
    }

    /// Build configuration from any key/value source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_key = lookup("GEMINI_API_KEY")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("GEMINI_API_KEY".to_string()))?;

        let default_model =
            lookup("DEFAULT_MODEL").unwrap_or_else(|| "gemini-2.0-flash".to_string());

        let defaults = AgentConfig::default();
        let max_iterations = parse_or(&lookup, "MAX_ITERATIONS", defaults.max_iterations)?;
        if max_iterations == 0 {
            return Err(ConfigError::InvalidValue(
                "MAX_ITERATIONS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let llm_timeout = parse_or(&lookup, "LLM_TIMEOUT_SECS", defaults.llm_timeout.as_secs())?;
        if llm_timeout == 0 {
            return Err(ConfigError::InvalidValue(
                "LLM_TIMEOUT_SECS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let iteration_delay = parse_or(
            &lookup,
            "ITERATION_DELAY_MS",
            defaults.iteration_delay.as_millis() as u64,
        )?;

        let mcp_command = lookup("MCP_SERVER_COMMAND").unwrap_or_else(|| "python".to_string());
        let mcp_args = lookup("MCP_SERVER_ARGS")
            .unwrap_or_else(|| "server.py".to_string())
            .split_whitespace()
            .map(str::to_string)
            .collect();

        let query = lookup("AGENT_QUERY")
            .filter(|q| !q.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_QUERY.to_string());

        Ok(Self {
            api_key,
            default_model,
            agent: AgentConfig {
                max_iterations,
                llm_timeout: Duration::from_secs(llm_timeout),
                iteration_delay: Duration::from_millis(iteration_delay),
            },
            mcp_command,
            mcp_args,
            query,
        })
    }
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| ConfigError::InvalidValue(key.to_string(), format!("{}", e))),
    }
}

//! Errors that end an agent run.
//!
//! Every variant is fatal to the run: the loop records it as the final
//! diagnostic and stops without retrying. Each carries the 1-based iteration
//! it happened in and the payload or tool name needed to diagnose it.

use std::time::Duration;

use thiserror::Error;

use crate::tools::CoercionError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AgentError {
    #[error("iteration {iteration}: model call exceeded {timeout:?}")]
    Timeout { iteration: usize, timeout: Duration },

    #[error("iteration {iteration}: model call failed: {message}")]
    Invocation { iteration: usize, message: String },

    #[error("iteration {iteration}: malformed response ({reason}): {payload}")]
    MalformedResponse {
        iteration: usize,
        reason: String,
        payload: String,
    },

    #[error("iteration {iteration}: Unknown tool: {name}")]
    UnknownTool { iteration: usize, name: String },

    #[error("iteration {iteration}: cannot prepare arguments for '{tool}': {source}")]
    ArgumentCoercion {
        iteration: usize,
        tool: String,
        #[source]
        source: CoercionError,
    },

    #[error("iteration {iteration}: tool '{tool}' failed: {message}")]
    Dispatch {
        iteration: usize,
        tool: String,
        message: String,
    },
}

impl AgentError {
    /// Iteration (1-based) in which the run failed.
    pub fn iteration(&self) -> usize {
        match self {
            Self::Timeout { iteration, .. }
            | Self::Invocation { iteration, .. }
            | Self::MalformedResponse { iteration, .. }
            | Self::UnknownTool { iteration, .. }
            | Self::ArgumentCoercion { iteration, .. }
            | Self::Dispatch { iteration, .. } => *iteration,
        }
    }

    /// Stable name of the failure class.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "timeout_failure",
            Self::Invocation { .. } => "invocation_error",
            Self::MalformedResponse { .. } => "malformed_response",
            Self::UnknownTool { .. } => "unknown_tool",
            Self::ArgumentCoercion { .. } => "argument_coercion_failure",
            Self::Dispatch { .. } => "dispatch_failure",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ParamType;

    #[test]
    fn messages_carry_iteration_and_context() {
        let err = AgentError::UnknownTool {
            iteration: 3,
            name: "draw_circle".to_string(),
        };
        assert_eq!(err.to_string(), "iteration 3: Unknown tool: draw_circle");
        assert_eq!(err.iteration(), 3);
        assert_eq!(err.kind(), "unknown_tool");

        let err = AgentError::Timeout {
            iteration: 1,
            timeout: Duration::from_secs(10),
        };
        assert_eq!(err.to_string(), "iteration 1: model call exceeded 10s");
    }

    #[test]
    fn coercion_error_is_the_source() {
        use std::error::Error as _;

        let err = AgentError::ArgumentCoercion {
            iteration: 2,
            tool: "add".to_string(),
            source: CoercionError::InvalidValue {
                param: "a".to_string(),
                expected: ParamType::Integer,
                value: "\"x\"".to_string(),
            },
        };
        assert!(err.source().is_some());
        assert!(err.to_string().contains("parameter 'a' expects integer"));
    }
}

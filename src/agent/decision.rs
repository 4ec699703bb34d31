//! Parse and validate the model's structured reply.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::tools::RawArguments;

/// What the model decided to do this turn.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentDecision {
    /// Run one named tool.
    ToolCall {
        reasoning: String,
        self_correction: String,
        function_name: String,
        arguments: RawArguments,
    },
    /// Stop with a user-facing result.
    FinalAnswer {
        reasoning: String,
        self_correction: String,
        answer: String,
    },
}

impl AgentDecision {
    pub fn reasoning(&self) -> &str {
        match self {
            Self::ToolCall { reasoning, .. } | Self::FinalAnswer { reasoning, .. } => reasoning,
        }
    }

    pub fn self_correction(&self) -> &str {
        match self {
            Self::ToolCall {
                self_correction, ..
            }
            | Self::FinalAnswer {
                self_correction, ..
            } => self_correction,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("no JSON object found in model response")]
    NoJsonObject,

    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    #[error("response is not a JSON object")]
    NotAnObject,

    #[error("response contains both 'function' and 'answer'")]
    Ambiguous,

    #[error("response contains neither 'function' nor 'answer'")]
    MissingDecision,

    #[error("'function' must be a string, got {0}")]
    InvalidFunctionName(String),
}

/// The span from the first `{` to the last `}`, if there is one.
///
/// Models like to wrap their JSON in prose or code fences; only the outermost
/// brace span is kept.
pub fn extract_json_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Parse a raw model reply into exactly one [`AgentDecision`].
pub fn parse_decision(text: &str) -> Result<AgentDecision, ParseError> {
    let span = extract_json_span(text).ok_or(ParseError::NoJsonObject)?;
    let value: Value =
        serde_json::from_str(span).map_err(|e| ParseError::InvalidJson(e.to_string()))?;
    let object = value.as_object().ok_or(ParseError::NotAnObject)?;

    let reasoning = advisory(object, "reasoning");
    let self_correction = advisory(object, "self_correction");

    let function = object.get("function").filter(|v| truthy(v));
    let answer = object.get("answer").filter(|v| truthy(v));

    match (function, answer) {
        (Some(_), Some(_)) => Err(ParseError::Ambiguous),
        (None, None) => Err(ParseError::MissingDecision),
        (Some(function), None) => {
            let function_name = function
                .as_str()
                .ok_or_else(|| ParseError::InvalidFunctionName(function.to_string()))?
                .trim()
                .to_string();
            Ok(AgentDecision::ToolCall {
                reasoning,
                self_correction,
                function_name,
                arguments: RawArguments::from_value(object.get("parameters")),
            })
        }
        (None, Some(answer)) => Ok(AgentDecision::FinalAnswer {
            reasoning,
            self_correction,
            answer: match answer {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            },
        }),
    }
}

/// `reasoning` and `self_correction` are logged, never acted upon.
fn advisory(object: &Map<String, Value>, key: &str) -> String {
    match object.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => {
            tracing::warn!("Model response has no '{}'", key);
            String::new()
        }
        Some(other) => other.to_string(),
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_tool_call_wrapped_in_prose() {
        let text = r#"Sure! Here is my plan:
```json
{
  "reasoning": "LOOKUP: need the codes",
  "self_correction": "parameters look right",
  "function": "get_ascii_values",
  "parameters": {"string": "INDIA"}
}
```"#;

        let decision = parse_decision(text).unwrap();
        assert_eq!(
            decision,
            AgentDecision::ToolCall {
                reasoning: "LOOKUP: need the codes".to_string(),
                self_correction: "parameters look right".to_string(),
                function_name: "get_ascii_values".to_string(),
                arguments: RawArguments::from_value(Some(&json!({"string": "INDIA"}))),
            }
        );
    }

    #[test]
    fn done_is_an_ordinary_answer() {
        let decision = parse_decision(r#"{"answer": "DONE"}"#).unwrap();
        assert_eq!(
            decision,
            AgentDecision::FinalAnswer {
                reasoning: String::new(),
                self_correction: String::new(),
                answer: "DONE".to_string(),
            }
        );
    }

    #[test]
    fn numeric_answer_is_stringified() {
        let decision = parse_decision(r#"{"reasoning": "r", "answer": 7.59982224609308e33}"#)
            .unwrap();
        match decision {
            AgentDecision::FinalAnswer { answer, reasoning, .. } => {
                assert_eq!(reasoning, "r");
                assert!(answer.starts_with("7.59982224609308"));
            }
            other => panic!("expected final answer, got {:?}", other),
        }
    }

    #[test]
    fn rejects_both_discriminators() {
        assert_eq!(
            parse_decision(r#"{"function": "add", "parameters": {}, "answer": "5"}"#),
            Err(ParseError::Ambiguous)
        );
    }

    #[test]
    fn rejects_neither_discriminator() {
        assert_eq!(
            parse_decision(r#"{"reasoning": "thinking", "self_correction": "ok"}"#),
            Err(ParseError::MissingDecision)
        );
        // Empty values do not count as present.
        assert_eq!(
            parse_decision(r#"{"function": "", "answer": ""}"#),
            Err(ParseError::MissingDecision)
        );
    }

    #[test]
    fn empty_discriminator_defers_to_the_other() {
        let decision = parse_decision(r#"{"function": "", "answer": "42"}"#).unwrap();
        assert!(matches!(decision, AgentDecision::FinalAnswer { answer, .. } if answer == "42"));
    }

    #[test]
    fn rejects_text_without_braces() {
        assert_eq!(
            parse_decision("I will now call the add tool."),
            Err(ParseError::NoJsonObject)
        );
        assert_eq!(parse_decision("} backwards {"), Err(ParseError::NoJsonObject));
    }

    #[test]
    fn rejects_invalid_json_span() {
        assert!(matches!(
            parse_decision("{'function': 'add'}"),
            Err(ParseError::InvalidJson(_))
        ));
    }

    #[test]
    fn rejects_non_string_function() {
        assert_eq!(
            parse_decision(r#"{"function": 12}"#),
            Err(ParseError::InvalidFunctionName("12".to_string()))
        );
    }

    #[test]
    fn outermost_span_is_used() {
        assert_eq!(
            extract_json_span(r#"a {"x": {"y": 1}} b"#),
            Some(r#"{"x": {"y": 1}}"#)
        );
        assert_eq!(extract_json_span("no json"), None);
    }

    #[test]
    fn missing_parameters_means_no_input() {
        match parse_decision(r#"{"function": "open_paint"}"#).unwrap() {
            AgentDecision::ToolCall { arguments, .. } => assert!(arguments.is_empty()),
            other => panic!("expected tool call, got {:?}", other),
        }
    }
}

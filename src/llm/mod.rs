//! Language-model backends and the bounded invocation used by the agent.

mod gemini;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use gemini::GeminiClient;

/// A text-in, text-out model backend.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate a completion for a single prompt.
    async fn generate(&self, prompt: &str) -> anyhow::Result<String>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvokeError {
    #[error("LLM generation timed out after {0:?}")]
    TimedOut(Duration),

    #[error("LLM generation failed: {0}")]
    Failed(String),
}

/// Run one model call, racing it against `timeout`.
///
/// On expiry the in-flight request future is dropped, which aborts the HTTP
/// request for backends built on `reqwest`. A backend that spawned its own
/// background work may still finish it unobserved.
pub async fn invoke_with_timeout(
    llm: &dyn LlmClient,
    prompt: &str,
    timeout: Duration,
) -> Result<String, InvokeError> {
    tracing::debug!("Starting LLM generation ({} chars of prompt)", prompt.len());

    match tokio::time::timeout(timeout, llm.generate(prompt)).await {
        Ok(Ok(text)) => {
            tracing::debug!("LLM generation completed");
            Ok(text)
        }
        Ok(Err(e)) => {
            tracing::error!("Error in LLM generation: {:#}", e);
            Err(InvokeError::Failed(format!("{:#}", e)))
        }
        Err(_) => {
            tracing::error!("LLM generation timed out!");
            Err(InvokeError::TimedOut(timeout))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(&'static str);

    #[async_trait]
    impl LlmClient for Fixed {
        async fn generate(&self, _prompt: &str) -> anyhow::Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct Slow;

    #[async_trait]
    impl LlmClient for Slow {
        async fn generate(&self, _prompt: &str) -> anyhow::Result<String> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok("too late".to_string())
        }
    }

    struct Broken;

    #[async_trait]
    impl LlmClient for Broken {
        async fn generate(&self, _prompt: &str) -> anyhow::Result<String> {
            Err(anyhow::anyhow!("401 Unauthorized"))
        }
    }

    #[tokio::test]
    async fn returns_text_within_bound() {
        let text =
            tokio_test::assert_ok!(invoke_with_timeout(&Fixed("{}"), "hi", Duration::from_secs(1)).await);
        assert_eq!(text, "{}");
    }

    #[tokio::test]
    async fn times_out_without_partial_result() {
        let started = std::time::Instant::now();
        let err = invoke_with_timeout(&Slow, "hi", Duration::from_millis(50))
            .await
            .unwrap_err();

        assert_eq!(err, InvokeError::TimedOut(Duration::from_millis(50)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn backend_failure_carries_cause() {
        let err = invoke_with_timeout(&Broken, "hi", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(err, InvokeError::Failed("401 Unauthorized".to_string()));
    }
}

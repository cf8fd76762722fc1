use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("llm call timed out after {0:?}")]
    Timeout(Duration),
    #[error("llm transport error: {0}")]
    Transport(String),
    #[error("llm returned a response that didn't match the expected shape: {0}")]
    InvalidResponse(String),
}

/// `Analyze(systemPrompt, userPrompt, jsonSchema, timeout)` (§6). The core
/// never depends on free-form text — callers pair this with
/// [`crate::extract_json`] and a concrete response type.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn analyze(&self, system_prompt: &str, user_prompt: &str, timeout: Duration) -> Result<String, LlmError>;
}

/// Ollama-compatible HTTP client. Mirrors the request shape of a plain
/// `/api/generate` call; the schema constraint is enforced by the caller
/// parsing the returned text as JSON, not by the transport.
pub struct HttpLlmClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl HttpLlmClient {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self { client: reqwest::Client::new(), base_url: base_url.into(), model: model.into() }
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn analyze(&self, system_prompt: &str, user_prompt: &str, timeout: Duration) -> Result<String, LlmError> {
        let endpoint = format!("{}/api/generate", self.base_url.trim_end_matches('/'));
        let prompt = format!("{system_prompt}\n\n{user_prompt}");
        let payload = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "format": "json",
        });

        let response = tokio::time::timeout(timeout, self.client.post(&endpoint).json(&payload).send())
            .await
            .map_err(|_| LlmError::Timeout(timeout))?
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        let status = response.status();
        let body: serde_json::Value = response.json().await.map_err(|e| LlmError::Transport(e.to_string()))?;
        if !status.is_success() {
            return Err(LlmError::Transport(format!("llm backend returned {status}: {body}")));
        }

        body.get("response")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| LlmError::InvalidResponse(body.to_string()))
    }
}

/// Deterministic stand-in for tests and for the `provider = "mock"` config
/// default (§10.3) — never reaches the network.
pub struct MockLlmClient {
    pub fixed_response: String,
}

impl MockLlmClient {
    pub fn new(fixed_response: impl Into<String>) -> Self {
        Self { fixed_response: fixed_response.into() }
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn analyze(&self, _system_prompt: &str, _user_prompt: &str, _timeout: Duration) -> Result<String, LlmError> {
        Ok(self.fixed_response.clone())
    }
}

/// Call `analyze`, retrying once with `backoff` on transport/timeout failure
/// (§7: LLM calls retry once before the pipeline degrades to a low-confidence
/// assessment).
pub async fn analyze_with_retry(
    client: &dyn LlmClient,
    system_prompt: &str,
    user_prompt: &str,
    timeout: Duration,
    backoff: Duration,
) -> Result<String, LlmError> {
    match client.analyze(system_prompt, user_prompt, timeout).await {
        Ok(response) => Ok(response),
        Err(first_err) => {
            tracing::warn!(error = %first_err, "llm call failed, retrying once");
            tokio::time::sleep(backoff).await;
            client.analyze(system_prompt, user_prompt, timeout).await.inspect_err(|retry_err| {
                tracing::warn!(error = %retry_err, "llm call failed again after retry");
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_client_returns_fixed_response() {
        let client = MockLlmClient::new(r#"{"score":0.5}"#);
        let out = client.analyze("sys", "user", Duration::from_secs(1)).await.unwrap();
        assert_eq!(out, r#"{"score":0.5}"#);
    }

    #[tokio::test]
    async fn analyze_with_retry_succeeds_without_retry_when_first_call_ok() {
        let client = MockLlmClient::new("ok");
        let out = analyze_with_retry(&client, "sys", "user", Duration::from_secs(1), Duration::from_millis(1)).await.unwrap();
        assert_eq!(out, "ok");
    }

    struct FailingClient;

    #[async_trait]
    impl LlmClient for FailingClient {
        async fn analyze(&self, _: &str, _: &str, _: Duration) -> Result<String, LlmError> {
            Err(LlmError::Transport("down".to_string()))
        }
    }

    #[tokio::test]
    async fn analyze_with_retry_surfaces_error_after_second_failure() {
        let client = FailingClient;
        let result = analyze_with_retry(&client, "sys", "user", Duration::from_secs(1), Duration::from_millis(1)).await;
        assert!(result.is_err());
    }
}

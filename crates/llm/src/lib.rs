pub mod client;
pub mod schema;

use std::time::Duration;

pub use client::{HttpLlmClient, LlmClient, LlmError, MockLlmClient};
pub use schema::{ActionItem, DailyNarrative, Sentiment, StrategicAnalysis, StrategicImportance, ThreadStatusHint, ThreadSummary, UrgencyScore};

/// Parse the first JSON object out of an LLM response — a fenced ```json```
/// block if present, otherwise the first-`{`-to-last-`}` span. Models given
/// `"format": "json"` usually return a bare object, but some still wrap it in
/// prose.
pub fn extract_json<T: serde::de::DeserializeOwned>(response: &str) -> Option<T> {
    if let Some(fence_start) = response.find("```json") {
        let after_fence = &response[fence_start + "```json".len()..];
        if let Some(json_start) = after_fence.find(|c: char| !c.is_whitespace()) {
            let json_body = &after_fence[json_start..];
            if let Some(fence_end) = json_body.find("```") {
                let json_str = json_body[..fence_end].trim();
                if let Ok(val) = serde_json::from_str(json_str) {
                    return Some(val);
                }
            }
        }
    }

    let trimmed = response.trim();
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&trimmed[start..=end]).ok()
}

async fn analyze_typed<T: serde::de::DeserializeOwned>(
    client: &dyn LlmClient,
    system_prompt: &str,
    user_prompt: &str,
    timeout: Duration,
    backoff: Duration,
) -> Result<T, LlmError> {
    let raw = client::analyze_with_retry(client, system_prompt, user_prompt, timeout, backoff).await?;
    extract_json(&raw).ok_or_else(|| LlmError::InvalidResponse(raw))
}

const STRATEGIC_SYSTEM_PROMPT: &str = "You triage email for a busy executive. Respond with ONLY a JSON object matching: \
{labels: string[], strategicImportance: \"critical\"|\"high\"|\"medium\"|\"low\", requiresAction: bool, \
delegationHint?: string, estMinutesToHandle: int, keyInsight: string, decisionPoints: string[], \
sentiment: \"positive\"|\"neutral\"|\"negative\"|\"urgent\"}. No prose outside the object.";

pub async fn strategic_analysis(
    client: &dyn LlmClient,
    message_text: &str,
    timeout: Duration,
    backoff: Duration,
) -> Result<StrategicAnalysis, LlmError> {
    analyze_typed(client, STRATEGIC_SYSTEM_PROMPT, message_text, timeout, backoff).await
}

const THREAD_SUMMARY_SYSTEM_PROMPT: &str = "Summarize this email thread. Respond with ONLY a JSON object matching: \
{summary: string, keyDecisions: string[], actionItems: [{action: string, owner?: string, deadline?: string}], \
status: \"resolved\"|\"ongoing\"|\"stalled\"|\"escalated\", priority: string, \
sentiment: \"positive\"|\"neutral\"|\"negative\"|\"urgent\", nextSteps: string[]}. No prose outside the object.";

pub async fn thread_summary(
    client: &dyn LlmClient,
    thread_text: &str,
    timeout: Duration,
    backoff: Duration,
) -> Result<ThreadSummary, LlmError> {
    analyze_typed(client, THREAD_SUMMARY_SYSTEM_PROMPT, thread_text, timeout, backoff).await
}

const DAILY_NARRATIVE_SYSTEM_PROMPT: &str = "Write a short daily email briefing. Respond with ONLY a JSON object matching: \
{headline: string, narrative: string, actionItems: string[], deadlines: string[], characters: string[], themes: string[]}. \
Keep narrative under 200 words. No prose outside the object.";

pub async fn daily_narrative(
    client: &dyn LlmClient,
    day_digest: &str,
    timeout: Duration,
    backoff: Duration,
) -> Result<DailyNarrative, LlmError> {
    analyze_typed(client, DAILY_NARRATIVE_SYSTEM_PROMPT, day_digest, timeout, backoff).await
}

const URGENCY_SYSTEM_PROMPT: &str = "Score how urgent this email is on a 0 to 1 scale. \
Respond with ONLY a JSON object matching: {score: number in [0,1]}. No prose outside the object.";

pub async fn urgency_score(
    client: &dyn LlmClient,
    message_text: &str,
    timeout: Duration,
    backoff: Duration,
) -> Result<UrgencyScore, LlmError> {
    analyze_typed(client, URGENCY_SYSTEM_PROMPT, message_text, timeout, backoff).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_json_parses_fenced_block() {
        let raw = "Sure!\n```json\n{\"score\":0.7}\n```";
        let out: UrgencyScore = extract_json(raw).unwrap();
        assert_eq!(out.score, 0.7);
    }

    #[test]
    fn extract_json_parses_bare_object() {
        let raw = r#"{"score":0.3}"#;
        let out: UrgencyScore = extract_json(raw).unwrap();
        assert_eq!(out.score, 0.3);
    }

    #[test]
    fn extract_json_returns_none_for_plain_text() {
        let out: Option<UrgencyScore> = extract_json("no json here");
        assert!(out.is_none());
    }

    #[tokio::test]
    async fn urgency_score_uses_mock_client() {
        let client = MockLlmClient::new(r#"{"score":0.9}"#);
        let out = urgency_score(&client, "URGENT: respond now", Duration::from_secs(1), Duration::from_millis(1)).await.unwrap();
        assert_eq!(out.score, 0.9);
    }

    #[tokio::test]
    async fn strategic_analysis_rejects_malformed_response() {
        let client = MockLlmClient::new("not json");
        let result = strategic_analysis(&client, "hello", Duration::from_secs(1), Duration::from_millis(1)).await;
        assert!(result.is_err());
    }
}

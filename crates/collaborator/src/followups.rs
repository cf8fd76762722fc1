//! Action-item/commitment extraction (§11 SUPPLEMENT) feeding
//! `Decision.followUps`. A regex/keyword scan over the message body, in the
//! same degrade-gracefully spirit as the analyzers: no LLM call, no failure
//! mode, just a best-effort list of sentences worth following up on.

const FOLLOW_UP_MARKERS: &[&str] = &["please", "can you", "could you", "action:", "let me know", "waiting for"];

/// Split `body` into sentences and keep the ones containing a follow-up
/// marker or a "by <weekday/date>" deadline phrase, capped at 5.
pub fn extract_follow_ups(body: &str) -> Vec<String> {
    let mut found = Vec::new();
    for raw_sentence in body.split(['.', '\n']) {
        let sentence = raw_sentence.trim();
        if sentence.is_empty() {
            continue;
        }
        let lower = sentence.to_lowercase();
        let has_marker = FOLLOW_UP_MARKERS.iter().any(|m| lower.contains(m));
        let has_deadline = lower.contains("by ") && lower.split("by ").nth(1).is_some_and(|rest| !rest.trim().is_empty());
        if has_marker || has_deadline {
            found.push(sentence.to_string());
            if found.len() >= 5 {
                break;
            }
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn please_sentence_is_extracted() {
        let body = "Thanks for the update. Please send the signed contract by Friday. No other action needed.";
        let found = extract_follow_ups(body);
        assert!(found.iter().any(|s| s.to_lowercase().contains("please send")));
    }

    #[test]
    fn plain_informational_body_yields_nothing() {
        let body = "Your package has shipped and will arrive soon";
        assert!(extract_follow_ups(body).is_empty());
    }
}

use scout_core::{CoreError, LlmError, Opinion, FALLBACK_RECOMMENDATION};
use tracing::{debug, warn};

const FENCE: &str = "```";

/// Inner content of the first fenced code block, with an optional `json`
/// language tag and surrounding whitespace removed.
pub fn extract_fenced_block(text: &str) -> Option<&str> {
    let start = text.find(FENCE)? + FENCE.len();
    let rest = &text[start..];
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let end = rest.find(FENCE)?;
    Some(rest[..end].trim())
}

pub fn parse_opinion(raw: &str) -> Result<Opinion, serde_json::Error> {
    let content = extract_fenced_block(raw).unwrap_or(raw);
    serde_json::from_str(content.trim())
}

/// Turns the outcome of an analysis call into an opinion. Never fails: each
/// failure mode yields a record that says what went wrong.
pub fn interpret(outcome: Result<String, CoreError>) -> Opinion {
    match outcome {
        Ok(raw) => match parse_opinion(&raw) {
            Ok(opinion) => opinion,
            Err(e) => {
                warn!("Could not parse analysis response as JSON: {}", e);
                debug!("Unparseable analysis response: {}", raw);
                unparseable_opinion()
            }
        },
        Err(CoreError::Llm(LlmError::ApiStatus { status_code, body })) => {
            warn!("Error calling Claude API: {} - {}", status_code, body);
            api_error_opinion(status_code)
        }
        Err(CoreError::Llm(LlmError::RateLimitExceeded { .. })) => {
            warn!("Error calling Claude API: 429 - rate limited");
            api_error_opinion(429)
        }
        Err(CoreError::Llm(LlmError::InvalidApiKey { .. })) => {
            warn!("Error calling Claude API: 401 - API key rejected");
            api_error_opinion(401)
        }
        Err(e) => {
            warn!("Exception in Claude analysis: {}", e);
            exception_opinion(&e.to_string())
        }
    }
}

fn fallback(key_points: Vec<String>, red_flag: String, brief_summary: String) -> Opinion {
    Opinion {
        likely_new_listing: None,
        sentiment_score: None,
        key_points,
        red_flags: vec![red_flag],
        listing_status: "unknown".to_string(),
        recommendation: FALLBACK_RECOMMENDATION.to_string(),
        brief_summary,
    }
}

pub fn unparseable_opinion() -> Opinion {
    fallback(
        vec!["Error parsing Claude response".to_string()],
        "Could not obtain structured analysis".to_string(),
        "Could not analyze tweets properly. Please review manually.".to_string(),
    )
}

pub fn api_error_opinion(status_code: u16) -> Opinion {
    fallback(
        Vec::new(),
        "Error calling Claude API".to_string(),
        format!("API error: {}", status_code),
    )
}

pub fn exception_opinion(detail: &str) -> Opinion {
    fallback(
        Vec::new(),
        format!("Exception: {}", detail),
        "Error during analysis".to_string(),
    )
}

// Layer 3: OpenRouter Verifier
//
// Concept: Ask an LLM whether the source excerpt supports a claimed field value
// API: OpenAI-compatible chat completions (OpenRouter by default)
//
// Timeouts are set on the HTTP client; the gate additionally bounds every call
// with `layer3.timeout_ms`. Requests are rate limited per minute.

use super::{AiJudgement, AiVerdict, AiVerificationRequest, AiVerifier, AiVerifierError};
use crate::config::Layer3Config;
use crate::error::{GateError, GateResult};
use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::time::Duration;

const SYSTEM_PROMPT: &str = "You verify facts extracted from web pages about a business owner. \
Judge ONLY from the supplied source excerpt. Reply with a single JSON object: \
{\"verdict\": \"confirmed\" | \"refuted\" | \"inconclusive\", \"confidence\": 0.0-1.0, \
\"rationale\": \"one sentence\"}. Use \"refuted\" when the excerpt contradicts the value \
or the value looks fabricated, \"inconclusive\" when the excerpt does not mention it.";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Model output before normalization; models are loose with verdict spelling
#[derive(Debug, Deserialize)]
struct RawJudgement {
    verdict: String,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    rationale: String,
}

/// OpenRouter chat-completions verifier
pub struct OpenRouterVerifier {
    /// HTTP client with configured timeouts
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
    timeout_ms: u64,
    max_excerpt_chars: usize,
    rate_limiter: RateLimiter<
        governor::state::direct::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
}

impl OpenRouterVerifier {
    /// Build from `[layer3]` configuration
    ///
    /// # Errors
    /// `GateError::Config` when no API key is available (env or TOML) or the
    /// HTTP client cannot be built.
    pub fn from_config(config: &Layer3Config) -> GateResult<Self> {
        let api_key = config.resolve_api_key().ok_or_else(|| {
            GateError::Config(format!(
                "Layer 3 needs an API key: set {} or layer3.api_key",
                crate::config::API_KEY_ENV_VAR
            ))
        })?;

        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms.max(1)))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| GateError::Config(format!("Failed to build HTTP client: {}", e)))?;

        let per_minute = NonZeroU32::new(config.requests_per_minute).unwrap_or(NonZeroU32::MIN);

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key,
            timeout_ms: config.timeout_ms,
            max_excerpt_chars: config.max_excerpt_chars,
            rate_limiter: RateLimiter::direct(Quota::per_minute(per_minute)),
        })
    }

    fn user_prompt(&self, request: &AiVerificationRequest) -> String {
        build_user_prompt(request, self.max_excerpt_chars)
    }

    fn map_reqwest_error(&self, error: reqwest::Error) -> AiVerifierError {
        if error.is_timeout() {
            AiVerifierError::Timeout(self.timeout_ms)
        } else {
            AiVerifierError::Http(format!("verifier request failed: {}", error))
        }
    }
}

#[async_trait]
impl AiVerifier for OpenRouterVerifier {
    fn name(&self) -> &'static str {
        "openrouter"
    }

    async fn verify(&self, request: &AiVerificationRequest) -> Result<AiJudgement, AiVerifierError> {
        self.rate_limiter.until_ready().await;

        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: self.user_prompt(request),
                },
            ],
            temperature: 0.0,
            response_format: ResponseFormat { kind: "json_object" },
        };

        tracing::debug!(
            profile_id = %request.profile_id,
            field = %request.field,
            model = %self.model,
            "Requesting AI verification"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_reqwest_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AiVerifierError::Http(format!(
                "verifier returned error status: {}",
                status
            )));
        }

        let chat: ChatResponse = response.json().await.map_err(|e| {
            AiVerifierError::InvalidResponse(format!("Failed to parse chat response: {}", e))
        })?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| AiVerifierError::InvalidResponse("no choices in response".to_string()))?;

        parse_judgement(&content)
    }
}

/// Prompt for one field; the excerpt is cut at `max_excerpt_chars` characters
pub fn build_user_prompt(request: &AiVerificationRequest, max_excerpt_chars: usize) -> String {
    let excerpt: String = request.source_excerpt.chars().take(max_excerpt_chars).collect();
    let truncated = if request.source_excerpt.chars().count() > max_excerpt_chars {
        " [truncated]"
    } else {
        ""
    };

    format!(
        "Field: {}\nClaimed value: {}\nConcern: {}\n\nSource excerpt{}:\n\"\"\"\n{}\n\"\"\"",
        request.field, request.value, request.concern, truncated, excerpt
    )
}

/// Parse the model's reply into a judgement
///
/// Accepts bare JSON, JSON inside a Markdown code fence, or JSON surrounded by
/// prose. Unknown verdict words become `Inconclusive`.
pub fn parse_judgement(content: &str) -> Result<AiJudgement, AiVerifierError> {
    let start = content.find('{');
    let end = content.rfind('}');
    let json = match (start, end) {
        (Some(start), Some(end)) if start < end => &content[start..=end],
        _ => {
            return Err(AiVerifierError::InvalidResponse(format!(
                "no JSON object in reply: {}",
                content.chars().take(120).collect::<String>()
            )))
        }
    };

    let raw: RawJudgement = serde_json::from_str(json)
        .map_err(|e| AiVerifierError::InvalidResponse(format!("malformed judgement: {}", e)))?;

    let verdict = match raw.verdict.trim().to_ascii_lowercase().as_str() {
        "confirmed" | "supported" | "true" | "yes" => AiVerdict::Confirmed,
        "refuted" | "contradicted" | "false" | "no" | "fabricated" => AiVerdict::Refuted,
        _ => AiVerdict::Inconclusive,
    };

    let confidence = raw.confidence.unwrap_or(0.5);
    let confidence = if confidence.is_nan() { 0.0 } else { confidence.clamp(0.0, 1.0) };

    Ok(AiJudgement {
        verdict,
        confidence,
        rationale: raw.rationale,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FieldName;
    use serial_test::serial;

    fn request(excerpt: &str) -> AiVerificationRequest {
        AiVerificationRequest {
            profile_id: "p1".to_string(),
            field: FieldName::Email,
            value: "info@acme.io".to_string(),
            concern: "placeholder: role or placeholder local-part 'info'".to_string(),
            source_excerpt: excerpt.to_string(),
        }
    }

    #[test]
    fn test_parse_bare_json() {
        let j = parse_judgement(r#"{"verdict": "confirmed", "confidence": 0.92, "rationale": "listed on contact page"}"#)
            .unwrap();
        assert_eq!(j.verdict, AiVerdict::Confirmed);
        assert_eq!(j.confidence, 0.92);
        assert_eq!(j.rationale, "listed on contact page");
    }

    #[test]
    fn test_parse_fenced_json() {
        let reply = "Sure!\n```json\n{\"verdict\": \"Refuted\", \"confidence\": 1.4}\n```";
        let j = parse_judgement(reply).unwrap();
        assert_eq!(j.verdict, AiVerdict::Refuted);
        assert_eq!(j.confidence, 1.0);
    }

    #[test]
    fn test_unknown_verdict_is_inconclusive() {
        let j = parse_judgement(r#"{"verdict": "maybe"}"#).unwrap();
        assert_eq!(j.verdict, AiVerdict::Inconclusive);
        assert_eq!(j.confidence, 0.5);
    }

    #[test]
    fn test_garbage_reply_is_invalid_response() {
        assert!(matches!(
            parse_judgement("I cannot help with that."),
            Err(AiVerifierError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_judgement("{not json}"),
            Err(AiVerifierError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_prompt_truncates_excerpt() {
        let prompt = build_user_prompt(&request("abcdefghij"), 4);
        assert!(prompt.contains("abcd\n"));
        assert!(!prompt.contains("abcde"));
        assert!(prompt.contains("[truncated]"));
        assert!(prompt.contains("Field: email"));
    }

    #[test]
    #[serial]
    fn test_missing_api_key_is_config_error() {
        std::env::remove_var(crate::config::API_KEY_ENV_VAR);
        let config = Layer3Config {
            enabled: true,
            ..Layer3Config::default()
        };
        assert!(matches!(
            OpenRouterVerifier::from_config(&config),
            Err(GateError::Config(_))
        ));
    }

    #[test]
    #[serial]
    fn test_toml_api_key_builds_client() {
        std::env::remove_var(crate::config::API_KEY_ENV_VAR);
        let config = Layer3Config {
            enabled: true,
            api_key: Some("sk-test".to_string()),
            ..Layer3Config::default()
        };
        let verifier = OpenRouterVerifier::from_config(&config).unwrap();
        assert_eq!(verifier.name(), "openrouter");
    }
}

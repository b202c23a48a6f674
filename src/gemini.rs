use serde::{Deserialize, Serialize};

use crate::config::GeminiConfig;
use crate::error::StudyError;

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

/// Thin client for the Gemini `generateContent` endpoint.
///
/// One prompt in, one text out. Failures of any kind come back as
/// `StudyError::Generation` with a message meant for the user.
pub struct GeminiClient {
    base_url: String,
    model: String,
    api_key: String,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn with_config(config: &GeminiConfig, api_key: String) -> Result<Self, StudyError> {
        let client = reqwest::Client::builder().build().map_err(|e| {
            StudyError::Configuration(format!(
                "Failed to initialize Gemini model. Please check your API key and network connection: {}",
                e
            ))
        })?;

        Ok(GeminiClient {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            client,
        })
    }

    pub fn get_model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }

    pub async fn generate(&self, prompt: &str) -> Result<String, StudyError> {
        let request = GenerateRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
        };

        tracing::info!(
            model = %self.model,
            prompt_chars = prompt.chars().count(),
            "sending prompt"
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| StudyError::Generation(format!("request to Gemini failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StudyError::Generation(format!("could not read Gemini response: {}", e)))?;

        if !status.is_success() {
            tracing::warn!(%status, "Gemini returned an error");
            return Err(StudyError::Generation(api_error_message(status, &body)));
        }

        let text = parse_generate_response(&body)?;
        tracing::info!(response_chars = text.chars().count(), "response received");
        Ok(text)
    }
}

fn api_error_message(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) if !envelope.error.message.is_empty() => match envelope.error.status {
            Some(kind) => format!(
                "Gemini API error {} ({}): {}",
                status, kind, envelope.error.message
            ),
            None => format!("Gemini API error {}: {}", status, envelope.error.message),
        },
        _ if body.trim().is_empty() => format!("Gemini API error {}", status),
        _ => format!("Gemini API error {}: {}", status, body.trim()),
    }
}

fn parse_generate_response(body: &str) -> Result<String, StudyError> {
    let response: GenerateResponse = serde_json::from_str(body)
        .map_err(|e| StudyError::Generation(format!("malformed response from Gemini: {}", e)))?;

    if let Some(reason) = response
        .prompt_feedback
        .as_ref()
        .and_then(|feedback| feedback.block_reason.as_deref())
    {
        return Err(StudyError::Generation(format!("prompt was blocked: {}", reason)));
    }

    let candidate = response
        .candidates
        .first()
        .ok_or_else(|| StudyError::Generation("Gemini returned no candidates".to_string()))?;

    let text: String = candidate
        .content
        .iter()
        .flat_map(|content| content.parts.iter())
        .filter_map(|part| part.text.as_deref())
        .collect();

    if text.is_empty() {
        let reason = candidate.finish_reason.as_deref().unwrap_or("UNKNOWN");
        return Err(StudyError::Generation(format!(
            "Gemini returned no text (finish reason: {})",
            reason
        )));
    }

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    fn client_for(base_url: &str) -> GeminiClient {
        let config = GeminiConfig {
            base_url: base_url.to_string(),
            ..GeminiConfig::default()
        };
        GeminiClient::with_config(&config, "test-key".to_string()).unwrap()
    }

    #[test]
    fn test_endpoint() {
        let client = client_for("https://generativelanguage.googleapis.com/");
        assert_eq!(
            client.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-pro-latest:generateContent"
        );
        assert_eq!(client.get_model(), "gemini-pro-latest");
    }

    #[test]
    fn test_request_shape() {
        let request = GenerateRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part { text: Some("hi".to_string()) }],
            }],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hi");
    }

    #[test]
    fn test_parse_joins_parts() {
        let body = r#"{
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Plants turn "}, {"text": "light into sugar."}]},
                "finishReason": "STOP"
            }]
        }"#;
        assert_eq!(parse_generate_response(body).unwrap(), "Plants turn light into sugar.");
    }

    #[test]
    fn test_parse_blocked_prompt() {
        let body = r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#;
        let err = parse_generate_response(body).unwrap_err();
        assert_eq!(err, StudyError::Generation("prompt was blocked: SAFETY".to_string()));
    }

    #[test]
    fn test_parse_empty_candidate() {
        let body = r#"{"candidates": [{"finishReason": "RECITATION"}]}"#;
        let err = parse_generate_response(body).unwrap_err();
        assert!(err.to_string().contains("RECITATION"));

        let err = parse_generate_response(r#"{"candidates": []}"#).unwrap_err();
        assert!(err.to_string().contains("no candidates"));
    }

    #[test]
    fn test_parse_malformed_body() {
        let err = parse_generate_response("<html>oops</html>").unwrap_err();
        assert!(matches!(err, StudyError::Generation(_)));
        assert!(err.to_string().starts_with("malformed response"));
    }

    #[test]
    fn test_api_error_message() {
        let body = r#"{"error": {"code": 400, "message": "API key not valid. Please pass a valid API key.", "status": "INVALID_ARGUMENT"}}"#;
        let message = api_error_message(StatusCode::BAD_REQUEST, body);
        assert_eq!(
            message,
            "Gemini API error 400 Bad Request (INVALID_ARGUMENT): API key not valid. Please pass a valid API key."
        );

        let message = api_error_message(StatusCode::TOO_MANY_REQUESTS, "");
        assert_eq!(message, "Gemini API error 429 Too Many Requests");

        let message = api_error_message(StatusCode::BAD_GATEWAY, "upstream down");
        assert_eq!(message, "Gemini API error 502 Bad Gateway: upstream down");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_generation_error() {
        let client = client_for("http://127.0.0.1:9");
        let err = client.generate("Explain gravity").await.unwrap_err();
        assert!(matches!(err, StudyError::Generation(_)));
        assert!(err.to_string().starts_with("request to Gemini failed"));
    }
}

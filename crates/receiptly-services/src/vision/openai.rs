//! OpenAI-compatible chat completions client for receipt extraction

use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use serde_json::json;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::time::Duration;

use super::{VisionClient, VisionError, VisionRequest};

/// Sends receipts to a vision-capable chat completions endpoint.
#[derive(Clone)]
pub struct OpenAiVisionClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl Debug for OpenAiVisionClient {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("OpenAiVisionClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

impl OpenAiVisionClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        max_tokens: u32,
        timeout: Duration,
    ) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::error!(error = %e, "Failed to create HTTP client for vision API, using default client");
                reqwest::Client::default()
            });

        Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            max_tokens,
        }
    }

    /// PDFs travel as a file part, images as an `image_url` data URL.
    fn content_part(request: &VisionRequest) -> serde_json::Value {
        let encoded = base64::engine::general_purpose::STANDARD.encode(&request.data);
        let data_url = format!("data:{};base64,{}", request.mime_type, encoded);

        if request.mime_type == "application/pdf" {
            json!({
                "type": "file",
                "file": {
                    "filename": request.filename,
                    "file_data": data_url
                }
            })
        } else {
            json!({
                "type": "image_url",
                "image_url": { "url": data_url }
            })
        }
    }
}

#[async_trait]
impl VisionClient for OpenAiVisionClient {
    async fn extract(&self, request: VisionRequest) -> Result<String, VisionError> {
        let url = format!("{}/chat/completions", self.base_url);

        let request_body = json!({
            "model": self.model,
            "messages": [
                {
                    "role": "user",
                    "content": [
                        { "type": "text", "text": request.prompt },
                        Self::content_part(&request)
                    ]
                }
            ],
            "max_tokens": self.max_tokens
        });

        tracing::debug!(
            model = %self.model,
            mime_type = %request.mime_type,
            size_bytes = request.data.len(),
            "Sending receipt extraction request to vision API"
        );

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| VisionError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            let message = serde_json::from_str::<serde_json::Value>(&error_text)
                .ok()
                .and_then(|body| {
                    let error = body.get("error")?;
                    let message = error.get("message")?.as_str()?;
                    let error_type = error
                        .get("type")
                        .and_then(|t| t.as_str())
                        .unwrap_or("api_error");
                    Some(format!("{}: {}", error_type, message))
                })
                .unwrap_or(error_text);

            return Err(VisionError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let chat_response: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| VisionError::InvalidResponse(e.to_string()))?;

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|s| s.trim().to_string())
            .unwrap_or_default();

        tracing::debug!(
            response_length = content.len(),
            "Received vision API response"
        );

        Ok(content)
    }
}

// Chat Completions API response types
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn request(mime_type: &str) -> VisionRequest {
        VisionRequest {
            prompt: "Read this receipt".to_string(),
            filename: "receipt".to_string(),
            mime_type: mime_type.to_string(),
            data: vec![0xFF, 0xD8, 0xFF, 0xE0],
        }
    }

    fn client(base_url: &str) -> OpenAiVisionClient {
        OpenAiVisionClient::new(base_url, "sk-test", "gpt-4o", 300, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_extract_returns_message_content() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::PartialJson(json!({
                "model": "gpt-4o",
                "max_tokens": 300
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "choices": [{
                        "message": { "role": "assistant", "content": " {\"merchant\":\"Cafe\"} " },
                        "finish_reason": "stop"
                    }]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let content = client(&server.url())
            .extract(request("image/jpeg"))
            .await
            .unwrap();

        assert_eq!(content, "{\"merchant\":\"Cafe\"}");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_extract_surfaces_api_error_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .with_body(
                json!({"error": {"message": "Rate limit reached", "type": "rate_limit"}})
                    .to_string(),
            )
            .create_async()
            .await;

        let err = client(&server.url())
            .extract(request("image/png"))
            .await
            .unwrap_err();

        match err {
            VisionError::Api { status, message } => {
                assert_eq!(status, 429);
                assert!(message.contains("Rate limit reached"));
            }
            other => panic!("expected API error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_request_error() {
        let err = client("http://127.0.0.1:9")
            .extract(request("image/png"))
            .await
            .unwrap_err();
        assert!(matches!(err, VisionError::Request(_)));
    }

    #[test]
    fn test_pdf_is_sent_as_file_part() {
        let part = OpenAiVisionClient::content_part(&request("application/pdf"));
        assert_eq!(part["type"], "file");
        assert!(part["file"]["file_data"]
            .as_str()
            .unwrap()
            .starts_with("data:application/pdf;base64,"));

        let part = OpenAiVisionClient::content_part(&request("image/jpeg"));
        assert_eq!(part["type"], "image_url");
        assert!(part["image_url"]["url"]
            .as_str()
            .unwrap()
            .starts_with("data:image/jpeg;base64,"));
    }
}

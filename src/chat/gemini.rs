//! Client for the Gemini `generateContent` REST endpoint.

use super::{ChatClient, ChatError, ChatRequest};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";

/// Substituted when the provider answers successfully but without text.
pub const EMPTY_REPLY: &str =
    "I'm having a little trouble, but you're smart enough to solve this! Try asking again.";

/// Longest slice of an error body kept in [`ChatError::Api`].
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: GEMINI_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text {
        text: &'a str,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData<'a>,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    thinking_config: ThinkingConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    thinking_budget: u32,
}

impl<'a> GenerateContentRequest<'a> {
    fn from_chat(request: &'a ChatRequest) -> Self {
        let mut parts = vec![Part::Text {
            text: &request.prompt,
        }];
        if let Some(image) = &request.image {
            parts.push(Part::InlineData {
                inline_data: InlineData {
                    mime_type: &image.mime_type,
                    data: &image.data,
                },
            });
        }
        Self {
            system_instruction: request.system_instruction.as_deref().map(|text| Content {
                parts: vec![Part::Text { text }],
            }),
            contents: vec![Content { parts }],
            generation_config: GenerationConfig {
                thinking_config: ThinkingConfig { thinking_budget: 0 },
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

/// JSON body sent for a chat request.
pub fn request_body(request: &ChatRequest) -> serde_json::Result<serde_json::Value> {
    serde_json::to_value(GenerateContentRequest::from_chat(request))
}

/// Concatenated text of the first candidate, or `None` when it carries no text.
pub fn reply_text(body: &str) -> Result<Option<String>, ChatError> {
    let response: GenerateContentResponse =
        serde_json::from_str(body).map_err(|err| ChatError::UnexpectedResponse {
            message: err.to_string(),
        })?;
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();
    if text.trim().is_empty() {
        Ok(None)
    } else {
        Ok(Some(text))
    }
}

pub struct GeminiClient {
    client: Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self, ChatError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ChatError::Network {
                message: format!("Failed to build HTTP client: {}", e),
            })?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }
}

impl ChatClient for GeminiClient {
    async fn send(&self, request: &ChatRequest) -> Result<String, ChatError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or(ChatError::MissingApiKey)?;

        let body = GenerateContentRequest::from_chat(request);
        let start = Instant::now();
        debug!(
            model = %self.config.model,
            has_image = request.image.is_some(),
            "sending generateContent request"
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let mut message = text;
            if message.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !message.is_char_boundary(cut) {
                    cut -= 1;
                }
                message.truncate(cut);
            }
            warn!(status = status.as_u16(), "model provider returned an error status");
            return Err(ChatError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let reply = reply_text(&text)?;
        info!(
            model = %self.config.model,
            duration_ms = start.elapsed().as_millis() as u64,
            empty = reply.is_none(),
            "generateContent completed"
        );
        Ok(reply.unwrap_or_else(|| EMPTY_REPLY.to_string()))
    }
}

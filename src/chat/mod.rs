//! Chat panel: history, image attachments and the model collaborator.
//!
//! A failed request never surfaces to the user. It is logged and replaced by
//! a single fallback assistant message; nothing is retried.

pub mod error;
pub mod gemini;

pub use error::ChatError;
pub use gemini::{GeminiClient, GeminiConfig};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use tracing::{error, info, warn};

pub const PERSONA_INSTRUCTION: &str = "You are the 'Academic Concierge', a warm, sophisticated and \
brilliant mentor for a BBA student. Your tone is premium, encouraging and deeply knowledgeable \
about business topics (Marketing, Finance, Management, BIS). When answering: \
1. Be concise but insightful. \
2. Use business terminology correctly but explain it simply when the student is stuck. \
3. If a photo is attached, analyze the business context or math problem immediately. \
4. Always end with a short, high-energy line of encouragement.";

pub const FALLBACK_REPLY: &str = "I hit a glitch. Try again!";

pub const STUDY_TIPS_FALLBACK: &str = "The AI advisor is taking a quick break. Believe in yourself!";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub role: ChatRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// An image split out of a `data:<mime>;base64,<payload>` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAttachment {
    pub mime_type: String,
    pub data: String,
}

impl ImageAttachment {
    pub fn from_data_url(url: &str) -> Result<Self, ChatError> {
        let (header, data) = url.split_once(";base64,").ok_or_else(|| {
            ChatError::InvalidAttachment {
                message: "expected a base64 data URL".into(),
            }
        })?;
        let mime_type = header.strip_prefix("data:").unwrap_or(header).trim();
        if !mime_type.starts_with("image/") {
            return Err(ChatError::InvalidAttachment {
                message: format!("unsupported mime type '{mime_type}'"),
            });
        }
        STANDARD
            .decode(data)
            .map_err(|err| ChatError::InvalidAttachment {
                message: format!("payload is not valid base64: {err}"),
            })?;
        Ok(Self {
            mime_type: mime_type.to_string(),
            data: data.to_string(),
        })
    }

    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: STANDARD.encode(bytes),
        }
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub system_instruction: Option<String>,
    pub prompt: String,
    pub image: Option<ImageAttachment>,
}

/// The outbound model collaborator.
pub trait ChatClient {
    fn send(&self, request: &ChatRequest) -> impl Future<Output = Result<String, ChatError>> + Send;
}

/// Chat history plus the at-most-one-in-flight guard.
#[derive(Debug, Clone)]
pub struct ChatSession {
    messages: Vec<ChatMessage>,
    persona: String,
    in_flight: bool,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::from_history(Vec::new())
    }
}

impl ChatSession {
    pub fn from_history(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            persona: PERSONA_INSTRUCTION.to_string(),
            in_flight: false,
        }
    }

    pub fn with_persona(mut self, persona: impl Into<String>) -> Self {
        self.persona = persona.into();
        self
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Drop the outstanding request without a reply. Returns whether one was
    /// outstanding; the user's message stays in the history.
    pub fn cancel(&mut self) -> bool {
        if !self.in_flight {
            return false;
        }
        self.in_flight = false;
        warn!("chat reply abandoned before it arrived");
        true
    }

    fn next_id(&self, now: DateTime<Utc>, offset: i64) -> String {
        let mut stamp = now.timestamp_millis() + offset;
        while self.messages.iter().any(|m| m.id == stamp.to_string()) {
            stamp += 1;
        }
        stamp.to_string()
    }

    /// Append the user's message and build the outbound request.
    pub fn begin(
        &mut self,
        query: &str,
        image_data_url: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<ChatRequest, ChatError> {
        let image_data_url = image_data_url.filter(|url| !url.trim().is_empty());
        if query.trim().is_empty() && image_data_url.is_none() {
            return Err(ChatError::EmptyMessage);
        }
        if self.in_flight {
            warn!("chat send rejected while a reply is outstanding");
            return Err(ChatError::Busy);
        }
        let image = image_data_url.map(ImageAttachment::from_data_url).transpose()?;

        self.messages.push(ChatMessage {
            id: self.next_id(now, 0),
            role: ChatRole::User,
            content: query.to_string(),
            image: image_data_url.map(ToOwned::to_owned),
            timestamp: now,
        });
        self.in_flight = true;

        Ok(ChatRequest {
            system_instruction: Some(self.persona.clone()),
            prompt: query.to_string(),
            image,
        })
    }

    /// Record the outcome of the request started by [`ChatSession::begin`].
    pub fn finish(&mut self, result: Result<String, ChatError>, now: DateTime<Utc>) -> &ChatMessage {
        self.in_flight = false;
        let content = match result {
            Ok(text) => {
                info!(chars = text.len(), "chat reply received");
                text
            }
            Err(err) => {
                error!(error = %err, "chat request failed, substituting fallback reply");
                FALLBACK_REPLY.to_string()
            }
        };
        let id = self.next_id(now, 10);
        self.messages.push(ChatMessage {
            id,
            role: ChatRole::Assistant,
            content,
            image: None,
            timestamp: now,
        });
        &self.messages[self.messages.len() - 1]
    }

    pub async fn ask<C: ChatClient>(
        &mut self,
        client: &C,
        query: &str,
        image_data_url: Option<&str>,
    ) -> Result<&ChatMessage, ChatError> {
        let request = self.begin(query, image_data_url, Utc::now())?;
        let mut pending = PendingReply {
            session: &mut *self,
            armed: true,
        };
        let result = client.send(&request).await;
        pending.armed = false;
        drop(pending);
        Ok(self.finish(result, Utc::now()))
    }
}

/// Clears the in-flight flag when an `ask` future is dropped mid-request.
struct PendingReply<'a> {
    session: &'a mut ChatSession,
    armed: bool,
}

impl Drop for PendingReply<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.session.cancel();
        }
    }
}

pub fn study_tips_prompt(subject: &str) -> String {
    format!(
        "Provide 3 very sweet, encouraging and high-impact study tips for the BBA course \"{subject}\". \
Focus on professional growth and academic excellence. \
The tone should be supportive, professional yet warm. \
Format as a clean markdown list."
    )
}

/// One-shot study tips for a course; failures become a fixed encouragement.
pub async fn study_tips<C: ChatClient>(client: &C, subject: &str) -> String {
    let request = ChatRequest {
        system_instruction: None,
        prompt: study_tips_prompt(subject),
        image: None,
    };
    match client.send(&request).await {
        Ok(text) => text,
        Err(err) => {
            error!(subject, error = %err, "study tips request failed");
            STUDY_TIPS_FALLBACK.to_string()
        }
    }
}

//! Client for the external dream-analysis service.
//!
//! The service speaks the common chat-completions shape: an ordered list
//! of `{role, content}` messages in, one assistant message out. Failures
//! never reach the user as errors; the chat view shows [`APOLOGY`]
//! instead.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::ServiceConfig;

pub const GREETING: &str = "Hello! I'm your dream analysis AI. Share your dream with me, \
     and I'll help you understand its deeper meaning.";

pub const APOLOGY: &str = "I apologize, but I encountered an error. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("analysis request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("analysis service returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("analysis service returned no message")]
    EmptyResponse,
}

#[derive(Clone)]
pub struct ChatService {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl ChatService {
    pub fn new(config: &ServiceConfig) -> Self {
        ChatService {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: std::env::var("DREAM_JOURNAL_API_KEY").ok(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Send the full transcript and return the assistant's reply.
    pub async fn send(&self, messages: &[ChatMessage]) -> Result<String, ChatError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest {
            model: &self.model,
            messages,
        };

        let mut request = self.client.post(&url).timeout(self.timeout).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(ChatError::Status(response.status()));
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or(ChatError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_uses_lowercase_roles() {
        let messages = vec![
            ChatMessage {
                role: Role::Assistant,
                content: GREETING.into(),
            },
            ChatMessage {
                role: Role::User,
                content: "I dreamed of flying".into(),
            },
        ];
        let body = ChatRequest {
            model: "test-model",
            messages: &messages,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["messages"][0]["role"], "assistant");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["model"], "test-model");
    }

    #[test]
    fn response_parsing_takes_the_first_choice() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"A symbol of freedom."}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(
            parsed.choices.into_iter().next().unwrap().message.content,
            "A symbol of freedom."
        );
    }
}

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};

use crate::config::Config;
use crate::conversation::ChatMessage;
use crate::error::BackendError;

pub const DEBUG_REPLY: &str =
    "DEBUG MODE: This is a mock response. Set debug=false to use actual API.";

/// The AI completion boundary: full history in, one reply out.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn complete(
        &self,
        history: &[ChatMessage],
        cfg: &Config,
    ) -> Result<String, BackendError>;
}

/// Talks to any OpenAI-compatible chat-completions endpoint. With `debug`
/// enabled it answers offline with a canned reply, so every chat path works
/// without credentials or network.
pub struct OpenAiBackend {
    client: Client,
}

impl OpenAiBackend {
    pub fn new() -> Result<Self, BackendError> {
        let client = Client::builder().timeout(Duration::from_secs(120)).build()?;
        Ok(Self { client })
    }

    fn endpoint(base_url: &str) -> String {
        format!("{}/chat/completions", base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl Backend for OpenAiBackend {
    async fn complete(
        &self,
        history: &[ChatMessage],
        cfg: &Config,
    ) -> Result<String, BackendError> {
        if cfg.debug {
            return Ok(DEBUG_REPLY.to_string());
        }
        if cfg.api_key.trim().is_empty() {
            return Err(BackendError::MissingApiKey);
        }

        let body = json!({
            "model": cfg.model,
            "messages": history,
            "temperature": 0.2
        });

        let resp = self
            .client
            .post(Self::endpoint(&cfg.base_url))
            .bearer_auth(&cfg.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(BackendError::Api { status: status.as_u16(), body });
        }

        let text = resp.text().await?;
        let value: Value = match serde_json::from_str(&text) {
            Ok(value) => value,
            Err(err) => {
                tracing::debug!("unparsable completion payload: {err}");
                return Err(BackendError::EmptyResponse);
            }
        };
        let content = extract_content(&value).ok_or(BackendError::EmptyResponse)?;
        Ok(content.trim().to_string())
    }
}

fn extract_content(value: &Value) -> Option<String> {
    let content = value.get("choices")?.get(0)?.get("message")?.get("content")?;

    match content {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => {
            let mut out = String::new();
            for item in items {
                if item.get("type").and_then(|t| t.as_str()) == Some("text")
                    && let Some(t) = item.get("text").and_then(|t| t.as_str())
                {
                    out.push_str(t);
                }
            }
            if out.is_empty() { None } else { Some(out) }
        }
        _ => None,
    }
}

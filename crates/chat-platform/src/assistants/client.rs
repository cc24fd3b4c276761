//! Assistants API adapter.
//!
//! Speaks the hosted thread/run protocol over HTTPS with a bearer token and
//! the fixed `OpenAI-Beta` version header.
//! Uses browser `fetch()` via gloo-net for WASM compatibility.

use async_trait::async_trait;
use gloo_net::http::{Request, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use chat_core::ports::AssistantsPort;
use chat_types::{
    ChatError, Result,
    config::ApiConfig,
    message::ContentPart,
    thread::{Run, ThreadMessage},
};

use super::wire::*;

pub struct HttpAssistantsClient {
    config: ApiConfig,
}

impl HttpAssistantsClient {
    pub fn new(config: ApiConfig) -> Self {
        Self { config }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url(), path)
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("Authorization", &format!("Bearer {}", self.config.api_key))
            .header("OpenAI-Beta", &self.config.beta_header)
            .header("Content-Type", "application/json")
    }

    async fn post<B: serde::Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        log::debug!("POST {}", path);
        let request = self
            .authorize(Request::post(&self.url(path)))
            .json(body)
            .map_err(|e| ChatError::Serialization(e.to_string()))?;
        let response = request.send().await.map_err(|e| network_error(path, e))?;
        decode(path, response).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        log::debug!("GET {}", path);
        let response = self
            .authorize(Request::get(&self.url(path)))
            .send()
            .await
            .map_err(|e| network_error(path, e))?;
        decode(path, response).await
    }
}

fn network_error(path: &str, e: gloo_net::Error) -> ChatError {
    log::error!("Request to {} failed: {}", path, e);
    ChatError::Network(e.to_string())
}

async fn decode<T: DeserializeOwned>(path: &str, response: Response) -> Result<T> {
    if !response.ok() {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "unknown error".to_string());
        log::warn!("{} responded HTTP {}: {}", path, status, body);
        return Err(ChatError::Http { status, body });
    }

    let text = response
        .text()
        .await
        .map_err(|e| network_error(path, e))?;
    serde_json::from_str(&text).map_err(|e| {
        log::warn!("Unexpected response body from {}: {}", path, e);
        ChatError::from(e)
    })
}

#[async_trait(?Send)]
impl AssistantsPort for HttpAssistantsClient {
    async fn create_thread(&self) -> Result<String> {
        self.config.validate()?;
        let thread: ThreadObject = self.post("/threads", &serde_json::json!({})).await?;
        Ok(thread.id)
    }

    async fn add_message(&self, thread_id: &str, content: &[ContentPart]) -> Result<()> {
        let path = format!("/threads/{}/messages", thread_id);
        let _ack: serde_json::Value = self.post(&path, &CreateMessageBody::user(content)).await?;
        Ok(())
    }

    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> Result<Run> {
        let path = format!("/threads/{}/runs", thread_id);
        let run: RunObject = self.post(&path, &CreateRunBody { assistant_id }).await?;
        Ok(run.into_run(thread_id))
    }

    async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<Run> {
        let path = format!("/threads/{}/runs/{}", thread_id, run_id);
        let run: RunObject = self.get(&path).await?;
        Ok(run.into_run(thread_id))
    }

    async fn latest_messages(&self, thread_id: &str, limit: u32) -> Result<Vec<ThreadMessage>> {
        let path = format!("/threads/{}/messages?limit={}", thread_id, limit);
        // A reply in an unexpected shape is reported as unreadable, not as
        // a transport failure, so the caller can fall back to its placeholder.
        let list: MessageList = self.get(&path).await.map_err(|e| match e {
            ChatError::Serialization(detail) => ChatError::ResponseParse(detail),
            other => other,
        })?;
        Ok(list.into_messages())
    }
}

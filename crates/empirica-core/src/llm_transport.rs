//! Language-model transport abstraction.
//!
//! The core treats the LM as an opaque `ask(prompt_text, model_id?) -> reply_text`
//! function; errors from it propagate unchanged, the core does not classify
//! them. Concrete providers (Anthropic, OpenAI, etc.) live outside this crate;
//! [`StubLlmTransport`] is a placeholder for unwired backends and
//! [`ScriptedLlmTransport`] is a small in-memory fixture for tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use tokio::sync::Mutex;

#[derive(Debug, thiserror::Error)]
pub enum LlmTransportError {
    #[error("llm transport not configured: {0}")]
    NotConfigured(String),
    #[error("llm transport error: {0}")]
    Transport(String),
    #[error("llm transport timed out")]
    Timeout,
}

#[async_trait]
pub trait LlmTransport: Send + Sync {
    /// Send `prompt_text` to the model and return its raw reply text.
    async fn ask(
        &self,
        prompt_text: &str,
        model_id: Option<&str>,
    ) -> Result<String, LlmTransportError>;

    /// Human-readable transport name, used in diagnostics and metadata.
    fn name(&self) -> &str;
}

/// A placeholder transport that always returns `NotConfigured`.
#[derive(Debug, Clone)]
pub struct StubLlmTransport {
    transport_name: String,
}

impl StubLlmTransport {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            transport_name: name.into(),
        }
    }
}

#[async_trait]
impl LlmTransport for StubLlmTransport {
    async fn ask(
        &self,
        _prompt_text: &str,
        _model_id: Option<&str>,
    ) -> Result<String, LlmTransportError> {
        Err(LlmTransportError::NotConfigured(format!(
            "{} transport is not configured — install a concrete implementation",
            self.transport_name
        )))
    }

    fn name(&self) -> &str {
        &self.transport_name
    }
}

/// An in-memory transport that plays back a fixed queue of replies, one per
/// `ask` call. Used by cascade tests to script an LM conversation without a
/// network call.
pub struct ScriptedLlmTransport {
    replies: Mutex<VecDeque<String>>,
}

impl ScriptedLlmTransport {
    pub fn new(replies: impl IntoIterator<Item = String>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
        }
    }
}

#[async_trait]
impl LlmTransport for ScriptedLlmTransport {
    async fn ask(
        &self,
        _prompt_text: &str,
        _model_id: Option<&str>,
    ) -> Result<String, LlmTransportError> {
        let mut replies = self.replies.lock().await;
        replies
            .pop_front()
            .ok_or_else(|| LlmTransportError::Transport("scripted replies exhausted".into()))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stub_transport_refuses() {
        let transport = StubLlmTransport::new("anthropic");
        let err = transport.ask("hello", None).await.unwrap_err();
        assert!(matches!(err, LlmTransportError::NotConfigured(_)));
    }

    #[tokio::test]
    async fn scripted_transport_plays_back_in_order() {
        let transport = ScriptedLlmTransport::new(["first".to_string(), "second".to_string()]);
        assert_eq!(transport.ask("p", None).await.unwrap(), "first");
        assert_eq!(transport.ask("p", None).await.unwrap(), "second");
        assert!(transport.ask("p", None).await.is_err());
    }
}

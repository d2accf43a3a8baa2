//! Language model seams used by pack selection and by packs themselves.
//!
//! Two shapes are accepted: plain prompt-in/text-out models ([`LanguageModel`],
//! with [`FnModel`] for closures) and chat models that take a list of
//! messages ([`ChatModel`], adapted through [`ChatAdapter`]).

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A text completion model: one prompt in, one reply out.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A chat-style model: takes the conversation so far, returns the next message.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<ChatMessage>;
}

/// Presents a [`ChatModel`] as a [`LanguageModel`] by sending the prompt as a single user message.
pub struct ChatAdapter<C> {
    inner: C,
}

impl<C: ChatModel> ChatAdapter<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<C: ChatModel> LanguageModel for ChatAdapter<C> {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let reply = self.inner.chat(&[ChatMessage::user(prompt)]).await?;
        Ok(reply.content)
    }
}

type CompletionFn = dyn Fn(&str) -> Result<String> + Send + Sync;

/// Wraps a synchronous closure as a [`LanguageModel`].
#[derive(Clone)]
pub struct FnModel {
    f: Arc<CompletionFn>,
}

impl FnModel {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&str) -> Result<String> + Send + Sync + 'static,
    {
        Self { f: Arc::new(f) }
    }
}

impl fmt::Debug for FnModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnModel").finish_non_exhaustive()
    }
}

#[async_trait]
impl LanguageModel for FnModel {
    async fn complete(&self, prompt: &str) -> Result<String> {
        (self.f)(prompt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoChat;

    #[async_trait]
    impl ChatModel for EchoChat {
        async fn chat(&self, messages: &[ChatMessage]) -> Result<ChatMessage> {
            assert_eq!(messages.len(), 1);
            assert_eq!(messages[0].role, Role::User);
            Ok(ChatMessage {
                role: Role::Assistant,
                content: format!("echo: {}", messages[0].content),
            })
        }
    }

    #[tokio::test]
    async fn test_chat_adapter_sends_single_user_message() {
        let model = ChatAdapter::new(EchoChat);
        assert_eq!(model.complete("hi").await.unwrap(), "echo: hi");
    }

    #[tokio::test]
    async fn test_fn_model() {
        let model = FnModel::new(|prompt| Ok(prompt.to_uppercase()));
        assert_eq!(model.complete("abc").await.unwrap(), "ABC");

        let failing = FnModel::new(|_| anyhow::bail!("quota exceeded"));
        assert!(failing.complete("abc").await.is_err());
    }

    #[test]
    fn test_role_serialization() {
        let json = serde_json::to_string(&ChatMessage::user("x")).unwrap();
        assert_eq!(json, r#"{"role":"user","content":"x"}"#);
    }
}

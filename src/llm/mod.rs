//! Generation backend.
//!
//! [`ChatBackend`] is the seam between the translation loop and the network. The
//! production implementation is [`LlmClient`]; tests substitute scripted backends.

pub mod client;
pub mod env;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::descriptor::AgentConfig;
use crate::errors::LlmError;
pub use client::LlmClient;

/// A role-tagged message sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new("assistant", content)
    }
}

/// Sends a conversation to a model and returns the reply text.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn chat(
        &self,
        agent: &AgentConfig,
        model: &str,
        messages: &[ChatMessage],
    ) -> Result<String, LlmError>;
}

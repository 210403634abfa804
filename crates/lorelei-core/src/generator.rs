use anyhow::Result;
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Model,
}

/// One entry of the conversation history sent to the generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn model(content: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            content: content.into(),
        }
    }
}

/// A trait abstracting the generative dialogue model.
///
/// Adapters for concrete providers (Gemini, OpenAI) live in the service crate.
/// The history always ends with the `user` turn to answer. Implementations
/// must resolve within a bounded time and report transport or quota problems
/// as errors rather than retrying.
#[async_trait]
#[cfg_attr(test, automock)]
pub trait Generator: Send + Sync {
    async fn generate(&self, history: &[Turn]) -> Result<String>;
}

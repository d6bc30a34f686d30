//! Scripted Provider
//!
//! Replays canned model replies in order and records every prompt it was
//! sent. Used for offline runs and for tests that drive the relay loop.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::error::{AgentError, Result};
use crate::message::Message;
use crate::provider::{Completion, GenerationOptions, LlmProvider, ModelInfo};

#[derive(Default)]
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedProvider {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Every message list passed to `complete`, oldest first
    pub fn prompts(&self) -> Result<Vec<Vec<Message>>> {
        Ok(self.prompts.lock().map_err(poisoned)?.clone())
    }
}

fn poisoned<E>(_: E) -> AgentError {
    AgentError::Provider("scripted provider lock poisoned".into())
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    async fn complete(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<Completion> {
        self.prompts.lock().map_err(poisoned)?.push(messages.to_vec());

        let reply = self
            .replies
            .lock()
            .map_err(poisoned)?
            .pop_front()
            .ok_or_else(|| AgentError::Provider("script exhausted".into()))?;

        Ok(Completion::text(&options.model, reply))
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        Ok(vec![ModelInfo {
            id: "scripted".into(),
            name: "scripted".into(),
        }])
    }
}

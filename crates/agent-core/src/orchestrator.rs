//! Orchestrator Boundary
//!
//! The narrow interface callers use to hand a message to the model-driven
//! orchestrator: submit a message plus context, receive a structured result.
//! Which tools run, and in what order, is decided behind this trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::thread::ThreadId;

/// One conversational turn
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Invocation {
    /// Natural-language request
    pub message: String,

    /// Caller identity, visible to tools through `ToolContext`
    pub user_id: String,

    /// Conversation this turn belongs to
    pub thread_id: ThreadId,
}

impl Invocation {
    pub fn new(message: impl Into<String>, user_id: impl Into<String>, thread_id: ThreadId) -> Self {
        Self {
            message: message.into(),
            user_id: user_id.into(),
            thread_id,
        }
    }
}

/// Final answer of one turn, already checked against the output schema
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StructuredOutput {
    pub thread_id: ThreadId,

    /// Schema-conforming JSON object
    pub value: serde_json::Value,

    /// Tools invoked during the turn, in call order
    pub tool_calls: Vec<String>,
}

/// Submit a message with context, receive a structured result
#[async_trait]
pub trait Orchestrator: Send + Sync {
    async fn invoke(&self, invocation: Invocation) -> Result<StructuredOutput>;
}

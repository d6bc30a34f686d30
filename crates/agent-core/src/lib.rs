//! # agent-core
//!
//! Provider-agnostic tool surface and orchestrator boundary.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Orchestrator (trait)                     │
//! │  ┌─────────────┐  ┌─────────────┐  ┌──────────────────────┐  │
//! │  │ Relay loop  │  │    Tools    │  │   LlmProvider        │  │
//! │  │  (Agent)    │──│   Registry  │──│   (Strategy)         │  │
//! │  └─────────────┘  └─────────────┘  └──────────────────────┘  │
//! │         │                                                    │
//! │  ┌─────────────┐  ┌─────────────┐                            │
//! │  │ ThreadStore │  │OutputSchema │                            │
//! │  └─────────────┘  └─────────────┘                            │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Tools declare a name, a description and typed parameters. The model
//! behind `LlmProvider` decides which to call; the relay loop only executes
//! them and checks the final answer against the declared `OutputSchema`.

pub mod error;
pub mod message;
pub mod orchestrator;
pub mod provider;
pub mod reasoning;
pub mod schema;
pub mod scripted;
pub mod thread;
pub mod tool;

pub use error::{AgentError, Result};
pub use message::{Conversation, Message, Role};
pub use orchestrator::{Invocation, Orchestrator, StructuredOutput};
pub use provider::{GenerationOptions, LlmProvider};
pub use reasoning::{Agent, AgentBuilder, AgentConfig};
pub use schema::{FieldSchema, FieldType, OutputSchema};
pub use scripted::ScriptedProvider;
pub use thread::{MemoryThreadStore, Thread, ThreadId, ThreadStore};
pub use tool::{ParameterSchema, Tool, ToolCall, ToolContext, ToolRegistry, ToolResult, ToolSchema};

//! Tool Relay Loop
//!
//! [`Agent`] is the default [`Orchestrator`]: it forwards the thread history
//! to an [`LlmProvider`], runs whatever tool call the model emits, feeds the
//! result back, and stops once the model replies with a JSON object that
//! satisfies the [`OutputSchema`]. Tool choice and ordering belong to the model.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex as TurnLock;
use tracing::{debug, warn};

use crate::error::{AgentError, Result};
use crate::message::Message;
use crate::orchestrator::{Invocation, Orchestrator, StructuredOutput};
use crate::provider::{GenerationOptions, LlmProvider};
use crate::schema::OutputSchema;
use crate::thread::{MemoryThreadStore, Thread, ThreadId, ThreadStore};
use crate::tool::{ToolCall, ToolContext, ToolRegistry, ToolResult};

/// Agent configuration
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// Fixed instruction placed at the top of every thread
    pub system_prompt: String,

    /// Model round-trips allowed per invocation
    pub max_iterations: usize,

    pub generation: GenerationOptions,

    /// Deadline for a whole invocation, tool calls included
    pub timeout: Duration,

    /// Whether to append tool descriptions to the system prompt
    pub inject_tool_descriptions: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.into(),
            max_iterations: 10,
            generation: GenerationOptions::default(),
            timeout: Duration::from_secs(120),
            inject_tool_descriptions: true,
        }
    }
}

const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant. Use the available tools to gather facts before answering.";

/// The main Agent struct
pub struct Agent {
    provider: Arc<dyn LlmProvider>,
    tools: Arc<ToolRegistry>,
    schema: OutputSchema,
    store: Arc<dyn ThreadStore>,
    config: AgentConfig,

    /// One lock per thread; turns on the same thread run one at a time
    turn_locks: Mutex<HashMap<ThreadId, Arc<TurnLock<()>>>>,
}

impl Agent {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        tools: Arc<ToolRegistry>,
        schema: OutputSchema,
        store: Arc<dyn ThreadStore>,
        config: AgentConfig,
    ) -> Self {
        Self {
            provider,
            tools,
            schema,
            store,
            config,
            turn_locks: Mutex::new(HashMap::new()),
        }
    }

    fn turn_lock(&self, thread_id: &ThreadId) -> Result<Arc<TurnLock<()>>> {
        let mut locks = self
            .turn_locks
            .lock()
            .map_err(|_| AgentError::Thread("turn lock table poisoned".into()))?;
        Ok(locks.entry(thread_id.clone()).or_default().clone())
    }

    /// Full system prompt: instruction, tool descriptions, answer schema
    pub fn build_system_prompt(&self) -> String {
        let mut prompt = self.config.system_prompt.clone();

        if self.config.inject_tool_descriptions && !self.tools.is_empty() {
            prompt.push_str("\n\n");
            prompt.push_str(&self.tools.generate_prompt_section());
        }

        prompt.push('\n');
        prompt.push_str(&self.schema.prompt_section());
        prompt
    }

    async fn run(&self, invocation: Invocation) -> Result<StructuredOutput> {
        let Invocation {
            message,
            user_id,
            thread_id,
        } = invocation;

        let lock = self.turn_lock(&thread_id)?;
        let _turn = lock.lock().await;

        let mut thread = self
            .store
            .load(&thread_id)?
            .unwrap_or_else(|| Thread::new(thread_id.clone()));
        if thread.user_id.as_deref().is_some_and(|owner| owner != user_id) {
            return Err(AgentError::ThreadOwnership(thread_id.to_string()));
        }
        thread.user_id.get_or_insert_with(|| user_id.clone());
        thread.conversation.set_system_prompt(self.build_system_prompt());
        thread.conversation.push(Message::user(message));

        let ctx = ToolContext::new(user_id, thread_id.clone());
        let mut tool_calls = Vec::new();

        for iteration in 1..=self.config.max_iterations {
            thread.conversation.truncate_to_fit();

            let completion = self
                .provider
                .complete(thread.conversation.messages(), &self.config.generation)
                .await?;
            let content = completion.content;
            thread.conversation.push(Message::assistant(&content));

            match parse_tool_call(&content) {
                Some(Ok(call)) => {
                    debug!(thread = %thread_id, iteration, tool = %call.name, "executing tool");

                    let result = self.execute_tool(&call, &ctx).await;
                    thread.conversation.push(Message::tool(
                        &call.name,
                        format_tool_result(&result),
                        call.id.clone(),
                    ));
                    tool_calls.push(call.name);
                    continue;
                }
                Some(Err(e)) => {
                    warn!(thread = %thread_id, iteration, error = %e, "malformed tool call");
                    thread.conversation.push(Message::user(format!(
                        "Your tool call could not be parsed ({e}). Send it again as a ```tool block \
                         holding {{\"tool\": \"<name>\", \"arguments\": {{...}}}}."
                    )));
                    continue;
                }
                None => {}
            }

            let answer = OutputSchema::extract(&content)
                .ok_or_else(|| AgentError::Schema("reply contained no JSON object".into()))
                .and_then(|value| self.schema.validate(value));

            match answer {
                Ok(value) => {
                    thread.touch();
                    self.store.save(&thread)?;
                    debug!(thread = %thread_id, iteration, tools = tool_calls.len(), "final answer accepted");
                    return Ok(StructuredOutput {
                        thread_id,
                        value,
                        tool_calls,
                    });
                }
                Err(e) => {
                    warn!(thread = %thread_id, iteration, error = %e, "final answer rejected");
                    thread.conversation.push(Message::user(format!(
                        "Your answer was not accepted ({e}). Reply with only the JSON object described in the instructions."
                    )));
                }
            }
        }

        thread.touch();
        self.store.save(&thread)?;
        Err(AgentError::MaxIterations(self.config.max_iterations))
    }

    /// Execute a tool call; failures become failed results for the model
    async fn execute_tool(&self, call: &ToolCall, ctx: &ToolContext) -> ToolResult {
        let mut result = match self.tools.execute(call, ctx).await {
            Ok(result) => result,
            Err(e) => {
                warn!(tool = %call.name, error = %e, "tool call failed");
                ToolResult::failure(&call.name, format!("Error: {e}"))
            }
        };
        result.id.clone_from(&call.id);
        result
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn schema(&self) -> &OutputSchema {
        &self.schema
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }
}

#[async_trait]
impl Orchestrator for Agent {
    async fn invoke(&self, invocation: Invocation) -> Result<StructuredOutput> {
        let timeout = self.config.timeout;
        tokio::time::timeout(timeout, self.run(invocation))
            .await
            .unwrap_or(Err(AgentError::Timeout(timeout)))
    }
}

/// Parse a tool call from model output: a ```tool block first, then an
/// inline JSON object with a "tool" key. A ```tool block that does not
/// hold a valid call is an error; anything else without one is `None`.
fn parse_tool_call(content: &str) -> Option<Result<ToolCall>> {
    const FENCE: &str = "```tool";

    let parsed = match content.find(FENCE) {
        Some(start) => {
            let after = &content[start + FENCE.len()..];
            let body = after.find("```").map_or(after, |end| &after[..end]);
            serde_json::from_str::<ToolCall>(body.trim())
                .map_err(|e| AgentError::Parse(format!("invalid tool call: {e}")))
        }
        None => Ok(parse_inline_tool_call(content)?),
    };

    Some(parsed.map(|mut call| {
        if call.id.is_none() {
            call.id = Some(uuid::Uuid::new_v4().to_string());
        }
        call
    }))
}

fn parse_inline_tool_call(content: &str) -> Option<ToolCall> {
    if !content.contains(r#""tool""#) {
        return None;
    }

    let start = content.find('{')?;
    let end = content.rfind('}')?;
    if end <= start {
        return None;
    }

    serde_json::from_str::<ToolCall>(&content[start..=end]).ok()
}

fn format_tool_result(result: &ToolResult) -> String {
    if result.success {
        format!("[Tool '{}' returned]\n{}", result.name, result.output)
    } else {
        format!("[Tool '{}' failed]\n{}", result.name, result.output)
    }
}

/// Builder for Agent configuration
pub struct AgentBuilder {
    provider: Option<Arc<dyn LlmProvider>>,
    tools: ToolRegistry,
    schema: Option<OutputSchema>,
    store: Option<Arc<dyn ThreadStore>>,
    config: AgentConfig,
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            tools: ToolRegistry::new(),
            schema: None,
            store: None,
            config: AgentConfig::default(),
        }
    }

    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn tool<T: crate::tool::Tool + 'static>(mut self, tool: T) -> Self {
        self.tools.register(tool);
        self
    }

    pub fn tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    pub fn output_schema(mut self, schema: OutputSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn thread_store(mut self, store: Arc<dyn ThreadStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = prompt.into();
        self
    }

    pub fn generation(mut self, generation: GenerationOptions) -> Self {
        self.config.generation = generation;
        self
    }

    pub fn temperature(mut self, temp: f32) -> Self {
        self.config.generation.temperature = temp;
        self
    }

    pub fn max_iterations(mut self, max: usize) -> Self {
        self.config.max_iterations = max;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn build(self) -> Result<Agent> {
        let provider = self
            .provider
            .ok_or_else(|| AgentError::Config("Provider is required".into()))?;
        let schema = self
            .schema
            .ok_or_else(|| AgentError::Config("Output schema is required".into()))?;
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryThreadStore::new()));

        Ok(Agent::new(
            provider,
            Arc::new(self.tools),
            schema,
            store,
            self.config,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Role;
    use crate::provider::{Completion, ModelInfo};
    use crate::schema::FieldSchema;
    use crate::scripted::ScriptedProvider;
    use crate::tool::{Tool, ToolSchema};

    struct StalledProvider;

    #[async_trait]
    impl LlmProvider for StalledProvider {
        fn name(&self) -> &str {
            "stalled"
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        async fn complete(&self, _messages: &[Message], options: &GenerationOptions) -> Result<Completion> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(Completion::text(&options.model, "{\"user\": \"late\"}"))
        }

        async fn list_models(&self) -> Result<Vec<ModelInfo>> {
            Ok(vec![])
        }
    }

    struct WhoAmI;

    #[async_trait]
    impl Tool for WhoAmI {
        fn schema(&self) -> ToolSchema {
            ToolSchema {
                name: "whoami".into(),
                description: "Return the caller".into(),
                parameters: vec![],
                category: None,
                has_side_effects: false,
            }
        }

        async fn execute(&self, _call: &ToolCall, ctx: &ToolContext) -> Result<ToolResult> {
            Ok(ToolResult::success("whoami", ctx.user_id.clone()))
        }
    }

    fn agent(provider: Arc<ScriptedProvider>, store: Arc<dyn ThreadStore>) -> Agent {
        AgentBuilder::new()
            .provider(provider)
            .tool(WhoAmI)
            .output_schema(OutputSchema::new("Who", vec![FieldSchema::string("user", "Caller")]))
            .thread_store(store)
            .max_iterations(4)
            .build()
            .unwrap()
    }

    #[test]
    fn test_parse_fenced_tool_call() {
        let content = "Let me check.\n```tool\n{\"tool\": \"whoami\", \"arguments\": {}}\n```";
        let call = parse_tool_call(content).unwrap().unwrap();
        assert_eq!(call.name, "whoami");
        assert!(call.id.is_some());
    }

    #[test]
    fn test_parse_inline_tool_call() {
        let call = parse_tool_call(r#"{"tool": "get_stock", "arguments": {"symbol": "MSFT"}}"#)
            .unwrap()
            .unwrap();
        assert_eq!(call.str_arg("symbol"), Some("MSFT"));
    }

    #[test]
    fn test_final_answer_is_not_a_tool_call() {
        assert!(parse_tool_call(r#"{"symbol": "MSFT", "price": 410.5}"#).is_none());
    }

    #[test]
    fn test_malformed_fenced_tool_call() {
        let content = "```tool\n{\"tool\": \"whoami\", \"arguments\": {\n```";
        assert!(matches!(parse_tool_call(content), Some(Err(AgentError::Parse(_)))));
    }

    #[test]
    fn test_builder_requires_schema() {
        let result = AgentBuilder::new()
            .provider(Arc::new(ScriptedProvider::default()))
            .build();
        assert!(matches!(result, Err(AgentError::Config(_))));
    }

    #[tokio::test]
    async fn test_tool_then_answer() {
        let provider = Arc::new(ScriptedProvider::new([
            "```tool\n{\"tool\": \"whoami\"}\n```",
            "```json\n{\"user\": \"jake\"}\n```",
        ]));
        let store: Arc<dyn ThreadStore> = Arc::new(MemoryThreadStore::new());
        let agent = agent(provider.clone(), store);

        let out = agent
            .invoke(Invocation::new("who am I?", "jake", ThreadId::from_string("t")))
            .await
            .unwrap();

        assert_eq!(out.value["user"], "jake");
        assert_eq!(out.tool_calls, vec!["whoami"]);

        let prompts = provider.prompts().unwrap();
        let tool_msg = prompts[1].last().unwrap();
        assert_eq!(tool_msg.role, Role::Tool);
        assert!(tool_msg.content.contains("jake"));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_reported_to_model() {
        let provider = Arc::new(ScriptedProvider::new([
            "```tool\n{\"tool\": \"nope\"}\n```",
            "{\"user\": \"x\"}",
        ]));
        let agent = agent(provider.clone(), Arc::new(MemoryThreadStore::new()));

        let out = agent
            .invoke(Invocation::new("hi", "x", ThreadId::new()))
            .await
            .unwrap();
        assert_eq!(out.tool_calls, vec!["nope"]);

        let prompts = provider.prompts().unwrap();
        assert!(prompts[1].last().unwrap().content.contains("failed"));
    }

    #[tokio::test]
    async fn test_schema_violation_is_corrected() {
        let provider = Arc::new(ScriptedProvider::new(["I think you are jake.", "{\"user\": \"jake\"}"]));
        let agent = agent(provider.clone(), Arc::new(MemoryThreadStore::new()));

        let out = agent
            .invoke(Invocation::new("hi", "jake", ThreadId::new()))
            .await
            .unwrap();
        assert_eq!(out.value["user"], "jake");
        assert_eq!(provider.prompts().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_max_iterations() {
        let provider = Arc::new(ScriptedProvider::new(vec!["```tool\n{\"tool\": \"whoami\"}\n```"; 4]));
        let agent = agent(provider, Arc::new(MemoryThreadStore::new()));

        let err = agent
            .invoke(Invocation::new("loop", "jake", ThreadId::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::MaxIterations(4)));
    }

    #[tokio::test]
    async fn test_thread_history_carries_over() {
        let provider = Arc::new(ScriptedProvider::new(["{\"user\": \"a\"}", "{\"user\": \"b\"}"]));
        let store: Arc<dyn ThreadStore> = Arc::new(MemoryThreadStore::new());
        let agent = agent(provider.clone(), store.clone());
        let thread = ThreadId::from_string("1");

        agent.invoke(Invocation::new("first", "jake", thread.clone())).await.unwrap();
        agent.invoke(Invocation::new("second", "jake", thread.clone())).await.unwrap();

        let prompts = provider.prompts().unwrap();
        let second = &prompts[1];
        assert!(second.iter().any(|m| m.content == "first"));
        assert_eq!(second.iter().filter(|m| m.role == Role::System).count(), 1);

        let saved = store.load(&thread).unwrap().unwrap();
        assert_eq!(saved.turns(), 2);
        assert_eq!(saved.user_id.as_deref(), Some("jake"));
    }

    #[tokio::test]
    async fn test_malformed_tool_call_is_reported_to_model() {
        let provider = Arc::new(ScriptedProvider::new([
            "```tool\n{\"tool\": whoami}\n```",
            "{\"user\": \"jake\"}",
        ]));
        let agent = agent(provider.clone(), Arc::new(MemoryThreadStore::new()));

        let out = agent
            .invoke(Invocation::new("hi", "jake", ThreadId::new()))
            .await
            .unwrap();
        assert!(out.tool_calls.is_empty());

        let prompts = provider.prompts().unwrap();
        let correction = prompts[1].last().unwrap();
        assert_eq!(correction.role, Role::User);
        assert!(correction.content.contains("tool call could not be parsed"));
    }

    #[tokio::test]
    async fn test_thread_rejects_other_user() {
        let provider = Arc::new(ScriptedProvider::new(["{\"user\": \"jake\"}", "{\"user\": \"jack\"}"]));
        let store: Arc<dyn ThreadStore> = Arc::new(MemoryThreadStore::new());
        let agent = agent(provider.clone(), store.clone());
        let thread = ThreadId::from_string("1");

        agent.invoke(Invocation::new("mine", "jake", thread.clone())).await.unwrap();
        let err = agent
            .invoke(Invocation::new("whose?", "jack", thread.clone()))
            .await
            .unwrap_err();

        assert!(matches!(err, AgentError::ThreadOwnership(id) if id == "1"));
        assert_eq!(provider.prompts().unwrap().len(), 1);
        assert_eq!(store.load(&thread).unwrap().unwrap().turns(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_turns_keep_both() {
        let provider = Arc::new(ScriptedProvider::new(["{\"user\": \"a\"}", "{\"user\": \"b\"}"]));
        let store: Arc<dyn ThreadStore> = Arc::new(MemoryThreadStore::new());
        let agent = agent(provider, store.clone());
        let thread = ThreadId::from_string("shared");

        let (first, second) = tokio::join!(
            agent.invoke(Invocation::new("first", "jake", thread.clone())),
            agent.invoke(Invocation::new("second", "jake", thread.clone())),
        );
        first.unwrap();
        second.unwrap();

        let saved = store.load(&thread).unwrap().unwrap();
        assert_eq!(saved.turns(), 2);
    }

    #[tokio::test]
    async fn test_invocation_timeout() {
        let agent = AgentBuilder::new()
            .provider(Arc::new(StalledProvider))
            .output_schema(OutputSchema::new("Who", vec![FieldSchema::string("user", "Caller")]))
            .timeout(Duration::from_millis(50))
            .build()
            .unwrap();

        let err = agent
            .invoke(Invocation::new("hi", "jake", ThreadId::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Timeout(d) if d == Duration::from_millis(50)));
    }
}

//! End-to-end turn pipeline tests with a scripted LLM and a recording
//! channel adapter.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use herald_domain::config::RuntimeConfig;
use herald_domain::event::{RuntimeEvent, RuntimeEventType};
use herald_domain::message::{Message, Role};
use herald_domain::outcome::FinishReason;
use herald_domain::stream::Usage;
use herald_domain::tool::{ToolCall, ToolDefinition};
use herald_domain::Result;
use herald_providers::{ChatRequest, ChatResponse, LlmError, LlmPort, LlmResult};
use herald_runtime::ports::{ChannelPort, RateLimitPort, RateLimitResult};
use herald_runtime::{Orchestrator, RuntimeState};
use herald_tools::ToolComponent;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Mocks
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// LLM that replays a fixed script of responses and records requests.
struct ScriptedLlm {
    script: Mutex<VecDeque<LlmResult<ChatResponse>>>,
    requests: Mutex<Vec<ChatRequest>>,
    calls: AtomicUsize,
}

impl ScriptedLlm {
    fn new(script: Vec<LlmResult<ChatResponse>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        })
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn last_request(&self) -> ChatRequest {
        self.requests.lock().last().cloned().expect("no requests")
    }
}

#[async_trait::async_trait]
impl LlmPort for ScriptedLlm {
    async fn chat(&self, req: ChatRequest) -> LlmResult<ChatResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(req);
        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::Other("script exhausted".into())))
    }

    fn provider_id(&self) -> &str {
        "scripted"
    }
}

fn final_response(text: &str) -> LlmResult<ChatResponse> {
    Ok(ChatResponse {
        content: Some(text.to_string()),
        tool_calls: Vec::new(),
        usage: Some(Usage {
            input_tokens: 10,
            output_tokens: 5,
        }),
        model: "default-model".into(),
        finish_reason: Some("stop".into()),
    })
}

fn tool_call_response(call_id: &str, tool: &str, args: Value) -> LlmResult<ChatResponse> {
    Ok(ChatResponse {
        content: None,
        tool_calls: vec![ToolCall {
            id: call_id.into(),
            name: tool.into(),
            arguments: args,
        }],
        usage: None,
        model: "default-model".into(),
        finish_reason: Some("tool_calls".into()),
    })
}

/// Channel adapter that records every send.
struct RecordingChannel {
    sent: Mutex<Vec<(String, String)>>,
    events: Mutex<Vec<RuntimeEvent>>,
}

impl RecordingChannel {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            events: Mutex::new(Vec::new()),
        })
    }

    fn sent_texts(&self) -> Vec<String> {
        self.sent.lock().iter().map(|(_, t)| t.clone()).collect()
    }
}

#[async_trait::async_trait]
impl ChannelPort for RecordingChannel {
    fn channel_type(&self) -> &str {
        "test"
    }

    async fn send_message(&self, chat_id: &str, text: &str, _attachments: &[String]) -> Result<()> {
        self.sent.lock().push((chat_id.to_string(), text.to_string()));
        Ok(())
    }

    async fn send_runtime_event(&self, _chat_id: &str, event: &RuntimeEvent) -> Result<()> {
        self.events.lock().push(event.clone());
        Ok(())
    }
}

/// Shell-flavored echo tool that counts executions.
struct EchoShell {
    executions: AtomicUsize,
}

impl EchoShell {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            executions: AtomicUsize::new(0),
        })
    }

    fn execution_count(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ToolComponent for EchoShell {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "shell".into(),
            description: "Run a shell command.".into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": { "cmd": { "type": "string" } },
                "required": ["cmd"]
            }),
        }
    }

    async fn execute(&self, arguments: &Value) -> Result<String> {
        self.executions.fetch_add(1, Ordering::SeqCst);
        let cmd = arguments.get("cmd").and_then(Value::as_str).unwrap_or("");
        Ok(match cmd.strip_prefix("echo ") {
            Some(rest) => format!("{rest}\n"),
            None => String::new(),
        })
    }
}

struct DenyAll;

impl RateLimitPort for DenyAll {
    fn try_consume(&self) -> RateLimitResult {
        RateLimitResult {
            allowed: false,
            retry_after: Some(std::time::Duration::from_secs(30)),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Harness
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

struct Harness {
    state: Arc<RuntimeState>,
    orchestrator: Orchestrator,
    llm: Arc<ScriptedLlm>,
    channel: Arc<RecordingChannel>,
    shell: Arc<EchoShell>,
    plan_rx: tokio::sync::mpsc::UnboundedReceiver<herald_domain::event::PlanReadyEvent>,
}

fn harness_with(config: RuntimeConfig, script: Vec<LlmResult<ChatResponse>>) -> Harness {
    let llm = ScriptedLlm::new(script);
    let (mut state, plan_rx) = RuntimeState::new(config, llm.clone());

    let channel = RecordingChannel::new();
    state.register_channel(channel.clone());

    let shell = EchoShell::new();
    state.tool_registry.register(shell.clone());

    let state = Arc::new(state);
    let orchestrator = Orchestrator::new(state.clone());
    Harness {
        state,
        orchestrator,
        llm,
        channel,
        shell,
        plan_rx,
    }
}

fn harness(script: Vec<LlmResult<ChatResponse>>) -> Harness {
    harness_with(RuntimeConfig::default(), script)
}

fn user_message(chat_id: &str, text: &str) -> Message {
    Message::user(text).with_channel("test", chat_id)
}

fn history_of(state: &RuntimeState, chat_id: &str) -> Vec<Message> {
    state
        .sessions
        .get_or_create("test", chat_id)
        .read()
        .messages
        .clone()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Scenarios
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn happy_path_single_tool() {
    let mut h = harness(vec![
        tool_call_response("tc1", "shell", serde_json::json!({"cmd": "echo hello"})),
        final_response("Done: hello"),
    ]);

    let ctx = h
        .orchestrator
        .process_message(user_message("c1", "Say hello via shell"))
        .await;

    // History: user, assistant(tool_calls), tool, assistant(final).
    let history = history_of(&h.state, "c1");
    assert_eq!(history.len(), 4);
    assert_eq!(history[0].role, Role::User);
    assert_eq!(history[1].role, Role::Assistant);
    assert_eq!(history[1].tool_calls.len(), 1);
    assert_eq!(history[2].role, Role::Tool);
    assert_eq!(history[2].tool_call_id.as_deref(), Some("tc1"));
    assert_eq!(history[2].content_str(), "hello\n");
    assert_eq!(history[3].role, Role::Assistant);
    assert_eq!(history[3].content_str(), "Done: hello");

    assert_eq!(h.llm.call_count(), 2);
    assert!(ctx.final_answer_ready);
    assert!(ctx.loop_complete);
    assert_eq!(
        ctx.turn_outcome.as_ref().unwrap().finish_reason,
        FinishReason::Success
    );
    assert_eq!(h.channel.sent_texts(), vec!["Done: hello"]);
    assert!(h.plan_rx.try_recv().is_err());
}

#[tokio::test]
async fn multi_step_two_tools() {
    let h = harness(vec![
        tool_call_response("tc1", "shell", serde_json::json!({"cmd": "echo one"})),
        tool_call_response("tc2", "shell", serde_json::json!({"cmd": "echo two"})),
        final_response("final"),
    ]);

    let ctx = h
        .orchestrator
        .process_message(user_message("c2", "two steps please"))
        .await;

    let history = history_of(&h.state, "c2");
    assert_eq!(history.len(), 6);
    assert_eq!(h.shell.execution_count(), 2);
    assert_eq!(h.llm.call_count(), 3);
    assert_eq!(
        ctx.turn_outcome.as_ref().unwrap().finish_reason,
        FinishReason::Success
    );

    // Every tool call has a matching result later in history.
    for call_id in ["tc1", "tc2"] {
        let call_pos = history
            .iter()
            .position(|m| m.tool_calls.iter().any(|c| c.id == call_id))
            .unwrap();
        let result_pos = history
            .iter()
            .position(|m| m.tool_call_id.as_deref() == Some(call_id))
            .unwrap();
        assert!(result_pos > call_pos);
    }
}

#[tokio::test]
async fn model_switch_flattens_view_and_preserves_raw_history() {
    let h = harness(vec![final_response("fresh answer")]);

    // Seed a prior tool round under another model.
    let session = h.state.sessions.get_or_create("test", "c3");
    h.state.history.append_assistant(
        &session,
        Some("working".into()),
        vec![ToolCall {
            id: "old1".into(),
            name: "shell".into(),
            arguments: serde_json::json!({"cmd": "echo hi"}),
        }],
    );
    h.state.history.append_tool(&session, "old1", "shell", "hi\n");
    session.write().set_last_model("old-model");

    h.orchestrator
        .process_message(user_message("c3", "continue"))
        .await;

    // The LLM request view is flattened: no tool calls, masked text.
    let request = h.llm.last_request();
    assert!(request.messages.iter().all(|m| m.tool_calls.is_empty()));
    assert!(request.messages.iter().all(|m| m.role != Role::Tool));
    let joined: Vec<&str> = request.messages.iter().map(|m| m.content_str()).collect();
    assert!(joined.iter().any(|c| c.contains("[masked: 1 tool call(s)]")));
    assert!(joined.iter().any(|c| c.contains("[Tool result: shell]")));

    // Raw history still carries the original structure.
    let history = history_of(&h.state, "c3");
    assert!(history.iter().any(|m| !m.tool_calls.is_empty()));
    assert!(history.iter().any(|m| m.role == Role::Tool));

    // Metadata now tracks the new model.
    assert_eq!(
        h.state
            .sessions
            .get_or_create("test", "c3")
            .read()
            .last_model(),
        Some("default-model")
    );
}

#[tokio::test]
async fn plan_mode_intercepts_and_finalizes() {
    let mut config = RuntimeConfig::default();
    config.plan.enabled = true;
    let mut h = harness_with(
        config,
        vec![
            tool_call_response("tc1", "shell", serde_json::json!({"cmd": "echo hi"})),
            final_response("Plan drafted"),
        ],
    );

    h.state.plan.activate_plan_mode("c4");

    let ctx = h
        .orchestrator
        .process_message(user_message("c4", "set something up"))
        .await;

    // No external execution; the call became a plan step.
    assert_eq!(h.shell.execution_count(), 0);
    let plan = h.state.plan.active_plan("c4").expect("plan still active");
    assert_eq!(plan.steps.len(), 1);
    assert_eq!(plan.steps[0].tool_name, "shell");

    // Synthetic outcome landed in history as the tool result.
    let history = history_of(&h.state, "c4");
    let tool_msg = history.iter().find(|m| m.role == Role::Tool).unwrap();
    assert!(tool_msg.content_str().contains("Recorded as plan step 1"));

    // Finalization: event published, approval flagged, summary appended.
    let event = h.plan_rx.try_recv().expect("plan ready event");
    assert_eq!(event.plan_id, plan.id);
    assert_eq!(event.chat_id, "c4");
    assert_eq!(ctx.plan_approval_needed.as_deref(), Some(plan.id.as_str()));

    let texts = h.channel.sent_texts();
    assert_eq!(texts.len(), 1);
    assert!(texts[0].contains("Plan drafted"));
    assert!(texts[0].contains("Waiting for approval"));
    assert!(texts[0].contains("1. shell"));
}

#[tokio::test]
async fn empty_plan_is_cancelled_without_event() {
    let mut config = RuntimeConfig::default();
    config.plan.enabled = true;
    let mut h = harness_with(config, vec![final_response("nothing to do")]);

    h.state.plan.activate_plan_mode("c5");

    let ctx = h
        .orchestrator
        .process_message(user_message("c5", "never mind"))
        .await;

    assert!(h.state.plan.active_plan("c5").is_none());
    assert!(h.plan_rx.try_recv().is_err());
    assert!(ctx.plan_approval_needed.is_none());
    assert_eq!(h.channel.sent_texts(), vec!["nothing to do"]);
}

#[tokio::test]
async fn feedback_guarantee_replies_on_llm_error() {
    let h = harness(vec![Err(LlmError::Http {
        status: 500,
        message: "upstream broke".into(),
    })]);

    let ctx = h
        .orchestrator
        .process_message(user_message("c6", "hello?"))
        .await;

    assert_eq!(ctx.llm_error.as_deref(), Some("internal_server"));
    let expected = h
        .state
        .preferences
        .get_message("system.error.generic.feedback");
    assert_eq!(
        ctx.outgoing_response.as_ref().unwrap().text,
        expected
    );
    assert_eq!(h.channel.sent_texts(), vec![expected]);

    // The failure closes the turn with a TURN_FAILED event.
    assert!(h
        .channel
        .events
        .lock()
        .iter()
        .any(|e| e.event_type == RuntimeEventType::TurnFailed));

    // No assistant message was fabricated into history.
    let history = history_of(&h.state, "c6");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].role, Role::User);
}

#[tokio::test]
async fn rate_limited_turn_rejects_without_llm() {
    let llm = ScriptedLlm::new(vec![final_response("never sent")]);
    let (mut state, _plan_rx) = RuntimeState::new(RuntimeConfig::default(), llm.clone());
    let channel = RecordingChannel::new();
    state.register_channel(channel.clone());
    state.rate_limit = Arc::new(DenyAll);
    let state = Arc::new(state);
    let orchestrator = Orchestrator::new(state.clone());

    orchestrator
        .process_message(user_message("c7", "too fast"))
        .await;

    assert_eq!(llm.call_count(), 0);
    let texts = channel.sent_texts();
    assert_eq!(texts.len(), 1);
    assert!(texts[0].contains("too quickly"));
    assert!(texts[0].contains("Retry in 30s."));

    // The rejected message never enters history.
    assert!(history_of(&state, "c7").is_empty());
}

#[tokio::test]
async fn tool_limit_surfaces_last_response_text() {
    let mut config = RuntimeConfig::default();
    config.max_iterations = 2;
    let h = harness_with(
        config,
        vec![
            tool_call_response("tc1", "shell", serde_json::json!({"cmd": "echo a"})),
            Ok(ChatResponse {
                content: Some("still working".into()),
                tool_calls: vec![ToolCall {
                    id: "tc2".into(),
                    name: "shell".into(),
                    arguments: serde_json::json!({"cmd": "echo b"}),
                }],
                usage: None,
                model: "default-model".into(),
                finish_reason: Some("tool_calls".into()),
            }),
        ],
    );

    let ctx = h
        .orchestrator
        .process_message(user_message("c8", "loop forever"))
        .await;

    let outcome = ctx.turn_outcome.as_ref().unwrap();
    assert_eq!(outcome.finish_reason, FinishReason::ToolLimit);
    assert_eq!(outcome.assistant_text.as_deref(), Some("still working"));
    assert!(!ctx.final_answer_ready);
    assert_eq!(h.channel.sent_texts(), vec!["still working"]);
}

#[tokio::test]
async fn auto_mode_suppresses_feedback_on_error() {
    let h = harness(vec![Err(LlmError::Timeout("llm stalled".into()))]);

    let auto = user_message("c9", "tick")
        .with_metadata(herald_domain::keys::AUTO_MODE, serde_json::json!(true));
    let ctx = h.orchestrator.process_message(auto).await;

    assert_eq!(ctx.llm_error.as_deref(), Some("timeout"));
    assert!(ctx.outgoing_response.is_none());
    assert!(h.channel.sent_texts().is_empty());
}

#[tokio::test]
async fn turn_lifecycle_events_reach_the_channel() {
    let h = harness(vec![final_response("ok")]);

    h.orchestrator
        .process_message(user_message("c10", "hi"))
        .await;

    let events = h.channel.events.lock();
    let kinds: Vec<RuntimeEventType> = events.iter().map(|e| e.event_type).collect();
    assert!(kinds.contains(&RuntimeEventType::TurnStarted));
    assert!(kinds.contains(&RuntimeEventType::TurnFinished));
    assert!(!kinds.contains(&RuntimeEventType::TurnFailed));
}

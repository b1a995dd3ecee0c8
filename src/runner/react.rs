//! ReAct 运行器
//!
//! Plan -> 工具闸门（授权 / 审批）-> Act -> Observe -> 下一轮 Plan。
//! 某一步中任一工具调用需要决策时，整步挂起：待执行的调用写入检查点，流中发出 Interrupts 后结束本次 Pass；
//! 收到 RunInput::Resume 后按位置把决策配回这些调用，从挂起点继续。
//!
//! 每次 Pass 在独立任务中运行，通过 mpsc 通道把更新推给消费方。

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream;
use tokio::sync::mpsc;

use crate::core::AgentError;
use crate::interrupt::Decision;
use crate::llm::LlmClient;
use crate::memory::Message;
use crate::runner::{
    parse_llm_output, AgentMessage, AgentRunner, AgentUpdate, Checkpoint, CheckpointStore, Gate,
    PendingCall, PendingSuspension, Planner, PlannerOutput, RunConfig, RunInput, ToolCall,
    UpdateStream,
};
use crate::tools::{render_tool_catalog, tool_call_schema_json, ToolDescriptor, ToolExecutor};

/// 单次 Pass 默认最大步数，防止死循环
pub const DEFAULT_MAX_STEPS: usize = 20;

type UpdateSender = mpsc::UnboundedSender<Result<AgentUpdate, AgentError>>;

/// 需要人工批准的工具；"*" 表示全部
#[derive(Debug, Clone, Default)]
pub struct ApprovalPolicy {
    all: bool,
    tools: HashSet<String>,
}

impl ApprovalPolicy {
    pub fn new(tools: &[String]) -> Self {
        Self {
            all: tools.iter().any(|t| t == "*"),
            tools: tools.iter().cloned().collect(),
        }
    }

    pub fn requires(&self, tool: &str) -> bool {
        self.all || self.tools.contains(tool)
    }
}

#[derive(Clone)]
pub struct ReactRunner {
    planner: Arc<Planner>,
    executor: ToolExecutor,
    catalog: Arc<HashMap<String, ToolDescriptor>>,
    approval: Arc<ApprovalPolicy>,
    checkpoints: Arc<CheckpointStore>,
    identity: String,
    max_steps: usize,
    /// 发给 LLM 的最近轮数，0 表示全部历史
    context_turns: usize,
}

/// 拼接 system prompt：基础 prompt + 工具清单 + 调用格式
fn compose_system_prompt(base: &str, tools: &[ToolDescriptor]) -> String {
    format!(
        "{}\n\n{}\nTo call a tool, reply with ONLY a JSON object matching this schema:\n{}\n\
         To call several tools in one step, reply with a JSON array of such objects.\n\
         Each tool result arrives as a user message starting with \"Observation from <tool>:\".\n\
         When you have the final answer, reply in plain text without JSON.",
        base.trim(),
        render_tool_catalog(tools),
        tool_call_schema_json()
    )
}

impl ReactRunner {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        base_prompt: &str,
        tools: Vec<ToolDescriptor>,
        executor: ToolExecutor,
        identity: impl Into<String>,
    ) -> Self {
        let system_prompt = compose_system_prompt(base_prompt, &tools);
        let catalog = tools.into_iter().map(|t| (t.name.clone(), t)).collect();
        Self {
            planner: Arc::new(Planner::new(llm, system_prompt)),
            executor,
            catalog: Arc::new(catalog),
            approval: Arc::new(ApprovalPolicy::default()),
            checkpoints: Arc::new(CheckpointStore::new()),
            identity: identity.into(),
            max_steps: DEFAULT_MAX_STEPS,
            context_turns: 0,
        }
    }

    pub fn with_approval(mut self, policy: ApprovalPolicy) -> Self {
        self.approval = Arc::new(policy);
        self
    }

    pub fn with_checkpoints(mut self, store: Arc<CheckpointStore>) -> Self {
        self.checkpoints = store;
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps.max(1);
        self
    }

    pub fn with_context_turns(mut self, turns: usize) -> Self {
        self.context_turns = turns;
        self
    }

    pub fn checkpoints(&self) -> Arc<CheckpointStore> {
        Arc::clone(&self.checkpoints)
    }

    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.catalog.keys().cloned().collect();
        names.sort();
        names
    }

    async fn run_pass(&self, input: RunInput, thread_id: &str, tx: &UpdateSender) -> Result<(), AgentError> {
        let mut checkpoint = self.checkpoints.load(thread_id).await;
        let result = self.drive(&mut checkpoint, input, thread_id, tx).await;
        self.checkpoints.save(thread_id, checkpoint).await;
        let (prompt, completion, total) = self.planner.token_usage();
        tracing::debug!(thread = %thread_id, prompt, completion, total, "token usage");
        result
    }

    async fn drive(
        &self,
        cp: &mut Checkpoint,
        input: RunInput,
        thread_id: &str,
        tx: &UpdateSender,
    ) -> Result<(), AgentError> {
        let mut step = match input {
            RunInput::Message(text) => {
                if let Some(pending) = cp.pending.take() {
                    tracing::warn!(thread = %thread_id, "new message discards pending suspension");
                    abandon(
                        cp,
                        pending.calls.iter().map(|c| &c.call),
                        "the user sent a new message instead of deciding",
                    );
                }
                cp.conversation.begin_turn(Message::user(text));
                0
            }
            RunInput::Resume(command) => {
                let pending = cp
                    .pending
                    .take()
                    .ok_or_else(|| AgentError::NothingToResume(thread_id.to_string()))?;
                let expected = pending.gated_count();
                let decisions = command.decisions();
                if decisions.len() != expected {
                    let err = AgentError::ResumeMismatch {
                        expected,
                        got: decisions.len(),
                    };
                    abandon(cp, pending.calls.iter().map(|c| &c.call), &err.to_string());
                    return Err(err);
                }
                tracing::info!(thread = %thread_id, decisions = expected, "resuming suspended step");
                let step = pending.step;
                let results = self
                    .run_calls(cp, pending.calls, &mut decisions.into_iter())
                    .await;
                send(tx, AgentUpdate::Messages(results));
                step + 1
            }
        };

        loop {
            if step >= self.max_steps {
                let text = format!("Reached the step limit ({}) for this turn.", self.max_steps);
                cp.conversation.push(Message::assistant(text.clone()));
                send(tx, AgentUpdate::Messages(vec![AgentMessage::Assistant { content: text }]));
                return Ok(());
            }

            let output = self
                .planner
                .plan(cp.conversation.recent_turns(self.context_turns))
                .await?;
            match parse_llm_output(&output) {
                Ok(PlannerOutput::Response(text)) => {
                    cp.conversation.push(Message::assistant(text.clone()));
                    send(tx, AgentUpdate::Messages(vec![AgentMessage::Assistant { content: text }]));
                    return Ok(());
                }
                Ok(PlannerOutput::ToolCalls(calls)) => {
                    cp.conversation.push(Message::assistant(output.trim().to_string()));
                    send(
                        tx,
                        AgentUpdate::Messages(
                            calls
                                .iter()
                                .map(|c| AgentMessage::ToolCall {
                                    tool: c.tool.clone(),
                                    args: c.args.clone(),
                                })
                                .collect(),
                        ),
                    );

                    let mut gates = Vec::with_capacity(calls.len());
                    for call in &calls {
                        match self.gate(call).await {
                            Ok(gate) => gates.push(gate),
                            Err(e) => {
                                abandon(cp, &calls, &e.to_string());
                                return Err(e);
                            }
                        }
                    }
                    let gated = calls
                        .into_iter()
                        .zip(gates)
                        .map(|(call, gate)| PendingCall { call, gate })
                        .collect();
                    let suspension = PendingSuspension { calls: gated, step };
                    if suspension.gated_count() > 0 {
                        let interrupts = suspension.interrupts();
                        tracing::info!(thread = %thread_id, count = interrupts.len(), "pass suspended");
                        cp.pending = Some(suspension);
                        send(tx, AgentUpdate::Interrupts(interrupts));
                        return Ok(());
                    }
                    let results = self
                        .run_calls(cp, suspension.calls, &mut std::iter::empty())
                        .await;
                    send(tx, AgentUpdate::Messages(results));
                }
                Err(e) => {
                    tracing::warn!(thread = %thread_id, "unparseable LLM output: {}", e);
                    cp.conversation.push(Message::user(format!(
                        "Your last output was not valid JSON ({e}). \
                         To call a tool reply with only {{\"tool\": \"name\", \"args\": {{...}}}}."
                    )));
                }
            }
            step += 1;
        }
    }

    /// 决定一次调用的闸门：未知工具 / 待授权 / 待审批 / 放行
    async fn gate(&self, call: &ToolCall) -> Result<Gate, AgentError> {
        let Some(tool) = self.catalog.get(&call.tool) else {
            return Ok(Gate::Unknown);
        };
        if tool.requires_authorization {
            let resp = self.executor.authorize(tool, &self.identity).await?;
            if !resp.is_completed() {
                return Ok(Gate::Authorization(resp));
            }
        }
        if self.approval.requires(&call.tool) {
            return Ok(Gate::Approval);
        }
        Ok(Gate::Open)
    }

    /// 按原顺序执行（或拒绝）一步中的调用，观察写回对话；gated 调用依次消费 decisions
    async fn run_calls(
        &self,
        cp: &mut Checkpoint,
        calls: Vec<PendingCall>,
        decisions: &mut (dyn Iterator<Item = Decision> + Send),
    ) -> Vec<AgentMessage> {
        let mut results = Vec::with_capacity(calls.len());
        for PendingCall { call, gate } in calls {
            let observation = if gate.is_gated() && !decisions.next().map(|d| d.authorized).unwrap_or(false) {
                format!("Tool call to {} was not authorized by the user.", call.tool)
            } else {
                self.observe(&call, &gate).await
            };
            cp.conversation.push(Message::user(format!(
                "Observation from {}: {}",
                call.tool, observation
            )));
            results.push(AgentMessage::ToolResult {
                tool: call.tool,
                content: observation,
            });
        }
        results
    }

    async fn observe(&self, call: &ToolCall, gate: &Gate) -> String {
        let tool = match (gate, self.catalog.get(&call.tool)) {
            (Gate::Unknown, _) | (_, None) => {
                tracing::warn!(tool = %call.tool, "model requested a tool outside the catalog");
                return format!(
                    "Error: {}. Available tools: {}",
                    AgentError::HallucinatedTool(call.tool.clone()),
                    self.tool_names().join(", ")
                );
            }
            (_, Some(tool)) => tool,
        };
        match self
            .executor
            .execute(tool, call.args.clone(), &self.identity)
            .await
        {
            Ok(out) => out,
            Err(e) => format!("Error: {e}"),
        }
    }
}

/// 给未执行的调用补上错误观察，使历史中的每个调用请求都有对应结果
fn abandon<'a>(cp: &mut Checkpoint, calls: impl IntoIterator<Item = &'a ToolCall>, reason: &str) {
    for call in calls {
        cp.conversation.push(Message::user(format!(
            "Observation from {}: Tool call to {} was not executed: {}",
            call.tool, call.tool, reason
        )));
    }
}

fn send(tx: &UpdateSender, update: AgentUpdate) {
    if tx.send(Ok(update)).is_err() {
        tracing::debug!("update receiver dropped");
    }
}

#[async_trait]
impl AgentRunner for ReactRunner {
    async fn stream(&self, input: RunInput, config: &RunConfig) -> Result<UpdateStream, AgentError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let runner = self.clone();
        let thread_id = config.thread_id.clone();
        tokio::spawn(async move {
            if let Err(e) = runner.run_pass(input, &thread_id, &tx).await {
                let _ = tx.send(Err(e));
            }
        });
        Ok(Box::pin(stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthorizationResponse;
    use crate::interrupt::{encode, Decision};
    use crate::llm::ScriptedLlmClient;
    use crate::memory::Role;
    use crate::tools::{EchoTool, LocalToolProvider, ToolBackend, ToolProvider, ToolRegistry};
    use futures_util::StreamExt;
    use serde_json::{json, Value};
    use std::sync::Mutex;

    /// 需要授权的远程工具替身：authorize 总是 pending，execute 记录调用
    #[derive(Default)]
    struct GatedBackend {
        executed: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ToolBackend for GatedBackend {
        async fn authorize(
            &self,
            tool: &ToolDescriptor,
            _identity: &str,
        ) -> Result<AuthorizationResponse, AgentError> {
            Ok(AuthorizationResponse {
                id: format!("ar_{}", tool.name),
                url: format!("https://auth/{}", tool.name),
                status: Some("pending".into()),
            })
        }

        async fn execute(
            &self,
            tool: &ToolDescriptor,
            input: Value,
            _identity: &str,
        ) -> Result<String, AgentError> {
            self.executed.lock().unwrap().push(tool.name.clone());
            Ok(format!("{} ran with {}", tool.name, input))
        }
    }

    /// 授权服务不可达的后端替身
    struct BrokenAuthBackend;

    #[async_trait]
    impl ToolBackend for BrokenAuthBackend {
        async fn authorize(
            &self,
            _tool: &ToolDescriptor,
            _identity: &str,
        ) -> Result<AuthorizationResponse, AgentError> {
            Err(AgentError::Transport("auth down".into()))
        }

        async fn execute(
            &self,
            tool: &ToolDescriptor,
            _input: Value,
            _identity: &str,
        ) -> Result<String, AgentError> {
            Ok(format!("{} ran", tool.name))
        }
    }

    fn descriptor(name: &str, requires_authorization: bool) -> ToolDescriptor {
        ToolDescriptor {
            name: name.into(),
            qualified_name: name.into(),
            description: format!("{name} tool"),
            toolkit: "Test".into(),
            parameters: json!({}),
            requires_authorization,
        }
    }

    async fn echo_runner(llm: Arc<ScriptedLlmClient>, approval: &[&str]) -> ReactRunner {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool);
        let provider = Arc::new(LocalToolProvider::new(registry));
        let tools = provider.resolve("u", &["Local".into()], &[], 10).await.unwrap();
        let approval: Vec<String> = approval.iter().map(|s| s.to_string()).collect();
        ReactRunner::new(llm, "You are a test agent.", tools, ToolExecutor::new(provider, 5), "u")
            .with_approval(ApprovalPolicy::new(&approval))
    }

    async fn run(runner: &ReactRunner, input: RunInput) -> Vec<Result<AgentUpdate, AgentError>> {
        runner
            .stream(input, &RunConfig::new("t"))
            .await
            .unwrap()
            .collect()
            .await
    }

    fn ok(updates: Vec<Result<AgentUpdate, AgentError>>) -> Vec<AgentUpdate> {
        updates.into_iter().map(|u| u.unwrap()).collect()
    }

    #[tokio::test]
    async fn test_plain_answer_single_update() {
        let llm = Arc::new(ScriptedLlmClient::new(["Here are 5 jobs."]));
        let runner = echo_runner(llm.clone(), &[]).await;
        let updates = ok(run(&runner, RunInput::Message("find jobs".into())).await);
        assert_eq!(
            updates,
            vec![AgentUpdate::Messages(vec![AgentMessage::Assistant {
                content: "Here are 5 jobs.".into()
            }])]
        );
        let system = &llm.calls()[0][0].content;
        assert!(system.contains("- echo: Echo text"));
    }

    #[tokio::test]
    async fn test_open_tool_executes_without_interrupt() {
        let llm = Arc::new(ScriptedLlmClient::new([
            r#"{"tool": "echo", "args": {"text": "hi"}}"#,
            "done",
        ]));
        let runner = echo_runner(llm.clone(), &[]).await;
        let updates = ok(run(&runner, RunInput::Message("say hi".into())).await);
        assert_eq!(updates.len(), 3);
        assert_eq!(
            updates[1],
            AgentUpdate::Messages(vec![AgentMessage::ToolResult {
                tool: "echo".into(),
                content: "hi".into()
            }])
        );
        let last_call = llm.calls().pop().unwrap();
        assert_eq!(last_call.last().unwrap().content, "Observation from echo: hi");
    }

    #[tokio::test]
    async fn test_approval_suspends_then_resumes() {
        let llm = Arc::new(ScriptedLlmClient::new([
            r#"{"tool": "echo", "args": {"text": "hi"}}"#,
            "finished",
        ]));
        let runner = echo_runner(llm.clone(), &["echo"]).await;
        let updates = ok(run(&runner, RunInput::Message("say hi".into())).await);
        match updates.last().unwrap() {
            AgentUpdate::Interrupts(list) => {
                assert_eq!(list.len(), 1);
                assert_eq!(list[0].value["hitl_required"], true);
                assert_eq!(list[0].value["input"]["text"], "hi");
            }
            other => panic!("Expected Interrupts, got {other:?}"),
        }
        assert!(runner.checkpoints().has_pending("t").await);
        assert_eq!(llm.calls().len(), 1);

        let resumed = ok(run(&runner, RunInput::Resume(encode(vec![Decision::allow()]))).await);
        assert_eq!(
            resumed[0],
            AgentUpdate::Messages(vec![AgentMessage::ToolResult {
                tool: "echo".into(),
                content: "hi".into()
            }])
        );
        assert_eq!(
            resumed[1],
            AgentUpdate::Messages(vec![AgentMessage::Assistant { content: "finished".into() }])
        );
        assert!(!runner.checkpoints().has_pending("t").await);
    }

    #[tokio::test]
    async fn test_denied_call_is_not_executed() {
        let llm = Arc::new(ScriptedLlmClient::new([
            r#"{"tool": "echo", "args": {"text": "hi"}}"#,
            "ok, skipped",
        ]));
        let runner = echo_runner(llm, &["*"]).await;
        run(&runner, RunInput::Message("say hi".into())).await;
        let resumed = ok(run(&runner, RunInput::Resume(encode(vec![Decision::deny()]))).await);
        assert_eq!(
            resumed[0],
            AgentUpdate::Messages(vec![AgentMessage::ToolResult {
                tool: "echo".into(),
                content: "Tool call to echo was not authorized by the user.".into()
            }])
        );
    }

    #[tokio::test]
    async fn test_multiple_interrupts_in_call_order() {
        let backend = Arc::new(GatedBackend::default());
        let llm = Arc::new(ScriptedLlmClient::new([
            r#"[{"tool": "free", "args": {}}, {"tool": "mail", "args": {"to": "a"}}, {"tool": "jobs", "args": {"q": "rust"}}]"#,
            "all done",
        ]));
        let runner = ReactRunner::new(
            llm,
            "test",
            vec![descriptor("free", false), descriptor("mail", true), descriptor("jobs", false)],
            ToolExecutor::new(backend.clone(), 5),
            "u",
        )
        .with_approval(ApprovalPolicy::new(&["jobs".to_string()]));

        let updates = ok(run(&runner, RunInput::Message("go".into())).await);
        let AgentUpdate::Interrupts(list) = updates.last().unwrap() else {
            panic!("Expected Interrupts");
        };
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].value["authorization_required"], true);
        assert_eq!(list[0].value["authorization_response"]["id"], "ar_mail");
        assert_eq!(list[1].value["tool_name"], "jobs");
        assert!(backend.executed.lock().unwrap().is_empty());

        let resumed = ok(run(
            &runner,
            RunInput::Resume(encode(vec![Decision::allow(), Decision::deny()])),
        )
        .await);
        let AgentUpdate::Messages(results) = &resumed[0] else {
            panic!("Expected tool results");
        };
        assert_eq!(results.len(), 3);
        assert_eq!(
            *backend.executed.lock().unwrap(),
            vec!["free".to_string(), "mail".to_string()]
        );
        assert!(matches!(&results[2], AgentMessage::ToolResult { content, .. } if content.contains("not authorized")));
    }

    #[tokio::test]
    async fn test_resume_without_pending_fails() {
        let llm = Arc::new(ScriptedLlmClient::new(Vec::<String>::new()));
        let runner = echo_runner(llm, &[]).await;
        let updates = run(&runner, RunInput::Resume(encode(vec![Decision::allow()]))).await;
        assert_eq!(updates.len(), 1);
        assert!(matches!(updates[0], Err(AgentError::NothingToResume(_))));
    }

    #[tokio::test]
    async fn test_resume_with_wrong_count_fails() {
        let llm = Arc::new(ScriptedLlmClient::new([r#"{"tool": "echo", "args": {"text": "x"}}"#]));
        let runner = echo_runner(llm, &["echo"]).await;
        run(&runner, RunInput::Message("x".into())).await;
        let updates = run(
            &runner,
            RunInput::Resume(encode(vec![Decision::allow(), Decision::allow()])),
        )
        .await;
        assert!(matches!(
            updates.last().unwrap(),
            Err(AgentError::ResumeMismatch { expected: 1, got: 2 })
        ));

        let cp = runner.checkpoints().load("t").await;
        assert!(cp.pending.is_none());
        let last = cp.conversation.messages().last().unwrap();
        assert_eq!(last.role, Role::User);
        assert!(last.content.starts_with("Observation from echo: Tool call to echo was not executed"));
        assert!(last.content.contains("expected 1 decisions, got 2"));
    }

    #[tokio::test]
    async fn test_gate_error_leaves_no_dangling_call() {
        let llm = Arc::new(ScriptedLlmClient::new([
            r#"[{"tool": "free", "args": {}}, {"tool": "mail", "args": {}}]"#,
            "recovered",
        ]));
        let runner = ReactRunner::new(
            llm.clone(),
            "test",
            vec![descriptor("free", false), descriptor("mail", true)],
            ToolExecutor::new(Arc::new(BrokenAuthBackend), 5),
            "u",
        );

        let updates = run(&runner, RunInput::Message("send it".into())).await;
        assert!(matches!(updates.last().unwrap(), Err(AgentError::Transport(m)) if m == "auth down"));

        ok(run(&runner, RunInput::Message("try again".into())).await);
        let history: Vec<String> = llm.calls()[1].iter().map(|m| m.content.clone()).collect();
        let call_at = history.iter().position(|m| m.starts_with('[')).unwrap();
        assert!(history[call_at + 1].starts_with("Observation from free: Tool call to free was not executed"));
        assert!(history[call_at + 2].starts_with("Observation from mail: Tool call to mail was not executed"));
        assert!(history[call_at + 2].ends_with("auth down"));
        assert_eq!(history[call_at + 3], "try again");
    }

    #[tokio::test]
    async fn test_new_message_answers_discarded_calls() {
        let llm = Arc::new(ScriptedLlmClient::new([
            r#"{"tool": "echo", "args": {"text": "hi"}}"#,
            "fine, skipped",
        ]));
        let runner = echo_runner(llm.clone(), &["echo"]).await;
        run(&runner, RunInput::Message("say hi".into())).await;
        assert!(runner.checkpoints().has_pending("t").await);

        ok(run(&runner, RunInput::Message("never mind".into())).await);
        assert!(!runner.checkpoints().has_pending("t").await);
        let history: Vec<String> = llm.calls()[1].iter().map(|m| m.content.clone()).collect();
        let n = history.len();
        assert!(history[n - 2].starts_with("Observation from echo: Tool call to echo was not executed"));
        assert_eq!(history[n - 1], "never mind");
    }

    #[tokio::test]
    async fn test_later_turns_see_first_question() {
        let mut script = Vec::new();
        for i in 0..11 {
            script.push(format!(r#"{{"tool": "echo", "args": {{"text": "call {i}"}}}}"#));
            script.push(format!("answer {i}"));
        }
        let llm = Arc::new(ScriptedLlmClient::new(script));
        let runner = echo_runner(llm.clone(), &[]).await;
        for i in 0..11 {
            ok(run(&runner, RunInput::Message(format!("question {i}"))).await);
        }

        let calls = llm.calls();
        let last = calls.last().unwrap();
        assert!(last.iter().any(|m| m.content == "question 0"));
        assert!(last.iter().any(|m| m.content == "answer 0"));
        let cp = runner.checkpoints().load("t").await;
        assert_eq!(cp.conversation.len(), 44);
        assert_eq!(cp.conversation.turns(), 11);
    }

    #[tokio::test]
    async fn test_context_window_trims_request_only() {
        let script: Vec<String> = (0..5).map(|i| format!("answer {i}")).collect();
        let llm = Arc::new(ScriptedLlmClient::new(script));
        let runner = echo_runner(llm.clone(), &[]).await.with_context_turns(2);
        for i in 0..5 {
            ok(run(&runner, RunInput::Message(format!("question {i}"))).await);
        }

        let last = llm.calls().pop().unwrap();
        assert_eq!(last[0].role, Role::System);
        let contents: Vec<&str> = last[1..].iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["question 3", "answer 3", "question 4"]);
        assert_eq!(runner.checkpoints().load("t").await.conversation.len(), 10);
    }

    #[tokio::test]
    async fn test_unknown_tool_gets_error_observation() {
        let llm = Arc::new(ScriptedLlmClient::new([
            r#"{"tool": "launch_rocket", "args": {}}"#,
            "sorry",
        ]));
        let runner = echo_runner(llm, &["*"]).await;
        let updates = ok(run(&runner, RunInput::Message("x".into())).await);
        assert!(updates.iter().all(|u| !matches!(u, AgentUpdate::Interrupts(_))));
        assert!(matches!(
            &updates[1],
            AgentUpdate::Messages(m) if m[0].formatted().contains("Hallucinated tool: launch_rocket")
        ));
    }

    #[tokio::test]
    async fn test_llm_error_surfaces_in_stream() {
        let llm = Arc::new(ScriptedLlmClient::new(Vec::<String>::new()));
        llm.push_error("503 upstream");
        let runner = echo_runner(llm, &[]).await;
        let updates = run(&runner, RunInput::Message("x".into())).await;
        assert!(matches!(updates.last().unwrap(), Err(AgentError::LlmError(m)) if m == "503 upstream"));
    }

    #[tokio::test]
    async fn test_step_limit() {
        let llm = Arc::new(ScriptedLlmClient::new([
            r#"{"tool": "echo", "args": {"text": "1"}}"#,
            r#"{"tool": "echo", "args": {"text": "2"}}"#,
        ]));
        let runner = echo_runner(llm, &[]).await.with_max_steps(2);
        let updates = ok(run(&runner, RunInput::Message("loop".into())).await);
        assert!(matches!(
            updates.last().unwrap(),
            AgentUpdate::Messages(m) if m[0].formatted().contains("step limit (2)")
        ));
    }

    #[tokio::test]
    async fn test_invalid_json_retries() {
        let llm = Arc::new(ScriptedLlmClient::new([r#"{"tool": "echo", "#, "recovered"]));
        let runner = echo_runner(llm.clone(), &[]).await;
        let updates = ok(run(&runner, RunInput::Message("x".into())).await);
        assert_eq!(
            updates,
            vec![AgentUpdate::Messages(vec![AgentMessage::Assistant { content: "recovered".into() }])]
        );
        assert!(llm.calls()[1].last().unwrap().content.contains("not valid JSON"));
    }

    #[test]
    fn test_approval_policy() {
        let p = ApprovalPolicy::new(&["a".to_string()]);
        assert!(p.requires("a"));
        assert!(!p.requires("b"));
        assert!(ApprovalPolicy::new(&["*".to_string()]).requires("anything"));
        assert!(!ApprovalPolicy::default().requires("a"));
    }
}

//! 会话构建器：统一的初始化逻辑
//!
//! 按环境选择后端：OPENAI_API_KEY → OpenAI 兼容客户端，否则 Mock；
//! ARCADE_API_KEY → Arcade 工具 / 授权服务，否则本地工具注册表（echo，总是已授权）。

use std::sync::Arc;

use crate::auth::{AuthorizationService, StaticAuthorizer};
use crate::config::AppConfig;
use crate::core::{AgentError, Session, SessionKey, TurnOrchestrator};
use crate::interrupt::DecisionCollector;
use crate::llm::{LlmClient, MockLlmClient, OpenAiClient};
use crate::runner::{ApprovalPolicy, CheckpointStore, ReactRunner};
use crate::tools::{
    ArcadeClient, EchoTool, LocalToolProvider, ToolBackend, ToolExecutor, ToolProvider,
    ToolRegistry, LOCAL_TOOLKIT,
};

const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant. Use the available tools when they help answer the user's request.";

/// 工具来源、执行后端与授权服务（Arcade 时三者为同一客户端）
#[derive(Clone)]
pub struct ToolStack {
    pub provider: Arc<dyn ToolProvider>,
    pub backend: Arc<dyn ToolBackend>,
    pub auth: Arc<dyn AuthorizationService>,
    /// 在配置的工具组之外额外解析的组
    pub extra_groups: Vec<String>,
}

impl ToolStack {
    /// 本地工具注册表：echo 工具，授权立即完成
    pub fn local() -> Self {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool);
        let local = Arc::new(LocalToolProvider::new(registry));
        Self {
            provider: local.clone(),
            backend: local,
            auth: Arc::new(StaticAuthorizer::granting()),
            extra_groups: vec![LOCAL_TOOLKIT.to_string()],
        }
    }

    pub fn arcade(client: ArcadeClient) -> Self {
        let client = Arc::new(client);
        Self {
            provider: client.clone(),
            backend: client.clone(),
            auth: client,
            extra_groups: Vec::new(),
        }
    }
}

pub struct AgentBuilder {
    config: AppConfig,
    system_prompt: String,
}

impl AgentBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }

    pub fn with_system_prompt(mut self, prompt: &str) -> Self {
        self.system_prompt = prompt.to_string();
        self
    }

    /// 从 config/prompts/system.md 加载系统提示词，找不到时保留内置提示词
    pub fn with_system_prompt_from_file(mut self) -> Self {
        if let Some(prompt) = ["config/prompts/system.md", "../config/prompts/system.md"]
            .into_iter()
            .find_map(|p| std::fs::read_to_string(p).ok())
            .filter(|p| !p.trim().is_empty())
        {
            self.system_prompt = prompt;
        }
        self
    }

    /// 有 API Key 时使用 OpenAI 兼容客户端，否则 Mock
    pub fn create_llm(&self, api_key: Option<&str>) -> Arc<dyn LlmClient> {
        match api_key {
            Some(key) if !key.trim().is_empty() => {
                tracing::info!("Using OpenAI LLM ({})", self.config.model());
                Arc::new(OpenAiClient::new(
                    self.config.llm.base_url.as_deref(),
                    self.config.model(),
                    key,
                ))
            }
            _ => {
                tracing::warn!("OPENAI_API_KEY not set, using Mock LLM");
                Arc::new(MockLlmClient)
            }
        }
    }

    /// 有 API Key 时使用 Arcade，否则本地工具
    pub fn create_tool_stack(&self, api_key: Option<&str>) -> Result<ToolStack, AgentError> {
        match api_key {
            Some(key) if !key.trim().is_empty() => {
                tracing::info!("Using Arcade tools");
                Ok(ToolStack::arcade(ArcadeClient::from_config(&self.config.arcade, key)?))
            }
            _ => {
                tracing::warn!("ARCADE_API_KEY not set, using local tool registry");
                Ok(ToolStack::local())
            }
        }
    }

    /// 按环境变量选择后端并构建会话
    pub async fn build(self) -> Result<Session, AgentError> {
        let llm = self.create_llm(std::env::var("OPENAI_API_KEY").ok().as_deref());
        let stack = self.create_tool_stack(std::env::var("ARCADE_API_KEY").ok().as_deref())?;
        self.build_with(llm, stack).await
    }

    /// 用给定的 LLM 与工具栈构建会话：解析工具 → ReAct 运行器 → 编排器
    pub async fn build_with(self, llm: Arc<dyn LlmClient>, stack: ToolStack) -> Result<Session, AgentError> {
        let cfg = &self.config;
        let groups: Vec<String> = cfg
            .arcade
            .toolkits
            .iter()
            .chain(stack.extra_groups.iter())
            .cloned()
            .collect();
        let tools = stack
            .provider
            .resolve(cfg.user_id(), &groups, &cfg.arcade.tools, cfg.arcade.tool_limit)
            .await?;
        if tools.is_empty() {
            tracing::warn!("No tools resolved for groups {:?}", groups);
        } else {
            tracing::info!(count = tools.len(), "tools resolved");
        }

        let runner = ReactRunner::new(
            llm,
            &self.system_prompt,
            tools,
            ToolExecutor::new(stack.backend, cfg.agent.tool_timeout_secs),
            cfg.user_id(),
        )
        .with_approval(ApprovalPolicy::new(&cfg.approval.tools))
        .with_checkpoints(Arc::new(CheckpointStore::new()))
        .with_context_turns(cfg.app.max_context_turns)
        .with_max_steps(cfg.agent.max_steps);

        let orchestrator = TurnOrchestrator::new(Arc::new(runner), DecisionCollector::new(stack.auth));
        let key = SessionKey::from_config(cfg.session.thread_id.as_deref());
        tracing::info!(thread = %key, "session created");
        Ok(Session::new(key, orchestrator))
    }
}

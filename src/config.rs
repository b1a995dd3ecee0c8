//! 应用配置：从 .env、config/default.toml 与环境变量加载
//!
//! 加载顺序：.env（dotenvy）→ config/default.toml → 显式指定的文件 → 环境变量 `TOLLGATE__*`
//! （双下划线表示嵌套，如 `TOLLGATE__ARCADE__TOOL_LIMIT=50`）。
//! 最后用 `ARCADE_USER_ID` / `OPENAI_MODEL` 补齐仍未设置的身份与模型。

use std::path::PathBuf;

use serde::Deserialize;

use crate::core::AgentError;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub arcade: ArcadeSection,
    pub approval: ApprovalSection,
    pub agent: AgentSection,
    pub session: SessionSection,
}

/// [app] 段
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppSection {
    pub name: Option<String>,
    /// 每次请求发给 LLM 的最近对话轮数（检查点始终保留全部历史），0 表示不截取
    pub max_context_turns: usize,
}

/// [llm] 段：模型与 OpenAI 兼容端点
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct LlmSection {
    /// 必填；未设置时取 OPENAI_MODEL
    pub model: Option<String>,
    pub base_url: Option<String>,
}

/// [arcade] 段：身份、工具组与授权服务
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ArcadeSection {
    /// 必填；未设置时取 ARCADE_USER_ID
    pub user_id: Option<String>,
    /// 未设置时用 https://api.arcade.dev
    pub base_url: Option<String>,
    /// 工具组（toolkit）
    pub toolkits: Vec<String>,
    /// 单独点名的工具
    pub tools: Vec<String>,
    pub tool_limit: usize,
    pub request_timeout_secs: u64,
    /// 授权状态长轮询每次等待秒数
    pub auth_wait_secs: u64,
}

impl Default for ArcadeSection {
    fn default() -> Self {
        Self {
            user_id: None,
            base_url: None,
            toolkits: vec!["GoogleJobs".to_string()],
            tools: Vec::new(),
            tool_limit: 100,
            request_timeout_secs: 30,
            auth_wait_secs: 59,
        }
    }
}

/// [approval] 段：执行前需人工批准的工具名，"*" 表示全部
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ApprovalSection {
    pub tools: Vec<String>,
}

/// [agent] 段：ReAct 循环限制
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentSection {
    pub max_steps: usize,
    pub tool_timeout_secs: u64,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            max_steps: 20,
            tool_timeout_secs: 30,
        }
    }
}

/// [session] 段：固定会话 id（不设则每次启动随机生成）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SessionSection {
    pub thread_id: Option<String>,
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map(str::trim).unwrap_or("").is_empty()
}

impl AppConfig {
    /// 用旧式环境变量补齐未设置的身份与模型
    pub fn apply_legacy_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if is_blank(&self.arcade.user_id) {
            if let Some(v) = lookup("ARCADE_USER_ID") {
                self.arcade.user_id = Some(v);
            }
        }
        if is_blank(&self.llm.model) {
            if let Some(v) = lookup("OPENAI_MODEL") {
                self.llm.model = Some(v);
            }
        }
    }

    /// 启动前校验必填项；失败即启动致命
    pub fn validate(&self) -> Result<(), AgentError> {
        if is_blank(&self.arcade.user_id) {
            return Err(AgentError::ConfigError(
                "arcade.user_id is required (set ARCADE_USER_ID or TOLLGATE__ARCADE__USER_ID)".into(),
            ));
        }
        if is_blank(&self.llm.model) {
            return Err(AgentError::ConfigError(
                "llm.model is required (set OPENAI_MODEL or TOLLGATE__LLM__MODEL)".into(),
            ));
        }
        if self.arcade.tool_limit == 0 {
            return Err(AgentError::ConfigError(
                "arcade.tool_limit must be greater than 0".into(),
            ));
        }
        if self.arcade.toolkits.is_empty() && self.arcade.tools.is_empty() {
            tracing::warn!("No toolkits or tools configured; the agent will answer without tools");
        }
        Ok(())
    }

    pub fn user_id(&self) -> &str {
        self.arcade.user_id.as_deref().map(str::trim).unwrap_or_default()
    }

    pub fn model(&self) -> &str {
        self.llm.model.as_deref().map(str::trim).unwrap_or_default()
    }
}

/// 加载配置：.env → 默认 TOML → 指定文件 → TOLLGATE__* 环境变量 → 旧式环境变量补齐
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, AgentError> {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!("Failed to read .env: {}", e),
    }

    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if !path.exists() {
            return Err(AgentError::ConfigError(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        builder = builder.add_source(config::File::from(path.clone()));
    }

    builder = builder.add_source(
        config::Environment::with_prefix("TOLLGATE")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("arcade.toolkits")
            .with_list_parse_key("arcade.tools")
            .with_list_parse_key("approval.tools")
            .try_parsing(true),
    );

    let mut cfg: AppConfig = builder.build()?.try_deserialize()?;
    cfg.apply_legacy_env(|key| std::env::var(key).ok());
    Ok(cfg)
}

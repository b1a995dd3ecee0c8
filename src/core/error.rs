//! Agent 错误类型
//!
//! 配置错误在启动阶段致命；其余错误只影响当前轮次（Turn），由会话循环捕获后继续。

use thiserror::Error;

/// 运行过程中可能出现的错误（配置、LLM、工具、授权、恢复协议等）
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("JSON parse error: {0}")]
    JsonParseError(String),

    #[error("Tool execution failed: {0}")]
    ToolExecutionFailed(String),

    #[error("Tool timeout: {0}")]
    ToolTimeout(String),

    #[error("Hallucinated tool: {0}")]
    HallucinatedTool(String),

    /// 授权服务返回失败或无法访问
    #[error("Authorization error: {0}")]
    Authorization(String),

    /// HTTP / 网络层失败
    #[error("Transport error: {0}")]
    Transport(String),

    /// 恢复命令中的决策数与挂起的中断数不一致
    #[error("Resume mismatch: expected {expected} decisions, got {got}")]
    ResumeMismatch { expected: usize, got: usize },

    /// 会话没有挂起的执行，却收到了恢复命令
    #[error("Nothing to resume for thread {0}")]
    NothingToResume(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for AgentError {
    fn from(e: reqwest::Error) -> Self {
        AgentError::Transport(e.to_string())
    }
}

impl From<config::ConfigError> for AgentError {
    fn from(e: config::ConfigError) -> Self {
        AgentError::ConfigError(e.to_string())
    }
}

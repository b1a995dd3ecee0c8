//! 会话：会话标识与交互主循环
//!
//! SessionKey 在启动时确定一次，通过 RunConfig 显式传给每次运行器调用；
//! 主循环逐行读取输入，每行原样作为一个轮次（空行也是）；整行不区分大小写等于 exit 时结束。
//! 轮次失败只打印错误，不结束会话。

use std::fmt;

use crate::core::{AgentError, TurnOrchestrator};
use crate::runner::RunConfig;
use crate::ui::{Console, Tone};

pub const WELCOME: &str = "Welcome to the chatbot! Type 'exit' to quit.";
pub const PROMPT: &str = "> ";
pub const FAREWELL: &str = "👋 Bye...";

/// 会话标识（不透明字符串）
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey(String);

impl SessionKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// 生成新的随机标识
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// 配置中给定且非空时使用配置值，否则生成
    pub fn from_config(configured: Option<&str>) -> Self {
        match configured.map(str::trim) {
            Some(key) if !key.is_empty() => Self::new(key),
            _ => Self::generate(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_exit(input: &str) -> bool {
    input.eq_ignore_ascii_case("exit")
}

pub struct Session {
    key: SessionKey,
    orchestrator: TurnOrchestrator,
}

impl Session {
    pub fn new(key: SessionKey, orchestrator: TurnOrchestrator) -> Self {
        Self { key, orchestrator }
    }

    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    /// 运行交互循环，直到输入 exit 或输入关闭；仅读取失败会以 Err 返回
    pub async fn run(&self, console: &mut dyn Console) -> Result<(), AgentError> {
        let config = RunConfig::new(self.key.as_str());
        tracing::info!(thread = %self.key, "session started");
        console.write(Tone::Success, WELCOME);

        loop {
            let Some(line) = console.read_line(PROMPT).await? else {
                tracing::info!(thread = %self.key, "input closed");
                break;
            };
            if is_exit(&line) {
                break;
            }
            if let Err(e) = self.orchestrator.run_turn(&config, console, &line).await {
                tracing::error!(thread = %self.key, "turn failed: {}", e);
                console.write(Tone::Error, &format!("Error: {e}"));
            }
        }

        console.write(Tone::Error, FAREWELL);
        tracing::info!(thread = %self.key, "session ended");
        Ok(())
    }
}

//! 智能体运行器（Agent Runner）能力接口
//!
//! stream(input, config) 驱动一次 Pass，返回按发出顺序排列的更新流：
//! 消息更新（Messages）或挂起中断（Interrupts）；流自然结束即 Pass 结束。
//! 恢复执行同样走 stream，输入为 RunInput::Resume。
//!
//! 实现：ReactRunner（LLM + 工具 + 检查点）与 ScriptedRunner（测试替身）。

pub mod checkpoint;
pub mod mock;
pub mod planner;
pub mod react;

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;
use serde::Serialize;
use serde_json::Value;

use crate::core::AgentError;
use crate::interrupt::{InterruptPayload, ResumeCommand};

pub use checkpoint::{Checkpoint, CheckpointStore, Gate, PendingCall, PendingSuspension};
pub use mock::ScriptedRunner;
pub use planner::{parse_llm_output, Planner, PlannerOutput, ToolCall};
pub use react::{ApprovalPolicy, ReactRunner};

/// 一次 Pass 的输入：新的用户消息，或继续挂起执行的恢复命令
#[derive(Debug, Clone, PartialEq)]
pub enum RunInput {
    Message(String),
    Resume(ResumeCommand),
}

/// 每次调用运行器时携带的会话配置（会话 id 显式传递，无全局状态）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub thread_id: String,
}

impl RunConfig {
    pub fn new(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
        }
    }
}

/// 流式展示给用户的消息
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentMessage {
    /// 智能体回复
    Assistant { content: String },
    /// 智能体请求调用工具
    ToolCall { tool: String, args: Value },
    /// 工具返回（或被拒绝 / 出错的说明）
    ToolResult { tool: String, content: String },
}

impl AgentMessage {
    /// 单行展示文本
    pub fn formatted(&self) -> String {
        match self {
            AgentMessage::Assistant { content } => content.clone(),
            AgentMessage::ToolCall { tool, args } => format!("Tool call: {tool} {args}"),
            AgentMessage::ToolResult { tool, content } => format!("Tool result ({tool}): {content}"),
        }
    }
}

/// 流中的一项
#[derive(Debug, Clone, PartialEq)]
pub enum AgentUpdate {
    Messages(Vec<AgentMessage>),
    Interrupts(Vec<InterruptPayload>),
}

pub type UpdateStream = Pin<Box<dyn Stream<Item = Result<AgentUpdate, AgentError>> + Send>>;

#[async_trait]
pub trait AgentRunner: Send + Sync {
    /// 开始一次 Pass；返回 Err 表示无法启动，流中的 Err 表示 Pass 中途失败
    async fn stream(&self, input: RunInput, config: &RunConfig) -> Result<UpdateStream, AgentError>;

    /// 以恢复命令继续挂起的执行
    async fn resume(&self, command: ResumeCommand, config: &RunConfig) -> Result<UpdateStream, AgentError> {
        self.stream(RunInput::Resume(command), config).await
    }
}

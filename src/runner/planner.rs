//! Planner：调用 LLM 并解析 Tool Call
//!
//! LLM 输出 `{"tool": "...", "args": {...}}` 表示调用一个工具，输出此类对象的数组表示同一步调用多个工具，
//! 其余文本视为最终回复。

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::AgentError;
use crate::llm::LlmClient;
use crate::memory::Message;

/// LLM 返回的 Tool Call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub tool: String,
    #[serde(default)]
    pub args: serde_json::Value,
}

/// Planner 输出
#[derive(Debug, Clone, PartialEq)]
pub enum PlannerOutput {
    /// 直接回复用户
    Response(String),
    /// 需要执行工具（按 LLM 给出的顺序）
    ToolCalls(Vec<ToolCall>),
}

/// 提取 JSON 片段：```json 代码块优先，否则取以 { 或 [ 开头的整段
fn extract_json(trimmed: &str) -> Option<&str> {
    if let Some(start) = trimmed.find("```json") {
        let rest = &trimmed[start + 7..];
        return Some(rest.find("```").map(|end| rest[..end].trim()).unwrap_or(rest.trim()));
    }
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return Some(trimmed);
    }
    None
}

/// 解析 LLM 输出：有效 Tool Call（单个或数组）→ ToolCalls，普通文本 → Response
pub fn parse_llm_output(output: &str) -> Result<PlannerOutput, AgentError> {
    let trimmed = output.trim();
    let Some(json_str) = extract_json(trimmed) else {
        return Ok(PlannerOutput::Response(trimmed.to_string()));
    };

    let calls: Vec<ToolCall> = if json_str.starts_with('[') {
        serde_json::from_str(json_str)
            .map_err(|e| AgentError::JsonParseError(format!("{}: {}", e, json_str)))?
    } else {
        vec![serde_json::from_str(json_str)
            .map_err(|e| AgentError::JsonParseError(format!("{}: {}", e, json_str)))?]
    };

    let calls: Vec<ToolCall> = calls.into_iter().filter(|c| !c.tool.is_empty()).collect();
    if calls.is_empty() {
        Ok(PlannerOutput::Response(trimmed.to_string()))
    } else {
        Ok(PlannerOutput::ToolCalls(calls))
    }
}

/// Planner：持有 LLM 与 system prompt
pub struct Planner {
    llm: Arc<dyn LlmClient>,
    system_prompt: String,
}

impl Planner {
    pub fn new(llm: Arc<dyn LlmClient>, system_prompt: impl Into<String>) -> Self {
        Self {
            llm,
            system_prompt: system_prompt.into(),
        }
    }

    /// 获取 LLM 累计 token 使用统计
    pub fn token_usage(&self) -> (u64, u64, u64) {
        self.llm.token_usage()
    }

    /// 拼 system + 对话历史后调用 LLM
    pub async fn plan(&self, messages: &[Message]) -> Result<String, AgentError> {
        let mut full_messages = Vec::with_capacity(messages.len() + 1);
        full_messages.push(Message::system(self.system_prompt.clone()));
        full_messages.extend_from_slice(messages);
        self.llm
            .complete(&full_messages)
            .await
            .map_err(AgentError::LlmError)
    }
}

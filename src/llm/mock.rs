//! Mock LLM 客户端（无需 API）
//!
//! MockLlmClient：首次对某条用户输入回显为 echo Tool Call，看到 Observation 后给出最终回复，
//! 便于本地跑通完整流程；ScriptedLlmClient：按序返回预置输出，测试用。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::LlmClient;
use crate::memory::{Message, Role};

/// Mock 客户端：回显用户最后一条消息
#[derive(Debug, Default)]
pub struct MockLlmClient;

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, String> {
        let last = messages
            .iter()
            .rev()
            .find(|m| matches!(m.role, Role::User))
            .map(|m| m.content.as_str())
            .unwrap_or("(no input)");

        if let Some(observation) = last.strip_prefix("Observation from ") {
            return Ok(format!("Mock agent finished: {observation}"));
        }
        Ok(serde_json::json!({
            "tool": "echo",
            "args": {"text": format!("Echo from Mock: {last}")}
        })
        .to_string())
    }
}

/// 脚本客户端：每次 complete 弹出一条预置输出，并记录收到的消息
#[derive(Debug, Default)]
pub struct ScriptedLlmClient {
    outputs: Mutex<VecDeque<Result<String, String>>>,
    calls: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedLlmClient {
    pub fn new<I, S>(outputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            outputs: Mutex::new(outputs.into_iter().map(|s| Ok(s.into())).collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// 追加一次失败输出
    pub fn push_error(&self, message: impl Into<String>) {
        if let Ok(mut q) = self.outputs.lock() {
            q.push_back(Err(message.into()));
        }
    }

    /// 已收到的请求（每次为完整消息列表）
    pub fn calls(&self) -> Vec<Vec<Message>> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, String> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(messages.to_vec());
        }
        self.outputs
            .lock()
            .map_err(|e| e.to_string())?
            .pop_front()
            .unwrap_or_else(|| Err("script exhausted".to_string()))
    }
}

//! 短期记忆：对话历史
//!
//! 保存会话的全部消息，由检查点按会话 id 保存；发给 LLM 时可按轮截取最近的窗口。

use serde::{Deserialize, Serialize};

/// 消息角色（与 LLM API 一致）
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    User,
    Assistant,
    System,
}

/// 单条消息
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// 会话的完整对话历史；记录每轮用户输入的起点，供按轮截取上下文窗口
#[derive(Clone, Debug, Default)]
pub struct ConversationMemory {
    messages: Vec<Message>,
    turn_starts: Vec<usize>,
}

impl ConversationMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以一条用户输入开启新的一轮
    pub fn begin_turn(&mut self, msg: Message) {
        self.turn_starts.push(self.messages.len());
        self.messages.push(msg);
    }

    pub fn push(&mut self, msg: Message) {
        self.messages.push(msg);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// 最近 `turns` 轮（从该轮的用户输入起），0 表示全部历史
    pub fn recent_turns(&self, turns: usize) -> &[Message] {
        if turns == 0 || self.turn_starts.len() <= turns {
            return &self.messages;
        }
        &self.messages[self.turn_starts[self.turn_starts.len() - turns]..]
    }

    pub fn turns(&self) -> usize {
        self.turn_starts.len()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
